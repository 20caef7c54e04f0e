//! Frame traces.
//!
//! A [`FrameTrace`] records every frame a [`CoupledPair`] sends, with the
//! sender's role and boundary pressure, and round-trips through CBOR for
//! offline inspection.
//!
//! [`CoupledPair`]: crate::CoupledPair

use std::io::{Read, Write};

use confluence_core::Role;
use confluence_proto::InterfaceFrame;
use serde::{Deserialize, Serialize};

use crate::{error::HarnessError, pair::SideId};

/// One sent frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Step the frame was sent in.
    pub step: u64,
    /// Sender.
    pub side: SideId,
    /// Sender's role after the step.
    pub role: Role,
    /// Sender's boundary pressure after the step (Pa).
    pub potential: f64,
    /// The frame.
    pub frame: InterfaceFrame,
}

/// Ordered frame records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTrace {
    records: Vec<TraceRecord>,
}

impl FrameTrace {
    /// Append a record.
    pub fn record(&mut self, record: TraceRecord) {
        self.records.push(record);
    }

    /// All records in send order.
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of times `side`'s recorded role changed.
    pub fn role_changes(&self, side: SideId) -> usize {
        let roles: Vec<Role> =
            self.records.iter().filter(|r| r.side == side).map(|r| r.role).collect();
        roles.windows(2).filter(|w| w[0] != w[1]).count()
    }

    /// Write the trace as CBOR.
    pub fn write_cbor(&self, writer: impl Write) -> Result<(), HarnessError> {
        ciborium::into_writer(self, writer)?;
        Ok(())
    }

    /// Read a trace written by [`write_cbor`](Self::write_cbor).
    pub fn read_cbor(reader: impl Read) -> Result<Self, HarnessError> {
        Ok(ciborium::from_reader(reader)?)
    }
}
