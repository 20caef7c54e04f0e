//! Confluence wire protocol.
//!
//! Defines the [`InterfaceFrame`] exchanged once per integration step between
//! the two sides of a distributed network coupling, and its fixed-layout
//! binary encoding.
//!
//! # Components
//!
//! - [`InterfaceFrame`]: the symmetric per-direction record
//! - [`FrameValidity`]: non-fatal validity query for incoming frames
//! - [`MixtureSizes`]: fixed mixture array sizes negotiated at setup
//! - [`FrameHeader`]: 48-byte big-endian header of the binary encoding
//! - [`EnergyConvention`]: whether `energy` carries temperature or enthalpy
//!
//! # Invariants
//!
//! - `frame_count` strictly increases per side; `0` means "not started"
//! - Bulk and trace fractions together sum to 1 on the wire
//! - Array sizes never change after construction

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod energy;
pub mod error;
pub mod frame;
pub mod validity;

pub use codec::{FrameFlags, FrameHeader, MAGIC, VERSION};
pub use energy::EnergyConvention;
pub use error::ProtocolError;
pub use frame::{InterfaceFrame, MixtureSizes, copy_prefix};
pub use validity::FrameValidity;
