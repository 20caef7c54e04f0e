//! The interface frame record.
//!
//! One frame travels in each direction per integration step. The record is
//! symmetric: both sides send the same shape, and the meaning of `source`
//! depends on the sender's role (potential in Supply, flow rate in Demand).

use serde::{Deserialize, Serialize};

use crate::validity::FrameValidity;

/// Fixed lengths of the bulk and trace mixture arrays.
///
/// Sizes are fixed when a frame is created and may legitimately differ
/// between the two sides of a pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MixtureSizes {
    /// Number of bulk constituents.
    pub bulk: usize,
    /// Number of trace constituents.
    pub trace: usize,
}

impl MixtureSizes {
    /// Create sizes from bulk and trace counts.
    pub const fn new(bulk: usize, trace: usize) -> Self {
        Self { bulk, trace }
    }

    /// Interface sizes for a side whose local model has `local` sizes.
    ///
    /// An override replaces the local sizes so dissimilar networks can agree
    /// on a common wire shape.
    pub fn negotiate(local: Self, override_sizes: Option<Self>) -> Self {
        override_sizes.unwrap_or(local)
    }

    /// Per-array overlap between two sizes.
    pub fn common(self, other: Self) -> Self {
        Self { bulk: self.bulk.min(other.bulk), trace: self.trace.min(other.trace) }
    }
}

/// Copy the overlapping prefix of `src` into `dst` and zero the remainder.
///
/// This is the size mismatch policy for every mixture array copy: lossy but
/// deterministic, never an error.
pub fn copy_prefix(dst: &mut [f64], src: &[f64]) {
    let common = dst.len().min(src.len());
    dst[..common].copy_from_slice(&src[..common]);
    dst[common..].fill(0.0);
}

/// Boundary state exchanged between paired links each frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFrame {
    /// Frame count driven by the sending side.
    pub frame_count: u32,
    /// Most recent partner frame count observed by the sender, echoed back.
    pub frame_loopback: u32,
    /// Sender is in Demand role.
    pub demand_mode: bool,
    /// Sender's available network capacitance (mol/Pa).
    pub capacitance: f64,
    /// Potential (Pa) in Supply role, molar flow rate (mol/s) in Demand role.
    pub source: f64,
    /// Temperature (K) or specific enthalpy (J/kg).
    pub energy: f64,
    mixture_fractions: Vec<f64>,
    trace_mixture_fractions: Vec<f64>,
}

impl InterfaceFrame {
    /// Create a zeroed frame with the given fixed mixture sizes.
    pub fn new(sizes: MixtureSizes) -> Self {
        Self {
            frame_count: 0,
            frame_loopback: 0,
            demand_mode: false,
            capacitance: 0.0,
            source: 0.0,
            energy: 0.0,
            mixture_fractions: vec![0.0; sizes.bulk],
            trace_mixture_fractions: vec![0.0; sizes.trace],
        }
    }

    /// Build a frame from decoded parts. Array lengths define the sizes.
    pub(crate) fn from_parts(
        frame_count: u32,
        frame_loopback: u32,
        demand_mode: bool,
        scalars: [f64; 3],
        mixture_fractions: Vec<f64>,
        trace_mixture_fractions: Vec<f64>,
    ) -> Self {
        let [capacitance, source, energy] = scalars;
        Self {
            frame_count,
            frame_loopback,
            demand_mode,
            capacitance,
            source,
            energy,
            mixture_fractions,
            trace_mixture_fractions,
        }
    }

    /// Fixed mixture array sizes of this frame.
    pub fn sizes(&self) -> MixtureSizes {
        MixtureSizes::new(self.mixture_fractions.len(), self.trace_mixture_fractions.len())
    }

    /// Bulk mole fractions.
    pub fn mixture_fractions(&self) -> &[f64] {
        &self.mixture_fractions
    }

    /// Trace compound mole fractions.
    pub fn trace_mixture_fractions(&self) -> &[f64] {
        &self.trace_mixture_fractions
    }

    /// Check whether this frame carries usable partner data.
    pub fn validity(&self) -> FrameValidity {
        FrameValidity::of(self)
    }

    /// Shorthand for `self.validity().is_valid()`.
    pub fn is_valid(&self) -> bool {
        self.validity().is_valid()
    }

    /// Set the wire fractions from arrays of any length.
    ///
    /// Positions beyond the given arrays are zero-filled; given entries beyond
    /// the frame's sizes are dropped.
    pub fn set_fractions(&mut self, bulk: &[f64], trace: &[f64]) {
        copy_prefix(&mut self.mixture_fractions, bulk);
        copy_prefix(&mut self.trace_mixture_fractions, trace);
    }

    /// Copy the wire fractions into caller arrays of any length.
    pub fn copy_fractions_into(&self, bulk: &mut [f64], trace: &mut [f64]) {
        copy_prefix(bulk, &self.mixture_fractions);
        copy_prefix(trace, &self.trace_mixture_fractions);
    }

    /// Take all values from `other`, keeping this frame's sizes.
    ///
    /// This is how a received frame lands in a side's fixed-size incoming
    /// record when the partner's sizes differ.
    pub fn absorb(&mut self, other: &Self) {
        self.frame_count = other.frame_count;
        self.frame_loopback = other.frame_loopback;
        self.demand_mode = other.demand_mode;
        self.capacitance = other.capacitance;
        self.source = other.source;
        self.energy = other.energy;
        self.set_fractions(&other.mixture_fractions, &other.trace_mixture_fractions);
    }

    /// Zero the logical clock, leaving payload and sizes untouched.
    pub fn reset_counters(&mut self) {
        self.frame_count = 0;
        self.frame_loopback = 0;
    }
}
