//! Per-frame validity query.
//!
//! Partners start, restart and drop frames independently, so an unusable
//! incoming frame is routine. [`FrameValidity`] reports why a frame cannot be
//! used yet without ever being an error.

use std::fmt;

use crate::frame::InterfaceFrame;

/// Result of checking an incoming frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameValidity {
    /// All checks passed.
    Valid,
    /// Partner has not produced a frame yet (`frame_count == 0`).
    NotStarted,
    /// Energy is zero, negative or NaN.
    NonPositiveEnergy(f64),
    /// Capacitance is negative or NaN.
    NegativeCapacitance(f64),
    /// Supply-role frame carries a negative potential.
    NegativeSupplySource(f64),
    /// A mixture fraction is negative or NaN.
    NegativeFraction {
        /// Position within its array.
        index: usize,
        /// True if the entry is in the trace array.
        trace: bool,
        /// Offending value.
        value: f64,
    },
}

impl FrameValidity {
    /// Run all checks against a frame, reporting the first failure.
    pub fn of(frame: &InterfaceFrame) -> Self {
        if frame.frame_count < 1 {
            return Self::NotStarted;
        }
        if frame.energy.is_nan() || frame.energy <= 0.0 {
            return Self::NonPositiveEnergy(frame.energy);
        }
        if frame.capacitance.is_nan() || frame.capacitance < 0.0 {
            return Self::NegativeCapacitance(frame.capacitance);
        }
        if !frame.demand_mode && (frame.source.is_nan() || frame.source < 0.0) {
            return Self::NegativeSupplySource(frame.source);
        }

        let bulk = frame.mixture_fractions().iter().map(|v| (false, v));
        let trace = frame.trace_mixture_fractions().iter().map(|v| (true, v));
        for (trace, index, value) in bulk
            .enumerate()
            .chain(trace.enumerate())
            .map(|(index, (trace, value))| (trace, index, *value))
        {
            if value.is_nan() || value < 0.0 {
                return Self::NegativeFraction { index, trace, value };
            }
        }

        Self::Valid
    }

    /// Returns true if the frame may be used.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for FrameValidity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::NotStarted => write!(f, "partner not started"),
            Self::NonPositiveEnergy(v) => write!(f, "non-positive energy: {v}"),
            Self::NegativeCapacitance(v) => write!(f, "negative capacitance: {v}"),
            Self::NegativeSupplySource(v) => write!(f, "negative supply potential: {v}"),
            Self::NegativeFraction { index, trace: true, value } => {
                write!(f, "negative trace fraction at {index}: {value}")
            },
            Self::NegativeFraction { index, trace: false, value } => {
                write!(f, "negative bulk fraction at {index}: {value}")
            },
        }
    }
}
