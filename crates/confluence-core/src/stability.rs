//! Demand-side coupling conductance.
//!
//! A Demand side couples to its partner's potential through an effective
//! conductance. The partner data it uses is `loop_latency` frames old, so the
//! conductance is bounded: higher latency lowers the gain ceiling, while a
//! partner with proportionally more capacitance pulls the gain back toward 1.
//!
//! # Invariants
//!
//! - Result is within `[0, conductance_limit]`
//! - Gain is non-increasing in loop latency for a fixed capacitance ratio up to
//!   1.25, where the blend weight reaches 1
//! - Conductance is non-decreasing in partner capacitance for a fixed latency
//! - Conservative conductance never exceeds Relaxed for the same inputs

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_CONDUCTANCE_LIMIT, DEFAULT_MODING_CAPACITANCE_RATIO, DemandFilter};

/// Capacitances at or below this are treated as negligible (`f32::EPSILON`).
pub const DEGENERATE_CAPACITANCE: f64 = 1.192_092_895_507_812_5e-7;

/// Largest latency exponent used in the gain limit.
const MAX_LATENCY_EXPONENT: i64 = 100;

/// How the nominal conductance is turned into the stamped conductance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConductancePolicy {
    /// Harmonic blend with this side's own capacitance.
    #[default]
    Conservative,
    /// Nominal conductance as-is. Higher flow, less margin at high latency.
    Relaxed,
}

impl DemandFilter {
    /// Latency-limited gain ceiling, `min(1, a * b^clamp(latency, 1, 100))`.
    pub fn gain_limit(&self, loop_latency: i64) -> f64 {
        let exponent = i32::try_from(loop_latency.clamp(1, MAX_LATENCY_EXPONENT)).unwrap_or(1);
        (self.a * self.b.powi(exponent)).min(1.0)
    }
}

/// Partner-to-own capacitance ratio clamped to `[1, moding_ratio]`.
pub fn capacitance_ratio(partner: f64, own: f64, moding_ratio: f64) -> f64 {
    (partner / own).clamp(1.0, moding_ratio)
}

/// Blend the gain ceiling toward 1 as the capacitance ratio grows.
///
/// The gain reaches 1 at a ratio of 1.25 and keeps rising past it, bounded
/// only by the moding ratio clamp on `ratio`.
pub fn blended_gain(gain_limit: f64, ratio: f64) -> f64 {
    gain_limit + (1.0 - gain_limit) * (ratio - 1.0) * 4.0
}

/// Per-step inputs to the Demand conductance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandInputs {
    /// This side's outgoing capacitance.
    pub own_capacitance: f64,
    /// Capacitance reported by the partner, zero if its frame is unusable.
    pub partner_capacitance: f64,
    /// Round-trip age of the partner data, in frames.
    pub loop_latency: i64,
    /// Integration step (s).
    pub dt: f64,
    /// Conductance derate fraction, 0 to 1.
    pub blockage: f64,
}

/// Stateful Demand conductance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityController {
    policy: ConductancePolicy,
    filter: DemandFilter,
    moding_ratio: f64,
    conductance_limit: f64,
    gain: f64,
}

impl Default for StabilityController {
    fn default() -> Self {
        Self::new(
            ConductancePolicy::default(),
            DemandFilter::default(),
            DEFAULT_MODING_CAPACITANCE_RATIO,
            DEFAULT_CONDUCTANCE_LIMIT,
        )
    }
}

impl StabilityController {
    /// Create a controller with gain reset to 1.
    pub fn new(
        policy: ConductancePolicy,
        filter: DemandFilter,
        moding_ratio: f64,
        conductance_limit: f64,
    ) -> Self {
        Self { policy, filter, moding_ratio, conductance_limit, gain: 1.0 }
    }

    /// Gain used in the most recent computation.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Active conductance policy.
    pub fn policy(&self) -> ConductancePolicy {
        self.policy
    }

    /// Reset the gain to 1.
    pub fn reset(&mut self) {
        self.gain = 1.0;
    }

    /// Conductance to stamp while in Demand role.
    pub fn demand_conductance(&mut self, inputs: DemandInputs) -> f64 {
        let DemandInputs { own_capacitance, partner_capacitance, loop_latency, dt, blockage } =
            inputs;

        if dt.is_nan() || dt <= f64::EPSILON {
            return 0.0;
        }

        let conductance = if own_capacitance > DEGENERATE_CAPACITANCE
            && partner_capacitance > DEGENERATE_CAPACITANCE
        {
            let ratio = capacitance_ratio(partner_capacitance, own_capacitance, self.moding_ratio);
            self.gain = blended_gain(self.filter.gain_limit(loop_latency), ratio);
            let nominal = self.gain * partner_capacitance / dt;
            match self.policy {
                ConductancePolicy::Relaxed => nominal,
                ConductancePolicy::Conservative => {
                    1.0 / (1.0 / nominal + dt / own_capacitance).max(f64::EPSILON)
                },
            }
        } else {
            self.gain = 1.0;
            partner_capacitance / dt
        };

        let derated = conductance * (1.0 - blockage);
        if derated.is_nan() { 0.0 } else { derated.max(0.0).min(self.conductance_limit) }
    }
}
