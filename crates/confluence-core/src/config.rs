//! Link configuration.
//!
//! [`LinkConfig`] is fixed at setup and validated once by
//! [`DistributedLink::new`](crate::DistributedLink::new). [`LinkInput`] holds
//! the values an operator may change while running.

use confluence_proto::{EnergyConvention, MixtureSizes};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, stability::ConductancePolicy};

/// Default moding capacitance ratio.
pub const DEFAULT_MODING_CAPACITANCE_RATIO: f64 = 1.25;

/// Default upper limit on the conductance stamped into the local system.
pub const DEFAULT_CONDUCTANCE_LIMIT: f64 = 1.0e15;

/// Handle of the capacitor that owns a node's volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapacitorId(pub usize);

/// Latency decay constants for the Demand gain limit.
///
/// `gain_limit = min(1, a * b^latency)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandFilter {
    /// Scale constant, at least 1.
    pub a: f64,
    /// Decay base, in (0, 1).
    pub b: f64,
}

impl Default for DemandFilter {
    fn default() -> Self {
        Self { a: 1.5, b: 0.75 }
    }
}

/// Static configuration of one side of a coupling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Name used in log output.
    pub name: String,
    /// Index of the boundary node in the local network.
    pub node: usize,
    /// Capacitor owning the boundary node's volume.
    pub capacitor: Option<CapacitorId>,
    /// This side flips to Demand on an exact startup capacitance tie.
    pub pair_master: bool,
    /// Energy convention shared with the partner.
    pub energy: EnergyConvention,
    /// Demand conductance policy.
    pub policy: ConductancePolicy,
    /// Upper clamp of the partner/own capacitance ratio, must exceed 1.
    pub moding_capacitance_ratio: f64,
    /// Latency decay constants.
    pub filter: DemandFilter,
    /// Fixed interface mixture sizes, replacing the local model's sizes.
    pub mixture_override: Option<MixtureSizes>,
    /// Upper limit on the stamped conductance.
    pub conductance_limit: f64,
    /// Relative band for treating startup capacitances as tied. Zero means
    /// exact equality.
    pub tie_tolerance: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: String::from("link"),
            node: 0,
            capacitor: Some(CapacitorId(0)),
            pair_master: false,
            energy: EnergyConvention::Temperature,
            policy: ConductancePolicy::Conservative,
            moding_capacitance_ratio: DEFAULT_MODING_CAPACITANCE_RATIO,
            filter: DemandFilter::default(),
            mixture_override: None,
            conductance_limit: DEFAULT_CONDUCTANCE_LIMIT,
            tie_tolerance: 0.0,
        }
    }
}

impl LinkConfig {
    /// Check the setup rules, returning the capacitor handle on success.
    pub fn validate(&self, input: &LinkInput) -> Result<CapacitorId, ConfigError> {
        let capacitor =
            self.capacitor.ok_or_else(|| ConfigError::MissingCapacitor { link: self.name.clone() })?;

        let ratio = self.moding_capacitance_ratio;
        if ratio.is_nan() || ratio <= 1.0 {
            return Err(ConfigError::ModingRatioTooSmall { ratio });
        }

        if input.force_demand && input.force_supply {
            return Err(ConfigError::ConflictingForceModes { link: self.name.clone() });
        }

        Ok(capacitor)
    }
}

/// Runtime inputs of one side of a coupling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinkInput {
    /// Fraction (0 to 1) by which the Demand conductance is derated.
    pub blockage: Option<f64>,
    /// Hold this side in Demand role.
    pub force_demand: bool,
    /// Hold this side in Supply role.
    pub force_supply: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = LinkConfig::default();
        assert_eq!(config.validate(&LinkInput::default()), Ok(CapacitorId(0)));
        assert!((config.moding_capacitance_ratio - 1.25).abs() < f64::EPSILON);
        assert!((config.filter.a - 1.5).abs() < f64::EPSILON);
        assert!((config.filter.b - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_capacitor_rejected() {
        let config = LinkConfig { name: "dock".to_string(), capacitor: None, ..Default::default() };
        assert_eq!(
            config.validate(&LinkInput::default()),
            Err(ConfigError::MissingCapacitor { link: "dock".to_string() })
        );
    }

    #[test]
    fn moding_ratio_must_exceed_one() {
        for ratio in [1.0, 0.5, f64::NAN] {
            let config = LinkConfig { moding_capacitance_ratio: ratio, ..Default::default() };
            assert!(matches!(
                config.validate(&LinkInput::default()),
                Err(ConfigError::ModingRatioTooSmall { .. })
            ));
        }
    }

    #[test]
    fn both_force_flags_rejected() {
        let input = LinkInput { force_demand: true, force_supply: true, ..Default::default() };
        assert!(matches!(
            LinkConfig::default().validate(&input),
            Err(ConfigError::ConflictingForceModes { .. })
        ));
    }
}
