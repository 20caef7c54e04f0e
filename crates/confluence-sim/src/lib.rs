//! Scenario runner behind the `confluence-sim` binary.
//!
//! Builds a [`CoupledPair`] from a [`Scenario`], runs it, and optionally
//! writes the frame trace as CBOR.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{fs::File, io::BufWriter, path::PathBuf};

use confluence_core::{ConductancePolicy, Role};
use confluence_harness::{
    ChannelConfig, CoupledPair, HarnessError, PairConfig, Reservoir, SideConfig, SideId,
};
use confluence_proto::EnergyConvention;
use thiserror::Error;

/// Scenario failures.
#[derive(Debug, Error)]
pub enum SimError {
    /// Setup or stepping failed.
    #[error(transparent)]
    Harness(#[from] HarnessError),

    /// Trace file could not be created.
    #[error("trace file: {0}")]
    Io(#[from] std::io::Error),
}

/// One network's setup.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSpec {
    /// Boundary node volume (m³).
    pub volume: f64,
    /// Initial pressure (Pa).
    pub pressure: f64,
    /// Reservoir volume behind the boundary node (m³), if any.
    pub reservoir: Option<f64>,
}

/// Everything needed to run a coupled scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Steps to run.
    pub steps: u64,
    /// Timestep (s).
    pub dt: f64,
    /// Channel delay in frames.
    pub latency: u32,
    /// Extra random delay in frames.
    pub jitter: u32,
    /// Frame loss probability.
    pub drop_rate: f64,
    /// Channel RNG seed.
    pub seed: u64,
    /// Network A, the pair master.
    pub a: NetworkSpec,
    /// Network B.
    pub b: NetworkSpec,
    /// Conductance between boundary and reservoir nodes (mol/s/Pa).
    pub reservoir_conductance: f64,
    /// Demand conductance policy on both sides.
    pub policy: ConductancePolicy,
    /// Exchange specific enthalpy instead of temperature.
    pub enthalpy: bool,
    /// Where to write the CBOR frame trace.
    pub trace: Option<PathBuf>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            steps: 1000,
            dt: 0.1,
            latency: 1,
            jitter: 0,
            drop_rate: 0.0,
            seed: 0,
            a: NetworkSpec { volume: 2.0, pressure: 101_325.0, reservoir: None },
            b: NetworkSpec { volume: 0.5, pressure: 100_000.0, reservoir: Some(1.0) },
            reservoir_conductance: 1e-4,
            policy: ConductancePolicy::Conservative,
            enthalpy: false,
            trace: None,
        }
    }
}

impl Scenario {
    fn side(&self, name: &str, network: &NetworkSpec, pair_master: bool) -> SideConfig {
        let mut side = SideConfig {
            volume: network.volume,
            potential: network.pressure,
            reservoir: network
                .reservoir
                .map(|volume| Reservoir { volume, conductance: self.reservoir_conductance }),
            ..Default::default()
        };
        side.link.name = name.to_string();
        side.link.pair_master = pair_master;
        side.link.policy = self.policy;
        if self.enthalpy {
            side.link.energy = EnergyConvention::SpecificEnthalpy;
        }
        side
    }

    /// Pair configuration for this scenario.
    pub fn pair_config(&self) -> PairConfig {
        let channel = |seed| ChannelConfig {
            latency: self.latency,
            jitter: self.jitter,
            drop_rate: self.drop_rate,
            seed,
        };
        PairConfig {
            dt: self.dt,
            a: self.side("a", &self.a, true),
            b: self.side("b", &self.b, false),
            a_to_b: channel(self.seed),
            b_to_a: channel(self.seed.wrapping_add(1)),
        }
    }
}

/// End state of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Steps run.
    pub steps: u64,
    /// Final roles of A and B.
    pub roles: [Role; 2],
    /// Final boundary pressures of A and B (Pa).
    pub pressures: [f64; 2],
    /// Role changes on A and B.
    pub flips: [usize; 2],
    /// Frames delivered to B and to A.
    pub delivered: [u64; 2],
    /// Frames dropped toward B and toward A.
    pub dropped: [u64; 2],
}

/// Run a scenario to completion.
pub fn run(scenario: &Scenario) -> Result<Summary, SimError> {
    let mut pair = CoupledPair::new(scenario.pair_config())?;
    if scenario.trace.is_some() {
        pair.enable_trace();
    }

    let report_every = (scenario.steps / 10).max(1);
    for step in 0..scenario.steps {
        pair.step()?;
        if step % report_every == 0 {
            tracing::debug!(
                "Step {}: A {:?} at {:.1} Pa, B {:?} at {:.1} Pa",
                step,
                pair.side(SideId::A).link().role(),
                pair.side(SideId::A).potential(),
                pair.side(SideId::B).link().role(),
                pair.side(SideId::B).potential()
            );
        }
    }

    if let (Some(path), Some(trace)) = (&scenario.trace, pair.trace()) {
        trace.write_cbor(BufWriter::new(File::create(path)?))?;
        tracing::info!("Wrote {} frame records to {}", trace.len(), path.display());
    }

    let a = pair.side(SideId::A);
    let b = pair.side(SideId::B);
    Ok(Summary {
        steps: pair.steps(),
        roles: [a.link().role(), b.link().role()],
        pressures: [a.potential(), b.potential()],
        flips: [a.transitions().len(), b.transitions().len()],
        delivered: [
            pair.channel(SideId::A).stats().delivered,
            pair.channel(SideId::B).stats().delivered,
        ],
        dropped: [pair.channel(SideId::A).stats().dropped, pair.channel(SideId::B).stats().dropped],
    })
}

#[cfg(test)]
mod tests {
    use confluence_harness::FrameTrace;

    use super::*;

    #[test]
    fn default_scenario_settles_with_b_in_demand() {
        let summary = run(&Scenario { steps: 200, ..Default::default() }).expect("runs");
        assert_eq!(summary.steps, 200);
        assert_eq!(summary.roles, [Role::Supply, Role::Demand]);
        assert_eq!(summary.flips, [0, 1]);
        assert_eq!(summary.dropped, [0, 0]);
    }

    #[test]
    fn enthalpy_convention_runs_the_same_roles() {
        let summary =
            run(&Scenario { steps: 100, enthalpy: true, ..Default::default() }).expect("runs");
        assert_eq!(summary.roles, [Role::Supply, Role::Demand]);
    }

    #[test]
    fn trace_is_written_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.cbor");
        let scenario = Scenario { steps: 10, trace: Some(path.clone()), ..Default::default() };

        run(&scenario).expect("runs");

        let trace = FrameTrace::read_cbor(File::open(path).expect("exists")).expect("reads");
        assert_eq!(trace.len(), 20);
    }

    #[test]
    fn invalid_drop_rate_is_reported() {
        let scenario = Scenario { drop_rate: 2.0, ..Default::default() };
        assert!(matches!(
            run(&scenario),
            Err(SimError::Harness(HarnessError::InvalidDropRate(_)))
        ));
    }
}
