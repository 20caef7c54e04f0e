//! Confluence coupled-network simulator.
//!
//! # Usage
//!
//! ```bash
//! # Default scenario: A (2 m³) supplies B (0.5 m³ + 1 m³ reservoir)
//! confluence-sim --steps 2000
//!
//! # Jittery, lossy channel with a frame trace
//! confluence-sim --latency 3 --jitter 2 --drop-rate 0.1 --seed 7 --trace run.cbor
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use confluence_core::ConductancePolicy;
use confluence_sim::{NetworkSpec, Scenario};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Series combination with the local capacitance
    Conservative,
    /// Filtered partner conductance only
    Relaxed,
}

impl From<Policy> for ConductancePolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Conservative => Self::Conservative,
            Policy::Relaxed => Self::Relaxed,
        }
    }
}

/// Confluence coupled-network simulator
#[derive(Parser, Debug)]
#[command(name = "confluence-sim")]
#[command(about = "Run two gas networks coupled over a latent channel")]
#[command(version)]
struct Args {
    /// Steps to run
    #[arg(short, long, default_value = "1000")]
    steps: u64,

    /// Timestep in seconds
    #[arg(long, default_value = "0.1")]
    dt: f64,

    /// Channel delay in frames
    #[arg(short, long, default_value = "1")]
    latency: u32,

    /// Extra random delay in frames
    #[arg(long, default_value = "0")]
    jitter: u32,

    /// Frame loss probability
    #[arg(long, default_value = "0.0")]
    drop_rate: f64,

    /// Channel RNG seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Boundary node volume of network A (m³)
    #[arg(long, default_value = "2.0")]
    volume_a: f64,

    /// Boundary node volume of network B (m³)
    #[arg(long, default_value = "0.5")]
    volume_b: f64,

    /// Initial pressure of network A (Pa)
    #[arg(long, default_value = "101325")]
    pressure_a: f64,

    /// Initial pressure of network B (Pa)
    #[arg(long, default_value = "100000")]
    pressure_b: f64,

    /// Reservoir volume behind A's boundary node (m³), 0 for none
    #[arg(long, default_value = "0.0")]
    reservoir_a: f64,

    /// Reservoir volume behind B's boundary node (m³), 0 for none
    #[arg(long, default_value = "1.0")]
    reservoir_b: f64,

    /// Boundary-to-reservoir conductance (mol/s/Pa)
    #[arg(long, default_value = "1e-4")]
    reservoir_conductance: f64,

    /// Demand conductance policy
    #[arg(long, value_enum, default_value = "conservative")]
    policy: Policy,

    /// Exchange specific enthalpy instead of temperature
    #[arg(long)]
    enthalpy: bool,

    /// Write a CBOR frame trace to this path
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Confluence simulation starting");
    tracing::info!(
        "Channel latency {} frames, jitter {}, drop rate {}, seed {}",
        args.latency,
        args.jitter,
        args.drop_rate,
        args.seed
    );

    let scenario = Scenario {
        steps: args.steps,
        dt: args.dt,
        latency: args.latency,
        jitter: args.jitter,
        drop_rate: args.drop_rate,
        seed: args.seed,
        a: NetworkSpec {
            volume: args.volume_a,
            pressure: args.pressure_a,
            reservoir: (args.reservoir_a > 0.0).then_some(args.reservoir_a),
        },
        b: NetworkSpec {
            volume: args.volume_b,
            pressure: args.pressure_b,
            reservoir: (args.reservoir_b > 0.0).then_some(args.reservoir_b),
        },
        reservoir_conductance: args.reservoir_conductance,
        policy: args.policy.into(),
        enthalpy: args.enthalpy,
        trace: args.trace,
    };

    let summary = confluence_sim::run(&scenario)?;

    tracing::info!(
        "Finished {} steps: A {:?} at {:.1} Pa ({} flips), B {:?} at {:.1} Pa ({} flips)",
        summary.steps,
        summary.roles[0],
        summary.pressures[0],
        summary.flips[0],
        summary.roles[1],
        summary.pressures[1],
        summary.flips[1]
    );
    tracing::info!(
        "Frames delivered {}/{}, dropped {}/{}",
        summary.delivered[0],
        summary.delivered[1],
        summary.dropped[0],
        summary.dropped[1]
    );

    Ok(())
}
