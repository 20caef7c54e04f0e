//! Deterministic simulation harness for Confluence couplings.
//!
//! Runs two [`DistributedLink`](confluence_core::DistributedLink)s against
//! small lumped gas networks, exchanging encoded frames over seeded
//! latency/jitter/drop channels. Same seed, same run.
//!
//! # Model-Based Testing
//!
//! The `model` module generates random [`Operation`]s, applies them to both a
//! [`CoupledPair`] and a bookkeeping [`ModelPair`], and checks the link
//! invariants after each one.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod error;
pub mod model;
pub mod network;
pub mod pair;
pub mod trace;

pub use channel::{ChannelConfig, ChannelStats, FrameChannel};
pub use error::HarnessError;
pub use model::{
    ForcedRole, InvariantViolation, ModelPair, ObservableState, Operation, check_invariants,
};
pub use network::{Conductor, GAS_CONSTANT, LumpedNetwork, Node, Stamp};
pub use pair::{BOUNDARY_NODE, CoupledPair, PairConfig, Reservoir, Side, SideConfig, SideId};
pub use trace::{FrameTrace, TraceRecord};
