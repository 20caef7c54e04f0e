//! Confluence protocol engine.
//!
//! Couples two independently integrated lumped-parameter networks through a
//! pair of [`DistributedLink`]s exchanging one
//! [`InterfaceFrame`](confluence_proto::InterfaceFrame) per step in each
//! direction, over a channel of unknown latency.
//!
//! # Architecture
//!
//! Sans-IO: the link never touches a solver, a capacitor or a transport.
//! Callers pass node state in and execute the returned [`LinkAction`]s.
//!
//! - [`ModeArbiter`]: decides Supply or Demand role each step
//! - [`StabilityController`]: bounds the Demand conductance under latency
//! - [`ledger`]: outgoing capacitance net of Demand-injected capacitance
//! - [`MixtureTranslator`]: local composition to and from wire fractions
//! - [`CouplingSet`]: several links sharing one network
//!
//! # Errors
//!
//! Only setup can fail, with a fatal [`ConfigError`]. Unusable partner data
//! at runtime is routine and handled by falling back to local state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod arbiter;
pub mod config;
pub mod coupling;
pub mod error;
pub mod fluid;
pub mod ledger;
pub mod link;
pub mod mixture;
pub mod stability;

pub use arbiter::{FlipCause, ModeArbiter, PartnerView, Role, Transition};
pub use config::{CapacitorId, DemandFilter, LinkConfig, LinkInput};
pub use coupling::CouplingSet;
pub use error::ConfigError;
pub use fluid::{FluidProperties, FluidState, IdealMixture};
pub use ledger::{
    InterfaceId, NoSiblings, SiblingDirectory, SiblingRegistry, SiblingState,
    available_capacitance,
};
pub use link::{Contribution, DistributedLink, FlowDirection, LinkAction, NodeState};
pub use mixture::{InboundMixture, MixtureTranslator};
pub use stability::{ConductancePolicy, DemandInputs, StabilityController};
