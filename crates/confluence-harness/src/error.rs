//! Harness errors.

use confluence_core::ConfigError;
use confluence_proto::ProtocolError;
use thiserror::Error;

/// Errors from setting up or running a simulated coupling.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A link rejected its configuration.
    #[error("link configuration: {0}")]
    Config(#[from] ConfigError),

    /// A frame could not be encoded for the channel.
    #[error("frame encoding: {0}")]
    Protocol(#[from] ProtocolError),

    /// Channel drop rate outside 0 to 1.
    #[error("drop rate must be in [0, 1], got {0}")]
    InvalidDropRate(f64),

    /// Conductor endpoint does not name a node.
    #[error("conductor endpoint {node} out of range for {nodes} nodes")]
    UnknownNode {
        /// Offending endpoint.
        node: usize,
        /// Nodes in the network.
        nodes: usize,
    },

    /// Timestep must be positive and finite.
    #[error("timestep must be positive, got {0}")]
    InvalidTimestep(f64),

    /// Writing a frame trace failed.
    #[error("trace write: {0}")]
    TraceWrite(#[from] ciborium::ser::Error<std::io::Error>),

    /// Reading a frame trace failed.
    #[error("trace read: {0}")]
    TraceRead(#[from] ciborium::de::Error<std::io::Error>),
}
