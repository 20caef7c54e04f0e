//! Link setup errors.

use thiserror::Error;

/// Errors from validating a link's configuration.
///
/// These are only raised by [`DistributedLink::new`](crate::DistributedLink::new).
/// Problems with partner data at runtime are never errors; see
/// [`FrameValidity`](confluence_proto::FrameValidity).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No capacitor is attached to the link's node, so roles cannot flip.
    #[error("link {link} has no capacitor at its node")]
    MissingCapacitor {
        /// Name of the misconfigured link.
        link: String,
    },

    /// Moding capacitance ratio must exceed 1.
    #[error("moding capacitance ratio must be > 1, got {ratio}")]
    ModingRatioTooSmall {
        /// The configured ratio.
        ratio: f64,
    },

    /// Both force-Demand and force-Supply were requested.
    #[error("link {link} cannot force both Demand and Supply")]
    ConflictingForceModes {
        /// Name of the misconfigured link.
        link: String,
    },
}

impl ConfigError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Setup errors abort initialization of the link.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::MissingCapacitor { .. }
            | Self::ModingRatioTooSmall { .. }
            | Self::ConflictingForceModes { .. } => true,
        }
    }
}
