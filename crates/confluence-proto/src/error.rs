//! Wire codec errors.

use thiserror::Error;

/// Errors from encoding or decoding an [`InterfaceFrame`](crate::InterfaceFrame).
///
/// These only describe malformed bytes. A well-formed frame whose contents
/// are not yet usable is reported by [`FrameValidity`](crate::FrameValidity)
/// instead, and is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Buffer is shorter than the header or the declared payload.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// Header does not start with the protocol magic.
    #[error("invalid magic: {0:02x?}")]
    InvalidMagic([u8; 4]),

    /// Header carries a version this codec does not understand.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),

    /// Header sets flag bits with no defined meaning.
    #[error("unknown flag bits: {0:#04x}")]
    UnknownFlags(u8),

    /// A mixture array is too long for the 16-bit length field.
    #[error("mixture array too long: {0} entries")]
    TooManyFractions(usize),
}
