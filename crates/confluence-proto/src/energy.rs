//! Energy convention carried in the frame's `energy` field.

use serde_repr::{Deserialize_repr, Serialize_repr};

/// Intensive energy measure transported with the exchanged fluid.
///
/// Both sides of a pairing must be configured with the same convention; the
/// frame itself does not carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EnergyConvention {
    /// `energy` is temperature (K).
    #[default]
    Temperature = 0,
    /// `energy` is specific enthalpy (J/kg).
    SpecificEnthalpy = 1,
}
