//! Fluid state and the thermophysical property seam.
//!
//! The link never models fluid physics itself. It reads compositions and
//! energies through [`FluidProperties`], implemented by whatever property
//! provider the local network uses.

use serde::{Deserialize, Serialize};

/// Composition and temperature of a node's fluid.
///
/// Bulk mass fractions sum to 1 on their own; trace compounds are carried
/// separately as mole fractions relative to the bulk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FluidState {
    /// Temperature (K).
    pub temperature: f64,
    /// Bulk constituent mass fractions.
    pub mass_fractions: Vec<f64>,
    /// Trace compound mole fractions, relative to the bulk.
    pub trace_mole_fractions: Vec<f64>,
}

impl FluidState {
    /// Create a fluid from its temperature and fractions.
    pub fn new(temperature: f64, mass_fractions: Vec<f64>, trace_mole_fractions: Vec<f64>) -> Self {
        Self { temperature, mass_fractions, trace_mole_fractions }
    }

    /// Returns true if any bulk or trace fraction is negative.
    pub fn has_negative_fractions(&self) -> bool {
        self.mass_fractions.iter().chain(&self.trace_mole_fractions).any(|x| *x < 0.0)
    }

    /// Returns true if this fluid can be sent to the partner as inflow.
    ///
    /// A node with no inflow this step reports a reset state with zero
    /// temperature.
    pub fn is_usable_inflow(&self) -> bool {
        self.temperature > 0.0 && !self.has_negative_fractions()
    }
}

/// Thermophysical property provider for one network's fluid model.
pub trait FluidProperties {
    /// Molar mass (kg/mol) of each bulk constituent, in model order.
    fn molar_masses(&self) -> &[f64];

    /// Number of trace compounds the model tracks.
    fn trace_compound_count(&self) -> usize {
        0
    }

    /// Specific enthalpy (J/kg) of the given fluid.
    fn specific_enthalpy(&self, fluid: &FluidState) -> f64;

    /// Temperature (K) of a mixture with the given specific enthalpy.
    fn temperature_from_enthalpy(&self, enthalpy: f64, mass_fractions: &[f64]) -> f64;
}

/// Calorically perfect mixture: `h = cp * T` with mass-weighted `cp`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdealMixture {
    molar_masses: Vec<f64>,
    specific_heats: Vec<f64>,
    trace_compounds: usize,
}

impl IdealMixture {
    /// Create a mixture from per-constituent molar masses (kg/mol) and
    /// specific heats (J/kg/K).
    ///
    /// The two lists are paired by position; extra entries in either are
    /// ignored.
    pub fn new(molar_masses: Vec<f64>, specific_heats: Vec<f64>, trace_compounds: usize) -> Self {
        let n = molar_masses.len().min(specific_heats.len());
        let mut molar_masses = molar_masses;
        let mut specific_heats = specific_heats;
        molar_masses.truncate(n);
        specific_heats.truncate(n);
        Self { molar_masses, specific_heats, trace_compounds }
    }

    /// Dry air as nitrogen and oxygen, with `trace_compounds` trace slots.
    pub fn air(trace_compounds: usize) -> Self {
        Self::new(vec![0.028_013_4, 0.031_998_8], vec![1040.0, 918.0], trace_compounds)
    }

    fn mixture_specific_heat(&self, mass_fractions: &[f64]) -> f64 {
        self.specific_heats.iter().zip(mass_fractions).map(|(cp, w)| cp * w).sum()
    }
}

impl FluidProperties for IdealMixture {
    fn molar_masses(&self) -> &[f64] {
        &self.molar_masses
    }

    fn trace_compound_count(&self) -> usize {
        self.trace_compounds
    }

    fn specific_enthalpy(&self, fluid: &FluidState) -> f64 {
        self.mixture_specific_heat(&fluid.mass_fractions) * fluid.temperature
    }

    fn temperature_from_enthalpy(&self, enthalpy: f64, mass_fractions: &[f64]) -> f64 {
        let cp = self.mixture_specific_heat(mass_fractions);
        if cp > f64::EPSILON { enthalpy / cp } else { 0.0 }
    }
}
