//! Mixture translation between a local fluid model and the wire convention.
//!
//! Locally, bulk mass fractions sum to 1 and trace compounds are carried
//! relative to the bulk. On the wire, bulk and trace mole fractions together
//! sum to 1. The two sides may model different numbers of constituents; arrays
//! are copied by overlapping prefix with the remainder zero-filled.

use confluence_proto::{InterfaceFrame, copy_prefix};

use crate::fluid::{FluidProperties, FluidState};

/// Convert mass fractions to mole fractions.
///
/// `out` is left untouched when the molar-weighted sum is negligible.
/// Constituents without a positive molar mass contribute nothing.
pub fn mass_to_mole_fractions(out: &mut [f64], mass_fractions: &[f64], molar_masses: &[f64]) {
    normalize_weighted(out, mass_fractions, molar_masses, |x, mw| x / mw);
}

/// Convert mole fractions to mass fractions.
///
/// `out` is left untouched when the mass-weighted sum is negligible.
pub fn mole_to_mass_fractions(out: &mut [f64], mole_fractions: &[f64], molar_masses: &[f64]) {
    normalize_weighted(out, mole_fractions, molar_masses, |x, mw| x * mw);
}

fn normalize_weighted(
    out: &mut [f64],
    input: &[f64],
    molar_masses: &[f64],
    weight: impl Fn(f64, f64) -> f64,
) {
    let term = |(x, mw): (&f64, &f64)| if *mw > 0.0 { weight(*x, *mw) } else { 0.0 };

    let sum: f64 = input.iter().zip(molar_masses).map(term).sum();
    if sum < f64::EPSILON {
        return;
    }

    for (slot, value) in out.iter_mut().zip(input.iter().zip(molar_masses).map(term)) {
        *slot = value / sum;
    }
}

/// Partner mixture converted to the local representation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMixture {
    /// Bulk mass fractions, summing to 1.
    pub mass_fractions: Vec<f64>,
    /// Trace mole fractions relative to the bulk.
    pub trace_mole_fractions: Vec<f64>,
    /// Sum of the incoming bulk mole fractions, at most 1.
    pub bulk_sum: f64,
}

/// Converts between a local fluid model and interface frame fractions.
///
/// Scratch arrays are sized once to the local model.
#[derive(Debug, Clone)]
pub struct MixtureTranslator {
    molar_masses: Vec<f64>,
    mass: Vec<f64>,
    mole: Vec<f64>,
    trace: Vec<f64>,
}

impl MixtureTranslator {
    /// Create a translator for the given local fluid model.
    pub fn new(props: &impl FluidProperties) -> Self {
        let bulk = props.molar_masses().len();
        Self {
            molar_masses: props.molar_masses().to_vec(),
            mass: vec![0.0; bulk],
            mole: vec![0.0; bulk],
            trace: vec![0.0; props.trace_compound_count()],
        }
    }

    /// Write `fluid`'s composition into `frame` in the wire convention.
    ///
    /// Returns the sum of bulk and trace mole fractions before normalizing,
    /// which is at least 1 for a normalized fluid. This is the factor from a
    /// bulk-only molar rate to the total molar rate.
    pub fn outbound(&mut self, fluid: &FluidState, frame: &mut InterfaceFrame) -> f64 {
        copy_prefix(&mut self.mass, &fluid.mass_fractions);
        self.mole.fill(0.0);
        mass_to_mole_fractions(&mut self.mole, &self.mass, &self.molar_masses);
        copy_prefix(&mut self.trace, &fluid.trace_mole_fractions);

        let sum: f64 = self.mole.iter().chain(&self.trace).sum();
        if sum > f64::EPSILON {
            self.mole.iter_mut().chain(self.trace.iter_mut()).for_each(|x| *x /= sum);
        }

        frame.set_fractions(&self.mole, &self.trace);
        sum
    }

    /// Read the partner's composition from `frame` into the local convention.
    ///
    /// Returns `None` if the incoming bulk fractions sum to a negligible
    /// value, meaning the partner has not sent a usable mixture yet.
    pub fn inbound(&mut self, frame: &InterfaceFrame) -> Option<InboundMixture> {
        frame.copy_fractions_into(&mut self.mole, &mut self.trace);

        let bulk_sum: f64 = self.mole.iter().sum();
        if bulk_sum.is_nan() || bulk_sum < f64::EPSILON {
            return None;
        }

        self.mole.iter_mut().chain(self.trace.iter_mut()).for_each(|x| *x /= bulk_sum);

        self.mass.fill(0.0);
        mole_to_mass_fractions(&mut self.mass, &self.mole, &self.molar_masses);

        Some(InboundMixture {
            mass_fractions: self.mass.clone(),
            trace_mole_fractions: self.trace.clone(),
            bulk_sum,
        })
    }
}
