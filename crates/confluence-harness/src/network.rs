//! Minimal lumped-parameter gas network.
//!
//! Just enough of a network solver to drive a [`DistributedLink`]: gas nodes
//! with ideal-gas capacitance, linear conductors between them, and external
//! admittance/source stamps. Each step solves the implicit system
//!
//! ```text
//! (C/dt + L + Y) p = C/dt p_old + s
//! ```
//!
//! where `L` is the conductor Laplacian and `Y`, `s` are the stamps.
//!
//! [`DistributedLink`]: confluence_core::DistributedLink

use confluence_core::{FluidProperties, FluidState};

use crate::error::HarnessError;

/// Universal gas constant (J/mol/K).
pub const GAS_CONSTANT: f64 = 8.314_462_618;

/// A gas node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Volume (m³).
    pub volume: f64,
    /// Pressure (Pa).
    pub potential: f64,
    /// Contents.
    pub content: FluidState,
}

impl Node {
    /// Create a node.
    pub fn new(volume: f64, potential: f64, content: FluidState) -> Self {
        Self { volume, potential, content }
    }

    /// Ideal-gas capacitance `V / (R T)` (mol/Pa). Zero for an empty or
    /// unheated node.
    pub fn capacitance(&self) -> f64 {
        if self.volume > 0.0 && self.content.temperature > 0.0 {
            self.volume / (GAS_CONSTANT * self.content.temperature)
        } else {
            0.0
        }
    }

    /// Moles held at the current potential.
    pub fn moles(&self) -> f64 {
        self.capacitance() * self.potential
    }
}

/// Linear conductor between two nodes (mol/s/Pa).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conductor {
    /// Upstream node for positive flow.
    pub from: usize,
    /// Downstream node for positive flow.
    pub to: usize,
    /// Conductance.
    pub conductance: f64,
}

/// External contribution at one node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stamp {
    /// Node index.
    pub node: usize,
    /// Diagonal admittance.
    pub admittance: f64,
    /// Source term (mol/s).
    pub source: f64,
}

/// Network of gas nodes. Node 0 always exists.
#[derive(Debug, Clone)]
pub struct LumpedNetwork {
    nodes: Vec<Node>,
    conductors: Vec<Conductor>,
    inflows: Vec<Option<FluidState>>,
}

impl LumpedNetwork {
    /// Create a network holding a single node.
    pub fn new(first: Node) -> Self {
        Self { nodes: vec![first], conductors: Vec::new(), inflows: vec![None] }
    }

    /// Add a node and return its index.
    pub fn add_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.inflows.push(None);
        self.nodes.len() - 1
    }

    /// Connect two existing nodes.
    pub fn add_conductor(&mut self, conductor: Conductor) -> Result<(), HarnessError> {
        let nodes = self.nodes.len();
        for node in [conductor.from, conductor.to] {
            if node >= nodes {
                return Err(HarnessError::UnknownNode { node, nodes });
            }
        }
        self.conductors.push(conductor);
        Ok(())
    }

    /// All nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// First node.
    pub fn first(&self) -> &Node {
        &self.nodes[0]
    }

    /// Look up a node.
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Look up a node mutably.
    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    /// Mixed fluid that flowed into a node through conductors in the last
    /// solve.
    pub fn inflow(&self, index: usize) -> Option<&FluidState> {
        self.inflows.get(index).and_then(Option::as_ref)
    }

    /// Total moles in the network.
    pub fn total_moles(&self) -> f64 {
        self.nodes.iter().map(Node::moles).sum()
    }

    /// Advance one step.
    ///
    /// Returns `Ok(false)` and leaves every potential unchanged if the system
    /// is singular.
    pub fn solve(
        &mut self,
        dt: f64,
        stamps: &[Stamp],
        props: &impl FluidProperties,
    ) -> Result<bool, HarnessError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(HarnessError::InvalidTimestep(dt));
        }

        let (a, b) = self.system(dt, stamps);
        let Some(potentials) = solve_dense(a, b) else {
            tracing::warn!("Singular network system, holding potentials");
            self.inflows.fill(None);
            return Ok(false);
        };

        self.transport(&potentials, dt, props);
        for (node, p) in self.nodes.iter_mut().zip(potentials) {
            node.potential = p;
        }
        Ok(true)
    }

    /// Network capacitance at `index` and the potential response of every
    /// node, from a probe `flux` injected there.
    ///
    /// Returns zero capacitance and an empty response for a singular system.
    pub fn capacitance_probe(
        &self,
        dt: f64,
        stamps: &[Stamp],
        index: usize,
        flux: f64,
    ) -> (f64, Vec<f64>) {
        if index >= self.nodes.len() {
            return (0.0, Vec::new());
        }
        let (a, _) = self.system(dt, stamps);
        let mut b = vec![0.0; self.nodes.len()];
        b[index] = flux;

        match solve_dense(a, b) {
            Some(response) => {
                let dp = response[index];
                let capacitance = if dp > f64::MIN_POSITIVE { flux * dt / dp } else { 0.0 };
                (capacitance, response)
            },
            None => (0.0, Vec::new()),
        }
    }

    /// Add `moles` of `fluid` to a node's contents. Potentials are left to
    /// the solver.
    pub fn inject(
        &mut self,
        index: usize,
        moles: f64,
        fluid: &FluidState,
        props: &impl FluidProperties,
    ) {
        if let Some(node) = self.nodes.get_mut(index) {
            let held = node.moles();
            node.content = mix(&node.content, held, fluid, moles, props.molar_masses());
        }
    }

    fn system(&self, dt: f64, stamps: &[Stamp]) -> (Vec<Vec<f64>>, Vec<f64>) {
        let n = self.nodes.len();
        let mut a = vec![vec![0.0; n]; n];
        let mut b = vec![0.0; n];

        for (i, node) in self.nodes.iter().enumerate() {
            let c = node.capacitance() / dt;
            a[i][i] += c;
            b[i] += c * node.potential;
        }
        for c in &self.conductors {
            let g = c.conductance;
            a[c.from][c.from] += g;
            a[c.to][c.to] += g;
            a[c.from][c.to] -= g;
            a[c.to][c.from] -= g;
        }
        for s in stamps.iter().filter(|s| s.node < n) {
            a[s.node][s.node] += s.admittance;
            b[s.node] += s.source;
        }

        (a, b)
    }

    fn transport(&mut self, potentials: &[f64], dt: f64, props: &impl FluidProperties) {
        let mw = props.molar_masses();
        let mut incoming: Vec<Option<(f64, FluidState)>> = vec![None; self.nodes.len()];

        for c in &self.conductors {
            let flow = c.conductance * (potentials[c.from] - potentials[c.to]) * dt;
            let (up, down, moles) =
                if flow >= 0.0 { (c.from, c.to, flow) } else { (c.to, c.from, -flow) };
            if moles <= 0.0 {
                continue;
            }
            let fluid = &self.nodes[up].content;
            incoming[down] = Some(match incoming[down].take() {
                None => (moles, fluid.clone()),
                Some((held, mixed)) => (held + moles, mix(&mixed, held, fluid, moles, mw)),
            });
        }

        for ((node, inflow), slot) in self.nodes.iter_mut().zip(incoming).zip(&mut self.inflows) {
            *slot = inflow.map(|(moles, fluid)| {
                node.content = mix(&node.content, node.moles(), &fluid, moles, mw);
                fluid
            });
        }
    }
}

fn molar_mass(fluid: &FluidState, molar_masses: &[f64]) -> f64 {
    let inverse: f64 = fluid
        .mass_fractions
        .iter()
        .zip(molar_masses)
        .filter(|(_, mw)| **mw > 0.0)
        .map(|(w, mw)| w / mw)
        .sum();
    if inverse > f64::EPSILON { 1.0 / inverse } else { 0.0 }
}

/// Mix two quantities of fluid.
///
/// Bulk fractions are mixed by mass, trace fractions and temperature by moles.
/// Non-positive amounts count as nothing.
pub fn mix(
    a: &FluidState,
    moles_a: f64,
    b: &FluidState,
    moles_b: f64,
    molar_masses: &[f64],
) -> FluidState {
    let na = moles_a.max(0.0);
    let nb = moles_b.max(0.0);
    let mass_a = na * molar_mass(a, molar_masses);
    let mass_b = nb * molar_mass(b, molar_masses);
    let moles = na + nb;
    let mass = mass_a + mass_b;
    if moles <= f64::EPSILON || mass <= 0.0 {
        return if nb > na { b.clone() } else { a.clone() };
    }

    let blend = |x: &[f64], y: &[f64], wx: f64, wy: f64, total: f64| -> Vec<f64> {
        (0..x.len().max(y.len()))
            .map(|i| {
                let xi = x.get(i).copied().unwrap_or(0.0);
                let yi = y.get(i).copied().unwrap_or(0.0);
                (xi * wx + yi * wy) / total
            })
            .collect()
    };

    FluidState {
        temperature: (a.temperature * na + b.temperature * nb) / moles,
        mass_fractions: blend(&a.mass_fractions, &b.mass_fractions, mass_a, mass_b, mass),
        trace_mole_fractions: blend(
            &a.trace_mole_fractions,
            &b.trace_mole_fractions,
            na,
            nb,
            moles,
        ),
    }
}

/// Dense Gaussian elimination with partial pivoting. `None` if singular.
fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    let scale = a.iter().flatten().fold(0.0_f64, |m, x| m.max(x.abs()));
    if scale <= 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * f64::EPSILON;

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() <= tolerance {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        let pivot_row = a[col].clone();
        for row in col + 1..n {
            let factor = a[row][col] / pivot_row[col];
            for (k, value) in pivot_row.iter().enumerate().skip(col) {
                a[row][k] -= factor * value;
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}
