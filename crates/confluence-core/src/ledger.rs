//! Capacitance ledger.
//!
//! Computes the capacitance a side reports to its partner. The raw network
//! capacitance at the boundary node already includes capacitance injected by
//! Demand-role couplings, so those contributions are taken back out: this
//! link's own, and each sibling's as seen through the conductive network.
//!
//! Siblings are referenced by [`InterfaceId`] handles, never by pointer. The
//! registry is filled at setup and read-only while stepping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Requested capacitance probe flux at the boundary node.
pub const CAPACITANCE_PROBE_FLUX: f64 = 1.0e-6;

/// Handle of one coupling within a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId(pub usize);

/// Sibling couplings sharing this link's network.
///
/// Append-only. Registering the owner or a known sibling again is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingRegistry {
    owner: InterfaceId,
    siblings: Vec<InterfaceId>,
}

impl SiblingRegistry {
    /// Create an empty registry for `owner`.
    pub fn new(owner: InterfaceId) -> Self {
        Self { owner, siblings: Vec::new() }
    }

    /// Register a sibling. Returns true if it was added.
    pub fn register(&mut self, id: InterfaceId) -> bool {
        if id == self.owner || self.siblings.contains(&id) {
            return false;
        }
        self.siblings.push(id);
        true
    }

    /// Registered siblings in registration order.
    pub fn siblings(&self) -> &[InterfaceId] {
        &self.siblings
    }

    /// Number of registered siblings.
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// Returns true if no siblings are registered.
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }
}

/// What the ledger needs to know about a sibling this step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiblingState {
    /// The sibling's boundary node index.
    pub node: usize,
    /// Capacitance the sibling injects while in Demand role.
    pub supplied_capacitance: f64,
}

/// Read-only lookup of sibling states by handle.
pub trait SiblingDirectory {
    /// Current state of the sibling, if known.
    fn sibling(&self, id: InterfaceId) -> Option<SiblingState>;
}

/// No siblings at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSiblings;

impl SiblingDirectory for NoSiblings {
    fn sibling(&self, _id: InterfaceId) -> Option<SiblingState> {
        None
    }
}

impl SiblingDirectory for HashMap<InterfaceId, SiblingState> {
    fn sibling(&self, id: InterfaceId) -> Option<SiblingState> {
        self.get(&id).copied()
    }
}

impl SiblingDirectory for Vec<SiblingState> {
    fn sibling(&self, id: InterfaceId) -> Option<SiblingState> {
        self.get(id.0).copied()
    }
}

/// Capacitance available to the partner.
///
/// `probe[i]` is the potential response at node `i` to the probe flux
/// injected at `own_node`. A sibling's supplied capacitance is scaled by its
/// node's response relative to ours. Siblings supplying negligible
/// capacitance, with negligible response, or at nodes outside the probe are
/// skipped. The result is never negative.
pub fn available_capacitance(
    network_capacitance: f64,
    own_supplied: f64,
    own_node: usize,
    probe: &[f64],
    registry: &SiblingRegistry,
    siblings: &impl SiblingDirectory,
) -> f64 {
    let own_response = probe.get(own_node).copied().unwrap_or(0.0).max(f64::EPSILON);

    let sibling_share: f64 = registry
        .siblings()
        .iter()
        .filter_map(|id| siblings.sibling(*id))
        .filter(|s| s.supplied_capacitance > f64::EPSILON)
        .filter_map(|s| {
            let response = probe.get(s.node).copied()?;
            (response > f64::EPSILON).then(|| s.supplied_capacitance * response / own_response)
        })
        .sum();

    let capacitance = network_capacitance - own_supplied - sibling_share;
    if capacitance.is_nan() { 0.0 } else { capacitance.max(0.0) }
}

/// Returns true if a Supply side should defer to its partner.
///
/// Only considered once the side has held its role for longer than the
/// measured loop latency.
pub fn capacitance_flip_due(
    frames_since_flip: u32,
    loop_latency: i64,
    own_capacitance: f64,
    partner_capacitance: f64,
    moding_ratio: f64,
) -> bool {
    i64::from(frames_since_flip) > loop_latency
        && own_capacitance * moding_ratio < partner_capacitance
}
