//! Couplings sharing one local network.
//!
//! A network may host several [`DistributedLink`]s, each paired with a
//! different remote network. Their ledgers need each other's supplied
//! capacitance, so the set owns the links and hands each one a read-only
//! snapshot of the others.

use crate::{
    config::{LinkConfig, LinkInput},
    error::ConfigError,
    fluid::FluidProperties,
    ledger::{InterfaceId, SiblingState},
    link::{DistributedLink, LinkAction, NodeState},
};

/// Links owned by one network, addressed by [`InterfaceId`].
#[derive(Debug, Clone, Default)]
pub struct CouplingSet {
    links: Vec<DistributedLink>,
}

impl CouplingSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and add a link. Its handle is its position in the set.
    pub fn add(
        &mut self,
        config: LinkConfig,
        input: LinkInput,
        props: &impl FluidProperties,
    ) -> Result<InterfaceId, ConfigError> {
        let id = InterfaceId(self.links.len());
        self.links.push(DistributedLink::new(id, config, input, props)?);
        Ok(id)
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the set holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Look up a link.
    pub fn link(&self, id: InterfaceId) -> Option<&DistributedLink> {
        self.links.get(id.0)
    }

    /// Look up a link mutably.
    pub fn link_mut(&mut self, id: InterfaceId) -> Option<&mut DistributedLink> {
        self.links.get_mut(id.0)
    }

    /// Iterate over all links.
    pub fn iter(&self) -> impl Iterator<Item = &DistributedLink> {
        self.links.iter()
    }

    /// Iterate mutably over all links.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DistributedLink> {
        self.links.iter_mut()
    }

    /// Make every link a sibling of every other. Safe to call repeatedly.
    pub fn register_siblings_all(&mut self) {
        let ids: Vec<InterfaceId> = self.links.iter().map(DistributedLink::id).collect();
        for link in &mut self.links {
            for id in &ids {
                link.register_sibling(*id);
            }
        }
    }

    /// Current sibling states, indexed by handle.
    pub fn snapshot(&self) -> Vec<SiblingState> {
        self.links.iter().map(DistributedLink::sibling_state).collect()
    }

    /// Post-solve processing for one link, against the others' current state.
    ///
    /// Returns `None` for an unknown handle.
    pub fn process_outputs(
        &mut self,
        id: InterfaceId,
        node: &NodeState<'_>,
        props: &impl FluidProperties,
    ) -> Option<Vec<LinkAction>> {
        let snapshot = self.snapshot();
        let link = self.links.get_mut(id.0)?;
        Some(link.process_outputs(node, &snapshot, props))
    }
}
