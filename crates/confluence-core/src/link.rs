//! One side of a distributed network coupling.
//!
//! [`DistributedLink`] is a pure state machine driven twice per integration
//! step by the owning network:
//!
//! 1. Pre-solve: [`receive`](DistributedLink::receive) the latest partner
//!    frame (if any), [`process_inputs`](DistributedLink::process_inputs), then
//!    [`step`](DistributedLink::step) to get this step's admittance and source
//!    terms for the local solve.
//! 2. Post-solve: [`compute_flows`](DistributedLink::compute_flows) with the
//!    solved node potential, then
//!    [`process_outputs`](DistributedLink::process_outputs), which emits the
//!    outgoing frame as a [`LinkAction::SendFrame`].
//!
//! The link performs no I/O. Node volume edits, node fluid overwrites and
//! frame transport are returned as actions for the caller to execute.
//!
//! # Invariants
//!
//! - Supply role stamps zero admittance
//! - Outgoing `frame_count` increases by one per step
//! - Outgoing capacitance is never negative
//! - No operation waits on partner data; unusable frames fall back to
//!   holding the node's own state

use confluence_proto::{EnergyConvention, InterfaceFrame, MixtureSizes};

use crate::{
    arbiter::{ModeArbiter, PartnerView, Role, Transition},
    config::{CapacitorId, LinkConfig, LinkInput},
    error::ConfigError,
    fluid::{FluidProperties, FluidState},
    ledger::{
        CAPACITANCE_PROBE_FLUX, InterfaceId, SiblingDirectory, SiblingRegistry, SiblingState,
        available_capacitance,
    },
    mixture::{InboundMixture, MixtureTranslator},
    stability::{DemandInputs, StabilityController},
};

/// Boundary node state supplied by the local solver.
#[derive(Debug, Clone, Copy)]
pub struct NodeState<'a> {
    /// Node potential (Pa).
    pub potential: f64,
    /// Node volume (m³) as currently set on its capacitor.
    pub volume: f64,
    /// Network capacitance at the node (mol/Pa).
    pub network_capacitance: f64,
    /// Potential response at every node to the probe flux at this node.
    pub capacitance_probe: &'a [f64],
    /// Current node contents.
    pub content: &'a FluidState,
    /// Mixed fluid flowing into the node this step, if any.
    pub inflow: Option<&'a FluidState>,
}

/// This step's terms for the local linear system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    /// Diagonal admittance at the boundary node.
    pub admittance: f64,
    /// Source vector term at the boundary node (mol/s).
    pub source: f64,
    /// Capacitance probe flux requested at the boundary node.
    pub probe_flux: f64,
    /// Admittance differs from the previous step.
    pub admittance_changed: bool,
}

/// Direction of flow at the boundary node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowDirection {
    /// Negligible flow.
    #[default]
    None,
    /// Flow into the node, or out of it toward a Supply side's partner.
    Sink,
    /// Flow out of a Demand side's node.
    Source,
}

/// Side effects requested by the link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    /// Set the volume of the boundary node's capacitor.
    EditVolume {
        /// Capacitor to edit.
        capacitor: CapacitorId,
        /// Enable the override.
        enable: bool,
        /// Volume to apply (m³).
        volume: f64,
    },
    /// Replace the boundary node's contents with the partner's fluid.
    OverwriteNodeFluid {
        /// Potential of the partner's fluid (Pa).
        potential: f64,
        /// The partner's fluid in the local representation.
        fluid: FluidState,
    },
    /// Role changed this step.
    RoleChanged(Transition),
    /// Hand the outgoing frame to the transport.
    SendFrame(InterfaceFrame),
}

/// One side of a coupling between two independently integrated networks.
#[derive(Debug, Clone)]
pub struct DistributedLink {
    id: InterfaceId,
    config: LinkConfig,
    capacitor: CapacitorId,
    blockage: f64,
    arbiter: ModeArbiter,
    stability: StabilityController,
    translator: MixtureTranslator,
    registry: SiblingRegistry,
    outgoing: InterfaceFrame,
    incoming: InterfaceFrame,
    loop_latency: i64,
    supplied_capacitance: f64,
    supply_volume: f64,
    admittance: f64,
    source_potential: f64,
    demand_flux: f64,
    flux: f64,
    direction: FlowDirection,
    influx_fluid: Option<FluidState>,
}

impl DistributedLink {
    /// Create a link in Supply role.
    ///
    /// Frame sizes come from the local fluid model unless
    /// `config.mixture_override` is set.
    pub fn new(
        id: InterfaceId,
        config: LinkConfig,
        input: LinkInput,
        props: &impl FluidProperties,
    ) -> Result<Self, ConfigError> {
        let capacitor = config.validate(&input)?;

        let local = MixtureSizes::new(props.molar_masses().len(), props.trace_compound_count());
        let sizes = MixtureSizes::negotiate(local, config.mixture_override);

        let forced = if input.force_demand {
            Some(Role::Demand)
        } else if input.force_supply {
            Some(Role::Supply)
        } else {
            None
        };

        let mut link = Self {
            id,
            capacitor,
            blockage: 0.0,
            arbiter: ModeArbiter::new(config.pair_master, config.tie_tolerance, forced),
            stability: StabilityController::new(
                config.policy,
                config.filter,
                config.moding_capacitance_ratio,
                config.conductance_limit,
            ),
            translator: MixtureTranslator::new(props),
            registry: SiblingRegistry::new(id),
            outgoing: InterfaceFrame::new(sizes),
            incoming: InterfaceFrame::new(sizes),
            loop_latency: 0,
            supplied_capacitance: 0.0,
            supply_volume: 0.0,
            admittance: 0.0,
            source_potential: 0.0,
            demand_flux: 0.0,
            flux: 0.0,
            direction: FlowDirection::None,
            influx_fluid: None,
            config,
        };
        link.set_blockage(input.blockage);

        tracing::debug!(
            "Link {} initialized: interface sizes {}/{}, local sizes {}/{}",
            link.config.name,
            sizes.bulk,
            sizes.trace,
            local.bulk,
            local.trace
        );

        Ok(link)
    }

    /// Handle of this link within its network.
    pub fn id(&self) -> InterfaceId {
        self.id
    }

    /// Configured name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Static configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.arbiter.role()
    }

    /// Frames elapsed since the last role change.
    pub fn frames_since_flip(&self) -> u32 {
        self.arbiter.frames_since_flip()
    }

    /// Round-trip age of the partner data, in frames.
    pub fn loop_latency(&self) -> i64 {
        self.loop_latency
    }

    /// Capacitance injected at the node while in Demand role.
    pub fn supplied_capacitance(&self) -> f64 {
        self.supplied_capacitance
    }

    /// Admittance stamped in the last step.
    pub fn admittance(&self) -> f64 {
        self.admittance
    }

    /// Demand gain used in the last step.
    pub fn gain(&self) -> f64 {
        self.stability.gain()
    }

    /// Partner potential followed in Demand role.
    pub fn source_potential(&self) -> f64 {
        self.source_potential
    }

    /// Partner demand flow imposed in Supply role (mol/s, positive into node).
    pub fn demand_flux(&self) -> f64 {
        self.demand_flux
    }

    /// Molar flow into the node from the last solve.
    pub fn flux(&self) -> f64 {
        self.flux
    }

    /// Flow direction from the last solve.
    pub fn flow_direction(&self) -> FlowDirection {
        self.direction
    }

    /// Conductance derate fraction.
    pub fn blockage(&self) -> f64 {
        self.blockage
    }

    /// Frame most recently produced.
    pub fn outgoing(&self) -> &InterfaceFrame {
        &self.outgoing
    }

    /// Latest partner frame.
    pub fn incoming(&self) -> &InterfaceFrame {
        &self.incoming
    }

    /// Partner fluid entering the node in Supply role.
    pub fn influx_fluid(&self) -> Option<&FluidState> {
        self.influx_fluid.as_ref()
    }

    /// Registered siblings.
    pub fn registry(&self) -> &SiblingRegistry {
        &self.registry
    }

    /// Register a sibling coupling sharing this network.
    ///
    /// Returns false for this link itself or an already known sibling.
    pub fn register_sibling(&mut self, id: InterfaceId) -> bool {
        self.registry.register(id)
    }

    /// State seen by sibling ledgers.
    pub fn sibling_state(&self) -> SiblingState {
        SiblingState { node: self.config.node, supplied_capacitance: self.supplied_capacitance }
    }

    /// Set the blockage fraction. Values outside 0 to 1 are ignored.
    pub fn set_blockage(&mut self, blockage: Option<f64>) {
        match blockage {
            None => self.blockage = 0.0,
            Some(value) if (0.0..=1.0).contains(&value) => self.blockage = value,
            Some(value) => {
                tracing::warn!("Link {}: ignoring blockage {} outside [0, 1]", self.config.name, value);
            },
        }
    }

    /// Replace the forced role. Takes effect at the next input processing.
    pub fn set_forced_role(&mut self, forced: Option<Role>) {
        self.arbiter.set_forced(forced);
    }

    /// Take a frame from the partner.
    ///
    /// The frame is absorbed into this side's fixed-size incoming record.
    pub fn receive(&mut self, frame: &InterfaceFrame) {
        tracing::debug!(
            "Link {} received frame {} (loopback {})",
            self.config.name,
            frame.frame_count,
            frame.frame_loopback
        );
        self.incoming.absorb(frame);
    }

    /// Pre-solve processing of the latest partner frame.
    pub fn process_inputs(
        &mut self,
        node: &NodeState<'_>,
        props: &impl FluidProperties,
    ) -> Vec<LinkAction> {
        let mut actions = Vec::new();

        let validity = self.incoming.validity();
        let valid = validity.is_valid();
        if !valid {
            tracing::trace!("Link {}: incoming frame unusable: {}", self.config.name, validity);
        }
        let partner = valid.then(|| PartnerView {
            demand_mode: self.incoming.demand_mode,
            capacitance: self.incoming.capacitance,
        });

        if let Some(transition) = self.arbiter.arbitrate(partner, self.outgoing.capacitance) {
            self.apply_transition(transition, node.volume, &mut actions);
        }

        self.demand_flux = 0.0;
        match self.arbiter.role() {
            Role::Demand => {
                let supply_partner = valid && !self.incoming.demand_mode;
                let inbound = if supply_partner { self.translator.inbound(&self.incoming) } else { None };
                if let Some(mixture) = inbound {
                    self.source_potential = self.incoming.source;
                    let fluid = self.local_fluid(mixture, props);
                    actions.push(LinkAction::OverwriteNodeFluid {
                        potential: self.source_potential,
                        fluid,
                    });
                } else {
                    self.source_potential = node.potential;
                }
            },
            Role::Supply => {
                self.source_potential = 0.0;
                let demand_partner = valid && self.incoming.demand_mode;
                let inbound = if demand_partner { self.translator.inbound(&self.incoming) } else { None };
                if let Some(mixture) = inbound {
                    self.demand_flux = -self.incoming.source * mixture.bulk_sum;
                    self.influx_fluid = Some(self.local_fluid(mixture, props));
                }
            },
        }

        self.outgoing.frame_count = self.outgoing.frame_count.wrapping_add(1);
        self.loop_latency =
            i64::from(self.outgoing.frame_count) - i64::from(self.incoming.frame_loopback);
        self.outgoing.frame_loopback = self.incoming.frame_count;

        actions
    }

    /// This step's admittance and source terms.
    pub fn step(&mut self, dt: f64) -> Contribution {
        let conductance = if self.arbiter.role().is_demand() {
            let partner_capacitance =
                if self.incoming.is_valid() { self.incoming.capacitance } else { 0.0 };
            self.stability.demand_conductance(DemandInputs {
                own_capacitance: self.outgoing.capacitance,
                partner_capacitance,
                loop_latency: self.loop_latency,
                dt,
                blockage: self.blockage,
            })
        } else {
            0.0
        };

        let admittance_changed = (self.admittance - conductance).abs() > 0.0;
        self.admittance = conductance;
        self.supplied_capacitance =
            if self.arbiter.role().is_demand() { self.admittance * dt } else { 0.0 };

        Contribution {
            admittance: self.admittance,
            source: self.source_potential * self.admittance + self.demand_flux,
            probe_flux: CAPACITANCE_PROBE_FLUX,
            admittance_changed,
        }
    }

    /// Flow into the node given the solved node potential.
    pub fn compute_flows(&mut self, potential: f64) -> f64 {
        self.flux = (self.source_potential - potential) * self.admittance + self.demand_flux;

        self.direction = if self.flux > f64::EPSILON {
            FlowDirection::Sink
        } else if self.flux < -f64::EPSILON {
            if self.arbiter.role().is_demand() { FlowDirection::Source } else { FlowDirection::Sink }
        } else {
            FlowDirection::None
        };

        self.flux
    }

    /// Post-solve processing: fill and emit the outgoing frame.
    pub fn process_outputs(
        &mut self,
        node: &NodeState<'_>,
        siblings: &impl SiblingDirectory,
        props: &impl FluidProperties,
    ) -> Vec<LinkAction> {
        let mut actions = Vec::new();

        self.outgoing.capacitance = available_capacitance(
            node.network_capacitance,
            self.supplied_capacitance,
            self.config.node,
            node.capacitance_probe,
            &self.registry,
            siblings,
        );

        match self.arbiter.role() {
            Role::Supply => {
                self.outgoing.source = node.potential;
                self.write_fluid(node.content, props);

                let partner_capacitance =
                    if self.incoming.is_valid() { self.incoming.capacitance } else { 0.0 };
                if let Some(transition) = self.arbiter.arbitrate_capacitance(
                    self.outgoing.capacitance,
                    partner_capacitance,
                    self.loop_latency,
                    self.config.moding_capacitance_ratio,
                ) {
                    self.apply_transition(transition, node.volume, &mut actions);
                    self.outgoing.source = 0.0;
                }
            },
            Role::Demand => {
                let fluid = match node.inflow {
                    Some(inflow) if inflow.is_usable_inflow() => inflow,
                    Some(inflow) if inflow.temperature > 0.0 => {
                        tracing::warn!(
                            "Link {}: node inflow has negative mixture fractions",
                            self.config.name
                        );
                        node.content
                    },
                    _ => node.content,
                };
                let total = self.write_fluid(fluid, props);
                self.outgoing.source = self.flux * total;
            },
        }

        self.arbiter.advance_frame();

        tracing::debug!(
            "Link {} sending frame {} as {:?}: capacitance {}, source {}",
            self.config.name,
            self.outgoing.frame_count,
            self.arbiter.role(),
            self.outgoing.capacitance,
            self.outgoing.source
        );
        actions.push(LinkAction::SendFrame(self.outgoing.clone()));

        actions
    }

    /// Re-zero derived state. Configuration, role and siblings are kept.
    pub fn restart(&mut self) {
        self.loop_latency = 0;
        self.stability.reset();
        self.supplied_capacitance = 0.0;
        self.admittance = 0.0;
        self.source_potential = 0.0;
        self.demand_flux = 0.0;
        self.flux = 0.0;
        self.direction = FlowDirection::None;
        self.influx_fluid = None;
        self.outgoing.reset_counters();
        self.incoming.reset_counters();
    }

    fn apply_transition(
        &mut self,
        transition: Transition,
        volume: f64,
        actions: &mut Vec<LinkAction>,
    ) {
        tracing::info!(
            "Link {} switched {:?} -> {:?} ({:?})",
            self.config.name,
            transition.from,
            transition.to,
            transition.cause
        );

        self.outgoing.demand_mode = transition.to.is_demand();
        let volume = match transition.to {
            Role::Demand => {
                self.supply_volume = volume;
                0.0
            },
            Role::Supply => std::mem::take(&mut self.supply_volume),
        };
        actions.push(LinkAction::EditVolume { capacitor: self.capacitor, enable: true, volume });
        actions.push(LinkAction::RoleChanged(transition));
    }

    fn write_fluid(&mut self, fluid: &FluidState, props: &impl FluidProperties) -> f64 {
        self.outgoing.energy = match self.config.energy {
            EnergyConvention::Temperature => fluid.temperature,
            EnergyConvention::SpecificEnthalpy => props.specific_enthalpy(fluid),
        };
        self.translator.outbound(fluid, &mut self.outgoing)
    }

    fn local_fluid(&self, mixture: InboundMixture, props: &impl FluidProperties) -> FluidState {
        let temperature = match self.config.energy {
            EnergyConvention::Temperature => self.incoming.energy,
            EnergyConvention::SpecificEnthalpy => {
                props.temperature_from_enthalpy(self.incoming.energy, &mixture.mass_fractions)
            },
        };
        FluidState::new(temperature, mixture.mass_fractions, mixture.trace_mole_fractions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arbiter::FlipCause, fluid::IdealMixture, ledger::NoSiblings};

    fn air() -> FluidState {
        FluidState::new(294.0, vec![0.77, 0.23], vec![])
    }

    fn node<'a>(content: &'a FluidState, potential: f64, capacitance: f64) -> NodeState<'a> {
        NodeState {
            potential,
            volume: 2.0,
            network_capacitance: capacitance,
            capacitance_probe: &[],
            content,
            inflow: None,
        }
    }

    fn link(name: &str, pair_master: bool) -> DistributedLink {
        let config = LinkConfig { name: name.to_string(), pair_master, ..Default::default() };
        DistributedLink::new(InterfaceId(0), config, LinkInput::default(), &IdealMixture::air(0))
            .expect("valid config")
    }

    fn sent_frame(actions: &[LinkAction]) -> InterfaceFrame {
        actions
            .iter()
            .find_map(|a| match a {
                LinkAction::SendFrame(frame) => Some(frame.clone()),
                _ => None,
            })
            .expect("frame sent")
    }

    #[test]
    fn new_rejects_conflicting_force_flags() {
        let input = LinkInput { force_demand: true, force_supply: true, ..Default::default() };
        let result =
            DistributedLink::new(InterfaceId(0), LinkConfig::default(), input, &IdealMixture::air(0));
        assert!(matches!(result, Err(ConfigError::ConflictingForceModes { .. })));
    }

    #[test]
    fn mixture_override_sets_frame_sizes() {
        let config =
            LinkConfig { mixture_override: Some(MixtureSizes::new(5, 2)), ..Default::default() };
        let link =
            DistributedLink::new(InterfaceId(0), config, LinkInput::default(), &IdealMixture::air(0))
                .expect("valid config");
        assert_eq!(link.outgoing().sizes(), MixtureSizes::new(5, 2));
        assert_eq!(link.incoming().sizes(), MixtureSizes::new(5, 2));
    }

    #[test]
    fn first_step_holds_supply_and_counts_frame() {
        let mut link = link("a", false);
        let content = air();
        let n = node(&content, 101_325.0, 10.0);

        let actions = link.process_inputs(&n, &IdealMixture::air(0));
        assert!(actions.is_empty());

        let contribution = link.step(0.1);
        assert!(contribution.admittance.abs() < f64::EPSILON);
        assert!((contribution.probe_flux - CAPACITANCE_PROBE_FLUX).abs() < f64::EPSILON);
        assert!(link.compute_flows(101_325.0).abs() < f64::EPSILON);

        let frame = sent_frame(&link.process_outputs(&n, &NoSiblings, &IdealMixture::air(0)));
        assert_eq!(frame.frame_count, 1);
        assert_eq!(frame.frame_loopback, 0);
        assert!(!frame.demand_mode);
        assert!((frame.capacitance - 10.0).abs() < f64::EPSILON);
        assert!((frame.source - 101_325.0).abs() < f64::EPSILON);
        assert!((frame.energy - 294.0).abs() < f64::EPSILON);
        assert_eq!(link.loop_latency(), 1);
    }

    #[test]
    fn force_demand_saves_and_zeroes_volume() {
        let config = LinkConfig { name: "forced".to_string(), ..Default::default() };
        let input = LinkInput { force_demand: true, ..Default::default() };
        let mut link =
            DistributedLink::new(InterfaceId(0), config, input, &IdealMixture::air(0)).expect("valid");
        let content = air();

        let actions = link.process_inputs(&node(&content, 1.0, 1.0), &IdealMixture::air(0));

        assert_eq!(
            actions[0],
            LinkAction::EditVolume { capacitor: CapacitorId(0), enable: true, volume: 0.0 }
        );
        assert!(matches!(
            actions[1],
            LinkAction::RoleChanged(Transition { to: Role::Demand, cause: FlipCause::Forced, .. })
        ));
        assert_eq!(link.role(), Role::Demand);

        link.set_forced_role(Some(Role::Supply));
        let actions = link.process_inputs(&node(&content, 1.0, 1.0), &IdealMixture::air(0));
        assert_eq!(
            actions[0],
            LinkAction::EditVolume { capacitor: CapacitorId(0), enable: true, volume: 2.0 }
        );
    }

    #[test]
    fn demand_without_partner_holds_node_potential() {
        let input = LinkInput { force_demand: true, ..Default::default() };
        let mut link =
            DistributedLink::new(InterfaceId(0), LinkConfig::default(), input, &IdealMixture::air(0))
                .expect("valid");
        let content = air();

        link.process_inputs(&node(&content, 90_000.0, 1.0), &IdealMixture::air(0));
        assert!((link.source_potential() - 90_000.0).abs() < f64::EPSILON);

        // No partner capacitance: degenerate branch, zero admittance.
        let contribution = link.step(0.1);
        assert!(contribution.admittance.abs() < f64::EPSILON);
        assert!((link.gain() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn supply_takes_demand_flux_from_partner() {
        let mut link = link("supply", false);
        let content = air();

        let mut partner = InterfaceFrame::new(MixtureSizes::new(2, 0));
        partner.frame_count = 1;
        partner.demand_mode = true;
        partner.capacitance = 5.0;
        partner.source = 0.5;
        partner.energy = 300.0;
        partner.set_fractions(&[0.8, 0.2], &[]);
        link.receive(&partner);

        link.process_inputs(&node(&content, 1.0, 10.0), &IdealMixture::air(0));
        assert!((link.demand_flux() + 0.5).abs() < 1e-12);
        let influx = link.influx_fluid().expect("partner fluid");
        assert!((influx.temperature - 300.0).abs() < f64::EPSILON);

        let contribution = link.step(0.1);
        assert!((contribution.source + 0.5).abs() < 1e-12);
        assert!((link.compute_flows(1.0) + 0.5).abs() < 1e-12);
        assert_eq!(link.flow_direction(), FlowDirection::Sink);
    }

    #[test]
    fn demand_sends_inflow_only_when_usable() {
        let input = LinkInput { force_demand: true, ..Default::default() };
        let mut link =
            DistributedLink::new(InterfaceId(0), LinkConfig::default(), input, &IdealMixture::air(0))
                .expect("valid");
        let props = IdealMixture::air(0);
        let content = air();
        let clean = FluidState::new(310.0, vec![0.5, 0.5], vec![]);
        let negative = FluidState::new(310.0, vec![1.2, -0.2], vec![]);
        let reset = FluidState::default();

        let mut energy_with = |inflow: &FluidState| {
            let n = NodeState { inflow: Some(inflow), ..node(&content, 1.0, 1.0) };
            link.process_inputs(&n, &props);
            link.step(0.1);
            link.compute_flows(1.0);
            sent_frame(&link.process_outputs(&n, &NoSiblings, &props)).energy
        };

        assert!((energy_with(&clean) - 310.0).abs() < f64::EPSILON);
        assert!((energy_with(&negative) - 294.0).abs() < f64::EPSILON);
        assert!((energy_with(&reset) - 294.0).abs() < f64::EPSILON);
    }

    #[test]
    fn blockage_outside_range_is_ignored() {
        let mut link = link("a", false);
        link.set_blockage(Some(0.3));
        link.set_blockage(Some(1.5));
        assert!((link.blockage() - 0.3).abs() < f64::EPSILON);
        link.set_blockage(None);
        assert!(link.blockage().abs() < f64::EPSILON);
    }

    #[test]
    fn restart_zeroes_derived_state_only() {
        let mut link = link("a", true);
        link.register_sibling(InterfaceId(4));
        let content = air();
        let n = node(&content, 1.0, 1.0);
        link.process_inputs(&n, &IdealMixture::air(0));
        link.step(0.1);
        link.process_outputs(&n, &NoSiblings, &IdealMixture::air(0));

        link.restart();

        assert_eq!(link.outgoing().frame_count, 0);
        assert_eq!(link.loop_latency(), 0);
        assert!((link.gain() - 1.0).abs() < f64::EPSILON);
        assert!(link.config().pair_master);
        assert_eq!(link.registry().siblings(), &[InterfaceId(4)]);
    }

    #[test]
    fn register_sibling_rejects_self() {
        let mut link = link("a", false);
        assert!(!link.register_sibling(InterfaceId(0)));
        assert!(link.register_sibling(InterfaceId(1)));
        assert!(!link.register_sibling(InterfaceId(1)));
    }
}
