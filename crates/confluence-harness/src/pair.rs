//! Two networks coupled by a pair of links.
//!
//! Each [`Side`] owns one [`DistributedLink`] and the [`LumpedNetwork`] it
//! sits in, and executes the link's actions against that network. A
//! [`CoupledPair`] steps both sides and moves their frames through one
//! [`FrameChannel`] per direction.

use arbitrary::Arbitrary;
use confluence_core::{
    DistributedLink, FluidState, IdealMixture, InterfaceId, LinkAction, LinkConfig, LinkInput,
    NoSiblings, NodeState, Role, Transition,
};
use confluence_proto::InterfaceFrame;
use serde::{Deserialize, Serialize};

use crate::{
    channel::{ChannelConfig, FrameChannel},
    error::HarnessError,
    network::{Conductor, LumpedNetwork, Node, Stamp},
    trace::{FrameTrace, TraceRecord},
};

/// Boundary node index. The link's capacitor is addressed by node index.
pub const BOUNDARY_NODE: usize = 0;

/// Which side of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary, Serialize, Deserialize)]
pub enum SideId {
    /// First side.
    A,
    /// Second side.
    B,
}

/// Extra volume behind the boundary node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reservoir {
    /// Volume (m³).
    pub volume: f64,
    /// Conductance to the boundary node (mol/s/Pa).
    pub conductance: f64,
}

/// One side's network and link setup.
#[derive(Debug, Clone, PartialEq)]
pub struct SideConfig {
    /// Link configuration. `node` is ignored: the link sits at the boundary node.
    pub link: LinkConfig,
    /// Runtime link inputs.
    pub input: LinkInput,
    /// Boundary node volume (m³).
    pub volume: f64,
    /// Initial pressure of every node (Pa).
    pub potential: f64,
    /// Initial contents of every node.
    pub fluid: FluidState,
    /// Optional reservoir node.
    pub reservoir: Option<Reservoir>,
    /// Trace compounds modelled locally.
    pub trace_compounds: usize,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            input: LinkInput::default(),
            volume: 1.0,
            potential: 101_325.0,
            fluid: FluidState::new(294.0, vec![0.77, 0.23], vec![]),
            reservoir: None,
            trace_compounds: 0,
        }
    }
}

/// One network and its coupling link.
#[derive(Debug, Clone)]
pub struct Side {
    link: DistributedLink,
    network: LumpedNetwork,
    props: IdealMixture,
    transitions: Vec<Transition>,
}

impl Side {
    /// Build a side.
    pub fn new(config: SideConfig) -> Result<Self, HarnessError> {
        let props = IdealMixture::air(config.trace_compounds);
        let link_config = LinkConfig { node: BOUNDARY_NODE, ..config.link };
        let link = DistributedLink::new(InterfaceId(0), link_config, config.input, &props)?;

        let mut network =
            LumpedNetwork::new(Node::new(config.volume, config.potential, config.fluid.clone()));
        if let Some(reservoir) = config.reservoir {
            let index =
                network.add_node(Node::new(reservoir.volume, config.potential, config.fluid));
            network.add_conductor(Conductor {
                from: BOUNDARY_NODE,
                to: index,
                conductance: reservoir.conductance,
            })?;
        }

        Ok(Self { link, network, props, transitions: Vec::new() })
    }

    /// The link.
    pub fn link(&self) -> &DistributedLink {
        &self.link
    }

    /// The link, mutably.
    pub fn link_mut(&mut self) -> &mut DistributedLink {
        &mut self.link
    }

    /// The local network.
    pub fn network(&self) -> &LumpedNetwork {
        &self.network
    }

    /// The local network, mutably.
    pub fn network_mut(&mut self) -> &mut LumpedNetwork {
        &mut self.network
    }

    /// Role changes so far.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Boundary node pressure.
    pub fn potential(&self) -> f64 {
        self.network.first().potential
    }

    /// Run one integration step and return the frame for the partner.
    pub fn step(&mut self, dt: f64) -> Result<Option<InterfaceFrame>, HarnessError> {
        let actions = {
            let boundary = self.network.first();
            let node = NodeState {
                potential: boundary.potential,
                volume: boundary.volume,
                network_capacitance: boundary.capacitance(),
                capacitance_probe: &[],
                content: &boundary.content,
                inflow: None,
            };
            self.link.process_inputs(&node, &self.props)
        };
        self.execute(actions);

        let contribution = self.link.step(dt);
        let stamps = [Stamp {
            node: BOUNDARY_NODE,
            admittance: contribution.admittance,
            source: contribution.source,
        }];
        self.network.solve(dt, &stamps, &self.props)?;

        let flux = self.link.compute_flows(self.potential());
        if flux > 0.0 && self.link.role() == Role::Supply {
            if let Some(fluid) = self.link.influx_fluid().cloned() {
                self.network.inject(BOUNDARY_NODE, flux * dt, &fluid, &self.props);
            }
        }

        let (network_capacitance, probe) =
            self.network.capacitance_probe(dt, &stamps, BOUNDARY_NODE, contribution.probe_flux);
        let actions = {
            let boundary = self.network.first();
            let node = NodeState {
                potential: boundary.potential,
                volume: boundary.volume,
                network_capacitance,
                capacitance_probe: &probe,
                content: &boundary.content,
                inflow: self.network.inflow(BOUNDARY_NODE),
            };
            self.link.process_outputs(&node, &NoSiblings, &self.props)
        };
        Ok(self.execute(actions))
    }

    fn execute(&mut self, actions: Vec<LinkAction>) -> Option<InterfaceFrame> {
        let mut sent = None;
        for action in actions {
            match action {
                LinkAction::EditVolume { capacitor, enable, volume } => {
                    match self.network.node_mut(capacitor.0) {
                        Some(node) if enable => node.volume = volume,
                        Some(_) => {},
                        None => tracing::warn!(
                            "Link {}: no capacitor at node {}",
                            self.link.name(),
                            capacitor.0
                        ),
                    }
                },
                LinkAction::OverwriteNodeFluid { potential, fluid } => {
                    if let Some(node) = self.network.node_mut(BOUNDARY_NODE) {
                        node.potential = potential;
                        node.content = fluid;
                    }
                },
                LinkAction::RoleChanged(transition) => self.transitions.push(transition),
                LinkAction::SendFrame(frame) => sent = Some(frame),
            }
        }
        sent
    }
}

/// Pair setup.
#[derive(Debug, Clone, PartialEq)]
pub struct PairConfig {
    /// Integration timestep (s).
    pub dt: f64,
    /// First side.
    pub a: SideConfig,
    /// Second side.
    pub b: SideConfig,
    /// Channel from A to B.
    pub a_to_b: ChannelConfig,
    /// Channel from B to A.
    pub b_to_a: ChannelConfig,
}

impl Default for PairConfig {
    fn default() -> Self {
        let mut a = SideConfig::default();
        a.link.name = "a".to_string();
        a.link.pair_master = true;
        let mut b = SideConfig::default();
        b.link.name = "b".to_string();
        Self {
            dt: 0.1,
            a,
            b,
            a_to_b: ChannelConfig::default(),
            b_to_a: ChannelConfig { seed: 1, ..ChannelConfig::default() },
        }
    }
}

/// Two sides stepped in lockstep over a pair of channels.
#[derive(Debug, Clone)]
pub struct CoupledPair {
    a: Side,
    b: Side,
    a_to_b: FrameChannel,
    b_to_a: FrameChannel,
    dt: f64,
    steps: u64,
    trace: Option<FrameTrace>,
}

impl CoupledPair {
    /// Build both sides and channels.
    pub fn new(config: PairConfig) -> Result<Self, HarnessError> {
        if !(config.dt > 0.0 && config.dt.is_finite()) {
            return Err(HarnessError::InvalidTimestep(config.dt));
        }
        Ok(Self {
            a: Side::new(config.a)?,
            b: Side::new(config.b)?,
            a_to_b: FrameChannel::new(config.a_to_b)?,
            b_to_a: FrameChannel::new(config.b_to_a)?,
            dt: config.dt,
            steps: 0,
            trace: None,
        })
    }

    /// Start recording every frame sent.
    pub fn enable_trace(&mut self) {
        self.trace.get_or_insert_with(FrameTrace::default);
    }

    /// Recorded frames, if tracing.
    pub fn trace(&self) -> Option<&FrameTrace> {
        self.trace.as_ref()
    }

    /// One side.
    pub fn side(&self, id: SideId) -> &Side {
        match id {
            SideId::A => &self.a,
            SideId::B => &self.b,
        }
    }

    /// One side, mutably.
    pub fn side_mut(&mut self, id: SideId) -> &mut Side {
        match id {
            SideId::A => &mut self.a,
            SideId::B => &mut self.b,
        }
    }

    /// The channel carrying frames away from `from`.
    pub fn channel(&self, from: SideId) -> &FrameChannel {
        match from {
            SideId::A => &self.a_to_b,
            SideId::B => &self.b_to_a,
        }
    }

    /// Steps run so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of sides currently in Demand role.
    pub fn demand_count(&self) -> usize {
        [self.a.link.role(), self.b.link.role()].iter().filter(|r| r.is_demand()).count()
    }

    /// Step both sides and exchange frames.
    pub fn step(&mut self) -> Result<(), HarnessError> {
        let from_a = self.a.step(self.dt)?;
        let from_b = self.b.step(self.dt)?;

        for (id, frame) in [(SideId::A, from_a), (SideId::B, from_b)] {
            let Some(frame) = frame else { continue };
            if let Some(trace) = self.trace.as_mut() {
                let side = match id {
                    SideId::A => &self.a,
                    SideId::B => &self.b,
                };
                trace.record(TraceRecord {
                    step: self.steps,
                    side: id,
                    role: side.link.role(),
                    potential: side.potential(),
                    frame: frame.clone(),
                });
            }
            match id {
                SideId::A => self.a_to_b.send(&frame)?,
                SideId::B => self.b_to_a.send(&frame)?,
            }
        }

        if let Some(frame) = self.a_to_b.advance() {
            self.b.link.receive(&frame);
        }
        if let Some(frame) = self.b_to_a.advance() {
            self.a.link.receive(&frame);
        }

        self.steps += 1;
        Ok(())
    }

    /// Run `steps` steps.
    pub fn run(&mut self, steps: u64) -> Result<(), HarnessError> {
        for _ in 0..steps {
            self.step()?;
        }
        Ok(())
    }
}
