//! Fuzz target for the [`DistributedLink`] state machine
//!
//! # Strategy
//!
//! - Partner frames with arbitrary counters, flags and values (including NaN,
//!   infinities and negative fractions)
//! - Role overrides, blockage changes and restarts between steps
//! - Arbitrary node state handed to both processing phases
//!
//! # Invariants
//!
//! - NEVER panic
//! - Supply role stamps zero admittance
//! - Admittance stays within [0, conductance limit]
//! - Outgoing capacitance is never negative or NaN
//! - Outgoing frame count advances by exactly one per step
//! - A forced role holds after the next input processing

#![no_main]

use arbitrary::Arbitrary;
use confluence_core::{
    DistributedLink, FluidState, IdealMixture, InterfaceId, LinkConfig, LinkInput, NoSiblings,
    NodeState, Role,
};
use confluence_proto::{InterfaceFrame, MixtureSizes};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct FuzzedFrame {
    frame_count: u32,
    frame_loopback: u32,
    demand_mode: bool,
    capacitance: f64,
    source: f64,
    energy: f64,
    bulk: Vec<f64>,
    trace: Vec<f64>,
}

impl FuzzedFrame {
    fn build(&self) -> InterfaceFrame {
        let mut frame =
            InterfaceFrame::new(MixtureSizes::new(self.bulk.len() % 8, self.trace.len() % 4));
        frame.frame_count = self.frame_count;
        frame.frame_loopback = self.frame_loopback;
        frame.demand_mode = self.demand_mode;
        frame.capacitance = self.capacitance;
        frame.source = self.source;
        frame.energy = self.energy;
        frame.set_fractions(&self.bulk, &self.trace);
        frame
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzedNode {
    potential: f64,
    volume: f64,
    network_capacitance: f64,
    probe: Vec<f64>,
    temperature: f64,
    fractions: [f64; 2],
}

#[derive(Debug, Clone, Arbitrary)]
enum LinkEvent {
    Receive(FuzzedFrame),
    Step { node: FuzzedNode, dt: f64 },
    Force(Option<bool>),
    Blockage(Option<f64>),
    Restart,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    pair_master: bool,
    tie_tolerance: u8,
    events: Vec<LinkEvent>,
}

fuzz_target!(|input: FuzzInput| {
    let props = IdealMixture::air(1);
    let config = LinkConfig {
        name: "fuzz".to_string(),
        pair_master: input.pair_master,
        tie_tolerance: f64::from(input.tie_tolerance) / 255.0,
        ..Default::default()
    };
    let Ok(mut link) = DistributedLink::new(InterfaceId(0), config, LinkInput::default(), &props)
    else {
        return;
    };
    let mut forced = None;

    for event in input.events {
        match event {
            LinkEvent::Receive(frame) => link.receive(&frame.build()),
            LinkEvent::Force(role) => {
                forced = role.map(Role::from_demand_flag);
                link.set_forced_role(forced);
            },
            LinkEvent::Blockage(b) => link.set_blockage(b),
            LinkEvent::Restart => link.restart(),
            LinkEvent::Step { node, dt } => {
                let content =
                    FluidState::new(node.temperature, node.fractions.to_vec(), vec![0.0]);
                let state = NodeState {
                    potential: node.potential,
                    volume: node.volume,
                    network_capacitance: node.network_capacitance,
                    capacitance_probe: &node.probe,
                    content: &content,
                    inflow: None,
                };

                let before = link.outgoing().frame_count;
                link.process_inputs(&state, &props);
                assert_eq!(link.outgoing().frame_count, before.wrapping_add(1));
                if let Some(role) = forced {
                    assert_eq!(link.role(), role, "forced role not held");
                }

                let contribution = link.step(dt);
                let limit = link.config().conductance_limit;
                assert!((0.0..=limit).contains(&contribution.admittance));
                if link.role() == Role::Supply {
                    assert!(contribution.admittance == 0.0, "Supply stamped admittance");
                }

                link.compute_flows(node.potential);
                link.process_outputs(&state, &NoSiblings, &props);
                let capacitance = link.outgoing().capacitance;
                assert!(capacitance >= 0.0, "reported capacitance {capacitance}");
            },
        }
    }
});
