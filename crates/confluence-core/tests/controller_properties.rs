//! Property-based tests for the stability controller, capacitance ledger and
//! mixture translator

use std::collections::HashMap;

use confluence_core::{
    ConductancePolicy, DemandFilter, DemandInputs, FluidState, IdealMixture, InterfaceId,
    MixtureTranslator, SiblingRegistry, SiblingState, StabilityController, available_capacitance,
};
use confluence_proto::{InterfaceFrame, MixtureSizes};
use proptest::prelude::*;

fn policy() -> impl Strategy<Value = ConductancePolicy> {
    prop_oneof![Just(ConductancePolicy::Conservative), Just(ConductancePolicy::Relaxed)]
}

fn moding_ratio() -> impl Strategy<Value = f64> {
    1.0001f64..=4.0
}

fn controller(policy: ConductancePolicy, moding_ratio: f64) -> StabilityController {
    StabilityController::new(policy, DemandFilter::default(), moding_ratio, 1.0e15)
}

#[test]
fn prop_gain_non_increasing_with_latency() {
    proptest!(|(
        own in 0.01f64..1.0e4,
        ratio in 0.5f64..=1.25,
        latency in -5i64..120,
        moding in moding_ratio(),
        policy in policy(),
    )| {
        let mut c = controller(policy, moding);
        let inputs = DemandInputs {
            own_capacitance: own,
            partner_capacitance: own * ratio,
            loop_latency: latency,
            dt: 0.1,
            blockage: 0.0,
        };

        let g_now = c.demand_conductance(inputs);
        let gain_now = c.gain();
        let g_later = c.demand_conductance(DemandInputs { loop_latency: latency + 1, ..inputs });
        let gain_later = c.gain();

        // PROPERTY: Within the blend band, more latency never raises gain or
        // conductance
        prop_assert!(gain_later <= gain_now + 1e-12);
        prop_assert!(g_later <= g_now * (1.0 + 1e-12));
    });
}

#[test]
fn prop_gain_follows_blend_formula() {
    proptest!(|(
        own in 0.01f64..1.0e4,
        ratio in 0.5f64..5.0,
        latency in -5i64..120,
        moding in moding_ratio(),
        policy in policy(),
    )| {
        let mut c = controller(policy, moding);
        let partner = own * ratio;
        c.demand_conductance(DemandInputs {
            own_capacitance: own,
            partner_capacitance: partner,
            loop_latency: latency,
            dt: 0.1,
            blockage: 0.0,
        });

        let limit = DemandFilter::default().gain_limit(latency);
        let clamped = (partner / own).clamp(1.0, moding);
        let expected = limit + (1.0 - limit) * (clamped - 1.0) * 4.0;

        // PROPERTY: Gain is the latency limit blended toward the clamped
        // capacitance ratio, with no cap on the blend weight
        prop_assert!(
            (c.gain() - expected).abs() <= 1e-12 * expected.max(1.0),
            "gain {} expected {}", c.gain(), expected
        );
    });
}

#[test]
fn prop_conductance_non_decreasing_with_capacitance_ratio() {
    proptest!(|(
        own in 0.01f64..1.0e4,
        ratio in 0.5f64..4.5,
        step in 0.0f64..1.0,
        latency in 0i64..50,
        moding in moding_ratio(),
        policy in policy(),
    )| {
        let mut c = controller(policy, moding);
        let inputs = DemandInputs {
            own_capacitance: own,
            partner_capacitance: own * ratio,
            loop_latency: latency,
            dt: 0.1,
            blockage: 0.0,
        };

        let g_low = c.demand_conductance(inputs);
        let g_high = c.demand_conductance(DemandInputs {
            partner_capacitance: own * (ratio + step),
            ..inputs
        });

        // PROPERTY: A larger partner never lowers the conductance
        prop_assert!(g_high >= g_low * (1.0 - 1e-12));
    });
}

#[test]
fn prop_conservative_never_above_relaxed() {
    proptest!(|(
        own in 0.0f64..1.0e6,
        partner in 0.0f64..1.0e6,
        latency in -5i64..200,
        dt in 0.001f64..1.0,
        blockage in 0.0f64..=1.0,
        moding in moding_ratio(),
    )| {
        let inputs = DemandInputs {
            own_capacitance: own,
            partner_capacitance: partner,
            loop_latency: latency,
            dt,
            blockage,
        };

        let conservative =
            controller(ConductancePolicy::Conservative, moding).demand_conductance(inputs);
        let relaxed = controller(ConductancePolicy::Relaxed, moding).demand_conductance(inputs);

        // PROPERTY: The series blend with own capacitance only ever lowers
        // the conductance
        prop_assert!(conservative <= relaxed * (1.0 + 1e-12));
    });
}

#[test]
fn prop_conductance_within_limits() {
    proptest!(|(
        own in -10.0f64..1.0e6,
        partner in -10.0f64..1.0e6,
        latency in -100i64..1000,
        dt in 0.0f64..1.0,
        blockage in 0.0f64..=1.0,
        moding in moding_ratio(),
        policy in policy(),
    )| {
        let mut c = StabilityController::new(policy, DemandFilter::default(), moding, 1.0e6);
        let g = c.demand_conductance(DemandInputs {
            own_capacitance: own,
            partner_capacitance: partner,
            loop_latency: latency,
            dt,
            blockage,
        });

        // PROPERTY: Stamped conductance is finite and within [0, limit]
        prop_assert!((0.0..=1.0e6).contains(&g));
    });
}

#[test]
fn prop_available_capacitance_non_negative() {
    proptest!(|(
        network in -10.0f64..100.0,
        own_supplied in 0.0f64..100.0,
        own_node in 0usize..6,
        probe in proptest::collection::vec(-1.0f64..10.0, 0..5),
        siblings in proptest::collection::vec((0usize..8, -1.0f64..1.0e3), 0..6),
    )| {
        let mut registry = SiblingRegistry::new(InterfaceId(0));
        let mut directory = HashMap::new();
        for (i, (node, supplied)) in siblings.iter().enumerate() {
            let id = InterfaceId(i + 1);
            registry.register(id);
            directory.insert(id, SiblingState { node: *node, supplied_capacitance: *supplied });
        }

        let cap = available_capacitance(network, own_supplied, own_node, &probe, &registry, &directory);

        // PROPERTY: Ledger output is never negative, whatever the probe says
        prop_assert!(cap >= 0.0);
        prop_assert!(cap.is_finite());
    });
}

fn composition(n: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.01f64..1.0, n).prop_map(|raw| {
        let sum: f64 = raw.iter().sum();
        raw.into_iter().map(|x| x / sum).collect()
    })
}

#[test]
fn prop_mixture_translation_idempotent() {
    proptest!(|(
        (bulk, mass) in (1usize..6).prop_flat_map(|n| (Just(n), composition(n))),
        local_trace in 0usize..3,
        extra_bulk in 0usize..3,
        wire_trace in 0usize..4,
        trace_level in 0.0f64..0.01,
    )| {
        let molar_masses: Vec<f64> = (0..bulk).map(|i| 0.002 + 0.01 * i as f64).collect();
        let props = IdealMixture::new(molar_masses, vec![1000.0; bulk], local_trace);
        let mut sender = MixtureTranslator::new(&props);
        let mut receiver = MixtureTranslator::new(&props);

        let fluid = FluidState::new(300.0, mass.clone(), vec![trace_level; local_trace]);
        let mut frame = InterfaceFrame::new(MixtureSizes::new(bulk + extra_bulk, wire_trace));

        let total = sender.outbound(&fluid, &mut frame);
        prop_assert!(total >= 1.0 - 1e-12);
        let wire_sum: f64 =
            frame.mixture_fractions().iter().chain(frame.trace_mixture_fractions()).sum();
        if wire_trace >= local_trace {
            prop_assert!((wire_sum - 1.0).abs() < 1e-9);
        }

        let inbound = receiver.inbound(&frame).expect("usable mixture");

        // PROPERTY: Outbound then inbound reproduces the bulk mass fractions
        for (got, want) in inbound.mass_fractions.iter().zip(&mass) {
            prop_assert!((got - want).abs() < 1e-9, "{:?} != {:?}", inbound.mass_fractions, mass);
        }
        prop_assert!(inbound.bulk_sum <= 1.0 + 1e-12);
    });
}
