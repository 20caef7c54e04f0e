//! Property-based tests for role arbitration
//!
//! Two arbiters exchange their role and capacitance once per step with one
//! step of delay, which is all the arbitration rules ever see of a partner.

use confluence_core::{ModeArbiter, PartnerView, Role};
use proptest::prelude::*;

struct Pair {
    a: ModeArbiter,
    b: ModeArbiter,
    cap_a: f64,
    cap_b: f64,
    view_of_a: Option<PartnerView>,
    view_of_b: Option<PartnerView>,
}

impl Pair {
    fn new(cap_a: f64, cap_b: f64, a_is_master: bool) -> Self {
        Self {
            a: ModeArbiter::new(a_is_master, 0.0, None),
            b: ModeArbiter::new(!a_is_master, 0.0, None),
            cap_a,
            cap_b,
            view_of_a: None,
            view_of_b: None,
        }
    }

    fn exchange(&mut self) {
        self.a.arbitrate(self.view_of_b, self.cap_a);
        self.b.arbitrate(self.view_of_a, self.cap_b);
        self.a.advance_frame();
        self.b.advance_frame();
        self.view_of_a =
            Some(PartnerView { demand_mode: self.a.role().is_demand(), capacitance: self.cap_a });
        self.view_of_b =
            Some(PartnerView { demand_mode: self.b.role().is_demand(), capacitance: self.cap_b });
    }

    fn demand_count(&self) -> usize {
        [self.a.role(), self.b.role()].iter().filter(|r| r.is_demand()).count()
    }
}

#[test]
fn prop_exactly_one_demand_after_first_exchange() {
    proptest!(|(
        cap_a in 0.001f64..1.0e6,
        cap_b in 0.001f64..1.0e6,
        a_is_master in any::<bool>(),
    )| {
        prop_assume!(cap_a != cap_b);
        let mut pair = Pair::new(cap_a, cap_b, a_is_master);

        // No usable partner frame yet: nobody moves.
        pair.exchange();
        prop_assert_eq!(pair.demand_count(), 0);

        pair.exchange();

        // PROPERTY: Exactly one side is Demand, and it is the smaller one
        prop_assert_eq!(pair.demand_count(), 1);
        let expected_a = if cap_a < cap_b { Role::Demand } else { Role::Supply };
        prop_assert_eq!(pair.a.role(), expected_a);

        for _ in 0..10 {
            pair.exchange();
            prop_assert_eq!(pair.demand_count(), 1);
        }
    });
}

#[test]
fn prop_tie_goes_to_master() {
    proptest!(|(cap in 0.001f64..1.0e6, a_is_master in any::<bool>())| {
        let mut pair = Pair::new(cap, cap, a_is_master);
        pair.exchange();
        pair.exchange();

        // PROPERTY: On an exact tie the master side is Demand
        prop_assert_eq!(pair.demand_count(), 1);
        prop_assert_eq!(pair.a.role().is_demand(), a_is_master);
    });
}

impl Pair {
    /// Flip one side to Demand for a single step, then release it, so both
    /// sides see each other in Demand on the next exchange.
    fn push_to_demand(&mut self, push_a: bool) {
        let pushed = if push_a { &mut self.a } else { &mut self.b };
        pushed.set_forced(Some(Role::Demand));
        pushed.arbitrate(None, 0.0);
        pushed.set_forced(None);
        self.view_of_a =
            Some(PartnerView { demand_mode: self.a.role().is_demand(), capacitance: self.cap_a });
        self.view_of_b =
            Some(PartnerView { demand_mode: self.b.role().is_demand(), capacitance: self.cap_b });
    }
}

#[test]
fn prop_double_demand_clears_on_next_exchange() {
    proptest!(|(
        cap_a in 0.001f64..1.0e6,
        cap_b in 0.001f64..1.0e6,
        settle in 3usize..8,
        push_a in any::<bool>(),
    )| {
        prop_assume!(cap_a != cap_b);
        let mut pair = Pair::new(cap_a, cap_b, true);
        for _ in 0..settle {
            pair.exchange();
        }
        let settled_a = pair.a.role();

        pair.push_to_demand(push_a);
        pair.exchange();

        // PROPERTY: One exchange after both sides have seen each other, the
        // double Demand is gone and exactly one side holds Demand
        prop_assert_eq!(pair.demand_count(), 1);

        // The side that was already Demand yields; a pushed Supply keeps it.
        let pushed_was_supply = (settled_a == Role::Supply) == push_a;
        if pushed_was_supply {
            prop_assert_eq!(pair.a.role().is_demand(), push_a);
        } else {
            prop_assert_eq!(pair.a.role(), settled_a);
        }
    });
}

#[test]
fn simultaneous_flips_clear_then_rearbitrate() {
    // B flips on frame 2 while A is pushed to Demand before it has seen B in
    // Demand. Neither remembers its partner as Demand, so both yield on frame
    // 3 and the startup rule picks B again on frame 4.
    let mut pair = Pair::new(10.0, 5.0, true);
    pair.exchange();
    pair.exchange();
    assert_eq!(pair.b.role(), Role::Demand);

    pair.push_to_demand(true);
    assert_eq!(pair.demand_count(), 2);

    pair.exchange();
    assert_eq!(pair.demand_count(), 0);

    pair.exchange();
    assert_eq!(pair.a.role(), Role::Supply);
    assert_eq!(pair.b.role(), Role::Demand);
}

#[test]
fn prop_forced_role_always_holds() {
    proptest!(|(
        cap_a in 0.001f64..1.0e6,
        cap_b in 0.001f64..1.0e6,
        force_demand in any::<bool>(),
        steps in 1usize..20,
    )| {
        let forced = if force_demand { Role::Demand } else { Role::Supply };
        let mut pair = Pair::new(cap_a, cap_b, false);
        pair.a.set_forced(Some(forced));

        for _ in 0..steps {
            pair.exchange();
            // PROPERTY: A forced side never leaves its forced role
            prop_assert_eq!(pair.a.role(), forced);
        }
    });
}
