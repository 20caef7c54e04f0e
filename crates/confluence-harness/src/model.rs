//! Reference model for model-based testing.
//!
//! Operations are generated randomly and applied both to a [`CoupledPair`]
//! and to [`ModelPair`], a bookkeeping model of what each side must report.
//! Physics and arbitration outcomes are not modelled; those are covered by
//! [`check_invariants`], which must hold after every operation.

use arbitrary::Arbitrary;
use confluence_core::Role;

use crate::{
    error::HarnessError,
    pair::{CoupledPair, SideId},
};

/// Role override requested by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ForcedRole {
    /// Hold Demand.
    Demand,
    /// Hold Supply.
    Supply,
    /// Release any override.
    Released,
}

impl ForcedRole {
    /// The role override, if any.
    pub fn role(self) -> Option<Role> {
        match self {
            Self::Demand => Some(Role::Demand),
            Self::Supply => Some(Role::Supply),
            Self::Released => None,
        }
    }
}

/// Operations that can be applied to a pair.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Run `count % 16` steps.
    Step {
        /// Step count.
        count: u8,
    },

    /// Override or release a side's role.
    Force {
        /// Target side.
        side: SideId,
        /// Override.
        role: ForcedRole,
    },

    /// Set blockage to `percent / 100`. Values above 100 must be ignored.
    SetBlockage {
        /// Target side.
        side: SideId,
        /// Blockage in percent.
        percent: u8,
    },

    /// Restart a side's link.
    Restart {
        /// Target side.
        side: SideId,
    },
}

impl Operation {
    /// Apply to the real pair.
    pub fn apply(&self, pair: &mut CoupledPair) -> Result<(), HarnessError> {
        match *self {
            Self::Step { count } => pair.run(u64::from(count % 16))?,
            Self::Force { side, role } => pair.side_mut(side).link_mut().set_forced_role(role.role()),
            Self::SetBlockage { side, percent } => {
                pair.side_mut(side).link_mut().set_blockage(Some(f64::from(percent) / 100.0));
            },
            Self::Restart { side } => pair.side_mut(side).link_mut().restart(),
        }
        Ok(())
    }
}

/// What a side must report, independent of physics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObservableState {
    /// Outgoing frame counter.
    pub frame_count: u32,
    /// Blockage fraction.
    pub blockage: f64,
    /// Role the side is held in, once a step has run since the override.
    pub held_role: Option<Role>,
}

impl ObservableState {
    /// Observe a side of the real pair.
    pub fn of(pair: &CoupledPair, side: SideId, expected_hold: Option<Role>) -> Self {
        let link = pair.side(side).link();
        Self {
            frame_count: link.outgoing().frame_count,
            blockage: link.blockage(),
            held_role: expected_hold.map(|_| link.role()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ModelSide {
    frames: u32,
    blockage: f64,
    forced: Option<Role>,
    forced_applied: bool,
}

/// Bookkeeping model of a coupled pair.
#[derive(Debug, Clone, Default)]
pub struct ModelPair {
    a: ModelSide,
    b: ModelSide,
}

impl ModelPair {
    /// Fresh pair with no steps run.
    pub fn new() -> Self {
        Self::default()
    }

    fn side_mut(&mut self, id: SideId) -> &mut ModelSide {
        match id {
            SideId::A => &mut self.a,
            SideId::B => &mut self.b,
        }
    }

    /// Apply an operation to the model.
    pub fn apply(&mut self, op: &Operation) {
        match *op {
            Operation::Step { count } => {
                let count = u32::from(count % 16);
                for side in [&mut self.a, &mut self.b] {
                    side.frames = side.frames.wrapping_add(count);
                    if count > 0 {
                        side.forced_applied = side.forced.is_some();
                    }
                }
            },
            Operation::Force { side, role } => {
                let side = self.side_mut(side);
                side.forced = role.role();
                side.forced_applied = false;
            },
            Operation::SetBlockage { side, percent } => {
                if percent <= 100 {
                    self.side_mut(side).blockage = f64::from(percent) / 100.0;
                }
            },
            Operation::Restart { side } => self.side_mut(side).frames = 0,
        }
    }

    /// Role a side must be in right now, if it is forced and has stepped
    /// since.
    pub fn expected_hold(&self, id: SideId) -> Option<Role> {
        let side = match id {
            SideId::A => &self.a,
            SideId::B => &self.b,
        };
        side.forced.filter(|_| side.forced_applied)
    }

    /// Expected observation of a side.
    pub fn observe(&self, id: SideId) -> ObservableState {
        let side = match id {
            SideId::A => &self.a,
            SideId::B => &self.b,
        };
        ObservableState {
            frame_count: side.frames,
            blockage: side.blockage,
            held_role: self.expected_hold(id),
        }
    }
}

/// A violated invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    /// Side the violation was found on.
    pub side: SideId,
    /// What went wrong.
    pub message: String,
}

/// Check the invariants every link must hold at every step boundary.
pub fn check_invariants(pair: &CoupledPair) -> Result<(), InvariantViolation> {
    for id in [SideId::A, SideId::B] {
        let link = pair.side(id).link();
        let fail = |message: String| Err(InvariantViolation { side: id, message });

        if link.role() == Role::Supply && link.admittance().abs() > 0.0 {
            return fail(format!("Supply side stamped admittance {}", link.admittance()));
        }
        let capacitance = link.outgoing().capacitance;
        if !(capacitance >= 0.0 && capacitance.is_finite()) {
            return fail(format!("reported capacitance {capacitance}"));
        }
        let limit = link.config().conductance_limit;
        if !(0.0..=limit).contains(&link.admittance()) {
            return fail(format!("admittance {} outside [0, {limit}]", link.admittance()));
        }
        if !link.flux().is_finite() {
            return fail(format!("flux {}", link.flux()));
        }
        if link.outgoing().demand_mode != link.role().is_demand() && link.outgoing().frame_count > 0
        {
            return fail("outgoing demand flag disagrees with role".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_tracks_frames_and_restart() {
        let mut model = ModelPair::new();
        model.apply(&Operation::Step { count: 3 });
        model.apply(&Operation::Restart { side: SideId::B });
        model.apply(&Operation::Step { count: 17 });

        assert_eq!(model.observe(SideId::A).frame_count, 4);
        assert_eq!(model.observe(SideId::B).frame_count, 1);
    }

    #[test]
    fn model_ignores_out_of_range_blockage() {
        let mut model = ModelPair::new();
        model.apply(&Operation::SetBlockage { side: SideId::A, percent: 40 });
        model.apply(&Operation::SetBlockage { side: SideId::A, percent: 200 });
        assert!((model.observe(SideId::A).blockage - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn forced_role_expected_only_after_a_step() {
        let mut model = ModelPair::new();
        model.apply(&Operation::Force { side: SideId::A, role: ForcedRole::Demand });
        assert_eq!(model.expected_hold(SideId::A), None);

        model.apply(&Operation::Step { count: 0 });
        assert_eq!(model.expected_hold(SideId::A), None);

        model.apply(&Operation::Step { count: 1 });
        assert_eq!(model.expected_hold(SideId::A), Some(Role::Demand));
    }
}
