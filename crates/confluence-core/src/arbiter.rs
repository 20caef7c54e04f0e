//! Supply/Demand role arbitration.
//!
//! Each side runs its own [`ModeArbiter`] and sees only the partner's last
//! frame. The rules below guarantee that two sides starting in Supply settle
//! on exactly one Demand side without a coordinator:
//!
//! 1. A forced role wins whenever it differs from the current role.
//! 2. With a usable partner frame:
//!    - Demand seeing a partner that has just become Demand yields to Supply.
//!    - Two Supply sides: the strictly smaller capacitance becomes Demand; on
//!      a tie, the pair master does.
//! 3. After the solve, a Supply side with much less capacitance than its
//!    partner becomes Demand (see [`capacitance_flip_due`]).
//!
//! A transition into the role opposite a forced role is refused.

use serde::{Deserialize, Serialize};

use crate::ledger::capacitance_flip_due;

/// Coupling role of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    /// Exposes potential and composition to the partner.
    #[default]
    Supply,
    /// Follows the partner's potential with zero local capacitance.
    Demand,
}

impl Role {
    /// Returns true for [`Role::Demand`].
    pub fn is_demand(self) -> bool {
        matches!(self, Self::Demand)
    }

    /// Role carried by a frame's `demand_mode` flag.
    pub fn from_demand_flag(demand_mode: bool) -> Self {
        if demand_mode { Self::Demand } else { Self::Supply }
    }
}

/// Why a role changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipCause {
    /// Operator force flag.
    Forced,
    /// Partner just entered Demand, so this side yielded.
    PartnerDemand,
    /// Startup negotiation between two Supply sides.
    StartupTieBreak,
    /// Partner capacitance exceeded ours by the moding ratio.
    CapacitanceRatio,
}

/// A completed role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Previous role.
    pub from: Role,
    /// New role.
    pub to: Role,
    /// Rule that triggered it.
    pub cause: FlipCause,
}

/// Partner state read from a usable incoming frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartnerView {
    /// Partner is in Demand role.
    pub demand_mode: bool,
    /// Partner's reported capacitance.
    pub capacitance: f64,
}

/// Role state machine for one side of a coupling.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeArbiter {
    role: Role,
    forced: Option<Role>,
    pair_master: bool,
    tie_tolerance: f64,
    partner_was_demand: bool,
    frames_since_flip: u32,
}

impl ModeArbiter {
    /// Create an arbiter in Supply role.
    pub fn new(pair_master: bool, tie_tolerance: f64, forced: Option<Role>) -> Self {
        Self {
            role: Role::Supply,
            forced,
            pair_master,
            tie_tolerance: tie_tolerance.max(0.0),
            partner_was_demand: false,
            frames_since_flip: 0,
        }
    }

    /// Current role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Forced role, if any.
    pub fn forced(&self) -> Option<Role> {
        self.forced
    }

    /// Frames elapsed since the last role change.
    pub fn frames_since_flip(&self) -> u32 {
        self.frames_since_flip
    }

    /// Partner role seen in the last usable frame.
    pub fn partner_was_demand(&self) -> bool {
        self.partner_was_demand
    }

    /// Replace the forced role. Takes effect on the next arbitration.
    pub fn set_forced(&mut self, forced: Option<Role>) {
        self.forced = forced;
    }

    /// Pre-solve arbitration against the partner's latest usable frame.
    ///
    /// `partner` is `None` when the incoming frame is not valid.
    pub fn arbitrate(
        &mut self,
        partner: Option<PartnerView>,
        own_capacitance: f64,
    ) -> Option<Transition> {
        match self.forced {
            Some(Role::Demand) if self.role == Role::Supply => {
                return self.transition(Role::Demand, FlipCause::Forced);
            },
            Some(Role::Supply) if self.role == Role::Demand => {
                return self.transition(Role::Supply, FlipCause::Forced);
            },
            _ => {},
        }

        let partner = partner?;
        let transition = match self.role {
            Role::Demand if partner.demand_mode && !self.partner_was_demand => {
                self.transition(Role::Supply, FlipCause::PartnerDemand)
            },
            Role::Supply
                if !partner.demand_mode && self.yields_at_startup(own_capacitance, partner) =>
            {
                self.transition(Role::Demand, FlipCause::StartupTieBreak)
            },
            _ => None,
        };
        self.partner_was_demand = partner.demand_mode;
        transition
    }

    /// Post-solve check for a capacitance-triggered flip to Demand.
    pub fn arbitrate_capacitance(
        &mut self,
        own_capacitance: f64,
        partner_capacitance: f64,
        loop_latency: i64,
        moding_ratio: f64,
    ) -> Option<Transition> {
        if self.role == Role::Supply
            && capacitance_flip_due(
                self.frames_since_flip,
                loop_latency,
                own_capacitance,
                partner_capacitance,
                moding_ratio,
            )
        {
            return self.transition(Role::Demand, FlipCause::CapacitanceRatio);
        }
        None
    }

    /// Count one completed frame in the current role.
    pub fn advance_frame(&mut self) {
        self.frames_since_flip = self.frames_since_flip.saturating_add(1);
    }

    /// Move to `to` unless already there or held in the other role.
    pub fn transition(&mut self, to: Role, cause: FlipCause) -> Option<Transition> {
        if self.role == to || self.forced.is_some_and(|forced| forced != to) {
            return None;
        }
        let from = self.role;
        self.role = to;
        self.frames_since_flip = 0;
        Some(Transition { from, to, cause })
    }

    fn yields_at_startup(&self, own: f64, partner: PartnerView) -> bool {
        let band = self.tie_tolerance * own.abs().max(partner.capacitance.abs());
        if (own - partner.capacitance).abs() <= band {
            self.pair_master
        } else {
            own < partner.capacitance
        }
    }
}
