//! Cascade shadows
//!
//! Shadow bookkeeping for the incremental selection path. Instead of
//! rebuilding a real-parton overlay for every retry, each check accumulates
//! the recoil given to every interacting parton and evaluates the
//! interaction against the cascade as it was built.
//!
//! # Status rules
//!
//! For the interacting pair `(l, r)` with accumulated recoils applied:
//!
//! - `PropFail`: either parton carries no positive light-cone momentum
//! - `KineFail`: one side needs more minus than the other side's plus
//! - `Ordering`: the recoiled minus drops below that of an emitted child, or
//!   the two partons overlap in rapidity

use crate::collaborators::{CheckMode, ShadowModel};
use crate::kinematics::{on_shell_minus, rapidity, Vec2};
use crate::models::{DipoleInteraction, DipoleState, InteractionStatus, PartonId};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Side {
    Left,
    Right,
}

/// Reference shadow model
#[derive(Debug, Clone, Default)]
pub struct CascadeShadows {
    /// Candidate indices registered by `prepare`
    prepared: BTreeSet<usize>,

    /// Recoil accumulated since the last `reset_interacted`
    accumulated: BTreeMap<(Side, PartonId), Vec2>,

    /// Recoil already written into the cascades by final checks
    applied: BTreeMap<(Side, PartonId), Vec2>,
}

impl CascadeShadows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_prepared(&self, inter: &DipoleInteraction) -> bool {
        self.prepared.contains(&inter.index)
    }

    fn accumulated(&self, side: Side, parton: PartonId) -> Vec2 {
        self.accumulated
            .get(&(side, parton))
            .copied()
            .unwrap_or(Vec2::ZERO)
    }

    fn applied(&self, side: Side, parton: PartonId) -> Vec2 {
        self.applied.get(&(side, parton)).copied().unwrap_or(Vec2::ZERO)
    }

    fn minus_below_children(state: &DipoleState, parton: PartonId, minus: f64) -> bool {
        state
            .partons()
            .any(|(_, p)| p.mother == Some(parton) && p.minus < minus)
    }

    fn evaluate(
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
        acc_l: Vec2,
        acc_r: Vec2,
    ) -> InteractionStatus {
        let (lp, rp) = inter.ints;
        let pl = left.parton(lp);
        let pr = right.parton(rp);
        if pl.plus <= 0.0 || pr.plus <= 0.0 {
            return InteractionStatus::PropFail;
        }

        let ml = on_shell_minus(pl.plus, &(pl.pt + acc_l), pl.mass);
        let mr = on_shell_minus(pr.plus, &(pr.pt + acc_r), pr.mass);
        if ml > pr.plus || mr > pl.plus {
            return InteractionStatus::KineFail;
        }

        if Self::minus_below_children(left, lp, ml) || Self::minus_below_children(right, rp, mr) {
            return InteractionStatus::Ordering;
        }
        if rapidity(pl.plus, ml) + rapidity(pr.plus, mr) <= 0.0 {
            return InteractionStatus::Ordering;
        }
        InteractionStatus::Accepted
    }

    fn put_on_shell(state: &mut DipoleState, parton: PartonId, recoil: Vec2) {
        let p = state.parton_mut(parton);
        p.pt += recoil;
        p.update_minus();
        p.on_shell = true;
        for a in state.ancestors(parton) {
            state.parton_mut(a).on_shell = true;
        }
    }
}

impl ShadowModel for CascadeShadows {
    fn reset_shadows(&mut self, _left: &DipoleState, _right: &DipoleState) {
        self.prepared.clear();
        self.accumulated.clear();
        self.applied.clear();
    }

    fn reset_interacted(&mut self) {
        self.accumulated.clear();
    }

    fn prepare(
        &mut self,
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
    ) -> InteractionStatus {
        self.prepared.insert(inter.index);
        let (rl, rr) = inter.effective_recoil();
        Self::evaluate(inter, left, right, rl, rr)
    }

    fn check(
        &mut self,
        inter: &DipoleInteraction,
        mode: CheckMode,
        left: &mut DipoleState,
        right: &mut DipoleState,
    ) -> InteractionStatus {
        if !self.is_prepared(inter) {
            return InteractionStatus::Unknown;
        }
        let (lp, rp) = inter.ints;
        let (rl, rr) = inter.effective_recoil();
        let acc_l = self.accumulated(Side::Left, lp) + rl;
        let acc_r = self.accumulated(Side::Right, rp) + rr;

        let status = Self::evaluate(
            inter,
            left,
            right,
            acc_l - self.applied(Side::Left, lp),
            acc_r - self.applied(Side::Right, rp),
        );
        if status != InteractionStatus::Accepted {
            return status;
        }

        self.accumulated.insert((Side::Left, lp), acc_l);
        self.accumulated.insert((Side::Right, rp), acc_r);
        if mode == CheckMode::Final {
            Self::put_on_shell(left, lp, rl);
            Self::put_on_shell(right, rp, rr);
            self.applied.insert((Side::Left, lp), self.applied(Side::Left, lp) + rl);
            self.applied.insert((Side::Right, rp), self.applied(Side::Right, rp) + rr);
        }
        status
    }

    fn reject(&mut self, inter: &DipoleInteraction) {
        self.prepared.remove(&inter.index);
    }

    /// Valence partons go on shell and every off-shell parton hands its
    /// momentum to its nearest on-shell ancestor
    fn finalize(&mut self, left: &mut DipoleState, right: &mut DipoleState) {
        for state in [left, right] {
            let valence: Vec<_> = state
                .partons()
                .filter(|(_, p)| p.valence)
                .map(|(id, _)| id)
                .collect();
            for v in valence {
                let p = state.parton_mut(v);
                p.on_shell = true;
                p.update_minus();
            }
            state.fold_off_shell_momentum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DipoleId, Parton};

    fn pair_states() -> (DipoleState, DipoleState, DipoleInteraction) {
        let mut left = DipoleState::new(1.0).with_shadows(true);
        left.add_valence_dipole(
            Parton::new(2, 50.0, Vec2::new(0.3, 0.0), Vec2::new(-1.0, 0.0)),
            Parton::new(-2, 50.0, Vec2::new(-0.3, 0.0), Vec2::new(1.0, 0.0)),
        );
        let right = left.clone();
        let mut inter = DipoleInteraction::new(0, (DipoleId(0), DipoleId(0)), (PartonId(0), PartonId(0)));
        inter.recoil = Vec2::new(1.0, 0.0);
        inter.partner_recoil = Vec2::new(-1.0, 0.0);
        (left, right, inter)
    }

    #[test]
    fn test_unprepared_interaction_is_unknown() {
        let (mut left, mut right, inter) = pair_states();
        let mut shadows = CascadeShadows::new();
        let status = shadows.check(&inter, CheckMode::Tentative, &mut left, &mut right);
        assert_eq!(status, InteractionStatus::Unknown);
    }

    #[test]
    fn test_tentative_check_leaves_cascades_alone() {
        let (mut left, mut right, inter) = pair_states();
        let before = (left.clone(), right.clone());
        let mut shadows = CascadeShadows::new();
        assert_eq!(shadows.prepare(&inter, &left, &right), InteractionStatus::Accepted);
        let status = shadows.check(&inter, CheckMode::Tentative, &mut left, &mut right);
        assert_eq!(status, InteractionStatus::Accepted);
        assert_eq!(left.parton(PartonId(0)), before.0.parton(PartonId(0)));
        assert_eq!(right.parton(PartonId(0)), before.1.parton(PartonId(0)));
    }

    #[test]
    fn test_huge_recoil_is_kinematically_vetoed() {
        let (mut left, mut right, mut inter) = pair_states();
        inter.recoil = Vec2::new(100.0, 0.0);
        let mut shadows = CascadeShadows::new();
        shadows.prepare(&inter, &left, &right);
        let status = shadows.check(&inter, CheckMode::Tentative, &mut left, &mut right);
        assert_eq!(status, InteractionStatus::KineFail);
    }

    #[test]
    fn test_final_check_puts_partons_on_shell() {
        let (mut left, mut right, inter) = pair_states();
        let mut shadows = CascadeShadows::new();
        shadows.prepare(&inter, &left, &right);
        shadows.check(&inter, CheckMode::Final, &mut left, &mut right);
        let p = left.parton(PartonId(0));
        assert!(p.on_shell);
        assert!((p.pt.x - 1.3).abs() < 1e-12);
        assert!(p.off_shellness().abs() < 1e-9);
    }
}
