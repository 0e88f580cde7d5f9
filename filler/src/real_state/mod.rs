//! Real Parton State
//!
//! Per-side overlay deciding which cascade partons become real final-state
//! partons as interactions are tentatively added.
//!
//! # Critical Invariants
//!
//! 1. **Revertible**: after any failed [`RealPartonState::control_evolution`]
//!    the overlay is identical to what it was before the call, and
//!    [`RealPartonState::revert_to_previous`] restores the last
//!    [`RealPartonState::save_state`] exactly.
//! 2. **Valence is real**: valence partons are always [`Keep::Yes`].
//! 3. **Plus conservation**: [`RealPartonState::merge_virtuals`] and
//!    [`RealPartonState::add_recoilers`] move light-cone plus and transverse
//!    momentum between partons without creating or destroying any.
//!
//! The cascade itself is only written by `save_state`, `set_on_shell` and
//! `add_recoilers`; everything else works on the overlay.

pub mod evolution;
pub mod parton;

pub use evolution::EvolutionMode;
pub use parton::{Keep, RealParton};

use crate::kinematics::{on_shell_minus, TransverseMomentum, Vec2};
use crate::models::{DipoleId, DipoleState, Parton, PartonId};
use std::collections::{BTreeMap, BTreeSet};

/// Everything that `save_state` snapshots
#[derive(Debug, Clone, PartialEq, Default)]
struct Overlay {
    partons: BTreeMap<PartonId, RealParton>,
    valence: BTreeSet<PartonId>,

    /// Dipoles of this side in accepted interactions, in acceptance order
    interactions: Vec<DipoleId>,
    does_ints: Vec<(bool, bool)>,

    total_recoil: TransverseMomentum,

    /// Plus momentum carried by the whole cascade
    available_plus: f64,
}

/// Real-parton overlay for one cascade side
#[derive(Debug, Clone, PartialEq)]
pub struct RealPartonState {
    current: Overlay,
    saved: Overlay,
    mode: EvolutionMode,
}

impl Default for RealPartonState {
    fn default() -> Self {
        Self::new(EvolutionMode::default())
    }
}

impl RealPartonState {
    pub fn new(mode: EvolutionMode) -> Self {
        Self {
            current: Overlay::default(),
            saved: Overlay::default(),
            mode,
        }
    }

    pub fn mode(&self) -> EvolutionMode {
        self.mode
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, parton: PartonId) -> Option<&RealParton> {
        self.current.partons.get(&parton)
    }

    pub fn keep(&self, parton: PartonId) -> Option<Keep> {
        self.get(parton).map(|rp| rp.keep)
    }

    pub fn partons(&self) -> impl Iterator<Item = &RealParton> {
        self.current.partons.values()
    }

    pub fn valence(&self) -> impl Iterator<Item = PartonId> + '_ {
        self.current.valence.iter().copied()
    }

    pub fn interactions(&self) -> &[DipoleId] {
        &self.current.interactions
    }

    pub fn does_ints(&self) -> &[(bool, bool)] {
        &self.current.does_ints
    }

    pub fn total_recoil(&self) -> TransverseMomentum {
        self.current.total_recoil
    }

    /// Subtract a vetoed interaction's contribution from the total recoil
    pub fn remove_total_recoil(&mut self, recoil: TransverseMomentum) {
        self.current.total_recoil -= recoil;
    }

    /// Plus momentum this side can give away
    pub fn total_plus(&self) -> f64 {
        self.current.available_plus
    }

    /// Minus momentum the kept partons need, with current recoils
    pub fn total_minus(&self) -> f64 {
        self.current
            .partons
            .values()
            .filter(|rp| rp.keep == Keep::Yes && rp.plus > 0.0)
            .map(|rp| on_shell_minus(rp.plus, &rp.pt, rp.mass))
            .sum()
    }

    /// Summed (plus, minus) of every parton that is not switched off
    pub fn light_cone_totals(&self) -> (f64, f64) {
        self.current
            .partons
            .values()
            .filter(|rp| rp.keep != Keep::No)
            .fold((0.0, 0.0), |(p, m), rp| (p + rp.plus, m + rp.minus))
    }

    /// Longitudinal boost: plus scaled by `factor`, minus by its inverse
    pub fn boost(&mut self, factor: f64) {
        for rp in self.current.partons.values_mut().filter(|rp| rp.keep != Keep::No) {
            rp.plus *= factor;
            rp.minus /= factor;
        }
    }

    // ========================================================================
    // Seeding and snapshots
    // ========================================================================

    /// Seed the overlay with every valence parton of `state`
    pub fn add_valence(&mut self, state: &DipoleState) {
        for (id, parton) in state.partons().filter(|(_, p)| p.valence) {
            self.current
                .partons
                .insert(id, RealParton::from_parton(id, parton, Keep::Yes));
            self.current.valence.insert(id);
        }
        self.current.available_plus = state.all_partons().map(|(_, p)| p.plus.max(0.0)).sum();
    }

    /// Commit the overlay as the rollback point and write it to `state`
    pub fn save_state(&mut self, state: &mut DipoleState) {
        for (id, rp) in self.current.partons.iter_mut() {
            if id.0 >= state.n_partons() {
                log::warn!("real parton {} is not part of the cascade", id.0);
                continue;
            }
            if rp.keep == Keep::Yes {
                rp.set_on_shell();
            }
            let p = state.parton_mut(*id);
            p.plus = rp.plus;
            p.minus = rp.minus;
            p.pt = rp.pt;
            p.on_shell = rp.keep == Keep::Yes;
        }
        self.saved = self.current.clone();
    }

    /// Undo everything since the last [`RealPartonState::save_state`]
    ///
    /// The whole overlay is restored, which covers the subtree of `dipole`.
    pub fn revert_to_previous(&mut self, dipole: DipoleId) {
        log::trace!("reverting real state after dipole {}", dipole.0);
        self.current = self.saved.clone();
    }

    // ========================================================================
    // Evolution control
    // ========================================================================

    /// Add an interaction on `dipole` and check that the cascade can still be
    /// read as an ordered evolution
    ///
    /// # Arguments
    ///
    /// * `dipole` - This side's dipole in the interaction
    /// * `partner` - The other side's dipole
    /// * `does_int` - Which endpoints of `dipole` genuinely interact
    /// * `recoils` - Recoil size on each endpoint
    ///
    /// # Returns
    ///
    /// `false` if an ordering or pt-max violation cannot be fixed; the
    /// overlay is then exactly as before the call.
    pub fn control_evolution(
        &mut self,
        state: &DipoleState,
        dipole: DipoleId,
        partner: DipoleId,
        does_int: (bool, bool),
        recoils: (f64, f64),
    ) -> bool {
        let backup = self.current.clone();
        self.current.interactions.push(dipole);
        self.current.does_ints.push(does_int);

        let (a, b) = state.dipole(dipole).partons;
        for (parton, flag, recoil) in [(a, does_int.0, recoils.0), (b, does_int.1, recoils.1)] {
            if !flag {
                continue;
            }
            if !self.promote(state, parton) {
                log::trace!(
                    "dipole {} (partner {}): ancestor of parton {} was switched off",
                    dipole.0,
                    partner.0,
                    parton.0
                );
                self.current = backup;
                return false;
            }
            if let Some(rp) = self.current.partons.get_mut(&parton) {
                rp.interacting = true;
                rp.recoil_scale = rp.recoil_scale.max(recoil);
            }
        }

        let ok = match self.mode {
            EvolutionMode::SingleSweep => evolution::single_sweep(&mut self.current.partons),
            EvolutionMode::Consistent => evolution::consistent(&mut self.current.partons),
            EvolutionMode::NonRecursive => evolution::non_recursive(&mut self.current.partons),
        };
        if !ok {
            log::trace!("dipole {} (partner {}) fails the evolution check", dipole.0, partner.0);
            self.current = backup;
        }
        ok
    }

    /// Make `parton` and all its ancestors real
    fn promote(&mut self, state: &DipoleState, parton: PartonId) -> bool {
        let mut line = vec![parton];
        line.extend(state.ancestors(parton));
        for id in line {
            match self.current.partons.get_mut(&id) {
                None => {
                    let rp = RealParton::from_parton(id, state.parton(id), Keep::Yes);
                    self.current.partons.insert(id, rp);
                }
                Some(rp) => match rp.keep {
                    Keep::Yes => {}
                    Keep::Virtual if self.mode != EvolutionMode::NonRecursive => {
                        rp.keep = Keep::Yes;
                    }
                    Keep::Virtual | Keep::No => return false,
                },
            }
        }
        true
    }

    // ========================================================================
    // Recoils
    // ========================================================================

    /// Take back every recoil; transverse momenta return to their bases
    pub fn reset_recoils(&mut self) {
        for rp in self.current.partons.values_mut() {
            rp.pt = rp.base_pt;
        }
        self.current.total_recoil = Vec2::ZERO;
    }

    /// Give `recoil` to `parton`, counting it in the total
    pub fn apply_recoil(&mut self, parton: PartonId, recoil: TransverseMomentum) -> bool {
        if !self.shift_pt(parton, recoil) {
            return false;
        }
        self.current.total_recoil += recoil;
        true
    }

    /// Change the transverse momentum of `parton` without bookkeeping
    pub fn shift_pt(&mut self, parton: PartonId, delta: TransverseMomentum) -> bool {
        match self.current.partons.get_mut(&parton) {
            Some(rp) => {
                rp.pt += delta;
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Final state
    // ========================================================================

    /// Put the kept endpoints of `dipole` on shell
    pub fn set_on_shell(&mut self, state: &mut DipoleState, dipole: DipoleId) {
        let (a, b) = state.dipole(dipole).partons;
        for id in [a, b] {
            self.put_on_shell(state, id);
        }
    }

    pub fn set_valence_on_shell(&mut self, state: &mut DipoleState) {
        let valence: Vec<PartonId> = self.current.valence.iter().copied().collect();
        for id in valence {
            self.put_on_shell(state, id);
        }
    }

    fn put_on_shell(&mut self, state: &mut DipoleState, id: PartonId) {
        let Some(rp) = self.current.partons.get_mut(&id) else {
            return;
        };
        if rp.keep != Keep::Yes {
            return;
        }
        rp.set_on_shell();
        let p = state.parton_mut(id);
        p.plus = rp.plus;
        p.pt = rp.pt;
        p.minus = rp.minus;
        p.on_shell = true;
    }

    /// Fold every parton that is not kept into its nearest kept ancestor
    ///
    /// Partons never touched by an interaction count as not kept. Folded
    /// partons end up [`Keep::No`] with zero momentum.
    ///
    /// # Returns
    ///
    /// Number of partons folded
    pub fn merge_virtuals(&mut self, state: &DipoleState) -> usize {
        let mut transfers: Vec<(PartonId, f64, TransverseMomentum)> = Vec::new();

        for (id, parton) in state.all_partons() {
            let (plus, pt) = match self.current.partons.get(&id) {
                Some(rp) if rp.keep == Keep::Yes || rp.folded => continue,
                Some(rp) => (rp.plus, rp.pt),
                None => (parton.plus, parton.pt),
            };
            let target = state
                .ancestors(id)
                .into_iter()
                .find(|a| self.keep(*a) == Some(Keep::Yes));
            let Some(target) = target else {
                log::warn!("parton {} has no real ancestor to fold into", id.0);
                continue;
            };
            transfers.push((target, plus, pt));

            let rp = self
                .current
                .partons
                .entry(id)
                .or_insert_with(|| RealParton::from_parton(id, parton, Keep::No));
            rp.keep = Keep::No;
            rp.folded = true;
            rp.clear_momentum();
        }

        let folded = transfers.len();
        for (target, plus, pt) in transfers {
            if let Some(rp) = self.current.partons.get_mut(&target) {
                rp.plus += plus;
                rp.pt += pt;
                rp.base_pt += pt;
                rp.set_on_shell();
            }
        }
        folded
    }

    /// Split recoiler partons off kept partons whose recoil dwarfs their own
    /// transverse momentum
    ///
    /// A parton with recoil `r` and base `k`, `|r| > 2|k|`, keeps `k` and a
    /// fraction `|k| / (|r| + |k|)` of its plus; a new gluon at the same
    /// position carries `r` and the rest of the plus.
    ///
    /// # Returns
    ///
    /// Number of recoilers added
    pub fn add_recoilers(&mut self, state: &mut DipoleState) -> usize {
        let candidates: Vec<PartonId> = self
            .current
            .partons
            .iter()
            .filter(|(_, rp)| {
                let r = rp.recoil().pt();
                rp.keep == Keep::Yes && rp.plus > 0.0 && r > 0.0 && r > 2.0 * rp.base_pt.pt()
            })
            .map(|(id, _)| *id)
            .collect();

        let mut added = 0;
        for id in candidates {
            let (dipole, position, interacted) = {
                let p = state.parton(id);
                (p.dipoles.1.or(p.dipoles.0), p.position, p.interacted)
            };
            let Some(dipole) = dipole else { continue };
            let Some(rp) = self.current.partons.get_mut(&id) else {
                continue;
            };

            let recoil = rp.recoil();
            let base = rp.base_pt;
            let fraction = recoil.pt() / (recoil.pt() + base.pt());
            let plus = rp.plus * fraction;
            rp.plus -= plus;
            rp.pt = base;
            rp.set_on_shell();

            let mut gluon = Parton::gluon(plus, recoil, position);
            gluon.mother = Some(id);
            gluon.interacted = interacted;
            let c = state.insert_gluon(dipole, gluon);

            let mut recoiler = RealParton::from_parton(c, state.parton(c), Keep::Yes);
            recoiler.interacting = true;
            recoiler.recoil_scale = recoil.pt();
            self.current.partons.insert(c, recoiler);
            added += 1;
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::Vec2;

    /// Quark pair with one emitted gluon (id 2) on dipole 0
    fn cascade() -> DipoleState {
        let mut state = DipoleState::new(1.0);
        let d = state.add_valence_dipole(
            Parton::new(2, 50.0, Vec2::new(0.2, 0.0), Vec2::new(-1.0, 0.0)),
            Parton::new(-2, 50.0, Vec2::new(-0.2, 0.0), Vec2::new(1.0, 0.0)),
        );
        state
            .emit(d, Parton::gluon(5.0, Vec2::new(0.0, 1.0), Vec2::new(-0.8, 0.3)))
            .unwrap();
        state
    }

    fn seeded(state: &mut DipoleState) -> RealPartonState {
        let mut rs = RealPartonState::new(EvolutionMode::SingleSweep);
        rs.add_valence(state);
        rs.save_state(state);
        rs
    }

    #[test]
    fn test_valence_is_kept() {
        let mut state = cascade();
        let rs = seeded(&mut state);
        assert_eq!(rs.keep(PartonId(0)), Some(Keep::Yes));
        assert_eq!(rs.keep(PartonId(1)), Some(Keep::Yes));
        assert_eq!(rs.keep(PartonId(2)), None);
        assert!(state.parton(PartonId(0)).on_shell);
    }

    #[test]
    fn test_control_evolution_promotes_ancestors() {
        let mut state = cascade();
        let mut rs = seeded(&mut state);
        // dipole 0 is now (0, 2)
        assert!(rs.control_evolution(&state, DipoleId(0), DipoleId(0), (false, true), (0.0, 1.0)));
        assert_eq!(rs.keep(PartonId(2)), Some(Keep::Yes));
        assert!(rs.get(PartonId(2)).unwrap().interacting);
        assert_eq!(rs.interactions(), &[DipoleId(0)]);
    }

    #[test]
    fn test_revert_restores_saved_overlay() {
        let mut state = cascade();
        let mut rs = seeded(&mut state);
        let before = rs.clone();
        assert!(rs.control_evolution(&state, DipoleId(0), DipoleId(0), (true, true), (1.0, 1.0)));
        assert_ne!(rs, before);
        rs.revert_to_previous(DipoleId(0));
        assert_eq!(rs, before);
    }

    #[test]
    fn test_merge_virtuals_conserves_plus_and_pt() {
        let mut state = cascade();
        let mut rs = seeded(&mut state);
        let total_plus: f64 = state.all_partons().map(|(_, p)| p.plus).sum();
        let total_pt = state.all_partons().fold(Vec2::ZERO, |acc, (_, p)| acc + p.pt);

        assert_eq!(rs.merge_virtuals(&state), 1);
        rs.save_state(&mut state);

        let plus: f64 = state.all_partons().map(|(_, p)| p.plus).sum();
        let pt = state.all_partons().fold(Vec2::ZERO, |acc, (_, p)| acc + p.pt);
        assert!((plus - total_plus).abs() < 1e-12);
        assert!((pt - total_pt).pt() < 1e-12);
        assert_eq!(rs.keep(PartonId(2)), Some(Keep::No));
        assert!(!state.parton(PartonId(2)).on_shell);
        assert!(state.parton(PartonId(0)).off_shellness().abs() < 1e-9);
    }

    #[test]
    fn test_add_recoilers_splits_large_recoil() {
        let mut state = cascade();
        let mut rs = seeded(&mut state);
        assert!(rs.apply_recoil(PartonId(1), Vec2::new(3.0, 0.0)));
        let plus_before = rs.get(PartonId(1)).unwrap().plus;

        assert_eq!(rs.add_recoilers(&mut state), 1);
        let remnant = rs.get(PartonId(1)).unwrap();
        let recoiler = rs.get(PartonId(3)).unwrap();
        assert!((remnant.plus + recoiler.plus - plus_before).abs() < 1e-12);
        assert!((remnant.pt + recoiler.pt - Vec2::new(2.8, 0.0)).pt() < 1e-12);
        assert_eq!(state.parton(PartonId(3)).mother, Some(PartonId(1)));
    }

    #[test]
    fn test_apply_recoil_requires_known_parton() {
        let mut state = cascade();
        let mut rs = seeded(&mut state);
        assert!(!rs.apply_recoil(PartonId(2), Vec2::new(1.0, 0.0)));
        assert_eq!(rs.total_recoil(), Vec2::ZERO);
    }
}
