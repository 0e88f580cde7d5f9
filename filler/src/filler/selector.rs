//! Interaction Selector
//!
//! Picks a mutually consistent set of interactions out of the catalog.
//!
//! Each round samples one primary candidate with probability proportional to
//! its unitarised weight, adds every other eligible candidate with the
//! corrected probability from
//! [`InteractionCatalog::corrected_probability`], and then tries to commit
//! the resulting potential set in rank order. A round that commits at least
//! one interaction ends the selection.
//!
//! # Give-up conditions
//!
//! - More than `max_retries` rounds without a committed interaction
//!   ([`GiveUpReason::RetriesExhausted`])
//! - No candidate left that may be sampled as primary
//!   ([`GiveUpReason::EmptyPool`])
//!
//! Both are soft: the event is discarded and the caller resamples.
//!
//! # Primary bookkeeping
//!
//! A candidate that fails before anything has been committed in a round is
//! remembered and skipped in later rounds until something is committed. If
//! it is also the best-ranked remaining candidate it is removed from primary
//! sampling altogether.

use crate::collaborators::{CheckMode, CrossSection, ShadowModel};
use crate::error::FillerError;
use crate::filler::catalog::{InteractionCatalog, PrimaryPool};
use crate::filler::config::FillerConfig;
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent, GiveUpReason};
use crate::filler::recoil::RecoilController;
use crate::models::{
    DipoleId, DipoleInteraction, DipoleState, ImpactParameters, InteractionStatus, PartonId,
};
use crate::real_state::RealPartonState;
use crate::rng::RngManager;
use std::collections::BTreeSet;

/// Result of a selection
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Candidate indices committed, in commit order
    Found {
        accepted: Vec<usize>,
        potential: usize,
    },
    GaveUp(GiveUpReason),
}

impl Selection {
    pub fn accepted(&self) -> &[usize] {
        match self {
            Selection::Found { accepted, .. } => accepted,
            Selection::GaveUp(_) => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Selection::Found { .. })
    }
}

/// Both cascades and their real-parton overlays
pub struct Sides<'s> {
    pub left: &'s mut DipoleState,
    pub right: &'s mut DipoleState,
    pub lrs: &'s mut RealPartonState,
    pub rrs: &'s mut RealPartonState,
}

/// Per-event round state shared by both selection paths
struct Rounds {
    pool: PrimaryPool,
    ordered: Vec<usize>,
    failed_prims: BTreeSet<usize>,
    counter: usize,
}

impl Rounds {
    fn new(catalog: &InteractionCatalog) -> Self {
        Self {
            pool: catalog.primary_pool(),
            ordered: catalog.ordered(),
            failed_prims: BTreeSet::new(),
            counter: 0,
        }
    }

    /// Sample a primary and build the ranked potential set
    fn potential(&self, catalog: &InteractionCatalog, rng: &mut RngManager) -> Vec<usize> {
        let prim = self.pool.sample(rng.next_f64());
        let mut potential: Vec<usize> = catalog
            .eligible()
            .iter()
            .copied()
            .filter(|i| {
                Some(*i) == prim
                    || catalog.corrected_probability(catalog.get(*i).uf2) > rng.next_f64()
            })
            .collect();
        catalog.rank(&mut potential);
        potential
    }

    /// Remember a candidate that failed before anything was committed
    fn primary_failed(&mut self, index: usize) {
        self.failed_prims.insert(index);
        if self.ordered.first() == Some(&index) {
            self.ordered.remove(0);
            self.pool.remove(index);
        }
    }
}

/// Interaction selection for one event
pub struct InteractionSelector<'a> {
    config: &'a FillerConfig,
    xsec: &'a dyn CrossSection,
}

impl<'a> InteractionSelector<'a> {
    pub fn new(config: &'a FillerConfig, xsec: &'a dyn CrossSection) -> Self {
        Self { config, xsec }
    }

    fn give_up(
        reason: GiveUpReason,
        weight: f64,
        sink: &mut dyn DiagnosticsSink,
    ) -> Selection {
        log::debug!("giving up interaction selection: {:?}", reason);
        sink.record(FillerEvent::GaveUp { reason, weight });
        Selection::GaveUp(reason)
    }

    // ========================================================================
    // Generic path
    // ========================================================================

    /// Select interactions by rebuilding the real-parton overlays
    ///
    /// The overlays are seeded with the valence partons here. On success
    /// the endpoints of every committed interaction and all valence partons
    /// are on shell in both cascades.
    ///
    /// # Arguments
    ///
    /// * `weight` - Event weight, accumulated in diagnostics for every
    ///   attempted interaction and for give-ups
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &self,
        catalog: &mut InteractionCatalog,
        sides: &mut Sides<'_>,
        b: &ImpactParameters,
        weight: f64,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Selection {
        sides.lrs.add_valence(sides.left);
        sides.rrs.add_valence(sides.right);
        sides.lrs.save_state(sides.left);
        sides.rrs.save_state(sides.right);

        let mut rounds = Rounds::new(catalog);

        loop {
            let mut accepted: Vec<usize> = Vec::new();
            let mut found = false;
            let potential = rounds.potential(catalog, rng);

            rounds.counter += 1;
            if rounds.counter > self.config.max_retries {
                return Self::give_up(GiveUpReason::RetriesExhausted, weight, sink);
            }

            let mut ldips: BTreeSet<DipoleId> = BTreeSet::new();
            let mut rdips: BTreeSet<DipoleId> = BTreeSet::new();
            let mut intpairs: BTreeSet<(PartonId, PartonId)> = BTreeSet::new();

            for &i in &potential {
                if rounds.failed_prims.contains(&i) && !found {
                    continue;
                }
                let (dips, ints) = {
                    let c = catalog.get(i);
                    (c.dips, c.ints)
                };
                if self.config.only_once && (ldips.contains(&dips.0) || rdips.contains(&dips.1)) {
                    continue;
                }
                catalog.get_mut(i).norec = self.config.only_once && intpairs.contains(&ints);

                sink.record(FillerEvent::Rescatter { weight });
                match self.add_interaction(catalog, i, &mut accepted, sides, b) {
                    Ok(()) => {
                        found = true;
                        ldips.insert(dips.0);
                        rdips.insert(dips.1);
                        intpairs.insert(ints);
                        sink.record(FillerEvent::InteractionAccepted { index: i });
                    }
                    Err(status) => {
                        sink.record(FillerEvent::InteractionRejected { index: i, status });
                        if !found {
                            rounds.primary_failed(i);
                        }
                    }
                }
            }

            if !found {
                log::debug!("selection round {} committed nothing", rounds.counter);
                sink.record(FillerEvent::RoundFailed {
                    round: rounds.counter,
                });
            }
            if rounds.pool.is_empty() && !found {
                return Self::give_up(GiveUpReason::EmptyPool, weight, sink);
            }
            if found {
                for &i in &accepted {
                    let dips = catalog.get(i).dips;
                    sides.lrs.set_on_shell(sides.left, dips.0);
                    sides.rrs.set_on_shell(sides.right, dips.1);
                }
                sides.lrs.set_valence_on_shell(sides.left);
                sides.rrs.set_valence_on_shell(sides.right);
                sink.record(FillerEvent::Selected {
                    accepted: accepted.len(),
                    potential: potential.len(),
                });
                return Selection::Found {
                    accepted,
                    potential: potential.len(),
                };
            }
        }
    }

    /// Try to commit candidate `index` on top of `accepted`
    ///
    /// On failure both overlays are as they were before the call and
    /// `accepted` is unchanged; the status says which check failed.
    fn add_interaction(
        &self,
        catalog: &mut InteractionCatalog,
        index: usize,
        accepted: &mut Vec<usize>,
        sides: &mut Sides<'_>,
        b: &ImpactParameters,
    ) -> Result<(), InteractionStatus> {
        let dips = catalog.get(index).dips;
        let does = self.xsec.does_int(sides.left, sides.right, dips, b);
        catalog.get_mut(index).does_int = does;

        let controller = RecoilController::new(self.xsec);
        let rec = controller.recoil_for(catalog.get(index), sides.left, sides.right, b);

        if !sides.lrs.control_evolution(
            sides.left,
            dips.0,
            dips.1,
            does.left,
            (rec.left.0.pt(), rec.left.1.pt()),
        ) {
            catalog.get_mut(index).status = InteractionStatus::Ordering;
            return Err(InteractionStatus::Ordering);
        }
        if !sides.rrs.control_evolution(
            sides.right,
            dips.1,
            dips.0,
            does.right,
            (rec.right.0.pt(), rec.right.1.pt()),
        ) {
            sides.lrs.revert_to_previous(dips.0);
            catalog.get_mut(index).status = InteractionStatus::Ordering;
            return Err(InteractionStatus::Ordering);
        }

        accepted.push(index);
        let ok = {
            let set: Vec<&DipoleInteraction> = accepted.iter().map(|i| catalog.get(*i)).collect();
            controller.control_recoils(&set, sides.left, sides.right, sides.lrs, sides.rrs, b)
        };
        if !ok {
            sides.lrs.revert_to_previous(dips.0);
            sides.rrs.revert_to_previous(dips.1);
            accepted.pop();
            catalog.get_mut(index).status = InteractionStatus::KineFail;
            return Err(InteractionStatus::KineFail);
        }

        self.xsec.interact(sides.left, sides.right, catalog.get(index));
        catalog.get_mut(index).status = InteractionStatus::Accepted;
        sides.lrs.save_state(sides.left);
        sides.rrs.save_state(sides.right);
        Ok(())
    }

    // ========================================================================
    // Shadow path
    // ========================================================================

    /// Select interactions by incremental validation on the shadow model
    ///
    /// A dipole never takes part in more than one interaction, and a parton
    /// pair that already interacted gets no second recoil. Every rejected
    /// candidate is handed back to the shadow model and gets a negative id.
    ///
    /// # Errors
    ///
    /// [`FillerError::Consistency`] if removing a rejected candidate leaves
    /// an accepted set that no longer validates.
    #[allow(clippy::too_many_arguments)]
    pub fn select_shadow(
        &self,
        catalog: &mut InteractionCatalog,
        shadows: &mut dyn ShadowModel,
        left: &mut DipoleState,
        right: &mut DipoleState,
        weight: f64,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Selection, FillerError> {
        let mut rounds = Rounds::new(catalog);

        loop {
            let mut accepted: Vec<usize> = Vec::new();
            let mut found = false;
            shadows.reset_shadows(left, right);
            let potential = rounds.potential(catalog, rng);

            rounds.counter += 1;
            if rounds.counter > self.config.max_retries {
                return Ok(Self::give_up(GiveUpReason::RetriesExhausted, weight, sink));
            }

            let mut ldips: BTreeSet<DipoleId> = BTreeSet::new();
            let mut rdips: BTreeSet<DipoleId> = BTreeSet::new();
            let mut intpairs: BTreeSet<(PartonId, PartonId)> = BTreeSet::new();

            for &i in &potential {
                if rounds.failed_prims.contains(&i) && !found {
                    continue;
                }
                let dips = catalog.get(i).dips;
                if ldips.contains(&dips.0) || rdips.contains(&dips.1) {
                    continue;
                }

                accepted.push(i);
                {
                    let c = catalog.get_mut(i);
                    c.id = accepted.len() as i64;
                    c.norec = intpairs.contains(&c.ints);
                }
                // a candidate the shadow model refuses on its own never
                // reaches the recheck
                let prepared = shadows.prepare(catalog.get(i), left, right);
                let verdict = if prepared == InteractionStatus::Accepted {
                    recheck(shadows, catalog, &accepted, CheckMode::Tentative, left, right)
                } else {
                    catalog.get_mut(i).status = prepared;
                    Err(prepared)
                };

                match verdict {
                    Ok(()) => {
                        found = true;
                        ldips.insert(dips.0);
                        rdips.insert(dips.1);
                        intpairs = accepted.iter().map(|a| catalog.get(*a).ints).collect();
                        sink.record(FillerEvent::InteractionAccepted { index: i });
                    }
                    Err(status) => {
                        sink.record(FillerEvent::InteractionRejected { index: i, status });
                        accepted.pop();
                        shadows.reject(catalog.get(i));
                        let c = catalog.get_mut(i);
                        c.id = -c.id;
                        if let Err(status) =
                            recheck(shadows, catalog, &accepted, CheckMode::Tentative, left, right)
                        {
                            return Err(FillerError::Consistency(format!(
                                "previously accepted interactions fail the recheck ({:?})",
                                status
                            )));
                        }
                        if !found {
                            rounds.primary_failed(i);
                        }
                    }
                }
            }

            if !found {
                log::debug!("shadow selection round {} committed nothing", rounds.counter);
                sink.record(FillerEvent::RoundFailed {
                    round: rounds.counter,
                });
                if rounds.pool.is_empty() {
                    return Ok(Self::give_up(GiveUpReason::EmptyPool, weight, sink));
                }
            } else {
                for &i in &accepted {
                    self.xsec.interact(left, right, catalog.get(i));
                }
                sink.record(FillerEvent::Selected {
                    accepted: accepted.len(),
                    potential: potential.len(),
                });
                return Ok(Selection::Found {
                    accepted,
                    potential: potential.len(),
                });
            }
        }
    }
}

/// Validate `accepted` from scratch, in order
///
/// Each checked candidate gets the resulting status.
///
/// # Returns
///
/// The status of the first candidate that does not validate
pub fn recheck(
    shadows: &mut dyn ShadowModel,
    catalog: &mut InteractionCatalog,
    accepted: &[usize],
    mode: CheckMode,
    left: &mut DipoleState,
    right: &mut DipoleState,
) -> Result<(), InteractionStatus> {
    shadows.reset_interacted();
    for &i in accepted {
        let status = shadows.check(catalog.get(i), mode, left, right);
        catalog.get_mut(i).status = status;
        if status != InteractionStatus::Accepted {
            return Err(status);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CascadeShadows, StandardXSec};
    use crate::filler::diagnostics::{EventLog, FillerStats};
    use crate::kinematics::Vec2;
    use crate::models::Parton;
    use crate::real_state::EvolutionMode;

    fn cascade() -> DipoleState {
        let mut state = DipoleState::new(1.0);
        state.add_valence_dipole(
            Parton::new(2, 50.0, Vec2::new(0.3, 0.0), Vec2::new(-1.0, 0.0)),
            Parton::new(-2, 50.0, Vec2::new(-0.3, 0.0), Vec2::new(1.0, 0.0)),
        );
        state
    }

    fn impact() -> ImpactParameters {
        ImpactParameters::new(Vec2::new(0.3, 0.2), 0.4, 1.0)
    }

    #[test]
    fn test_single_candidate_is_committed() {
        let config = FillerConfig::default();
        let xsec = StandardXSec::new(0.5);
        let (mut left, mut right) = (cascade(), cascade());
        let b = impact();
        let mut catalog = InteractionCatalog::build(&xsec, &left, &right, &b);
        assert_eq!(catalog.eligible().len(), 1);

        let mut lrs = RealPartonState::new(EvolutionMode::SingleSweep);
        let mut rrs = RealPartonState::new(EvolutionMode::SingleSweep);
        let mut sides = Sides {
            left: &mut left,
            right: &mut right,
            lrs: &mut lrs,
            rrs: &mut rrs,
        };
        let mut log = EventLog::new();
        let sel = InteractionSelector::new(&config, &xsec).select(
            &mut catalog,
            &mut sides,
            &b,
            1.0,
            &mut RngManager::new(7),
            &mut log,
        );
        assert_eq!(sel.accepted(), &[0]);
        assert_eq!(catalog.get(0).status, InteractionStatus::Accepted);
        assert!(left.dipole(DipoleId(0)).interacted);
        assert!(right.dipole(DipoleId(0)).interacted);
        assert!(left.parton(PartonId(0)).on_shell);
    }

    #[test]
    fn test_empty_pool_gives_up() {
        let config = FillerConfig::default();
        let xsec = StandardXSec::new(0.5);
        let (mut left, mut right) = (cascade(), cascade());
        let b = impact();
        let mut catalog = InteractionCatalog::from_candidates(&xsec, Vec::new(), |_| true);

        let mut lrs = RealPartonState::default();
        let mut rrs = RealPartonState::default();
        let mut sides = Sides {
            left: &mut left,
            right: &mut right,
            lrs: &mut lrs,
            rrs: &mut rrs,
        };
        let mut stats = FillerStats::new();
        let sel = InteractionSelector::new(&config, &xsec).select(
            &mut catalog,
            &mut sides,
            &b,
            0.5,
            &mut RngManager::new(1),
            &mut stats,
        );
        assert_eq!(sel, Selection::GaveUp(GiveUpReason::EmptyPool));
        assert_eq!(stats.gave_up_empty, 1);
    }

    #[test]
    fn test_shadow_selection_assigns_ids() {
        let config = FillerConfig::default();
        let xsec = StandardXSec::new(0.5);
        let mut left = cascade().with_shadows(true);
        let mut right = cascade().with_shadows(true);
        let b = impact();
        let mut shadows = CascadeShadows::new();
        let mut log = EventLog::new();
        let mut catalog =
            InteractionCatalog::build_shadow(&xsec, &mut shadows, &left, &right, &b, &mut log);
        assert_eq!(catalog.eligible().len(), 1);

        let sel = InteractionSelector::new(&config, &xsec)
            .select_shadow(
                &mut catalog,
                &mut shadows,
                &mut left,
                &mut right,
                1.0,
                &mut RngManager::new(3),
                &mut log,
            )
            .unwrap();
        assert_eq!(sel.accepted(), &[0]);
        assert_eq!(catalog.get(0).id, 1);
        assert!(!catalog.get(0).norec);
        assert!(left.dipole(DipoleId(0)).interacted);
        assert!(right.dipole(DipoleId(0)).interacted);
    }

    /// Refuses one candidate when it is prepared, accepts everything on check
    #[derive(Default)]
    struct RefusingShadows {
        refuse: usize,
        rejected: Vec<usize>,
    }

    impl ShadowModel for RefusingShadows {
        fn reset_shadows(&mut self, _left: &DipoleState, _right: &DipoleState) {}

        fn reset_interacted(&mut self) {}

        fn prepare(
            &mut self,
            inter: &DipoleInteraction,
            _left: &DipoleState,
            _right: &DipoleState,
        ) -> InteractionStatus {
            if inter.index == self.refuse {
                InteractionStatus::KineFail
            } else {
                InteractionStatus::Accepted
            }
        }

        fn check(
            &mut self,
            _inter: &DipoleInteraction,
            _mode: CheckMode,
            _left: &mut DipoleState,
            _right: &mut DipoleState,
        ) -> InteractionStatus {
            InteractionStatus::Accepted
        }

        fn reject(&mut self, inter: &DipoleInteraction) {
            self.rejected.push(inter.index);
        }
    }

    #[test]
    fn test_shadow_candidate_refused_on_prepare_is_rejected() {
        let config = FillerConfig::default();
        let xsec = StandardXSec::new(0.5);
        let mut left = cascade().with_shadows(true);
        let mut right = cascade().with_shadows(true);
        let b = impact();
        let mut log = EventLog::new();
        let mut catalog = InteractionCatalog::from_candidates(
            &xsec,
            xsec.flist(&left, &right, &b),
            |c| c.f2 > 0.0,
        );
        assert_eq!(catalog.eligible(), &[0]);
        let mut shadows = RefusingShadows::default();

        let sel = InteractionSelector::new(&config, &xsec)
            .select_shadow(
                &mut catalog,
                &mut shadows,
                &mut left,
                &mut right,
                1.0,
                &mut RngManager::new(3),
                &mut log,
            )
            .unwrap();
        assert_eq!(sel, Selection::GaveUp(GiveUpReason::EmptyPool));
        assert_eq!(shadows.rejected, vec![0]);
        assert_eq!(catalog.get(0).status, InteractionStatus::KineFail);
        assert_eq!(catalog.get(0).id, -1);
        assert!(!left.dipole(DipoleId(0)).interacted);
    }
}
