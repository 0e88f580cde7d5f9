//! Final State Assembler
//!
//! Turns two cascades with a committed interaction set into colour strings.
//!
//! # Generic pipeline
//!
//! 1. Remove virtual partons from both cascades (colour only)
//! 2. Fold virtual momenta into real ancestors, save
//! 3. Split off recoilers, save
//! 4. Balance light-cone momentum with a longitudinal boost of each side
//! 5. Translate and mirror the right cascade, merge it into the left
//! 6. Reconnect the dipoles picked by the cross section
//! 7. Remove virtual partons from the merged state
//! 8. Final-state swings in rapidity windows
//! 9. Valence charge normalisation
//! 10. Restore colour flow of non-participating nucleons
//! 11. Error reconciliation
//! 12. Soft-gluon removal
//! 13. String extraction
//!
//! # Shadow pipeline
//!
//! The accepted set is validated once more in final mode, which puts the
//! relevant partons on shell, then the cascades are merged and the same
//! clean-up steps follow. The on-shell momentum is compared with the value
//! at merge time after every step.

use crate::collaborators::{Absorber, CheckMode, CrossSection, ShadowModel, Swinger};
use crate::error::{FillerError, FillerWarning, Outcome};
use crate::filler::catalog::InteractionCatalog;
use crate::filler::config::FillerConfig;
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent};
use crate::filler::reconciler::ErrorReconciler;
use crate::filler::selector::recheck;
use crate::filler::soft::SoftGluonRemover;
use crate::models::{ColourString, DipoleState, ImpactParameters, PartonId};
use crate::real_state::RealPartonState;
use crate::rng::RngManager;

/// Boost the two sides so that the kept partons carry `sqrt_s` in both
/// light-cone directions
///
/// The left side's plus is scaled by `x`, the right side's own plus by `y`
/// (minus by the inverses). `x` and `y` solve
///
/// ```text
/// x·L⁺ + R⁺/y = √s
/// L⁻/x + y·R⁻ = √s
/// ```
///
/// with `R⁺`, `R⁻` the right side's totals seen from the collision frame.
///
/// # Returns
///
/// The factors `(x, y)`, or a [`FillerWarning::NoBoostSolution`] with the
/// overlays untouched if no positive solution exists.
pub fn fix_boost(lrs: &mut RealPartonState, rrs: &mut RealPartonState, sqrt_s: f64) -> Outcome<(f64, f64)> {
    let (left_plus, left_minus) = lrs.light_cone_totals();
    let (own_plus, own_minus) = rrs.light_cone_totals();
    let right_plus = own_minus;
    let right_minus = own_plus;

    let a = (left_plus * left_minus - right_plus * right_minus - sqrt_s * sqrt_s)
        / (2.0 * right_minus * sqrt_s);
    let b = right_plus / right_minus;

    let mut x = -1.0;
    let mut y = -1.0;
    if a * a - b > 0.0 {
        y = -a + (a * a - b).sqrt();
        x = (y * sqrt_s - right_plus) / (y * left_plus);
    }

    if !(x > 0.0 && y > 0.0 && x.is_finite() && y.is_finite()) {
        log::warn!(
            "boost equation has no positive solution (A^2 = {}, B = {}), momentum left unbalanced",
            a * a,
            b
        );
        return Outcome::Warning((1.0, 1.0), FillerWarning::NoBoostSolution { a2: a * a, b });
    }

    lrs.boost(x);
    rrs.boost(y);
    Outcome::Ok((x, y))
}

/// Builds the final state of one event
pub struct FinalStateAssembler<'a> {
    config: &'a FillerConfig,
    xsec: &'a dyn CrossSection,
    absorber: &'a dyn Absorber,
    swinger: &'a dyn Swinger,
}

impl<'a> FinalStateAssembler<'a> {
    pub fn new(
        config: &'a FillerConfig,
        xsec: &'a dyn CrossSection,
        absorber: &'a dyn Absorber,
        swinger: &'a dyn Swinger,
    ) -> Self {
        Self {
            config,
            xsec,
            absorber,
            swinger,
        }
    }

    /// Take every off-shell parton out of the colour flow
    ///
    /// A chain that would be left with fewer than two on-shell partons is
    /// first swung with some other chain.
    ///
    /// # Returns
    ///
    /// Number of partons removed
    pub fn remove_virtuals(&self, state: &mut DipoleState) -> usize {
        let virtuals: Vec<PartonId> = state
            .partons()
            .filter(|(_, p)| !p.on_shell)
            .map(|(id, _)| id)
            .collect();

        let mut removed = 0;
        for id in virtuals {
            let p = state.parton(id);
            if p.absorbed || p.on_shell {
                continue;
            }
            if state.n_on_shell_in_chain(id) < 2 {
                if let Some(d) = p.dipoles.0.or(p.dipoles.1) {
                    self.absorber.swing_loop(state, d);
                }
            }
            self.absorber.remove_parton(state, id);
            removed += 1;
        }
        removed
    }

    /// Final-state swings over `[0, fs_swing_time)` in steps of
    /// `fs_swing_time_step`
    pub fn final_state_swings(&self, state: &mut DipoleState, rng: &mut RngManager) -> usize {
        let step = self.config.fs_swing_time_step;
        let mut swings = 0;
        let mut n = 0usize;
        loop {
            let y = n as f64 * step;
            if y >= self.config.fs_swing_time {
                break;
            }
            swings += state.swing_fs(y, y + step, self.swinger, rng);
            n += 1;
        }
        swings
    }

    fn check_momentum(
        &self,
        state: &DipoleState,
        step: &str,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<(), FillerError> {
        if let Outcome::Warning((), w) = state.check_fs_momentum(self.config.momentum_tolerance) {
            if self.config.check_momentum {
                return Err(FillerError::Consistency(format!("after {}: {}", step, w)));
            }
            log::warn!("after {}: {}", step, w);
            sink.record(FillerEvent::Warning(w));
        }
        Ok(())
    }

    /// Steps 9 to 13, shared by both pipelines
    fn finish(
        &self,
        state: &mut DipoleState,
        check_every_step: bool,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<ColourString>, FillerError> {
        let swings = state.normalise_valence_charge(self.config.valence_charge_normalisation);
        log::trace!("valence charge normalisation made {} swings", swings);
        if check_every_step {
            self.check_momentum(state, "valence charge normalisation", sink)?;
        }

        let swings = state.restore_nonparticipants();
        log::trace!("restored colour flow with {} swings", swings);
        if check_every_step {
            self.check_momentum(state, "restoring non-participants", sink)?;
        }

        let repairs = ErrorReconciler::new().dodge_errors(state, rng, sink);
        if repairs > 0 {
            state.reset_fs_reference();
        }
        if check_every_step {
            self.check_momentum(state, "error reconciliation", sink)?;
        }

        let removal = SoftGluonRemover::from_config(self.config).remove(state, sink);
        if removal.collinear > 0 {
            state.reset_fs_reference();
        }
        if check_every_step && removal.removed > 0 {
            self.check_momentum(state, "soft-gluon removal", sink)?;
        }

        let strings = state.strings();
        sink.record(FillerEvent::StringsExtracted {
            strings: strings.len(),
            partons: strings.iter().map(ColourString::len).sum(),
        });
        Ok(strings)
    }

    /// Generic pipeline
    ///
    /// `right` is consumed; the merged state is left in `left`.
    #[allow(clippy::too_many_arguments)]
    pub fn extract_strings(
        &self,
        left: &mut DipoleState,
        mut right: DipoleState,
        lrs: &mut RealPartonState,
        rrs: &mut RealPartonState,
        b: &ImpactParameters,
        sqrt_s: f64,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<ColourString>, FillerError> {
        self.remove_virtuals(left);
        self.remove_virtuals(&mut right);

        let folded = lrs.merge_virtuals(left) + rrs.merge_virtuals(&right);
        lrs.save_state(left);
        rrs.save_state(&mut right);
        log::trace!("folded {} virtual partons", folded);

        let recoilers = lrs.add_recoilers(left) + rrs.add_recoilers(&mut right);
        lrs.save_state(left);
        rrs.save_state(&mut right);
        log::trace!("added {} recoilers", recoilers);

        if let (_, Some(w)) = fix_boost(lrs, rrs, sqrt_s).into_parts() {
            sink.record(FillerEvent::Warning(w));
        }
        lrs.save_state(left);
        rrs.save_state(&mut right);

        let exchanges = self.xsec.colour_exchanges(lrs, rrs, left, &right);
        right.translate(b);
        right.mirror(0.0);
        let offsets = left.merge(right);

        for (ld, rd) in exchanges {
            if !self.xsec.reconnect(left, ld, offsets.dipole(rd)) {
                log::debug!("reconnection of dipoles {} and {} refused", ld.0, rd.0);
            }
        }

        self.remove_virtuals(left);
        if self.config.check_momentum {
            self.check_momentum(left, "merging", sink)?;
        }

        let swings = self.final_state_swings(left, rng);
        log::trace!("final-state swings: {}", swings);

        self.finish(left, self.config.check_momentum, rng, sink)
    }

    /// Shadow pipeline
    ///
    /// # Errors
    ///
    /// [`FillerError::Consistency`] if the accepted set fails the final
    /// recheck, or, with `check_momentum` set, if any step changes the
    /// on-shell momentum.
    #[allow(clippy::too_many_arguments)]
    pub fn extract_shadow_strings(
        &self,
        left: &mut DipoleState,
        mut right: DipoleState,
        catalog: &mut InteractionCatalog,
        accepted: &[usize],
        shadows: &mut dyn ShadowModel,
        b: &ImpactParameters,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<Vec<ColourString>, FillerError> {
        if let Err(status) = recheck(shadows, catalog, accepted, CheckMode::Final, left, &mut right) {
            return Err(FillerError::Consistency(format!(
                "accepted interactions fail the final check ({:?})",
                status
            )));
        }
        shadows.finalize(left, &mut right);

        right.translate(b);
        right.mirror(0.0);
        let offsets = left.merge(right);
        self.check_momentum(left, "merging", sink)?;

        for &i in accepted {
            let (ld, rd) = catalog.get(i).dips;
            if !self.xsec.reconnect(left, ld, offsets.dipole(rd)) {
                log::debug!("reconnection of dipoles {} and {} refused", ld.0, rd.0);
            }
        }
        self.check_momentum(left, "reconnection", sink)?;

        self.remove_virtuals(left);
        self.check_momentum(left, "removing virtuals", sink)?;

        self.finish(left, true, rng, sink)
    }
}
