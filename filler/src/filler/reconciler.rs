//! Error reconciler
//!
//! Last pass over the merged state before strings are extracted. Every live
//! parton in the colour flow is checked, in order, for
//!
//! 1. zero transverse momentum
//! 2. zero light-cone momentum
//! 3. non-finite transverse momentum
//! 4. non-finite light-cone momentum
//! 5. negative light-cone momentum
//! 6. a mass-shell mismatch above [`ONSHELL_TOLERANCE`]
//!
//! and repaired in place. Replacement values are small random momenta drawn
//! from the event's [`RngManager`]. A parton that passes all checks is left
//! untouched, so a second pass over a repaired state changes nothing.

use crate::error::FillerWarning;
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent};
use crate::kinematics::{Vec2, ONSHELL_TOLERANCE};
use crate::models::{DipoleState, Parton, PartonId};
use crate::rng::RngManager;

/// Repairs unphysical parton momenta
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReconciler;

impl ErrorReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Repair every parton of `state`
    ///
    /// # Returns
    ///
    /// Number of repairs made
    pub fn dodge_errors(
        &self,
        state: &mut DipoleState,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> usize {
        let ids: Vec<PartonId> = state
            .partons()
            .filter(|(_, p)| p.n_dipoles() > 0)
            .map(|(id, _)| id)
            .collect();

        let mut repairs = 0;
        for id in ids {
            for reason in Self::repair(state.parton_mut(id), rng) {
                log::warn!("repaired parton {}: {}", id.0, reason);
                sink.record(FillerEvent::Warning(FillerWarning::UnphysicalParton {
                    parton: id.0,
                    reason: reason.to_string(),
                }));
                sink.record(FillerEvent::Repair {
                    parton: id.0,
                    reason: reason.to_string(),
                });
                repairs += 1;
            }
        }
        repairs
    }

    fn random_pt(rng: &mut RngManager) -> Vec2 {
        Vec2::new(rng.next_positive(), rng.next_positive())
    }

    fn random_light_cone(p: &mut Parton, rng: &mut RngManager) {
        p.minus = rng.next_positive();
        p.plus = rng.next_positive();
    }

    /// Repair one parton; returns what was wrong with it
    fn repair(p: &mut Parton, rng: &mut RngManager) -> Vec<&'static str> {
        let mut fixed = Vec::new();

        if p.pt.is_zero() {
            p.pt = Self::random_pt(rng);
            fixed.push("zero transverse momentum");
        }
        if p.plus == 0.0 || p.minus == 0.0 {
            Self::random_light_cone(p, rng);
            fixed.push("zero light-cone momentum");
        }
        if !p.pt.is_finite() {
            p.pt = Self::random_pt(rng);
            fixed.push("non-finite transverse momentum");
        }
        if !p.plus.is_finite() || !p.minus.is_finite() {
            Self::random_light_cone(p, rng);
            fixed.push("non-finite light-cone momentum");
        }
        if p.plus < 0.0 || p.minus < 0.0 {
            Self::random_light_cone(p, rng);
            fixed.push("negative light-cone momentum");
        }

        if p.off_shellness().abs() > ONSHELL_TOLERANCE {
            let m2 = p.mass * p.mass;
            let pp = p.plus * p.minus;
            if pp <= m2 {
                let ratio = if m2 > 0.0 { 2.0 * m2 / pp } else { 2.0 };
                p.plus *= ratio.sqrt();
                p.minus *= ratio.sqrt();
                fixed.push("insufficient energy for mass");
            }
            let scale = (p.plus * p.minus - m2).sqrt() / p.pt.pt();
            p.pt = p.pt * scale;
            fixed.push("off shell");
        }
        fixed
    }
}
