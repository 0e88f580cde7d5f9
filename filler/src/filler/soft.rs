//! Soft-gluon removal
//!
//! Last clean-up before strings are extracted. Each gluon is weighed by the
//! invariant transverse momentum it carries relative to its two colour
//! neighbours,
//!
//! ```text
//! pT² = s₁₂ · s₂₃ / s₁₂₃
//! ```
//!
//! and a gluon below [`FillerConfig::pt2_cut`] is absorbed: its momentum is
//! shared between the neighbours, which stay on their mass shells, and the
//! gluon leaves the colour flow. Strings are swept until nothing changes.
//!
//! A neighbour pair that is already collinear with the gluon simply takes
//! it over. Otherwise the three momenta are boosted to their rest frame and
//! redistributed as a two-body system. The direction of the new pair
//! interpolates between the two neighbours' directions: a quark next to a
//! gluon keeps its direction, two partons of the same kind share the recoil
//! according to their energies.

use crate::error::FillerWarning;
use crate::filler::config::{FillerConfig, SoftRemove};
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent};
use crate::kinematics::FourMomentum;
use crate::models::{DipoleState, Parton, PartonId};

/// New momenta of the two neighbours of a removed gluon
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Absorption {
    /// The gluon was collinear with the first neighbour
    IntoFirst(FourMomentum),
    /// The gluon was collinear with the second neighbour
    IntoSecond(FourMomentum),
    /// Exact redistribution over both neighbours
    Shared(FourMomentum, FourMomentum),
}

/// What one pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftRemoval {
    pub removed: usize,

    /// Removals through a collinear merge, which conserves momentum only
    /// up to the merged pair's small mass
    pub collinear: usize,
}

/// Removes gluons below the configured invariant pt² from the final state
#[derive(Debug, Clone, Copy)]
pub struct SoftGluonRemover {
    pt2_cut: f64,
    mode: SoftRemove,
}

impl SoftGluonRemover {
    pub fn new(pt2_cut: f64, mode: SoftRemove) -> Self {
        Self { pt2_cut, mode }
    }

    pub fn from_config(config: &FillerConfig) -> Self {
        Self::new(config.pt2_cut, config.soft_remove)
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != SoftRemove::Off && self.pt2_cut > 0.0
    }

    /// Invariant pt² of `p2` between `p1` and `p3`
    ///
    /// Negative (`-1`) when one of the pair masses is space-like, which
    /// always falls below the cut.
    ///
    /// # Errors
    ///
    /// [`FillerWarning::SpaceLikeGluons`] if the three momenta together are
    /// lighter than the two outer masses.
    pub fn inv_pt2(p1: &Parton, p2: &Parton, p3: &Parton) -> Result<f64, FillerWarning> {
        let (q1, q2, q3) = (p1.momentum(), p2.momentum(), p3.momentum());
        let s = (q1 + q2 + q3).m2();
        let threshold = (p1.mass + p3.mass).powi(2);
        if !(s >= threshold) {
            return Err(FillerWarning::SpaceLikeGluons(format!(
                "three neighbouring partons have s = {:.6e} below (m1 + m3)^2 = {:.6e}",
                s, threshold
            )));
        }
        let s12 = (q1 + q2).m2();
        let s23 = (q2 + q3).m2();
        if s12 < 0.0 || s23 < 0.0 {
            return Ok(-1.0);
        }
        Ok(s12 * s23 / s)
    }

    /// Momenta of `p1` and `p3` after absorbing `p2`
    ///
    /// `None` if the three momenta cannot be shared between the two masses.
    pub fn absorb_gluon(p1: &Parton, p2: &Parton, p3: &Parton) -> Option<Absorption> {
        let (q1, q2, q3) = (p1.momentum(), p2.momentum(), p3.momentum());

        let merged = q1 + q2;
        if merged.m2() < collinear_limit(&merged) {
            return Some(Absorption::IntoFirst(merged));
        }
        let merged = q3 + q2;
        if merged.m2() < collinear_limit(&merged) {
            return Some(Absorption::IntoSecond(merged));
        }

        let total = q1 + q2 + q3;
        let s = total.m2();
        if !(s > 0.0) {
            return None;
        }
        let w = s.sqrt();
        let (m1, m3) = (p1.mass, p3.mass);
        let lambda = (s - (m1 + m3).powi(2)) * (s - (m1 - m3).powi(2));
        if lambda < 0.0 {
            return None;
        }

        let to_cm = total.velocity().map(|v| -v);
        let c1 = q1.boost(to_cm);
        let c3 = q3.boost(to_cm);

        let n1 = unit(c1.vector())?;
        let n3 = unit(c3.vector().map(|v| -v)).unwrap_or(n1);
        let psi = dot(&n1, &n3).clamp(-1.0, 1.0).acos();
        let beta = match (p1.is_gluon(), p3.is_gluon()) {
            (true, false) => psi,
            (false, true) => 0.0,
            _ => {
                let x1 = 2.0 * c1.e / w;
                let x3 = 2.0 * c3.e / w;
                psi * x3 * x3 / (x1 * x1 + x3 * x3)
            }
        };

        // rotate n1 towards n3 by beta, inside the plane they span
        let perp = [
            n3[0] - dot(&n1, &n3) * n1[0],
            n3[1] - dot(&n1, &n3) * n1[1],
            n3[2] - dot(&n1, &n3) * n1[2],
        ];
        let axis = match unit(perp) {
            Some(u) => {
                let (sb, cb) = beta.sin_cos();
                [
                    cb * n1[0] + sb * u[0],
                    cb * n1[1] + sb * u[1],
                    cb * n1[2] + sb * u[2],
                ]
            }
            None => n1,
        };

        let q = lambda.sqrt() / (2.0 * w);
        let e1 = (s + m1 * m1 - m3 * m3) / (2.0 * w);
        let n1_cm = FourMomentum::new(e1, q * axis[0], q * axis[1], q * axis[2]);
        let n3_cm = FourMomentum::new(w - e1, -q * axis[0], -q * axis[1], -q * axis[2]);
        let back = total.velocity();
        Some(Absorption::Shared(n1_cm.boost(back), n3_cm.boost(back)))
    }

    /// Sweep every colour string of `state` until no gluon is below the cut
    pub fn remove(&self, state: &mut DipoleState, sink: &mut dyn DiagnosticsSink) -> SoftRemoval {
        let mut summary = SoftRemoval::default();
        if !self.is_enabled() {
            return summary;
        }
        for string in state.strings() {
            if string.len() > 2 {
                self.sweep(state, &string.ids, string.closed, &mut summary, sink);
            }
        }
        if summary.removed > 0 {
            log::debug!(
                "removed {} soft gluons ({} collinear)",
                summary.removed,
                summary.collinear
            );
        }
        summary
    }

    fn sweep(
        &self,
        state: &mut DipoleState,
        ids: &[PartonId],
        closed: bool,
        summary: &mut SoftRemoval,
        sink: &mut dyn DiagnosticsSink,
    ) {
        let n = ids.len();
        let mut removed = vec![false; n];
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..n {
                if removed[i] {
                    continue;
                }
                let p2 = state.parton(ids[i]);
                if !p2.is_gluon() || (p2.valence && self.mode == SoftRemove::NoValence) {
                    continue;
                }
                let Some((i1, i3)) = neighbours(&removed, i, closed) else {
                    continue;
                };
                let (p1, p3) = (state.parton(ids[i1]), state.parton(ids[i3]));

                let pt2 = match Self::inv_pt2(p1, p2, p3) {
                    Ok(pt2) => pt2,
                    Err(w) => {
                        log::warn!("keeping gluon {}: {}", ids[i].0, w);
                        sink.record(FillerEvent::Warning(w));
                        continue;
                    }
                };
                if pt2 >= self.pt2_cut {
                    continue;
                }

                let Some(absorption) = Self::absorb_gluon(p1, p2, p3) else {
                    let w = FillerWarning::SpaceLikeGluons(format!(
                        "gluon {} cannot be shared between partons {} and {}",
                        ids[i].0, ids[i1].0, ids[i3].0
                    ));
                    log::warn!("keeping gluon {}: {}", ids[i].0, w);
                    sink.record(FillerEvent::Warning(w));
                    continue;
                };
                match absorption {
                    Absorption::IntoFirst(p) => {
                        take_over(state.parton_mut(ids[i1]), &p);
                        summary.collinear += 1;
                    }
                    Absorption::IntoSecond(p) => {
                        take_over(state.parton_mut(ids[i3]), &p);
                        summary.collinear += 1;
                    }
                    Absorption::Shared(a, b) => {
                        state.parton_mut(ids[i1]).set_momentum(&a);
                        state.parton_mut(ids[i3]).set_momentum(&b);
                    }
                }
                state.absorb(ids[i]);
                log::trace!("gluon {} with pt2 {:.4e} absorbed", ids[i].0, pt2);
                sink.record(FillerEvent::SoftGluonRemoved { parton: ids[i].0 });
                summary.removed += 1;
                removed[i] = true;
                changed = true;
            }
        }
    }
}

/// Positions of the nearest live neighbours of `i`; open strings do not
/// wrap around
fn neighbours(removed: &[bool], i: usize, closed: bool) -> Option<(usize, usize)> {
    let n = removed.len();
    let step = |from: usize, forward: bool| -> Option<usize> {
        let mut j = from;
        loop {
            j = if forward {
                if j + 1 == n {
                    if !closed {
                        return None;
                    }
                    0
                } else {
                    j + 1
                }
            } else if j == 0 {
                if !closed {
                    return None;
                }
                n - 1
            } else {
                j - 1
            };
            if j == from {
                return None;
            }
            if !removed[j] {
                return Some(j);
            }
        }
    };
    let i1 = step(i, false)?;
    let i3 = step(i, true)?;
    (i1 != i3).then_some((i1, i3))
}

/// A collinear merge keeps plus and pt; minus follows from the mass shell
fn take_over(p: &mut Parton, merged: &FourMomentum) {
    p.plus = merged.plus();
    p.pt = merged.pt();
    p.update_minus();
}

fn collinear_limit(p: &FourMomentum) -> f64 {
    f64::EPSILON * 1000.0 * p.e * p.e
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn unit(v: [f64; 3]) -> Option<[f64; 3]> {
    let norm = dot(&v, &v).sqrt();
    (norm > 1e-12).then(|| v.map(|c| c / norm))
}
