//! Standard dipole–dipole cross section
//!
//! Two-gluon exchange between dipoles `(x1, x2)` and `(y3, y4)`:
//!
//! ```text
//! f  = (α_s² / 2) · ln²( r13·r24 / (r14·r23) )
//! f2 = 2·f
//! ```
//!
//! Only the closest left/right parton pair exchanges momentum. The recoil on
//! a left parton `x_i` from a right parton `y_j` is `(x_i − y_j)/|x_i − y_j|²`
//! and the right parton receives the opposite.

use crate::collaborators::CrossSection;
use crate::kinematics::{Point, Vec2};
use crate::models::{
    DipoleId, DipoleInteraction, DipoleState, DoesInt, ImpactParameters, InteractionRecoil,
    PartonId,
};
use crate::real_state::RealPartonState;
use std::collections::BTreeSet;

/// Reference cross-section model
#[derive(Debug, Clone, PartialEq)]
pub struct StandardXSec {
    alpha_s: f64,
}

/// Endpoints of a left and a right dipole in the collision frame
struct Endpoints {
    left: (PartonId, PartonId),
    right: (PartonId, PartonId),
    x: [Point; 2],
    y: [Point; 2],
}

impl StandardXSec {
    pub fn new(alpha_s: f64) -> Self {
        Self { alpha_s }
    }

    pub fn alpha_s(&self) -> f64 {
        self.alpha_s
    }

    fn endpoints(
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
        dips: (DipoleId, DipoleId),
    ) -> Endpoints {
        let l = left.dipole(dips.0).partons;
        let r = right.dipole(dips.1).partons;
        Endpoints {
            left: l,
            right: r,
            x: [left.parton(l.0).position, left.parton(l.1).position],
            y: [
                b.apply(&right.parton(r.0).position),
                b.apply(&right.parton(r.1).position),
            ],
        }
    }

    /// Single-exchange amplitude `f` (not yet doubled)
    pub fn amplitude(&self, x: &[Point; 2], y: &[Point; 2]) -> f64 {
        let r13 = x[0].distance(&y[0]);
        let r24 = x[1].distance(&y[1]);
        let r14 = x[0].distance(&y[1]);
        let r23 = x[1].distance(&y[0]);
        let den = r14 * r23;
        let num = r13 * r24;
        if den <= 0.0 || num <= 0.0 {
            return 0.0;
        }
        let l = (num / den).ln();
        let f = 0.5 * self.alpha_s * self.alpha_s * l * l;
        if f.is_finite() {
            f
        } else {
            0.0
        }
    }

    /// Indices (left, right) of the closest endpoint pair
    fn closest(x: &[Point; 2], y: &[Point; 2]) -> (usize, usize) {
        let mut best = (0, 0);
        let mut dmin = f64::INFINITY;
        for (i, xi) in x.iter().enumerate() {
            for (j, yj) in y.iter().enumerate() {
                let d = xi.distance2(yj);
                if d < dmin {
                    dmin = d;
                    best = (i, j);
                }
            }
        }
        best
    }

    fn pair_recoil(x: &Point, y: &Point) -> Vec2 {
        let d = *x - *y;
        let r2 = d.pt2();
        if r2 > 0.0 {
            d * (1.0 / r2)
        } else {
            Vec2::ZERO
        }
    }
}

fn pick<T: Copy>(pair: (T, T), i: usize) -> T {
    if i == 0 {
        pair.0
    } else {
        pair.1
    }
}

impl CrossSection for StandardXSec {
    fn flist(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
    ) -> Vec<DipoleInteraction> {
        let mut out = Vec::new();
        for (ld, _) in left.active_dipoles() {
            for (rd, _) in right.active_dipoles() {
                let ends = Self::endpoints(left, right, b, (ld, rd));
                let f2 = 2.0 * self.amplitude(&ends.x, &ends.y);
                let (i, j) = Self::closest(&ends.x, &ends.y);
                let mut inter = DipoleInteraction::new(
                    out.len(),
                    (ld, rd),
                    (pick(ends.left, i), pick(ends.right, j)),
                );
                inter.f2 = f2;
                inter.uf2 = self.unitarize(f2);
                inter.does_int = self.does_int(left, right, (ld, rd), b);
                let rec = Self::pair_recoil(&ends.x[i], &ends.y[j]);
                inter.recoil = rec;
                inter.partner_recoil = b.inv_rotate_pt(&-rec);
                out.push(inter);
            }
        }
        out
    }

    fn does_int(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        dips: (DipoleId, DipoleId),
        b: &ImpactParameters,
    ) -> DoesInt {
        let ends = Self::endpoints(left, right, b, dips);
        let (i, j) = Self::closest(&ends.x, &ends.y);
        DoesInt {
            left: (i == 0, i == 1),
            right: (j == 0, j == 1),
        }
    }

    fn recoil(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
        dips: (DipoleId, DipoleId),
        does: &DoesInt,
    ) -> InteractionRecoil {
        let ends = Self::endpoints(left, right, b, dips);
        let lflags = [does.left.0, does.left.1];
        let rflags = [does.right.0, does.right.1];
        let mut lrec = [Vec2::ZERO; 2];
        let mut rrec = [Vec2::ZERO; 2];
        for i in 0..2 {
            for j in 0..2 {
                if lflags[i] && rflags[j] {
                    let d = Self::pair_recoil(&ends.x[i], &ends.y[j]);
                    lrec[i] += d;
                    rrec[j] -= d;
                }
            }
        }
        InteractionRecoil {
            left: (lrec[0], lrec[1]),
            right: (b.inv_rotate_pt(&rrec[0]), b.inv_rotate_pt(&rrec[1])),
        }
    }

    fn do_interaction(
        &self,
        recoil: &InteractionRecoil,
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
        lrs: &mut RealPartonState,
        rrs: &mut RealPartonState,
        _b: &ImpactParameters,
    ) -> bool {
        let (la, lb) = left.dipole(inter.dips.0).partons;
        let (ra, rb) = right.dipole(inter.dips.1).partons;

        let mut applied_left = Vec::new();
        for (p, r) in [(la, recoil.left.0), (lb, recoil.left.1)] {
            if !r.is_zero() && lrs.apply_recoil(p, r) {
                applied_left.push((p, r));
            }
        }
        let mut applied_right = Vec::new();
        for (p, r) in [(ra, recoil.right.0), (rb, recoil.right.1)] {
            if !r.is_zero() && rrs.apply_recoil(p, r) {
                applied_right.push((p, r));
            }
        }

        let ok = lrs.total_minus() <= rrs.total_plus() && rrs.total_minus() <= lrs.total_plus();
        if !ok {
            for (p, r) in applied_left {
                lrs.shift_pt(p, -r);
            }
            for (p, r) in applied_right {
                rrs.shift_pt(p, -r);
            }
        }
        ok
    }

    fn interact(&self, left: &mut DipoleState, right: &mut DipoleState, inter: &DipoleInteraction) {
        let (la, lb) = left.dipole(inter.dips.0).partons;
        let (ra, rb) = right.dipole(inter.dips.1).partons;
        left.dipole_mut(inter.dips.0).interacted = true;
        right.dipole_mut(inter.dips.1).interacted = true;

        let does = inter.does_int;
        if does.left.0 {
            left.mark_interacted(la);
        }
        if does.left.1 {
            left.mark_interacted(lb);
        }
        if does.right.0 {
            right.mark_interacted(ra);
        }
        if does.right.1 {
            right.mark_interacted(rb);
        }
    }

    fn colour_exchanges(
        &self,
        lrs: &RealPartonState,
        rrs: &RealPartonState,
        left: &DipoleState,
        right: &DipoleState,
    ) -> Vec<(DipoleId, DipoleId)> {
        let mut used_left = BTreeSet::new();
        let mut used_right = BTreeSet::new();
        let mut out = Vec::new();
        for (ld, rd) in lrs.interactions().iter().zip(rrs.interactions()) {
            if !left.dipole(*ld).active || !right.dipole(*rd).active {
                continue;
            }
            if used_left.contains(ld) || used_right.contains(rd) {
                continue;
            }
            used_left.insert(*ld);
            used_right.insert(*rd);
            out.push((*ld, *rd));
        }
        out
    }
}
