//! Recoil control
//!
//! Replays the recoils of every accepted interaction on the real-parton
//! overlays and lets the cross section veto them one by one.

use crate::collaborators::CrossSection;
use crate::models::{DipoleInteraction, DipoleState, ImpactParameters, InteractionRecoil};
use crate::real_state::RealPartonState;

/// Applies and validates the recoils of an accepted interaction set
pub struct RecoilController<'a> {
    xsec: &'a dyn CrossSection,
}

impl<'a> RecoilController<'a> {
    pub fn new(xsec: &'a dyn CrossSection) -> Self {
        Self { xsec }
    }

    /// Recoil of one interaction, given which endpoints interact
    pub fn recoil_for(
        &self,
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
    ) -> InteractionRecoil {
        if inter.norec {
            return InteractionRecoil::zero();
        }
        self.xsec.recoil(left, right, b, inter.dips, &inter.does_int)
    }

    /// Re-apply the recoils of `accepted`, in order, from the overlays' base
    /// transverse momenta
    ///
    /// An interaction the cross section vetoes keeps its transverse momenta
    /// unchanged and has its contribution taken out of both total recoils;
    /// the rest of the set is still applied.
    ///
    /// # Returns
    ///
    /// `false` if the last interaction of `accepted` was vetoed
    pub fn control_recoils(
        &self,
        accepted: &[&DipoleInteraction],
        left: &DipoleState,
        right: &DipoleState,
        lrs: &mut RealPartonState,
        rrs: &mut RealPartonState,
        b: &ImpactParameters,
    ) -> bool {
        lrs.reset_recoils();
        rrs.reset_recoils();

        let mut last_ok = true;
        for (n, inter) in accepted.iter().enumerate() {
            let rec = self.recoil_for(inter, left, right, b);
            let ok = self.xsec.do_interaction(&rec, inter, left, right, lrs, rrs, b);
            if !ok {
                log::trace!(
                    "recoil of interaction {} ({} of {}) vetoed",
                    inter.index,
                    n + 1,
                    accepted.len()
                );
                lrs.remove_total_recoil(rec.left_total());
                rrs.remove_total_recoil(rec.right_total());
            }
            last_ok = ok;
        }
        last_ok
    }
}
