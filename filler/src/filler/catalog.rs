//! Interaction catalog
//!
//! Builds the candidate list for one event, accumulates the raw and
//! unitarised amplitude sums, and ranks the candidates for the selector.
//!
//! # Example
//!
//! ```rust
//! use dipsy_filler_core_rs::filler::InteractionCatalog;
//!
//! // Σu = 0.6, P = 0.5: a candidate with p = 0.2 is kept with probability
//! // 0.2 · (0.6/0.5 − 1) / (0.6 − 0.2) = 0.1
//! let b = InteractionCatalog::correct(0.5, 0.6, 0.2);
//! assert!((b - 0.1).abs() < 1e-12);
//! ```

use crate::collaborators::{CrossSection, ShadowModel};
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent};
use crate::models::{
    DipoleInteraction, DipoleState, DoesInt, ImpactParameters, InteractionStatus,
};

/// Candidates of one event, with their amplitude sums
#[derive(Debug, Clone, Default)]
pub struct InteractionCatalog {
    candidates: Vec<DipoleInteraction>,

    /// Indices of candidates that may interact, in list order
    eligible: Vec<usize>,

    sum_f: f64,
    sum_u: f64,
    probability: f64,
}

impl InteractionCatalog {
    /// Catalog for the generic path
    ///
    /// Every candidate with a positive amplitude is eligible; candidates are
    /// ranked by the largest recoil any of the four dipole ends would take
    /// if all of them interacted.
    pub fn build(
        xsec: &dyn CrossSection,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
    ) -> Self {
        let mut candidates = xsec.flist(left, right, b);
        for (i, c) in candidates.iter_mut().enumerate() {
            c.index = i;
            c.order_key = xsec.recoil(left, right, b, c.dips, &DoesInt::all()).max_pt();
        }
        Self::from_candidates(xsec, candidates, |c| c.f2 > 0.0)
    }

    /// Catalog for cascades carrying shadows
    ///
    /// Every candidate with a positive amplitude is prepared on the shadow
    /// model; only those it accepts are eligible. Candidates keep list order.
    pub fn build_shadow(
        xsec: &dyn CrossSection,
        shadows: &mut dyn ShadowModel,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
        sink: &mut dyn DiagnosticsSink,
    ) -> Self {
        shadows.reset_shadows(left, right);
        let mut candidates = xsec.flist(left, right, b);
        for (i, c) in candidates.iter_mut().enumerate() {
            c.index = i;
            c.order_key = i as f64;
            if c.f2 > 0.0 {
                c.status = shadows.prepare(c, left, right);
                sink.record(FillerEvent::CandidateStatus { status: c.status });
            }
        }
        Self::from_candidates(xsec, candidates, |c| {
            c.f2 > 0.0 && c.status == InteractionStatus::Accepted
        })
    }

    /// Wrap an already prepared candidate list
    pub fn from_candidates<F>(
        xsec: &dyn CrossSection,
        candidates: Vec<DipoleInteraction>,
        eligible: F,
    ) -> Self
    where
        F: Fn(&DipoleInteraction) -> bool,
    {
        let mut sum_f = 0.0;
        let mut sum_u = 0.0;
        let mut ids = Vec::new();
        for c in candidates.iter().filter(|c| eligible(c)) {
            sum_f += c.f2;
            sum_u += c.uf2;
            ids.push(c.index);
        }
        Self {
            candidates,
            eligible: ids,
            sum_f,
            sum_u,
            probability: xsec.unitarize(sum_f),
        }
    }

    pub fn candidates(&self) -> &[DipoleInteraction] {
        &self.candidates
    }

    pub fn candidates_mut(&mut self) -> &mut [DipoleInteraction] {
        &mut self.candidates
    }

    pub fn get(&self, index: usize) -> &DipoleInteraction {
        &self.candidates[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut DipoleInteraction {
        &mut self.candidates[index]
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn eligible(&self) -> &[usize] {
        &self.eligible
    }

    /// Σf over eligible candidates
    pub fn sum_f(&self) -> f64 {
        self.sum_f
    }

    /// Σu over eligible candidates
    pub fn sum_u(&self) -> f64 {
        self.sum_u
    }

    /// Probability that the two cascades interact at all
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Probability that a non-primary candidate with unitarised weight `p`
    /// joins the potential set
    pub fn corrected_probability(&self, p: f64) -> f64 {
        Self::correct(self.probability, self.sum_u, p)
    }

    /// `p·(Σu/P − 1)/(Σu − p)`, zero where the expression is degenerate
    pub fn correct(total: f64, sum_u: f64, p: f64) -> f64 {
        let den = sum_u - p;
        if den <= 0.0 || total <= 0.0 {
            return 0.0;
        }
        let b = p * (sum_u / total - 1.0) / den;
        if b.is_finite() {
            b.max(0.0)
        } else {
            0.0
        }
    }

    /// Sort candidate indices by rank
    pub fn rank(&self, ids: &mut [usize]) {
        ids.sort_by(|a, b| {
            let (ca, cb) = (&self.candidates[*a], &self.candidates[*b]);
            ca.order_key.total_cmp(&cb.order_key).then(a.cmp(b))
        });
    }

    /// Eligible candidates in rank order
    pub fn ordered(&self) -> Vec<usize> {
        let mut ids = self.eligible.clone();
        self.rank(&mut ids);
        ids
    }

    /// Sampler over eligible candidates, weighted by `uf2`
    pub fn primary_pool(&self) -> PrimaryPool {
        let mut pool = PrimaryPool::default();
        for i in &self.eligible {
            pool.insert(*i, self.candidates[*i].uf2);
        }
        pool
    }

    pub fn into_candidates(self) -> Vec<DipoleInteraction> {
        self.candidates
    }
}

/// Weighted sampler used to pick the primary interaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimaryPool {
    entries: Vec<(usize, f64)>,
    total: f64,
}

impl PrimaryPool {
    pub fn insert(&mut self, index: usize, weight: f64) {
        if weight > 0.0 {
            self.entries.push((index, weight));
            self.total += weight;
        }
    }

    pub fn remove(&mut self, index: usize) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(i, _)| *i != index);
        if self.entries.len() == before {
            return false;
        }
        self.total = self.entries.iter().map(|(_, w)| w).sum();
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.iter().any(|(i, _)| *i == index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry selected by a uniform number `r` in `[0, 1)`
    pub fn sample(&self, r: f64) -> Option<usize> {
        let mut target = r * self.total;
        for (i, w) in &self.entries {
            if target < *w {
                return Some(*i);
            }
            target -= w;
        }
        self.entries.last().map(|(i, _)| *i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::StandardXSec;
    use crate::kinematics::Vec2;
    use crate::models::{DipoleId, Parton, PartonId};

    fn candidate(index: usize, f2: f64, recoil: f64) -> DipoleInteraction {
        let mut c = DipoleInteraction::new(index, (DipoleId(index), DipoleId(0)), (PartonId(0), PartonId(0)));
        c.f2 = f2;
        c.uf2 = 1.0 - (-f2).exp();
        c.recoil = Vec2::new(recoil, 0.0);
        c.order_key = recoil;
        c
    }

    #[test]
    fn test_sums_skip_zero_amplitudes() {
        let xsec = StandardXSec::new(0.2);
        let cat = InteractionCatalog::from_candidates(
            &xsec,
            vec![candidate(0, 0.5, 1.0), candidate(1, 0.0, 0.5), candidate(2, 0.25, 2.0)],
            |c| c.f2 > 0.0,
        );
        assert_eq!(cat.eligible(), &[0, 2]);
        assert!((cat.sum_f() - 0.75).abs() < 1e-12);
        assert!((cat.probability() - (1.0 - (-0.75f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_ordered_by_key_then_index() {
        let xsec = StandardXSec::new(0.2);
        let cat = InteractionCatalog::from_candidates(
            &xsec,
            vec![candidate(0, 0.5, 2.0), candidate(1, 0.5, 1.0), candidate(2, 0.5, 1.0)],
            |c| c.f2 > 0.0,
        );
        assert_eq!(cat.ordered(), vec![1, 2, 0]);
    }

    fn dipole(state: &mut DipoleState, x1: (f64, f64), x2: (f64, f64)) {
        state.add_valence_dipole(
            Parton::new(2, 10.0, Vec2::new(0.5, 0.0), Vec2::new(x1.0, x1.1)),
            Parton::new(-2, 10.0, Vec2::new(-0.5, 0.0), Vec2::new(x2.0, x2.1)),
        );
    }

    #[test]
    fn test_rank_uses_all_four_endpoints() {
        let xsec = StandardXSec::new(0.2);
        let mut left = DipoleState::new(1.0);
        // closest pair 1.0 apart, largest endpoint recoil about 1.02
        dipole(&mut left, (0.0, 1.0), (10.0, 1.5));
        // closest pair 1.2 apart, but the right quark takes about 1.60
        dipole(&mut left, (0.0, 1.2), (0.0, 1.3));
        let mut right = DipoleState::new(1.0);
        dipole(&mut right, (0.0, 0.0), (10.0, 0.0));

        let cat = InteractionCatalog::build(&xsec, &left, &right, &ImpactParameters::central());
        assert_eq!(cat.eligible(), &[0, 1]);
        // the closest-pair recoil alone would put candidate 1 first
        assert!(cat.get(1).recoil.pt() < cat.get(0).recoil.pt());
        assert!((cat.get(0).order_key - 1.0194).abs() < 1e-3);
        assert!((cat.get(1).order_key - 1.6026).abs() < 1e-3);
        assert_eq!(cat.ordered(), vec![0, 1]);
    }

    #[test]
    fn test_corrected_probability_degenerate() {
        // a single candidate has Σu − p = 0
        assert_eq!(InteractionCatalog::correct(0.5, 0.5, 0.5), 0.0);
        assert_eq!(InteractionCatalog::correct(0.0, 0.5, 0.1), 0.0);
    }

    #[test]
    fn test_pool_sampling_and_removal() {
        let mut pool = PrimaryPool::default();
        pool.insert(3, 1.0);
        pool.insert(7, 3.0);
        pool.insert(9, 0.0);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.sample(0.1), Some(3));
        assert_eq!(pool.sample(0.5), Some(7));
        assert!(pool.remove(7));
        assert!(!pool.remove(7));
        assert_eq!(pool.sample(0.99), Some(3));
        assert!(pool.remove(3));
        assert!(pool.is_empty());
        assert_eq!(pool.sample(0.5), None);
    }
}
