//! Collaborator Interfaces
//!
//! The filler never decides the physics of an individual dipole–dipole
//! collision itself. It consults four capabilities, each passed in by
//! reference through [`EventContext`](crate::filler::EventContext):
//!
//! - [`CrossSection`]: interaction amplitudes, recoils and kinematic vetoes
//! - [`Absorber`]: colour-only removal of virtual partons
//! - [`Swinger`]: final-state colour reconnection amplitudes
//! - [`ShadowModel`]: incremental validation for cascades carrying a shadow
//!   overlay
//!
//! One reference implementation of each ships with the crate. Alternative
//! tunes are new implementations of the same trait.
//!
//! ```rust
//! use dipsy_filler_core_rs::collaborators::{CrossSection, StandardXSec};
//!
//! let xsec = StandardXSec::new(0.2);
//! let p = xsec.unitarize(0.5);
//! assert!((p - (1.0 - (-0.5f64).exp())).abs() < 1e-12);
//! ```

pub mod absorber;
pub mod shadow;
pub mod standard;
pub mod swinger;

pub use absorber::ColourAbsorber;
pub use shadow::CascadeShadows;
pub use standard::StandardXSec;
pub use swinger::LambdaSwinger;

use crate::models::{
    DipoleId, DipoleInteraction, DipoleState, DoesInt, ImpactParameters, InteractionRecoil,
    InteractionStatus, PartonId,
};
use crate::real_state::RealPartonState;

/// Cross-section and amplitude model
pub trait CrossSection {
    /// Candidate interactions between every left and right dipole
    ///
    /// Each candidate carries its raw amplitude `f2`, its unitarised
    /// probability `uf2`, the interacting parton pair and the recoil on that
    /// pair (left in the collision frame, right in its own frame).
    fn flist(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
    ) -> Vec<DipoleInteraction>;

    /// Map a summed amplitude to a probability in `[0, 1)`
    fn unitarize(&self, sum: f64) -> f64 {
        1.0 - (-sum).exp()
    }

    /// Which endpoints of the two dipoles genuinely interact
    fn does_int(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        dips: (DipoleId, DipoleId),
        b: &ImpactParameters,
    ) -> DoesInt;

    /// Recoils on the four endpoint partons
    fn recoil(
        &self,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
        dips: (DipoleId, DipoleId),
        does: &DoesInt,
    ) -> InteractionRecoil;

    /// Apply `recoil` to the real-parton overlays and veto the interaction
    /// if the two sides cannot supply each other's light-cone momentum
    ///
    /// On a veto the transverse momenta must be left as they were; the
    /// caller takes care of the accumulated total recoil.
    #[allow(clippy::too_many_arguments)]
    fn do_interaction(
        &self,
        recoil: &InteractionRecoil,
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
        lrs: &mut RealPartonState,
        rrs: &mut RealPartonState,
        b: &ImpactParameters,
    ) -> bool;

    /// Mark the dipoles and partons of an accepted interaction
    fn interact(&self, left: &mut DipoleState, right: &mut DipoleState, inter: &DipoleInteraction);

    /// Dipole pairs (left, right) to reconnect once the cascades are merged
    fn colour_exchanges(
        &self,
        lrs: &RealPartonState,
        rrs: &RealPartonState,
        left: &DipoleState,
        right: &DipoleState,
    ) -> Vec<(DipoleId, DipoleId)>;

    /// Reconnect two dipoles of the merged state
    fn reconnect(&self, state: &mut DipoleState, d1: DipoleId, d2: DipoleId) -> bool {
        state.swing(d1, d2)
    }
}

/// Colour-only removal of partons from a cascade
pub trait Absorber {
    fn remove_parton(&self, state: &mut DipoleState, parton: PartonId);

    /// Reconnect the chain holding `dipole` with some dipole outside it
    fn swing_loop(&self, state: &mut DipoleState, dipole: DipoleId) -> bool;
}

/// Final-state swing amplitude
pub trait Swinger {
    /// Probability of reconnecting `d1` and `d2`, in `[0, 1]`
    fn fs_amplitude(&self, state: &DipoleState, d1: DipoleId, d2: DipoleId) -> f64;
}

/// How thoroughly a shadow check treats the interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    /// Validate only; nothing in the cascades changes
    Tentative,
    /// Validate and put the relevant partons on shell
    Final,
}

/// Shadow overlay bookkeeping
///
/// Validates interactions against an accumulated per-parton record rather
/// than rebuilding a real-parton overlay on every retry.
pub trait ShadowModel {
    /// Forget everything; called at the start of every selection round
    fn reset_shadows(&mut self, left: &DipoleState, right: &DipoleState);

    /// Forget accumulated recoils; called before every recheck
    fn reset_interacted(&mut self);

    /// Register an interaction and evaluate it on its own
    fn prepare(
        &mut self,
        inter: &DipoleInteraction,
        left: &DipoleState,
        right: &DipoleState,
    ) -> InteractionStatus;

    /// Evaluate an interaction on top of those checked since the last
    /// [`ShadowModel::reset_interacted`]
    fn check(
        &mut self,
        inter: &DipoleInteraction,
        mode: CheckMode,
        left: &mut DipoleState,
        right: &mut DipoleState,
    ) -> InteractionStatus;

    fn reject(&mut self, inter: &DipoleInteraction);

    /// Last step before the cascades are merged
    fn finalize(&mut self, _left: &mut DipoleState, _right: &mut DipoleState) {}
}
