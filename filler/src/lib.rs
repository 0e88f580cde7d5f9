//! DIPSY Event Filler Core
//!
//! Final-state construction and unitarisation for dipole-cascade collisions
//! with deterministic execution.
//!
//! # Architecture
//!
//! - **models**: Cascade arena (Parton, Dipole, DipoleState) and interaction candidates
//! - **real_state**: Per-side overlay of real, virtual and discarded partons
//! - **collaborators**: Cross section, absorber, swinger and shadow capabilities
//! - **filler**: Catalog, selection, recoils, final-state assembly, repairs,
//!   soft-gluon removal
//! - **kinematics**: Light-cone and transverse momentum helpers
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Every output parton is on shell with positive, finite momentum
//! 2. All randomness is deterministic (seeded RNG)
//! 3. A failed interaction leaves both real-parton overlays untouched
//! 4. A discarded event has weight zero

// Module declarations
pub mod collaborators;
pub mod error;
pub mod filler;
pub mod kinematics;
pub mod models;
pub mod real_state;
pub mod rng;

// Re-exports for convenience
pub use collaborators::{
    Absorber, CascadeShadows, CheckMode, ColourAbsorber, CrossSection, LambdaSwinger,
    ShadowModel, StandardXSec, Swinger,
};
pub use error::{FillerError, FillerWarning, Outcome};
pub use filler::{
    DiagnosticsSink, ErrorReconciler, EventContext, EventFiller, EventLog, FillOutcome,
    FillerConfig, FillerEvent, FillerStats, GiveUpReason, NullSink, SoftGluonRemover, SoftRemove,
    ValenceChargeMode,
};
pub use kinematics::{Point, TransverseMomentum, Vec2, HBARC};
pub use models::{
    ColourString, Dipole, DipoleId, DipoleInteraction, DipoleState, ImpactParameters,
    InteractionStatus, Parton, PartonId,
};
pub use real_state::{EvolutionMode, Keep, RealParton, RealPartonState};
pub use rng::RngManager;
