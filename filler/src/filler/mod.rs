//! Event filling
//!
//! Everything that happens to one event after both cascades have been
//! evolved: catalog, selection, recoils, final-state assembly, repairs and
//! soft-gluon removal.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod reconciler;
pub mod recoil;
pub mod selector;
pub mod soft;

pub use assembler::{fix_boost, FinalStateAssembler};
pub use catalog::{InteractionCatalog, PrimaryPool};
pub use config::{FillerConfig, SoftRemove, ValenceChargeMode};
pub use diagnostics::{DiagnosticsSink, EventLog, FillerEvent, FillerStats, GiveUpReason, NullSink};
pub use engine::{EventContext, EventFiller, FillOutcome};
pub use reconciler::ErrorReconciler;
pub use recoil::RecoilController;
pub use selector::{recheck, InteractionSelector, Selection, Sides};
pub use soft::{Absorption, SoftGluonRemover, SoftRemoval};
