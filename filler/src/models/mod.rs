//! Domain models for the event filler
//!
//! Cascades are stored as arenas: a [`DipoleState`] owns all of its
//! [`Parton`]s and [`Dipole`]s and every cross reference is a stable index
//! ([`PartonId`], [`DipoleId`]) into that arena.

pub mod colour_string;
pub mod dipole;
pub mod impact;
pub mod interaction;
pub mod parton;
pub mod state;

pub use colour_string::ColourString;
pub use dipole::{Dipole, DipoleId};
pub use impact::ImpactParameters;
pub use interaction::{DipoleInteraction, DoesInt, InteractionRecoil, InteractionStatus};
pub use parton::{Parton, PartonId};
pub use state::{DipoleState, MergeOffsets};
