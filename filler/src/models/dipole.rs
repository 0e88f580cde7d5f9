//! Dipole model

use crate::models::parton::PartonId;
use serde::{Deserialize, Serialize};

/// Stable index of a dipole inside its [`DipoleState`](crate::models::DipoleState) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DipoleId(pub usize);

/// A colour-connected pair of partons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dipole {
    /// (colour end, anti-colour end)
    pub partons: (PartonId, PartonId),

    /// Endpoints at creation, used to restore spectator colour flow
    pub original: (PartonId, PartonId),

    /// Whether the nucleon this dipole belongs to took part in the collision
    pub participating: bool,

    pub interacted: bool,

    /// False once the dipole has been merged away by an absorption
    pub active: bool,

    /// Valence group (nucleon) index, if the dipole is a valence dipole
    pub nucleon: Option<usize>,
}

impl Dipole {
    pub fn new(first: PartonId, second: PartonId) -> Self {
        Self {
            partons: (first, second),
            original: (first, second),
            participating: true,
            interacted: false,
            active: true,
            nucleon: None,
        }
    }

    pub fn contains(&self, parton: PartonId) -> bool {
        self.partons.0 == parton || self.partons.1 == parton
    }
}
