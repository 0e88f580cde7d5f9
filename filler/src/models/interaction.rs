//! Dipole–dipole interaction candidates
//!
//! A candidate associates one dipole of the left cascade with one dipole of
//! the right cascade. It is produced by the cross-section model, ranked and
//! sampled by the selector, and discarded once strings have been extracted.

use crate::kinematics::{TransverseMomentum, Vec2};
use crate::models::dipole::DipoleId;
use crate::models::parton::PartonId;
use serde::{Deserialize, Serialize};

/// Validation status of an interaction candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionStatus {
    /// Kinematically allowed
    Accepted,
    /// Failed because a parton ran out of light-cone momentum
    PropFail,
    /// Failed a kinematic veto
    KineFail,
    /// Failed an ordering requirement
    Ordering,
    /// Not yet evaluated
    Unknown,
}

impl InteractionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            InteractionStatus::PropFail | InteractionStatus::KineFail | InteractionStatus::Ordering
        )
    }
}

/// Which endpoint partons of the two dipoles genuinely interact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoesInt {
    pub left: (bool, bool),
    pub right: (bool, bool),
}

impl DoesInt {
    /// All four endpoints interact
    pub fn all() -> Self {
        Self {
            left: (true, true),
            right: (true, true),
        }
    }
}

/// Recoils imparted to the four endpoint partons
///
/// Left recoils are expressed in the collision frame (which is the left
/// cascade's own frame); right recoils in the right cascade's own frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionRecoil {
    pub left: (TransverseMomentum, TransverseMomentum),
    pub right: (TransverseMomentum, TransverseMomentum),
}

impl InteractionRecoil {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Largest recoil among the four endpoints
    pub fn max_pt(&self) -> f64 {
        self.left
            .0
            .pt()
            .max(self.left.1.pt())
            .max(self.right.0.pt())
            .max(self.right.1.pt())
    }

    pub fn left_total(&self) -> TransverseMomentum {
        self.left.0 + self.left.1
    }

    pub fn right_total(&self) -> TransverseMomentum {
        self.right.0 + self.right.1
    }
}

/// A candidate interaction between a left and a right dipole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DipoleInteraction {
    /// Position in the candidate list
    pub index: usize,

    /// (left dipole, right dipole)
    pub dips: (DipoleId, DipoleId),

    /// The parton pair that actually exchanges momentum
    pub ints: (PartonId, PartonId),

    pub does_int: DoesInt,

    /// Raw interaction amplitude (2·f_ij)
    pub f2: f64,

    /// Unitarised interaction probability
    pub uf2: f64,

    pub status: InteractionStatus,

    /// Recoil on the left interacting parton (collision frame)
    pub recoil: TransverseMomentum,

    /// Recoil on the right interacting parton (right cascade frame)
    pub partner_recoil: TransverseMomentum,

    /// Suppresses the recoil when the same parton pair has already interacted
    pub norec: bool,

    /// Position in the accepted list (1-based) or its negation once rejected
    pub id: i64,

    /// Tie-break key used when processing potential interactions
    pub order_key: f64,
}

impl DipoleInteraction {
    pub fn new(index: usize, dips: (DipoleId, DipoleId), ints: (PartonId, PartonId)) -> Self {
        Self {
            index,
            dips,
            ints,
            does_int: DoesInt::all(),
            f2: 0.0,
            uf2: 0.0,
            status: InteractionStatus::Unknown,
            recoil: Vec2::ZERO,
            partner_recoil: Vec2::ZERO,
            norec: false,
            id: 0,
            order_key: 0.0,
        }
    }

    /// Recoil on the two interacting partons, honouring `norec`
    pub fn effective_recoil(&self) -> (TransverseMomentum, TransverseMomentum) {
        if self.norec {
            (Vec2::ZERO, Vec2::ZERO)
        } else {
            (self.recoil, self.partner_recoil)
        }
    }
}
