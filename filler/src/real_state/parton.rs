//! Real-parton overlay entry

use crate::kinematics::{on_shell_minus, TransverseMomentum, Vec2};
use crate::models::{Parton, PartonId};
use serde::{Deserialize, Serialize};

/// Whether a parton survives into the final state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keep {
    /// Real: kept and put on shell
    Yes,
    /// Switched off by an ordering or pt-max fix; will be merged away
    Virtual,
    /// Not part of the final state (folded into an ancestor)
    No,
}

/// Overlay view of one cascade parton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealParton {
    pub parton: PartonId,
    pub keep: Keep,

    pub plus: f64,
    pub minus: f64,
    pub pt: TransverseMomentum,
    pub mass: f64,

    /// Transverse momentum before any interaction recoil
    pub base_pt: TransverseMomentum,

    pub mother: Option<PartonId>,
    pub valence: bool,

    /// Endpoint of an accepted (or tentatively added) interaction
    pub interacting: bool,

    /// Largest recoil this parton has to absorb
    pub recoil_scale: f64,

    /// Momentum already handed to an ancestor by `merge_virtuals`
    pub folded: bool,
}

impl RealParton {
    pub fn from_parton(id: PartonId, parton: &Parton, keep: Keep) -> Self {
        Self {
            parton: id,
            keep,
            plus: parton.plus,
            minus: on_shell_minus(parton.plus, &parton.pt, parton.mass),
            pt: parton.pt,
            mass: parton.mass,
            base_pt: parton.pt,
            mother: parton.mother,
            valence: parton.valence,
            interacting: false,
            recoil_scale: 0.0,
            folded: false,
        }
    }

    /// Valence and interacting partons can never be switched off
    pub fn is_essential(&self) -> bool {
        self.valence || self.interacting
    }

    /// Transverse scale used in the ordering checks
    pub fn scale(&self) -> f64 {
        self.base_pt.pt().max(self.recoil_scale)
    }

    /// Negative light-cone momentum implied by [`RealParton::scale`]
    pub fn effective_minus(&self) -> f64 {
        if self.plus <= 0.0 {
            return f64::INFINITY;
        }
        (self.scale().powi(2) + self.mass * self.mass) / self.plus
    }

    pub fn recoil(&self) -> TransverseMomentum {
        self.pt - self.base_pt
    }

    pub fn set_on_shell(&mut self) {
        self.minus = if self.plus > 0.0 {
            on_shell_minus(self.plus, &self.pt, self.mass)
        } else {
            0.0
        };
    }

    pub(crate) fn clear_momentum(&mut self) {
        self.plus = 0.0;
        self.minus = 0.0;
        self.pt = Vec2::ZERO;
        self.base_pt = Vec2::ZERO;
    }
}
