//! Impact parameter of a collision
//!
//! The right-moving cascade is rotated by `phi` and displaced by `b`
//! relative to the left-moving one. Recoils computed in the collision frame
//! are taken back to the right cascade's own frame with
//! [`ImpactParameters::inv_rotate_pt`].

use crate::kinematics::{Point, TransverseMomentum, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactParameters {
    /// Transverse displacement of the right cascade (GeV⁻¹)
    pub b: Vec2,

    /// Rotation of the right cascade around its own origin
    pub phi: f64,

    /// Sampling weight of this impact parameter
    pub weight: f64,
}

impl ImpactParameters {
    pub fn new(b: Vec2, phi: f64, weight: f64) -> Self {
        Self { b, phi, weight }
    }

    /// Head-on collision with unit weight
    pub fn central() -> Self {
        Self::new(Vec2::ZERO, 0.0, 1.0)
    }

    /// Position of a right-cascade point in the collision frame
    pub fn apply(&self, position: &Point) -> Point {
        position.rotate(self.phi) + self.b
    }

    pub fn rotate_pt(&self, pt: &TransverseMomentum) -> TransverseMomentum {
        pt.rotate(self.phi)
    }

    pub fn inv_rotate_pt(&self, pt: &TransverseMomentum) -> TransverseMomentum {
        pt.rotate(-self.phi)
    }
}
