//! Kinematic primitives
//!
//! Light-cone bookkeeping used throughout the filler. Momenta are in GeV,
//! transverse positions in GeV⁻¹. A parton is described by its positive and
//! negative light-cone components (`plus`, `minus`) and a transverse vector;
//! it is on shell when `plus * minus == pt² + m²`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// ħc in GeV·fm, used to turn GeV⁻² areas into fm².
pub const HBARC: f64 = 0.197_326_980_4;

/// Absolute tolerance (GeV²) on `plus * minus - pt² - m²`.
pub const ONSHELL_TOLERANCE: f64 = 1.0e-4;

/// PDG code of the gluon.
pub const GLUON: i32 = 21;

/// Two-dimensional vector in the transverse plane.
///
/// Doubles as a transverse momentum (GeV) and a transverse position (GeV⁻¹).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

/// Transverse momentum in GeV.
pub type TransverseMomentum = Vec2;

/// Transverse position in GeV⁻¹.
pub type Point = Vec2;

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Length of the vector (`pt` for a momentum)
    pub fn pt(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn pt2(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Rotate counter-clockwise by `phi` radians
    pub fn rotate(&self, phi: f64) -> Self {
        let (s, c) = phi.sin_cos();
        Self {
            x: c * self.x - s * self.y,
            y: s * self.x + c * self.y,
        }
    }

    pub fn distance(&self, other: &Vec2) -> f64 {
        (*self - *other).pt()
    }

    pub fn distance2(&self, other: &Vec2) -> f64 {
        (*self - *other).pt2()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// On-shell negative light-cone component for given `plus`, `pt` and mass
pub fn on_shell_minus(plus: f64, pt: &Vec2, mass: f64) -> f64 {
    (pt.pt2() + mass * mass) / plus
}

/// Rapidity from light-cone components
pub fn rapidity(plus: f64, minus: f64) -> f64 {
    0.5 * (plus / minus).ln()
}

/// Cartesian four-momentum `(e, x, y, z)` in GeV
///
/// Light-cone components are `plus = e + z` and `minus = e - z`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FourMomentum {
    pub e: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FourMomentum {
    pub fn new(e: f64, x: f64, y: f64, z: f64) -> Self {
        Self { e, x, y, z }
    }

    pub fn from_light_cone(plus: f64, minus: f64, pt: &Vec2) -> Self {
        Self::new(0.5 * (plus + minus), pt.x, pt.y, 0.5 * (plus - minus))
    }

    pub fn plus(&self) -> f64 {
        self.e + self.z
    }

    pub fn minus(&self) -> f64 {
        self.e - self.z
    }

    pub fn pt(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn vector(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Invariant mass squared
    pub fn m2(&self) -> f64 {
        self.e * self.e - self.x * self.x - self.y * self.y - self.z * self.z
    }

    /// Velocity of the frame in which this momentum is at rest
    pub fn velocity(&self) -> [f64; 3] {
        [self.x / self.e, self.y / self.e, self.z / self.e]
    }

    /// Lorentz boost by velocity `beta` (`|beta| < 1`)
    pub fn boost(&self, beta: [f64; 3]) -> Self {
        let b2 = beta[0] * beta[0] + beta[1] * beta[1] + beta[2] * beta[2];
        if b2 <= 0.0 {
            return *self;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = beta[0] * self.x + beta[1] * self.y + beta[2] * self.z;
        let k = (gamma - 1.0) / b2 * bp + gamma * self.e;
        Self {
            e: gamma * (self.e + bp),
            x: self.x + k * beta[0],
            y: self.y + k * beta[1],
            z: self.z + k * beta[2],
        }
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;
    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(self.e + rhs.e, self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Summed light-cone momentum of a set of partons
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LightConeSum {
    pub plus: f64,
    pub minus: f64,
    pub pt: Vec2,
}

impl LightConeSum {
    pub fn add(&mut self, plus: f64, minus: f64, pt: Vec2) {
        self.plus += plus;
        self.minus += minus;
        self.pt += pt;
    }

    /// Component-wise comparison with a tolerance relative to the larger
    /// light-cone total (absolute for the transverse components).
    pub fn approx_eq(&self, other: &LightConeSum, tolerance: f64) -> bool {
        let scale = self
            .plus
            .abs()
            .max(self.minus.abs())
            .max(other.plus.abs())
            .max(other.minus.abs())
            .max(1.0);
        (self.plus - other.plus).abs() <= tolerance * scale
            && (self.minus - other.minus).abs() <= tolerance * scale
            && (self.pt.x - other.pt.x).abs() <= tolerance * scale
            && (self.pt.y - other.pt.y).abs() <= tolerance * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_preserves_length() {
        let v = Vec2::new(3.0, 4.0);
        let r = v.rotate(1.234);
        assert!((r.pt() - 5.0).abs() < 1e-12);
        let back = r.rotate(-1.234);
        assert!((back.x - 3.0).abs() < 1e-12);
        assert!((back.y - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_on_shell_minus() {
        let pt = Vec2::new(3.0, 4.0);
        let minus = on_shell_minus(5.0, &pt, 0.0);
        assert!((5.0 * minus - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_boost_to_rest_frame() {
        let p = FourMomentum::from_light_cone(8.0, 0.5, &Vec2::new(1.0, -0.5));
        let rest = p.boost(p.velocity().map(|v| -v));
        assert!(rest.x.abs() < 1e-12 && rest.y.abs() < 1e-12 && rest.z.abs() < 1e-12);
        assert!((rest.e * rest.e - p.m2()).abs() < 1e-9);
        assert!((p.plus() - 8.0).abs() < 1e-12);
        assert!((p.minus() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_light_cone_sum_tolerance() {
        let mut a = LightConeSum::default();
        a.add(100.0, 100.0, Vec2::ZERO);
        let mut b = a;
        b.plus += 1e-9;
        assert!(a.approx_eq(&b, 1e-8));
        b.plus += 1.0;
        assert!(!a.approx_eq(&b, 1e-8));
    }
}
