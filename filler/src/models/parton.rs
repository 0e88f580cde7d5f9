//! Parton model
//!
//! A parton is a node in a dipole cascade. It terminates at most two dipoles
//! and remembers the parton it was emitted from, which is what the real
//! parton state walks when promoting ancestors of an interacting parton.

use crate::kinematics::{on_shell_minus, rapidity, FourMomentum, Point, TransverseMomentum, GLUON};
use crate::models::dipole::DipoleId;
use serde::{Deserialize, Serialize};

/// Stable index of a parton inside its [`DipoleState`](crate::models::DipoleState) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartonId(pub usize);

/// A parton in a dipole cascade
///
/// `dipoles.0` is the dipole in which this parton is the second (anti-colour)
/// end, `dipoles.1` the dipole in which it is the first (colour) end. A quark
/// at the start of a string has no `dipoles.0`, an antiquark at the end has
/// no `dipoles.1`, a gluon has both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parton {
    /// PDG flavour code (21 = gluon)
    pub flavour: i32,

    /// Positive light-cone momentum (GeV)
    pub plus: f64,

    /// Negative light-cone momentum (GeV)
    pub minus: f64,

    /// Transverse momentum (GeV)
    pub pt: TransverseMomentum,

    /// Transverse position (GeV⁻¹)
    pub position: Point,

    /// Rest mass (GeV)
    pub mass: f64,

    pub on_shell: bool,
    pub interacted: bool,
    pub valence: bool,

    /// Set once the parton has been removed from the colour flow
    pub absorbed: bool,

    /// Set once the parton is moving in the negative direction (mirrored side)
    pub right_moving: bool,

    pub dipoles: (Option<DipoleId>, Option<DipoleId>),

    /// The parton this one was emitted from; `None` for valence partons
    pub mother: Option<PartonId>,

    /// Both ends of the emitting dipole
    pub parents: (Option<PartonId>, Option<PartonId>),
}

impl Parton {
    /// Create a massless parton with on-shell `minus`
    pub fn new(flavour: i32, plus: f64, pt: TransverseMomentum, position: Point) -> Self {
        Self {
            flavour,
            plus,
            minus: on_shell_minus(plus, &pt, 0.0),
            pt,
            position,
            mass: 0.0,
            on_shell: false,
            interacted: false,
            valence: false,
            absorbed: false,
            right_moving: false,
            dipoles: (None, None),
            mother: None,
            parents: (None, None),
        }
    }

    pub fn gluon(plus: f64, pt: TransverseMomentum, position: Point) -> Self {
        Self::new(GLUON, plus, pt, position)
    }

    /// Builder-style mass setter; keeps the parton on its mass shell
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self.update_minus();
        self
    }

    pub fn is_gluon(&self) -> bool {
        self.flavour == GLUON
    }

    pub fn y(&self) -> f64 {
        rapidity(self.plus, self.minus)
    }

    /// Recompute `minus` so that the parton sits on its mass shell
    pub fn update_minus(&mut self) {
        self.minus = on_shell_minus(self.plus, &self.pt, self.mass);
    }

    /// `plus * minus - pt² - m²`, zero for an on-shell parton
    pub fn off_shellness(&self) -> f64 {
        self.plus * self.minus - self.pt.pt2() - self.mass * self.mass
    }

    pub fn momentum(&self) -> FourMomentum {
        FourMomentum::from_light_cone(self.plus, self.minus, &self.pt)
    }

    /// Take over `p`, keeping this parton's mass shell
    ///
    /// The larger light-cone component is copied; the smaller one follows
    /// from the mass shell.
    pub fn set_momentum(&mut self, p: &FourMomentum) {
        let mt2 = p.x * p.x + p.y * p.y + self.mass * self.mass;
        self.pt = p.pt();
        if p.z >= 0.0 {
            self.plus = p.plus();
            self.minus = mt2 / self.plus;
        } else {
            self.minus = p.minus();
            self.plus = mt2 / self.minus;
        }
    }

    /// Number of colour-connected neighbours
    pub fn n_dipoles(&self) -> usize {
        self.dipoles.0.is_some() as usize + self.dipoles.1.is_some() as usize
    }
}
