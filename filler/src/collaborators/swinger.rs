//! Final-state swing amplitude

use crate::collaborators::Swinger;
use crate::models::{DipoleId, DipoleState, PartonId};

/// Favours reconnections that shorten the summed squared dipole sizes
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaSwinger {
    strength: f64,
}

impl LambdaSwinger {
    pub fn new(strength: f64) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
        }
    }

    fn size2(state: &DipoleState, a: PartonId, b: PartonId) -> f64 {
        state.parton(a).position.distance2(&state.parton(b).position)
    }
}

impl Swinger for LambdaSwinger {
    fn fs_amplitude(&self, state: &DipoleState, d1: DipoleId, d2: DipoleId) -> f64 {
        let (a, b) = state.dipole(d1).partons;
        let (c, d) = state.dipole(d2).partons;
        if a == d || c == b {
            return 0.0;
        }
        let current = Self::size2(state, a, b) + Self::size2(state, c, d);
        let swapped = Self::size2(state, a, d) + Self::size2(state, c, b);
        if current <= 0.0 || swapped >= current {
            return 0.0;
        }
        (self.strength * (1.0 - swapped / current)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::Vec2;
    use crate::models::Parton;

    fn crossed() -> (DipoleState, DipoleId, DipoleId) {
        let mut state = DipoleState::new(1.0);
        // (0,0)->(5,1) and (5,0)->(0,1): swapping ends gives two short dipoles
        let d1 = state.add_valence_dipole(
            Parton::new(2, 10.0, Vec2::ZERO, Vec2::new(0.0, 0.0)),
            Parton::new(-2, 10.0, Vec2::ZERO, Vec2::new(5.0, 1.0)),
        );
        let d2 = state.add_valence_dipole(
            Parton::new(2, 10.0, Vec2::ZERO, Vec2::new(5.0, 0.0)),
            Parton::new(-2, 10.0, Vec2::ZERO, Vec2::new(0.0, 1.0)),
        );
        (state, d1, d2)
    }

    #[test]
    fn test_shortening_swing_has_positive_amplitude() {
        let (state, d1, d2) = crossed();
        let amp = LambdaSwinger::new(1.0).fs_amplitude(&state, d1, d2);
        assert!(amp > 0.0 && amp <= 1.0);
    }

    #[test]
    fn test_lengthening_swing_is_suppressed() {
        let (mut state, d1, d2) = crossed();
        assert!(state.swing(d1, d2));
        assert_eq!(LambdaSwinger::new(1.0).fs_amplitude(&state, d1, d2), 0.0);
    }
}
