//! Colour absorber

use crate::collaborators::Absorber;
use crate::models::{DipoleId, DipoleState, PartonId};
use std::collections::BTreeSet;

/// Removes partons from the colour flow without touching momenta
#[derive(Debug, Clone, Copy, Default)]
pub struct ColourAbsorber;

impl Absorber for ColourAbsorber {
    fn remove_parton(&self, state: &mut DipoleState, parton: PartonId) {
        state.absorb(parton);
    }

    /// Swing `dipole` with the nearest active dipole of another chain
    fn swing_loop(&self, state: &mut DipoleState, dipole: DipoleId) -> bool {
        if !state.dipole(dipole).active {
            return false;
        }
        let (chain, _) = state.chain(state.dipole(dipole).partons.0);
        let members: BTreeSet<_> = chain.into_iter().collect();
        let target = state.nearest_dipole(dipole, |d| {
            let (a, b) = state.dipole(d).partons;
            members.contains(&a) || members.contains(&b)
        });
        match target {
            Some(target) => state.swing(dipole, target),
            None => {
                log::debug!("no dipole outside the chain of dipole {} to swing with", dipole.0);
                false
            }
        }
    }
}
