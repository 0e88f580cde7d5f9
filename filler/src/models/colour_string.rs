//! Colour strings handed to hadronisation

use crate::kinematics::LightConeSum;
use crate::models::parton::{Parton, PartonId};
use serde::{Deserialize, Serialize};

/// A colour-ordered chain of final-state partons
///
/// Open strings run from a colour triplet end to an anti-triplet end;
/// closed strings are pure gluon loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColourString {
    /// Arena indices of the partons in colour order
    pub ids: Vec<PartonId>,

    /// Snapshot of the partons at extraction time
    pub partons: Vec<Parton>,

    pub closed: bool,
}

impl ColourString {
    pub fn len(&self) -> usize {
        self.partons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partons.is_empty()
    }

    pub fn momentum(&self) -> LightConeSum {
        let mut sum = LightConeSum::default();
        for p in &self.partons {
            sum.add(p.plus, p.minus, p.pt);
        }
        sum
    }
}
