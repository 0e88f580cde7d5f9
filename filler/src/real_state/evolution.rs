//! Evolution-check strategies
//!
//! Each strategy enforces the same two rules on the kept partons of an
//! overlay:
//!
//! - **Ordering**: a kept parton's effective minus (`scale² / plus`) may not
//!   be below that of its nearest kept ancestor.
//! - **Local pt-max**: a kept, non-valence parton may not be a local minimum
//!   of the transverse scale between its kept mother and a kept child.
//!
//! A violation is fixed by switching the non-essential parton to
//! [`Keep::Virtual`]; it is fatal to the interaction when both partons
//! involved are essential (valence or interacting).

use crate::models::PartonId;
use crate::real_state::parton::{Keep, RealParton};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Safety cap on full re-verification passes
const MAX_CONSISTENT_PASSES: usize = 100;

/// Relative slack on the ordering comparison
const ORDERING_SLACK: f64 = 1.0e-12;

/// Evolution-check strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvolutionMode {
    /// Repeat both sweeps until nothing changes
    Consistent,
    /// One forward ordering sweep and one backward pt-max sweep
    #[default]
    SingleSweep,
    /// Fix the worst violation first; never re-enable a switched-off parton
    NonRecursive,
}

type Overlay = BTreeMap<PartonId, RealParton>;

/// Nearest kept ancestor of `parton`
pub(crate) fn real_mother(partons: &Overlay, parton: PartonId) -> Option<PartonId> {
    let mut cur = partons.get(&parton)?.mother;
    while let Some(m) = cur {
        let rp = partons.get(&m)?;
        if rp.keep == Keep::Yes {
            return Some(m);
        }
        cur = rp.mother;
    }
    None
}

fn real_children(partons: &Overlay, parton: PartonId) -> Vec<PartonId> {
    partons
        .iter()
        .filter(|(id, rp)| rp.keep == Keep::Yes && real_mother(partons, **id) == Some(parton))
        .map(|(id, _)| *id)
        .collect()
}

fn kept(partons: &Overlay, parton: PartonId) -> Option<&RealParton> {
    partons
        .get(&parton)
        .filter(|rp| rp.keep == Keep::Yes && !rp.valence)
}

/// Real mother and violation size if `parton` is out of order
fn ordering_violation(partons: &Overlay, parton: PartonId) -> Option<(PartonId, f64)> {
    let rp = kept(partons, parton)?;
    let mother = real_mother(partons, parton)?;
    let m_minus = partons.get(&mother)?.effective_minus();
    let minus = rp.effective_minus();
    if m_minus > minus * (1.0 + ORDERING_SLACK) {
        Some((mother, m_minus / minus))
    } else {
        None
    }
}

/// Violation size if `parton` is a local scale minimum
fn pt_max_violation(partons: &Overlay, parton: PartonId) -> Option<f64> {
    let rp = kept(partons, parton)?;
    let mother = real_mother(partons, parton)?;
    let scale = rp.scale();
    let m_scale = partons.get(&mother)?.scale();
    let c_scale = real_children(partons, parton)
        .iter()
        .filter_map(|c| partons.get(c))
        .map(RealParton::scale)
        .fold(f64::NEG_INFINITY, f64::max);
    if scale < m_scale && scale < c_scale && scale > 0.0 {
        Some(m_scale.min(c_scale) / scale)
    } else if scale < m_scale && scale < c_scale {
        Some(f64::INFINITY)
    } else {
        None
    }
}

fn switch_off(partons: &mut Overlay, parton: PartonId) {
    if let Some(rp) = partons.get_mut(&parton) {
        rp.keep = Keep::Virtual;
    }
}

fn resolve_ordering(partons: &mut Overlay, mother: PartonId, child: PartonId) -> bool {
    let m_essential = partons.get(&mother).map_or(true, RealParton::is_essential);
    let c_essential = partons.get(&child).map_or(true, RealParton::is_essential);
    if !m_essential {
        switch_off(partons, mother);
        true
    } else if !c_essential {
        switch_off(partons, child);
        true
    } else {
        log::trace!(
            "ordering between essential partons {} and {} cannot be fixed",
            mother.0,
            child.0
        );
        false
    }
}

fn resolve_pt_max(partons: &mut Overlay, parton: PartonId) -> bool {
    if partons.get(&parton).map_or(true, |rp| rp.interacting) {
        log::trace!("interacting parton {} is not a local pt maximum", parton.0);
        return false;
    }
    switch_off(partons, parton);
    true
}

/// One forward ordering sweep then one backward pt-max sweep
///
/// Returns `None` on an unfixable violation, otherwise whether anything was
/// switched off.
fn sweep(partons: &mut Overlay) -> Option<bool> {
    let ids: Vec<PartonId> = partons.keys().copied().collect();
    let mut changed = false;

    for id in &ids {
        if let Some((mother, _)) = ordering_violation(partons, *id) {
            if !resolve_ordering(partons, mother, *id) {
                return None;
            }
            changed = true;
        }
    }
    for id in ids.iter().rev() {
        if pt_max_violation(partons, *id).is_some() {
            if !resolve_pt_max(partons, *id) {
                return None;
            }
            changed = true;
        }
    }
    Some(changed)
}

pub(crate) fn single_sweep(partons: &mut Overlay) -> bool {
    sweep(partons).is_some()
}

pub(crate) fn consistent(partons: &mut Overlay) -> bool {
    for _ in 0..MAX_CONSISTENT_PASSES {
        match sweep(partons) {
            None => return false,
            Some(false) => return true,
            Some(true) => {}
        }
    }
    log::debug!("consistent evolution check stopped after {MAX_CONSISTENT_PASSES} passes");
    true
}

enum Violation {
    Ordering { mother: PartonId, child: PartonId },
    PtMax(PartonId),
}

fn worst_violation(partons: &Overlay) -> Option<Violation> {
    let mut worst: Option<(f64, Violation)> = None;
    for id in partons.keys() {
        if let Some((mother, size)) = ordering_violation(partons, *id) {
            if worst.as_ref().map_or(true, |(w, _)| size > *w) {
                worst = Some((size, Violation::Ordering { mother, child: *id }));
            }
        }
        if let Some(size) = pt_max_violation(partons, *id) {
            if worst.as_ref().map_or(true, |(w, _)| size > *w) {
                worst = Some((size, Violation::PtMax(*id)));
            }
        }
    }
    worst.map(|(_, v)| v)
}

pub(crate) fn non_recursive(partons: &mut Overlay) -> bool {
    for _ in 0..=partons.len() {
        let fixed = match worst_violation(partons) {
            None => return true,
            Some(Violation::Ordering { mother, child }) => resolve_ordering(partons, mother, child),
            Some(Violation::PtMax(p)) => resolve_pt_max(partons, p),
        };
        if !fixed {
            return false;
        }
    }
    worst_violation(partons).is_none()
}
