//! Error Reconciler Tests
//!
//! Every kind of unphysical parton is repaired, reported and left on shell.

mod common;

use common::valence_pair;
use dipsy_filler_core_rs::{
    filler::{ErrorReconciler, EventLog, FillerEvent, FillerStats},
    kinematics::{Vec2, ONSHELL_TOLERANCE},
    DipoleState, FillerWarning, Parton, PartonId, RngManager,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn state_with(quark: Parton) -> DipoleState {
    let mut state = DipoleState::new(1.0);
    let (_, qbar) = valence_pair(20.0, 0.0);
    state.add_valence_dipole(quark, qbar);
    state
}

fn assert_physical(p: &Parton) {
    assert!(p.plus > 0.0 && p.plus.is_finite());
    assert!(p.minus > 0.0 && p.minus.is_finite());
    assert!(p.pt.is_finite() && !p.pt.is_zero());
    assert!(p.off_shellness().abs() < ONSHELL_TOLERANCE);
}

fn repair(quark: Parton) -> (DipoleState, EventLog, usize) {
    let mut state = state_with(quark);
    let mut log = EventLog::new();
    let n = ErrorReconciler::new().dodge_errors(&mut state, &mut RngManager::new(42), &mut log);
    (state, log, n)
}

// ============================================================================
// Repairs
// ============================================================================

#[test]
fn test_zero_pt_is_replaced() {
    let (state, log, n) = repair(Parton::new(2, 10.0, Vec2::ZERO, Vec2::new(-1.0, 0.0)));
    assert!(n >= 1);
    assert_physical(state.parton(PartonId(0)));
    assert_eq!(
        log.count(|e| matches!(e, FillerEvent::Repair { parton: 0, .. })),
        n
    );
}

#[test]
fn test_negative_plus_is_replaced() {
    let mut q = Parton::new(2, 10.0, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
    q.plus = -3.0;
    let (state, _, n) = repair(q);
    assert!(n >= 1);
    assert_physical(state.parton(PartonId(0)));
}

#[test]
fn test_infinite_pt_is_replaced() {
    let mut q = Parton::new(2, 10.0, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
    q.pt = Vec2::new(f64::INFINITY, 0.0);
    let (state, _, _) = repair(q);
    assert_physical(state.parton(PartonId(0)));
}

#[test]
fn test_off_shell_parton_is_put_on_shell() {
    let mut q = Parton::new(2, 10.0, Vec2::new(0.5, 0.5), Vec2::new(-1.0, 0.0));
    q.minus *= 3.0;
    let plus_before = q.plus;
    let (state, log, n) = repair(q);
    assert_eq!(n, 1);
    let p = state.parton(PartonId(0));
    assert_physical(p);
    // light-cone momenta are kept, pt is rescaled
    assert_eq!(p.plus, plus_before);
    let warnings: Vec<_> = log
        .events()
        .iter()
        .filter_map(|e| match e {
            FillerEvent::Warning(FillerWarning::UnphysicalParton { parton, .. }) => Some(*parton),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec![0]);
}

#[test]
fn test_absorbed_partons_are_ignored() {
    let mut state = state_with(Parton::new(2, 10.0, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0)));
    let mut stray = Parton::gluon(0.0, Vec2::ZERO, Vec2::ZERO);
    stray.absorbed = true;
    state.add_parton(stray);
    let mut stats = FillerStats::new();
    let n = ErrorReconciler::new().dodge_errors(&mut state, &mut RngManager::new(1), &mut stats);
    assert_eq!(n, 0);
    assert_eq!(stats.repairs, 0);
}

#[test]
fn test_repairs_are_counted_in_stats() {
    let mut q = Parton::new(2, 10.0, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
    q.minus = f64::NAN;
    let mut state = state_with(q);
    let mut stats = FillerStats::new();
    let n = ErrorReconciler::new().dodge_errors(&mut state, &mut RngManager::new(1), &mut stats);
    assert_eq!(stats.repairs, n as u64);
    assert_eq!(stats.warnings, n as u64);
}
