//! Event Filler Scenario Tests
//!
//! End-to-end fills through the generic path: weights, discards, give-ups,
//! and the physical properties of the extracted strings.

mod common;

use common::{dipole_cascade, impact, misordered_cascade, snapshot, Script, ScriptedXSec};
use dipsy_filler_core_rs::{
    collaborators::{ColourAbsorber, CrossSection, LambdaSwinger, StandardXSec},
    filler::{EventContext, EventFiller, FillerConfig, FillerStats},
    kinematics::{HBARC, ONSHELL_TOLERANCE},
    DipoleState, FillOutcome, ImpactParameters, RngManager,
};
use std::collections::BTreeSet;

const SQRT_S: f64 = 100.0;

// ============================================================================
// Test Helpers
// ============================================================================

fn fill_with(
    xsec: &dyn CrossSection,
    config: FillerConfig,
    left: &mut DipoleState,
    right: &mut DipoleState,
    b: &ImpactParameters,
    max_xsec: f64,
    seed: u64,
    stats: &mut FillerStats,
) -> FillOutcome {
    let swinger = LambdaSwinger::new(1.0);
    let mut ctx = EventContext::new(xsec, &ColourAbsorber, &swinger, SQRT_S, max_xsec);
    let filler = EventFiller::new(config).unwrap();
    filler
        .fill(left, right, b, &mut ctx, &mut RngManager::new(seed), stats)
        .unwrap()
}

fn assert_strings_physical(outcome: &FillOutcome) {
    for s in &outcome.strings {
        for p in &s.partons {
            assert!(p.plus > 0.0 && p.plus.is_finite(), "plus {}", p.plus);
            assert!(p.minus > 0.0 && p.minus.is_finite(), "minus {}", p.minus);
            assert!(p.pt.is_finite());
            assert!(
                p.off_shellness().abs() < ONSHELL_TOLERANCE,
                "off shell by {}",
                p.off_shellness()
            );
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_candidate_weight() {
    let xsec = ScriptedXSec::new(vec![Script::new((0, 0), (0, 0), std::f64::consts::LN_2)]);
    let mut left = dipole_cascade(1, 2.0);
    let mut right = dipole_cascade(1, 0.5);
    let b = impact(1.5);
    let mut stats = FillerStats::new();

    let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &b, 3.0, 1, &mut stats);

    assert!((out.probability - 0.5).abs() < 1e-12);
    let expected = 0.5 * HBARC * HBARC * 2.0 * 0.5 * 1.5 / 3.0;
    assert!((out.weight - expected).abs() < 1e-12 * expected);
    assert_eq!(out.accepted.len(), 1);
    assert_eq!(stats.interactions_accepted, 1);
    assert!(!out.strings.is_empty());
    assert_strings_physical(&out);
}

#[test]
fn test_zero_amplitudes_discard_without_side_effects() {
    let xsec = ScriptedXSec::new(vec![
        Script::new((0, 0), (0, 0), 0.0),
        Script::new((1, 0), (2, 0), 0.0),
    ]);
    let mut left = dipole_cascade(2, 1.0);
    let mut right = dipole_cascade(1, 1.0);
    let (before_l, before_r) = (snapshot(&left), snapshot(&right));
    let mut stats = FillerStats::new();

    let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, 1, &mut stats);

    assert_eq!(out.weight, 0.0);
    assert!(out.is_discarded());
    assert_eq!(snapshot(&left), before_l);
    assert_eq!(snapshot(&right), before_r);
    assert_eq!(stats.zero_amplitude, 1);
    assert_eq!(stats.interactions_accepted, 0);
}

#[test]
fn test_exhausted_retries_give_up_once() {
    // 4 x 3 candidates, all vetoed; Σu < P so only the primary is ever tried
    let mut scripts = Vec::new();
    for l in 0..4 {
        for r in 0..3 {
            let rank = (scripts.len() + 1) as f64;
            scripts.push(
                Script::new((l, r), (2 * l, 2 * r), 0.01)
                    .with_uf2(0.005)
                    .with_rank(rank),
            );
        }
    }
    let xsec = ScriptedXSec::new(scripts).vetoing();
    let mut left = dipole_cascade(4, 1.0);
    let mut right = dipole_cascade(3, 1.0);
    let mut stats = FillerStats::new();

    let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, 17, &mut stats);

    assert_eq!(out.weight, 0.0);
    assert!(out.accepted.is_empty());
    assert_eq!(stats.gave_up_retries, 1);
    assert_eq!(stats.gave_up(), 1);
    assert_eq!(stats.failed_rounds, 10);
    assert!(stats.over_retry_weight > 0.0);
}

#[test]
fn test_unitarised_candidates_failing_ordering_give_up_once() {
    // the misordered gluon is the left end of every candidate; weights are
    // the cross section's own unitarised amplitudes, so Σu >= P
    let scripts: Vec<Script> = (0..6)
        .map(|r| {
            Script::new((0, r), (2, 2 * r), 0.3)
                .with_does((false, true), (true, false))
                .with_rank((r + 1) as f64)
        })
        .collect();
    let xsec = ScriptedXSec::new(scripts);
    for seed in 0..8 {
        let mut left = misordered_cascade();
        let mut right = dipole_cascade(6, 1.0);
        let mut stats = FillerStats::new();

        let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, seed, &mut stats);

        assert!(out.is_discarded(), "seed {}", seed);
        assert_eq!(out.weight, 0.0);
        assert!(out.accepted.is_empty());
        assert_eq!(stats.gave_up(), 1, "seed {}", seed);
        assert!(stats.failed_rounds >= 1 && stats.failed_rounds <= 10);
        assert!(stats.rejected_ordering >= 1);
        assert_eq!(stats.interactions_accepted, 0);
    }
}

#[test]
fn test_retry_budget_is_configurable() {
    let scripts = (0..3)
        .map(|i| Script::new((i, 0), (2 * i, 0), 0.01).with_uf2(0.005).with_rank(i as f64))
        .collect();
    let xsec = ScriptedXSec::new(scripts).vetoing();
    let config = FillerConfig {
        max_retries: 1,
        ..FillerConfig::default()
    };
    let mut left = dipole_cascade(3, 1.0);
    let mut right = dipole_cascade(1, 1.0);
    let mut stats = FillerStats::new();

    fill_with(&xsec, config, &mut left, &mut right, &impact(1.0), 1.0, 5, &mut stats);

    assert_eq!(stats.failed_rounds, 1);
    assert_eq!(stats.gave_up_retries, 1);
}

// ============================================================================
// Properties over the standard cross section
// ============================================================================

#[test]
fn test_fill_commits_or_gives_up() {
    let xsec = StandardXSec::new(0.5);
    for seed in 0..20 {
        let mut left = dipole_cascade(3, 1.0);
        let mut right = dipole_cascade(3, 1.0);
        let mut stats = FillerStats::new();
        let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, seed, &mut stats);

        if out.is_discarded() {
            assert!(stats.gave_up() + stats.discarded + stats.zero_amplitude == 1);
        } else {
            assert!(!out.accepted.is_empty());
            assert!(out.weight > 0.0);
        }
        assert!(stats.failed_rounds <= 10);
    }
}

#[test]
fn test_strings_conserve_momentum() {
    let xsec = StandardXSec::new(0.5);
    for seed in 0..10 {
        let mut left = dipole_cascade(2, 1.0);
        let mut right = dipole_cascade(2, 1.0);
        let mut stats = FillerStats::new();
        let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, seed, &mut stats);
        if out.is_discarded() {
            continue;
        }
        assert_strings_physical(&out);

        let (mut plus, mut minus) = (0.0, 0.0);
        let mut pt = dipsy_filler_core_rs::Vec2::ZERO;
        for s in &out.strings {
            let m = s.momentum();
            plus += m.plus;
            minus += m.minus;
            pt += m.pt;
        }
        assert!((plus - SQRT_S).abs() < 1e-6 * SQRT_S, "plus {}", plus);
        assert!((minus - SQRT_S).abs() < 1e-6 * SQRT_S, "minus {}", minus);
        assert!(pt.pt() < 1e-6, "pt {:?}", pt);
    }
}

#[test]
fn test_only_once_never_reuses_a_dipole() {
    let xsec = StandardXSec::new(1.0);
    let config = FillerConfig {
        only_once: true,
        ..FillerConfig::default()
    };
    for seed in 0..20 {
        let mut left = dipole_cascade(3, 1.0);
        let mut right = dipole_cascade(3, 1.0);
        let mut stats = FillerStats::new();
        let b = ImpactParameters::new(dipsy_filler_core_rs::Vec2::new(0.1, 0.1), 0.0, 1.0);
        let out = fill_with(&xsec, config.clone(), &mut left, &mut right, &b, 1.0, seed, &mut stats);

        let lefts: BTreeSet<_> = out.accepted.iter().map(|i| i.dips.0).collect();
        let rights: BTreeSet<_> = out.accepted.iter().map(|i| i.dips.1).collect();
        assert_eq!(lefts.len(), out.accepted.len());
        assert_eq!(rights.len(), out.accepted.len());
    }
}

#[test]
fn test_same_seed_same_event() {
    let xsec = StandardXSec::new(0.5);
    let run = || {
        let mut left = dipole_cascade(3, 1.0);
        let mut right = dipole_cascade(3, 1.0);
        let mut stats = FillerStats::new();
        let out = fill_with(&xsec, FillerConfig::default(), &mut left, &mut right, &impact(1.0), 1.0, 99, &mut stats);
        (out, stats)
    };
    let (a, sa) = run();
    let (b, sb) = run();
    assert_eq!(a, b);
    assert_eq!(sa, sb);
}
