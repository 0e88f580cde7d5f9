//! Shared fixtures and scripted collaborators for the integration tests

#![allow(dead_code)]

use dipsy_filler_core_rs::collaborators::{CrossSection, StandardXSec};
use dipsy_filler_core_rs::kinematics::Vec2;
use dipsy_filler_core_rs::models::{
    DipoleId, DipoleInteraction, DipoleState, DoesInt, ImpactParameters, InteractionRecoil,
    Parton, PartonId,
};
use dipsy_filler_core_rs::real_state::RealPartonState;

pub const QUARK: i32 = 2;
pub const ANTIQUARK: i32 = -2;

/// One candidate as the scripted cross section will report it
#[derive(Debug, Clone)]
pub struct Script {
    pub dips: (DipoleId, DipoleId),
    pub ints: (PartonId, PartonId),
    pub does: DoesInt,
    pub f2: f64,
    /// Defaults to `unitarize(f2)`
    pub uf2: Option<f64>,
    /// Recoil reported when every endpoint is asked for, used only for
    /// ranking
    pub rank: f64,
}

impl Script {
    /// First end of each dipole interacts
    pub fn new(dips: (usize, usize), ints: (usize, usize), f2: f64) -> Self {
        Self {
            dips: (DipoleId(dips.0), DipoleId(dips.1)),
            ints: (PartonId(ints.0), PartonId(ints.1)),
            does: DoesInt {
                left: (true, false),
                right: (true, false),
            },
            f2,
            uf2: None,
            rank: 0.0,
        }
    }

    pub fn with_does(mut self, left: (bool, bool), right: (bool, bool)) -> Self {
        self.does = DoesInt { left, right };
        self
    }

    pub fn with_uf2(mut self, uf2: f64) -> Self {
        self.uf2 = Some(uf2);
        self
    }

    pub fn with_rank(mut self, rank: f64) -> Self {
        self.rank = rank;
        self
    }
}

/// Cross section with a fixed candidate list and no recoils
///
/// The recoil for all four endpoints carries the script's rank so the
/// catalog orders candidates by it; the recoil actually applied is zero.
/// With `veto` set every interaction fails the kinematic check.
pub struct ScriptedXSec {
    pub scripts: Vec<Script>,
    pub veto: bool,
    standard: StandardXSec,
}

impl ScriptedXSec {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            veto: false,
            standard: StandardXSec::new(0.2),
        }
    }

    pub fn vetoing(mut self) -> Self {
        self.veto = true;
        self
    }

    fn script(&self, dips: (DipoleId, DipoleId)) -> Option<&Script> {
        self.scripts.iter().find(|s| s.dips == dips)
    }
}

impl CrossSection for ScriptedXSec {
    fn flist(
        &self,
        _left: &DipoleState,
        _right: &DipoleState,
        _b: &ImpactParameters,
    ) -> Vec<DipoleInteraction> {
        self.scripts
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut inter = DipoleInteraction::new(i, s.dips, s.ints);
                inter.f2 = s.f2;
                inter.uf2 = s.uf2.unwrap_or_else(|| self.unitarize(s.f2));
                inter.does_int = s.does;
                inter.recoil = Vec2::new(s.rank, 0.0);
                inter
            })
            .collect()
    }

    fn does_int(
        &self,
        _left: &DipoleState,
        _right: &DipoleState,
        dips: (DipoleId, DipoleId),
        _b: &ImpactParameters,
    ) -> DoesInt {
        self.script(dips).map_or(DoesInt::all(), |s| s.does)
    }

    fn recoil(
        &self,
        _left: &DipoleState,
        _right: &DipoleState,
        _b: &ImpactParameters,
        dips: (DipoleId, DipoleId),
        does: &DoesInt,
    ) -> InteractionRecoil {
        let mut recoil = InteractionRecoil::zero();
        if *does == DoesInt::all() {
            if let Some(s) = self.script(dips) {
                recoil.left.0 = Vec2::new(s.rank, 0.0);
            }
        }
        recoil
    }

    fn do_interaction(
        &self,
        _recoil: &InteractionRecoil,
        _inter: &DipoleInteraction,
        _left: &DipoleState,
        _right: &DipoleState,
        _lrs: &mut RealPartonState,
        _rrs: &mut RealPartonState,
        _b: &ImpactParameters,
    ) -> bool {
        !self.veto
    }

    fn interact(&self, left: &mut DipoleState, right: &mut DipoleState, inter: &DipoleInteraction) {
        self.standard.interact(left, right, inter);
    }

    fn colour_exchanges(
        &self,
        lrs: &RealPartonState,
        rrs: &RealPartonState,
        left: &DipoleState,
        right: &DipoleState,
    ) -> Vec<(DipoleId, DipoleId)> {
        self.standard.colour_exchanges(lrs, rrs, left, right)
    }
}

/// Valence quark and antiquark at `x ∓ 1`, back to back in pt
pub fn valence_pair(plus: f64, x: f64) -> (Parton, Parton) {
    (
        Parton::new(QUARK, plus, Vec2::new(0.3, 0.0), Vec2::new(x - 1.0, 0.0)),
        Parton::new(ANTIQUARK, plus, Vec2::new(-0.3, 0.0), Vec2::new(x + 1.0, 0.0)),
    )
}

/// Cascade of `n` separated valence dipoles; dipole `i` joins partons
/// `2i` and `2i + 1`
pub fn dipole_cascade(n: usize, weight: f64) -> DipoleState {
    let mut state = DipoleState::new(weight);
    for i in 0..n {
        let (q, qbar) = valence_pair(50.0, 4.0 * i as f64);
        state.add_valence_dipole(q, qbar);
    }
    state
}

/// Single valence dipole whose quark has emitted a hard-plus, soft-pt gluon
///
/// Partons: quark 0, antiquark 1, gluon 2. Dipoles: (0, 2) is 0, (2, 1) is 1.
/// The gluon's effective minus is below its mother's, so making the gluon
/// interact breaks the ordering between two essential partons.
pub fn misordered_cascade() -> DipoleState {
    let mut state = DipoleState::new(1.0);
    let (q, qbar) = valence_pair(50.0, 0.0);
    state.add_valence_dipole(q, qbar);
    let gluon = Parton::gluon(49.0, Vec2::new(0.2, 0.0), Vec2::new(-0.9, 0.0));
    state
        .emit(DipoleId(0), gluon)
        .expect("quark carries enough plus");
    state
}

/// Every parton of a state, in arena order
pub fn snapshot(state: &DipoleState) -> Vec<Parton> {
    state.all_partons().map(|(_, p)| p.clone()).collect()
}

pub fn impact(weight: f64) -> ImpactParameters {
    ImpactParameters::new(Vec2::new(0.3, 0.2), 0.0, weight)
}
