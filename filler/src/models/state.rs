//! Dipole State
//!
//! One side's full cascade: an arena of partons and dipoles forming colour
//! chains, plus the list of initial (valence) dipoles.
//!
//! # Critical Invariants
//!
//! 1. **Stable indices**: partons and dipoles are never removed from the
//!    arena; absorption only flags them (`Parton::absorbed`,
//!    `Dipole::active`).
//! 2. **Link symmetry**: for every active dipole `d = (a, b)`,
//!    `a.dipoles.1 == Some(d)` and `b.dipoles.0 == Some(d)`.
//! 3. **Emission conserves momentum**: [`DipoleState::emit`] takes the
//!    emitted plus and transverse momentum from the mother parton.
//!
//! # Example
//!
//! ```rust
//! use dipsy_filler_core_rs::kinematics::Vec2;
//! use dipsy_filler_core_rs::models::{DipoleState, Parton};
//!
//! let mut state = DipoleState::new(1.0);
//! let q = Parton::new(2, 50.0, Vec2::new(0.5, 0.0), Vec2::new(-1.0, 0.0));
//! let qbar = Parton::new(-2, 50.0, Vec2::new(-0.5, 0.0), Vec2::new(1.0, 0.0));
//! let dip = state.add_valence_dipole(q, qbar);
//! let g = state
//!     .emit(dip, Parton::gluon(5.0, Vec2::new(0.0, 1.0), Vec2::new(0.0, 0.5)))
//!     .unwrap();
//! assert_eq!(state.n_live_partons(), 3);
//! assert!(state.parton(g).mother.is_some());
//! ```

use crate::collaborators::Swinger;
use crate::error::{FillerError, FillerWarning, Outcome};
use crate::filler::config::ValenceChargeMode;
use crate::kinematics::{LightConeSum, Point};
use crate::models::colour_string::ColourString;
use crate::models::dipole::{Dipole, DipoleId};
use crate::models::impact::ImpactParameters;
use crate::models::parton::{Parton, PartonId};
use crate::rng::RngManager;
use std::collections::BTreeMap;

/// Index shifts applied to the absorbed state by [`DipoleState::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOffsets {
    pub partons: usize,
    pub dipoles: usize,
}

impl MergeOffsets {
    pub fn parton(&self, id: PartonId) -> PartonId {
        PartonId(id.0 + self.partons)
    }

    pub fn dipole(&self, id: DipoleId) -> DipoleId {
        DipoleId(id.0 + self.dipoles)
    }
}

/// One side's cascade
#[derive(Debug, Clone, Default)]
pub struct DipoleState {
    partons: Vec<Parton>,
    dipoles: Vec<Dipole>,
    initial: Vec<DipoleId>,
    weight: f64,
    shadows: bool,
    n_nucleons: usize,

    /// On-shell momentum recorded at merge time, for consistency checks
    fs_reference: Option<LightConeSum>,
}

impl DipoleState {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            ..Self::default()
        }
    }

    /// Mark the cascade as carrying a shadow overlay
    pub fn with_shadows(mut self, shadows: bool) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn has_shadows(&self) -> bool {
        self.shadows
    }

    pub fn n_nucleons(&self) -> usize {
        self.n_nucleons
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    pub fn parton(&self, id: PartonId) -> &Parton {
        &self.partons[id.0]
    }

    pub fn parton_mut(&mut self, id: PartonId) -> &mut Parton {
        &mut self.partons[id.0]
    }

    pub fn dipole(&self, id: DipoleId) -> &Dipole {
        &self.dipoles[id.0]
    }

    pub fn dipole_mut(&mut self, id: DipoleId) -> &mut Dipole {
        &mut self.dipoles[id.0]
    }

    /// Checked parton lookup for indices that did not come from this arena
    pub fn try_parton(&self, id: PartonId) -> Result<&Parton, FillerError> {
        self.partons.get(id.0).ok_or(FillerError::UnknownParton(id.0))
    }

    pub fn try_dipole(&self, id: DipoleId) -> Result<&Dipole, FillerError> {
        self.dipoles.get(id.0).ok_or(FillerError::UnknownDipole(id.0))
    }

    /// Size of the parton arena, absorbed partons included
    pub fn n_partons(&self) -> usize {
        self.partons.len()
    }

    pub fn n_live_partons(&self) -> usize {
        self.partons.iter().filter(|p| !p.absorbed).count()
    }

    /// All partons still present in the colour flow
    pub fn partons(&self) -> impl Iterator<Item = (PartonId, &Parton)> {
        self.partons
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.absorbed)
            .map(|(i, p)| (PartonId(i), p))
    }

    /// Every parton ever created, absorbed ones included
    pub fn all_partons(&self) -> impl Iterator<Item = (PartonId, &Parton)> {
        self.partons.iter().enumerate().map(|(i, p)| (PartonId(i), p))
    }

    pub fn parton_ids(&self) -> Vec<PartonId> {
        self.partons().map(|(id, _)| id).collect()
    }

    pub fn active_dipoles(&self) -> impl Iterator<Item = (DipoleId, &Dipole)> {
        self.dipoles
            .iter()
            .enumerate()
            .filter(|(_, d)| d.active)
            .map(|(i, d)| (DipoleId(i), d))
    }

    pub fn initial_dipoles(&self) -> &[DipoleId] {
        &self.initial
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    pub fn add_parton(&mut self, parton: Parton) -> PartonId {
        self.partons.push(parton);
        PartonId(self.partons.len() - 1)
    }

    /// Create a dipole from `first` (colour end) to `second`
    pub fn connect(&mut self, first: PartonId, second: PartonId) -> DipoleId {
        let id = DipoleId(self.dipoles.len());
        self.dipoles.push(Dipole::new(first, second));
        self.partons[first.0].dipoles.1 = Some(id);
        self.partons[second.0].dipoles.0 = Some(id);
        id
    }

    /// Add a valence quark–antiquark dipole (e.g. a photon or meson)
    pub fn add_valence_dipole(&mut self, quark: Parton, antiquark: Parton) -> DipoleId {
        let nucleon = self.n_nucleons;
        self.n_nucleons += 1;
        let q = self.add_valence_parton(quark);
        let qbar = self.add_valence_parton(antiquark);
        let d = self.connect(q, qbar);
        self.dipoles[d.0].nucleon = Some(nucleon);
        self.initial.push(d);
        d
    }

    /// Add a nucleon as a closed triangle of three valence dipoles
    pub fn add_nucleon(&mut self, partons: [Parton; 3]) -> [DipoleId; 3] {
        let nucleon = self.n_nucleons;
        self.n_nucleons += 1;
        let [a, b, c] = partons;
        let ids = [
            self.add_valence_parton(a),
            self.add_valence_parton(b),
            self.add_valence_parton(c),
        ];
        let dips = [
            self.connect(ids[0], ids[1]),
            self.connect(ids[1], ids[2]),
            self.connect(ids[2], ids[0]),
        ];
        for d in dips {
            self.dipoles[d.0].nucleon = Some(nucleon);
            self.initial.push(d);
        }
        dips
    }

    fn add_valence_parton(&mut self, mut parton: Parton) -> PartonId {
        parton.valence = true;
        parton.mother = None;
        self.add_parton(parton)
    }

    /// Emit `parton` from `dipole`, splitting it in two
    ///
    /// The mother is the dipole end closest in transverse position; it gives
    /// up the emitted plus and transverse momentum and stays on its mass
    /// shell.
    pub fn emit(&mut self, dipole: DipoleId, mut parton: Parton) -> Result<PartonId, FillerError> {
        let (a, b) = self.try_dipole(dipole)?.partons;
        let da = self.partons[a.0].position.distance2(&parton.position);
        let db = self.partons[b.0].position.distance2(&parton.position);
        let mother = if db < da { b } else { a };

        let m = &mut self.partons[mother.0];
        if m.plus <= parton.plus {
            return Err(FillerError::Consistency(format!(
                "emission takes plus {} but mother {} only carries {}",
                parton.plus, mother.0, m.plus
            )));
        }
        m.plus -= parton.plus;
        m.pt -= parton.pt;
        m.update_minus();

        parton.mother = Some(mother);
        parton.parents = (Some(a), Some(b));
        parton.valence = false;
        Ok(self.insert_gluon(dipole, parton))
    }

    /// Insert `parton` into `dipole` without touching any momenta
    ///
    /// `(a, b)` becomes `(a, c)` plus a new dipole `(c, b)`.
    pub fn insert_gluon(&mut self, dipole: DipoleId, parton: Parton) -> PartonId {
        let (_, b) = self.dipoles[dipole.0].partons;
        let c = self.add_parton(parton);
        let mut tail = Dipole::new(c, b);
        tail.participating = self.dipoles[dipole.0].participating;
        let tail_id = DipoleId(self.dipoles.len());
        self.dipoles.push(tail);
        self.dipoles[dipole.0].partons.1 = c;
        self.partons[c.0].dipoles = (Some(dipole), Some(tail_id));
        self.partons[b.0].dipoles.0 = Some(tail_id);
        c
    }

    // ------------------------------------------------------------------
    // Cascade structure
    // ------------------------------------------------------------------

    /// Mother chain of `parton`, nearest first
    pub fn ancestors(&self, parton: PartonId) -> Vec<PartonId> {
        let mut out = Vec::new();
        let mut cur = self.partons[parton.0].mother;
        while let Some(m) = cur {
            out.push(m);
            cur = self.partons[m.0].mother;
        }
        out
    }

    /// Flag a parton and everything it descends from as interacted
    pub fn mark_interacted(&mut self, parton: PartonId) {
        self.partons[parton.0].interacted = true;
        for a in self.ancestors(parton) {
            self.partons[a.0].interacted = true;
        }
    }

    pub fn next_in_chain(&self, parton: PartonId) -> Option<PartonId> {
        let d = self.partons[parton.0].dipoles.1?;
        let dip = &self.dipoles[d.0];
        dip.active.then_some(dip.partons.1)
    }

    pub fn prev_in_chain(&self, parton: PartonId) -> Option<PartonId> {
        let d = self.partons[parton.0].dipoles.0?;
        let dip = &self.dipoles[d.0];
        dip.active.then_some(dip.partons.0)
    }

    /// The colour chain containing `parton`, in colour order, and whether it
    /// is a closed loop
    pub fn chain(&self, parton: PartonId) -> (Vec<PartonId>, bool) {
        let limit = self.partons.len();
        let mut start = parton;
        let mut closed = false;
        let mut steps = 0;
        while let Some(prev) = self.prev_in_chain(start) {
            if prev == parton {
                closed = true;
                break;
            }
            start = prev;
            steps += 1;
            if steps > limit {
                break;
            }
        }
        if closed {
            start = parton;
        }

        let mut out = vec![start];
        let mut cur = start;
        while let Some(next) = self.next_in_chain(cur) {
            if next == start || out.len() > limit {
                break;
            }
            out.push(next);
            cur = next;
        }
        (out, closed)
    }

    pub fn n_on_shell_in_chain(&self, parton: PartonId) -> usize {
        self.chain(parton)
            .0
            .iter()
            .filter(|id| self.partons[id.0].on_shell)
            .count()
    }

    // ------------------------------------------------------------------
    // Colour operations
    // ------------------------------------------------------------------

    /// Exchange the anti-colour ends of two dipoles
    ///
    /// `(a, b), (c, d)` becomes `(a, d), (c, b)`. Refused (returns `false`)
    /// when it would leave a dipole connecting a parton to itself.
    pub fn swing(&mut self, d1: DipoleId, d2: DipoleId) -> bool {
        if d1 == d2 || !self.dipoles[d1.0].active || !self.dipoles[d2.0].active {
            return false;
        }
        let (a, b) = self.dipoles[d1.0].partons;
        let (c, d) = self.dipoles[d2.0].partons;
        if a == d || c == b {
            return false;
        }
        self.dipoles[d1.0].partons = (a, d);
        self.dipoles[d2.0].partons = (c, b);
        self.partons[d.0].dipoles.0 = Some(d1);
        self.partons[b.0].dipoles.0 = Some(d2);
        true
    }

    /// Remove a parton from the colour flow
    ///
    /// The parton's own momentum is left to the caller. A gluon's two
    /// dipoles are merged into one; a chain end simply loses its dipole.
    /// When a two-parton loop collapses, the partner left without colour
    /// hands its momentum to the nearest parton still in the colour flow.
    pub fn absorb(&mut self, parton: PartonId) {
        let (din, dout) = self.partons[parton.0].dipoles;
        let din = din.filter(|d| self.dipoles[d.0].active);
        let dout = dout.filter(|d| self.dipoles[d.0].active);

        match (din, dout) {
            (Some(din), Some(dout)) => {
                let a = self.dipoles[din.0].partons.0;
                let b = self.dipoles[dout.0].partons.1;
                self.dipoles[dout.0].active = false;
                if a == b || din == dout {
                    // two-parton loop collapses to nothing
                    self.dipoles[din.0].active = false;
                    self.partons[a.0].dipoles = (None, None);
                    if a != parton {
                        self.fold_orphan(a, parton);
                    }
                } else {
                    self.dipoles[din.0].partons.1 = b;
                    self.partons[b.0].dipoles.0 = Some(din);
                }
            }
            (Some(din), None) => {
                let a = self.dipoles[din.0].partons.0;
                self.dipoles[din.0].active = false;
                self.partons[a.0].dipoles.1 = None;
            }
            (None, Some(dout)) => {
                let b = self.dipoles[dout.0].partons.1;
                self.dipoles[dout.0].active = false;
                self.partons[b.0].dipoles.0 = None;
            }
            (None, None) => {}
        }

        let p = &mut self.partons[parton.0];
        p.absorbed = true;
        p.on_shell = false;
        p.dipoles = (None, None);
    }

    /// Move all momentum of `orphan` onto the nearest parton that still
    /// has a dipole, preferring one with the same on-shell flag
    fn fold_orphan(&mut self, orphan: PartonId, skip: PartonId) {
        let o = &self.partons[orphan.0];
        let (pos, on_shell) = (o.position, o.on_shell);
        let nearest = |same_shell: bool| {
            self.partons()
                .filter(|(id, p)| {
                    *id != orphan
                        && *id != skip
                        && p.n_dipoles() > 0
                        && (!same_shell || p.on_shell == on_shell)
                })
                .min_by(|(_, a), (_, b)| {
                    a.position
                        .distance2(&pos)
                        .total_cmp(&b.position.distance2(&pos))
                })
                .map(|(id, _)| id)
        };
        let Some(target) = nearest(true).or_else(|| nearest(false)) else {
            log::debug!("no colour-connected parton left to take the momentum of parton {}", orphan.0);
            return;
        };

        let (plus, minus, pt) = (o.plus, o.minus, o.pt);
        let t = &mut self.partons[target.0];
        t.plus += plus;
        t.minus += minus;
        t.pt += pt;
        log::trace!("parton {} took the momentum of orphaned parton {}", target.0, orphan.0);

        let o = &mut self.partons[orphan.0];
        o.plus = 0.0;
        o.minus = 0.0;
        o.pt = Default::default();
        o.absorbed = true;
        o.on_shell = false;
    }

    fn midpoint(&self, dipole: DipoleId) -> Point {
        let (a, b) = self.dipoles[dipole.0].partons;
        (self.partons[a.0].position + self.partons[b.0].position) * 0.5
    }

    fn mean_rapidity(&self, dipole: DipoleId) -> f64 {
        let (a, b) = self.dipoles[dipole.0].partons;
        0.5 * (self.partons[a.0].y() + self.partons[b.0].y())
    }

    /// Closest active dipole (by midpoint) for which `exclude` is false
    pub fn nearest_dipole<F>(&self, dipole: DipoleId, exclude: F) -> Option<DipoleId>
    where
        F: Fn(DipoleId) -> bool,
    {
        let centre = self.midpoint(dipole);
        self.active_dipoles()
            .map(|(id, _)| id)
            .filter(|id| *id != dipole && !exclude(*id))
            .map(|id| (self.midpoint(id).distance2(&centre), id))
            .min_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)))
            .map(|(_, id)| id)
    }

    // ------------------------------------------------------------------
    // Whole-state transformations
    // ------------------------------------------------------------------

    /// Absorb `other` into this state, shifting its indices
    ///
    /// Records the merged on-shell momentum as the reference for
    /// [`DipoleState::check_fs_momentum`].
    pub fn merge(&mut self, other: DipoleState) -> MergeOffsets {
        let off = MergeOffsets {
            partons: self.partons.len(),
            dipoles: self.dipoles.len(),
        };
        let nucleon_offset = self.n_nucleons;

        for mut p in other.partons {
            p.dipoles = (p.dipoles.0.map(|d| off.dipole(d)), p.dipoles.1.map(|d| off.dipole(d)));
            p.mother = p.mother.map(|m| off.parton(m));
            p.parents = (p.parents.0.map(|m| off.parton(m)), p.parents.1.map(|m| off.parton(m)));
            self.partons.push(p);
        }
        for mut d in other.dipoles {
            d.partons = (off.parton(d.partons.0), off.parton(d.partons.1));
            d.original = (off.parton(d.original.0), off.parton(d.original.1));
            d.nucleon = d.nucleon.map(|n| n + nucleon_offset);
            self.dipoles.push(d);
        }
        self.initial
            .extend(other.initial.into_iter().map(|d| off.dipole(d)));
        self.n_nucleons += other.n_nucleons;
        self.shadows |= other.shadows;
        self.fs_reference = Some(self.on_shell_momentum());
        off
    }

    /// Move the state to its place in the collision frame
    pub fn translate(&mut self, b: &ImpactParameters) {
        for p in &mut self.partons {
            p.position = b.apply(&p.position);
            p.pt = b.rotate_pt(&p.pt);
        }
    }

    /// Reflect all rapidities around `y0`
    pub fn mirror(&mut self, y0: f64) {
        let e = (2.0 * y0).exp();
        for p in &mut self.partons {
            let (plus, minus) = (p.plus, p.minus);
            p.plus = minus * e;
            p.minus = plus / e;
            p.right_moving = !p.right_moving;
        }
    }

    /// Total light-cone momentum of the live on-shell partons
    pub fn on_shell_momentum(&self) -> LightConeSum {
        let mut sum = LightConeSum::default();
        for (_, p) in self.partons().filter(|(_, p)| p.on_shell) {
            sum.add(p.plus, p.minus, p.pt);
        }
        sum
    }

    /// Re-anchor the momentum reference after an intentional change
    pub fn reset_fs_reference(&mut self) {
        self.fs_reference = Some(self.on_shell_momentum());
    }

    /// Compare the on-shell momentum with the reference recorded at merge
    pub fn check_fs_momentum(&self, tolerance: f64) -> Outcome<()> {
        let Some(reference) = self.fs_reference else {
            return Outcome::Ok(());
        };
        let now = self.on_shell_momentum();
        if now.approx_eq(&reference, tolerance) {
            Outcome::Ok(())
        } else {
            Outcome::Warning(
                (),
                FillerWarning::MomentumMismatch(format!(
                    "expected (+{:.6}, -{:.6}, pt {:.6},{:.6}), found (+{:.6}, -{:.6}, pt {:.6},{:.6})",
                    reference.plus,
                    reference.minus,
                    reference.pt.x,
                    reference.pt.y,
                    now.plus,
                    now.minus,
                    now.pt.x,
                    now.pt.y
                )),
            )
        }
    }

    /// Give the momentum of every off-shell parton to its nearest on-shell
    /// ancestor; the donors are left with zero momentum
    pub fn fold_off_shell_momentum(&mut self) {
        let mut receivers = Vec::new();
        for i in (0..self.partons.len()).rev() {
            let p = &self.partons[i];
            if p.on_shell || (p.plus == 0.0 && p.pt.is_zero()) {
                continue;
            }
            let target = self
                .ancestors(PartonId(i))
                .into_iter()
                .find(|a| self.partons[a.0].on_shell && !self.partons[a.0].absorbed);
            let Some(target) = target else { continue };
            let (plus, pt) = (p.plus, p.pt);
            let t = &mut self.partons[target.0];
            t.plus += plus;
            t.pt += pt;
            receivers.push(target);
            let p = &mut self.partons[i];
            p.plus = 0.0;
            p.minus = 0.0;
            p.pt = Default::default();
        }
        for r in receivers {
            self.partons[r.0].update_minus();
        }
    }

    // ------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------

    /// Sort the remaining partons into colour strings
    pub fn strings(&self) -> Vec<ColourString> {
        let mut visited = vec![false; self.partons.len()];
        let mut out = Vec::new();

        for (id, p) in self.partons() {
            if visited[id.0] || p.n_dipoles() == 0 || self.prev_in_chain(id).is_some() {
                continue;
            }
            let (ids, closed) = self.chain(id);
            out.push(self.make_string(ids, closed, &mut visited));
        }

        for (id, p) in self.partons() {
            if visited[id.0] || p.n_dipoles() == 0 {
                continue;
            }
            let (ids, closed) = self.chain(id);
            out.push(self.make_string(ids, closed, &mut visited));
        }
        out
    }

    fn make_string(&self, ids: Vec<PartonId>, closed: bool, visited: &mut [bool]) -> ColourString {
        for id in &ids {
            visited[id.0] = true;
        }
        let partons = ids.iter().map(|id| self.partons[id.0].clone()).collect();
        ColourString {
            ids,
            partons,
            closed,
        }
    }

    // ------------------------------------------------------------------
    // Nucleon bookkeeping
    // ------------------------------------------------------------------

    fn nucleon_groups(&self) -> BTreeMap<usize, Vec<DipoleId>> {
        let mut groups: BTreeMap<usize, Vec<DipoleId>> = BTreeMap::new();
        for (i, d) in self.initial.iter().enumerate() {
            let key = self.dipoles[d.0]
                .nucleon
                .unwrap_or(usize::MAX - i);
            groups.entry(key).or_default().push(*d);
        }
        groups
    }

    /// Flag valence dipoles of nucleons in which no valence parton
    /// interacted as non-participating
    ///
    /// # Returns
    ///
    /// Number of untouched nucleons
    pub fn mark_participants(&mut self) -> usize {
        let mut untouched = 0;
        for (_, dips) in self.nucleon_groups() {
            let touched = dips.iter().any(|d| {
                let (a, b) = self.dipoles[d.0].original;
                self.partons[a.0].interacted || self.partons[b.0].interacted
            });
            for d in &dips {
                self.dipoles[d.0].participating = touched;
            }
            if !touched {
                untouched += 1;
            }
        }
        untouched
    }

    /// Reduce the colour charge carried by intact valence triangles
    ///
    /// # Returns
    ///
    /// Number of swings performed
    pub fn normalise_valence_charge(&mut self, mode: ValenceChargeMode) -> usize {
        if mode == ValenceChargeMode::None {
            return 0;
        }
        let mut swings = 0;
        for (_, dips) in self.nucleon_groups() {
            if dips.len() != 3 {
                continue;
            }
            let intact = dips.iter().all(|d| {
                let dip = &self.dipoles[d.0];
                dip.active && dip.partons == dip.original
            });
            if !intact {
                continue;
            }
            let target = self.nearest_dipole(dips[0], |id| dips.contains(&id));
            if let Some(target) = target {
                if self.swing(dips[0], target) {
                    swings += 1;
                }
            }
        }
        swings
    }

    /// Give non-participating nucleons back their original colour flow
    ///
    /// # Returns
    ///
    /// Number of swings performed
    pub fn restore_nonparticipants(&mut self) -> usize {
        let mut swings = 0;
        for i in 0..self.initial.len() {
            let d = self.initial[i];
            if self.dipoles[d.0].participating {
                continue;
            }
            let (a, b) = self.dipoles[d.0].original;
            if self.partons[a.0].absorbed || self.partons[b.0].absorbed {
                continue;
            }
            let (Some(da), Some(db)) = (self.partons[a.0].dipoles.1, self.partons[b.0].dipoles.0)
            else {
                continue;
            };
            if da == db {
                continue;
            }
            if self.swing(da, db) {
                swings += 1;
            }
        }
        swings
    }

    /// Final-state colour reconnection among dipoles whose mean |rapidity|
    /// lies in `[y_lo, y_hi)`
    ///
    /// # Returns
    ///
    /// Number of swings performed
    pub fn swing_fs(
        &mut self,
        y_lo: f64,
        y_hi: f64,
        swinger: &dyn Swinger,
        rng: &mut RngManager,
    ) -> usize {
        let window: Vec<DipoleId> = self
            .active_dipoles()
            .map(|(id, _)| id)
            .filter(|id| {
                let y = self.mean_rapidity(*id).abs();
                y >= y_lo && y < y_hi
            })
            .collect();

        let mut swings = 0;
        for (i, d1) in window.iter().enumerate() {
            for d2 in &window[i + 1..] {
                let amp = swinger.fs_amplitude(self, *d1, *d2);
                if amp > 0.0 && rng.next_f64() < amp && self.swing(*d1, *d2) {
                    swings += 1;
                    break;
                }
            }
        }
        swings
    }
}
