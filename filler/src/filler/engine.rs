//! Event Filler
//!
//! Entry point of the crate: turns two evolved cascades and an impact
//! parameter into a weighted set of colour strings.
//!
//! # Architecture
//!
//! ```text
//! fill(left, right, b):
//! 1. Build the interaction catalog (shadow or generic flavour)
//! 2. Σf <= 0: discard, nothing touched
//! 3. weight = unitarize(Σf) · ħc² · w_L · w_R · w_b / maxXSec
//! 4. Select a consistent interaction set (may give up: discard)
//! 5. Mark non-participating nucleons
//! 6. Merge the cascades and extract strings (none: discard)
//! ```
//!
//! A discarded event has weight zero. Resampling is the caller's business.
//!
//! # Example
//!
//! ```rust
//! use dipsy_filler_core_rs::collaborators::{ColourAbsorber, LambdaSwinger, StandardXSec};
//! use dipsy_filler_core_rs::filler::{EventContext, EventFiller, FillerConfig, NullSink};
//! use dipsy_filler_core_rs::kinematics::Vec2;
//! use dipsy_filler_core_rs::models::{DipoleState, ImpactParameters, Parton};
//! use dipsy_filler_core_rs::rng::RngManager;
//!
//! let cascade = || {
//!     let mut state = DipoleState::new(1.0);
//!     state.add_valence_dipole(
//!         Parton::new(2, 50.0, Vec2::new(0.3, 0.0), Vec2::new(-1.0, 0.0)),
//!         Parton::new(-2, 50.0, Vec2::new(-0.3, 0.0), Vec2::new(1.0, 0.0)),
//!     );
//!     state
//! };
//! let (mut left, mut right) = (cascade(), cascade());
//!
//! let xsec = StandardXSec::new(0.5);
//! let (absorber, swinger) = (ColourAbsorber, LambdaSwinger::new(1.0));
//! let mut ctx = EventContext::new(&xsec, &absorber, &swinger, 100.0, 1.0);
//!
//! let filler = EventFiller::new(FillerConfig::default()).unwrap();
//! let b = ImpactParameters::new(Vec2::new(0.3, 0.2), 0.0, 1.0);
//! let outcome = filler
//!     .fill(&mut left, &mut right, &b, &mut ctx, &mut RngManager::new(7), &mut NullSink)
//!     .unwrap();
//! assert!(outcome.weight >= 0.0);
//! ```

use crate::collaborators::{Absorber, CrossSection, ShadowModel, Swinger};
use crate::error::FillerError;
use crate::filler::assembler::FinalStateAssembler;
use crate::filler::catalog::InteractionCatalog;
use crate::filler::config::FillerConfig;
use crate::filler::diagnostics::{DiagnosticsSink, FillerEvent};
use crate::filler::selector::{InteractionSelector, Selection, Sides};
use crate::kinematics::HBARC;
use crate::models::{ColourString, DipoleInteraction, DipoleState, ImpactParameters};
use crate::real_state::RealPartonState;
use crate::rng::RngManager;

/// Collaborators and beam parameters for one run
pub struct EventContext<'a> {
    pub xsec: &'a dyn CrossSection,
    pub absorber: &'a dyn Absorber,
    pub swinger: &'a dyn Swinger,

    /// Used only for cascades that carry shadows
    pub shadows: Option<&'a mut dyn ShadowModel>,

    /// Centre-of-mass energy of the collision (GeV)
    pub sqrt_s: f64,

    /// Largest cross section the sampler may see, normalises the weight
    pub max_xsec: f64,
}

impl<'a> EventContext<'a> {
    pub fn new(
        xsec: &'a dyn CrossSection,
        absorber: &'a dyn Absorber,
        swinger: &'a dyn Swinger,
        sqrt_s: f64,
        max_xsec: f64,
    ) -> Self {
        Self {
            xsec,
            absorber,
            swinger,
            shadows: None,
            sqrt_s,
            max_xsec,
        }
    }

    pub fn with_shadows(mut self, shadows: &'a mut dyn ShadowModel) -> Self {
        self.shadows = Some(shadows);
        self
    }
}

/// Result of filling one event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillOutcome {
    /// Event weight; zero for a discarded event
    pub weight: f64,

    /// Probability that the cascades interacted at all
    pub probability: f64,

    pub strings: Vec<ColourString>,

    /// Committed interactions, in commit order
    pub accepted: Vec<DipoleInteraction>,

    pub untouched_nucleons: usize,
}

impl FillOutcome {
    pub fn discarded() -> Self {
        Self::default()
    }

    pub fn is_discarded(&self) -> bool {
        self.weight == 0.0
    }
}

/// Fills events from pairs of evolved cascades
#[derive(Debug, Clone)]
pub struct EventFiller {
    config: FillerConfig,
}

impl EventFiller {
    /// Create a filler
    ///
    /// # Errors
    ///
    /// [`FillerError::InvalidConfig`] if `config` fails validation
    pub fn new(config: FillerConfig) -> Result<Self, FillerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    /// Fill one event
    ///
    /// On return `left` holds the merged final state (if the event got that
    /// far) and `right` is emptied. A discarded event before selection
    /// leaves both cascades untouched.
    ///
    /// # Errors
    ///
    /// - [`FillerError::InvalidConfig`] if `ctx.max_xsec` is not positive
    /// - [`FillerError::Consistency`] if an accepted interaction set stops
    ///   validating, or momentum checks are enabled and fail
    pub fn fill(
        &self,
        left: &mut DipoleState,
        right: &mut DipoleState,
        b: &ImpactParameters,
        ctx: &mut EventContext<'_>,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<FillOutcome, FillerError> {
        sink.record(FillerEvent::EventStarted {
            n_left: left.n_live_partons(),
            n_right: right.n_live_partons(),
        });
        if !(ctx.max_xsec > 0.0) {
            return Err(FillerError::InvalidConfig(format!(
                "max_xsec must be positive, got {}",
                ctx.max_xsec
            )));
        }

        if left.has_shadows() {
            if let Some(shadows) = ctx.shadows.as_deref_mut() {
                return self.fill_with_shadows(
                    left,
                    right,
                    b,
                    ctx.xsec,
                    ctx.absorber,
                    ctx.swinger,
                    shadows,
                    ctx.max_xsec,
                    rng,
                    sink,
                );
            }
            log::debug!("cascade carries shadows but no shadow model was given");
        }

        let mut catalog = InteractionCatalog::build(ctx.xsec, left, right, b);
        if catalog.is_empty() || catalog.sum_f() <= 0.0 {
            sink.record(FillerEvent::ZeroAmplitude);
            return Ok(FillOutcome::discarded());
        }

        let probability = catalog.probability();
        let weight = self.event_weight(probability, left, right, b, ctx.max_xsec);

        let mut lrs = RealPartonState::new(self.config.evolution_mode);
        let mut rrs = RealPartonState::new(self.config.evolution_mode);
        let selection = {
            let selector = InteractionSelector::new(&self.config, ctx.xsec);
            let mut sides = Sides {
                left: &mut *left,
                right: &mut *right,
                lrs: &mut lrs,
                rrs: &mut rrs,
            };
            selector.select(&mut catalog, &mut sides, b, weight, rng, sink)
        };
        let accepted = match selection {
            Selection::Found { accepted, .. } => accepted,
            Selection::GaveUp(_) => return Ok(FillOutcome::discarded()),
        };

        let untouched_nucleons = left.mark_participants() + right.mark_participants();
        sink.record(FillerEvent::Participants { untouched_nucleons });

        let assembler = FinalStateAssembler::new(&self.config, ctx.xsec, ctx.absorber, ctx.swinger);
        let strings = assembler.extract_strings(
            left,
            std::mem::take(right),
            &mut lrs,
            &mut rrs,
            b,
            ctx.sqrt_s,
            rng,
            sink,
        )?;

        self.finish(weight, probability, strings, &catalog, &accepted, untouched_nucleons, sink)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_with_shadows(
        &self,
        left: &mut DipoleState,
        right: &mut DipoleState,
        b: &ImpactParameters,
        xsec: &dyn CrossSection,
        absorber: &dyn Absorber,
        swinger: &dyn Swinger,
        shadows: &mut dyn ShadowModel,
        max_xsec: f64,
        rng: &mut RngManager,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<FillOutcome, FillerError> {
        let mut catalog = InteractionCatalog::build_shadow(xsec, shadows, left, right, b, sink);
        if catalog.is_empty() || catalog.sum_f() <= 0.0 {
            sink.record(FillerEvent::ZeroAmplitude);
            return Ok(FillOutcome::discarded());
        }

        let probability = catalog.probability();
        let weight = self.event_weight(probability, left, right, b, max_xsec);

        let selector = InteractionSelector::new(&self.config, xsec);
        let accepted =
            match selector.select_shadow(&mut catalog, shadows, left, right, weight, rng, sink)? {
                Selection::Found { accepted, .. } => accepted,
                Selection::GaveUp(_) => return Ok(FillOutcome::discarded()),
            };

        let untouched_nucleons = left.mark_participants() + right.mark_participants();
        sink.record(FillerEvent::Participants { untouched_nucleons });

        let assembler = FinalStateAssembler::new(&self.config, xsec, absorber, swinger);
        let strings = assembler.extract_shadow_strings(
            left,
            std::mem::take(right),
            &mut catalog,
            &accepted,
            shadows,
            b,
            rng,
            sink,
        )?;

        self.finish(weight, probability, strings, &catalog, &accepted, untouched_nucleons, sink)
    }

    /// `P · ħc² · w_L · w_R · w_b / maxXSec`
    fn event_weight(
        &self,
        probability: f64,
        left: &DipoleState,
        right: &DipoleState,
        b: &ImpactParameters,
        max_xsec: f64,
    ) -> f64 {
        probability * HBARC * HBARC * left.weight() * right.weight() * b.weight / max_xsec
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        weight: f64,
        probability: f64,
        strings: Vec<ColourString>,
        catalog: &InteractionCatalog,
        accepted: &[usize],
        untouched_nucleons: usize,
        sink: &mut dyn DiagnosticsSink,
    ) -> Result<FillOutcome, FillerError> {
        if strings.is_empty() {
            log::debug!("no final-state partons left, discarding event");
            sink.record(FillerEvent::Discarded);
            return Ok(FillOutcome::discarded());
        }
        Ok(FillOutcome {
            weight,
            probability,
            strings,
            accepted: accepted.iter().map(|i| catalog.get(*i).clone()).collect(),
            untouched_nucleons,
        })
    }
}
