//! Diagnostics
//!
//! The filler reports what happens to every event through a
//! [`DiagnosticsSink`] passed in by the caller. Nothing is accumulated in
//! global state; parallel drivers give each worker its own [`FillerStats`]
//! and reduce them with [`FillerStats::merge`].
//!
//! # Example
//!
//! ```rust
//! use dipsy_filler_core_rs::filler::{DiagnosticsSink, FillerEvent, FillerStats};
//!
//! let mut stats = FillerStats::new();
//! stats.record(FillerEvent::EventStarted { n_left: 3, n_right: 3 });
//! stats.record(FillerEvent::ZeroAmplitude);
//! assert_eq!(stats.events, 1);
//! assert_eq!(stats.zero_amplitude, 1);
//! ```

use crate::error::FillerWarning;
use crate::models::InteractionStatus;
use serde::{Deserialize, Serialize};

/// Why the selector gave up on an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GiveUpReason {
    /// More selection rounds than the retry budget allows
    RetriesExhausted,
    /// No candidate left that could be primary
    EmptyPool,
}

/// Something that happened while filling one event
#[derive(Debug, Clone, PartialEq)]
pub enum FillerEvent {
    EventStarted { n_left: usize, n_right: usize },

    /// Every candidate had zero amplitude
    ZeroAmplitude,

    /// Status of a candidate when the catalog was built
    CandidateStatus { status: InteractionStatus },

    /// An interaction was tried; `weight` is the event weight at stake
    Rescatter { weight: f64 },

    InteractionAccepted { index: usize },

    InteractionRejected { index: usize, status: InteractionStatus },

    /// A selection round ended without any accepted interaction
    RoundFailed { round: usize },

    GaveUp { reason: GiveUpReason, weight: f64 },

    /// Final interaction set
    Selected { accepted: usize, potential: usize },

    Participants { untouched_nucleons: usize },

    Warning(FillerWarning),

    /// The error reconciler changed a parton
    Repair { parton: usize, reason: String },

    /// A soft gluon was absorbed by its colour neighbours
    SoftGluonRemoved { parton: usize },

    StringsExtracted { strings: usize, partons: usize },

    /// Strings could not be produced; the event is dropped
    Discarded,
}

/// Receiver of [`FillerEvent`]s
pub trait DiagnosticsSink {
    fn record(&mut self, event: FillerEvent);
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&mut self, _event: FillerEvent) {}
}

/// Sink that keeps every event, in order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<FillerEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[FillerEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Count events matching a predicate
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&FillerEvent) -> bool,
    {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl DiagnosticsSink for EventLog {
    fn record(&mut self, event: FillerEvent) {
        self.events.push(event);
    }
}

/// Accumulated counters over many events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillerStats {
    pub events: u64,
    pub zero_amplitude: u64,

    /// Summed event weight of every attempted interaction
    pub rescatter_weight: f64,

    /// Summed weight of events that ran out of retries
    pub over_retry_weight: f64,

    pub gave_up_retries: u64,
    pub gave_up_empty: u64,

    pub candidates_accepted: u64,
    pub candidates_prop_fail: u64,
    pub candidates_kine_fail: u64,
    pub candidates_ordering: u64,

    pub interactions_accepted: u64,
    pub rejected_prop_fail: u64,
    pub rejected_kine_fail: u64,
    pub rejected_ordering: u64,
    pub rejected_other: u64,

    pub failed_rounds: u64,
    pub untouched_nucleons: u64,
    pub repairs: u64,
    pub soft_gluons_removed: u64,
    pub warnings: u64,
    pub strings: u64,
    pub discarded: u64,
}

impl FillerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gave_up(&self) -> u64 {
        self.gave_up_retries + self.gave_up_empty
    }

    /// Fold another accumulator into this one
    pub fn merge(&mut self, other: &FillerStats) {
        self.events += other.events;
        self.zero_amplitude += other.zero_amplitude;
        self.rescatter_weight += other.rescatter_weight;
        self.over_retry_weight += other.over_retry_weight;
        self.gave_up_retries += other.gave_up_retries;
        self.gave_up_empty += other.gave_up_empty;
        self.candidates_accepted += other.candidates_accepted;
        self.candidates_prop_fail += other.candidates_prop_fail;
        self.candidates_kine_fail += other.candidates_kine_fail;
        self.candidates_ordering += other.candidates_ordering;
        self.interactions_accepted += other.interactions_accepted;
        self.rejected_prop_fail += other.rejected_prop_fail;
        self.rejected_kine_fail += other.rejected_kine_fail;
        self.rejected_ordering += other.rejected_ordering;
        self.rejected_other += other.rejected_other;
        self.failed_rounds += other.failed_rounds;
        self.untouched_nucleons += other.untouched_nucleons;
        self.repairs += other.repairs;
        self.soft_gluons_removed += other.soft_gluons_removed;
        self.warnings += other.warnings;
        self.strings += other.strings;
        self.discarded += other.discarded;
    }
}

impl DiagnosticsSink for FillerStats {
    fn record(&mut self, event: FillerEvent) {
        match event {
            FillerEvent::EventStarted { .. } => self.events += 1,
            FillerEvent::ZeroAmplitude => self.zero_amplitude += 1,
            FillerEvent::CandidateStatus { status } => match status {
                InteractionStatus::Accepted => self.candidates_accepted += 1,
                InteractionStatus::PropFail => self.candidates_prop_fail += 1,
                InteractionStatus::KineFail => self.candidates_kine_fail += 1,
                InteractionStatus::Ordering => self.candidates_ordering += 1,
                InteractionStatus::Unknown => {}
            },
            FillerEvent::Rescatter { weight } => self.rescatter_weight += weight,
            FillerEvent::InteractionAccepted { .. } => self.interactions_accepted += 1,
            FillerEvent::InteractionRejected { status, .. } => match status {
                InteractionStatus::PropFail => self.rejected_prop_fail += 1,
                InteractionStatus::KineFail => self.rejected_kine_fail += 1,
                InteractionStatus::Ordering => self.rejected_ordering += 1,
                InteractionStatus::Accepted | InteractionStatus::Unknown => {
                    self.rejected_other += 1
                }
            },
            FillerEvent::RoundFailed { .. } => self.failed_rounds += 1,
            FillerEvent::GaveUp { reason, weight } => match reason {
                GiveUpReason::RetriesExhausted => {
                    self.gave_up_retries += 1;
                    self.over_retry_weight += weight;
                }
                GiveUpReason::EmptyPool => self.gave_up_empty += 1,
            },
            FillerEvent::Selected { .. } => {}
            FillerEvent::Participants { untouched_nucleons } => {
                self.untouched_nucleons += untouched_nucleons as u64
            }
            FillerEvent::Warning(_) => self.warnings += 1,
            FillerEvent::Repair { .. } => self.repairs += 1,
            FillerEvent::SoftGluonRemoved { .. } => self.soft_gluons_removed += 1,
            FillerEvent::StringsExtracted { strings, .. } => self.strings += strings as u64,
            FillerEvent::Discarded => self.discarded += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_tally_by_status() {
        let mut stats = FillerStats::new();
        stats.record(FillerEvent::InteractionRejected {
            index: 0,
            status: InteractionStatus::KineFail,
        });
        stats.record(FillerEvent::InteractionRejected {
            index: 1,
            status: InteractionStatus::Ordering,
        });
        stats.record(FillerEvent::GaveUp {
            reason: GiveUpReason::RetriesExhausted,
            weight: 0.25,
        });
        assert_eq!(stats.rejected_kine_fail, 1);
        assert_eq!(stats.rejected_ordering, 1);
        assert_eq!(stats.gave_up(), 1);
        assert_eq!(stats.over_retry_weight, 0.25);
    }

    #[test]
    fn test_stats_merge() {
        let mut a = FillerStats::new();
        a.record(FillerEvent::EventStarted { n_left: 1, n_right: 1 });
        a.record(FillerEvent::Rescatter { weight: 0.5 });
        let mut b = a.clone();
        b.record(FillerEvent::Discarded);
        a.merge(&b);
        assert_eq!(a.events, 2);
        assert_eq!(a.rescatter_weight, 1.0);
        assert_eq!(a.discarded, 1);
    }

    #[test]
    fn test_event_log_keeps_order() {
        let mut log = EventLog::new();
        log.record(FillerEvent::ZeroAmplitude);
        log.record(FillerEvent::Discarded);
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[1], FillerEvent::Discarded);
        assert_eq!(log.count(|e| matches!(e, FillerEvent::ZeroAmplitude)), 1);
    }

    #[test]
    fn test_stats_serialize() {
        let stats = FillerStats::new();
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"gave_up_retries\":0"));
    }
}
