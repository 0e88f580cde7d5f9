//! Filler configuration
//!
//! Run-level switches for the event filler. Configurations round-trip
//! through JSON and carry a stable hash so that accumulated statistics can
//! be tagged with the settings that produced them.

use crate::error::FillerError;
use crate::real_state::EvolutionMode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How the excess colour charge of intact valence triangles is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValenceChargeMode {
    /// Leave valence colour flow alone
    #[default]
    None,
    /// Swing one dipole of each intact triangle with its nearest neighbour
    Swing,
}

/// Which gluons the soft-gluon pass may take out of the final state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SoftRemove {
    Off,
    #[default]
    All,
    /// Every gluon except valence ones
    NoValence,
}

/// Configuration for [`EventFiller`](crate::filler::EventFiller)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Evolution-check strategy for the real-parton overlays
    pub evolution_mode: EvolutionMode,

    /// Let every dipole take part in at most one interaction
    pub only_once: bool,

    /// Total rapidity extent of final-state swings (0 disables them)
    pub fs_swing_time: f64,

    /// Width of each final-state swing window
    pub fs_swing_time_step: f64,

    pub valence_charge_normalisation: ValenceChargeMode,

    /// Selection rounds before giving up on an event
    pub max_retries: usize,

    /// Treat final-state momentum mismatches as fatal
    pub check_momentum: bool,

    /// Relative tolerance of the momentum checks
    pub momentum_tolerance: f64,

    /// Gluons whose invariant pt² with their colour neighbours is below
    /// this (GeV²) are absorbed by the neighbours; 0 disables the pass
    pub pt2_cut: f64,

    pub soft_remove: SoftRemove,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            evolution_mode: EvolutionMode::SingleSweep,
            only_once: false,
            fs_swing_time: 0.0,
            fs_swing_time_step: 0.1,
            valence_charge_normalisation: ValenceChargeMode::None,
            max_retries: 10,
            check_momentum: false,
            momentum_tolerance: 1.0e-6,
            pt2_cut: 0.0,
            soft_remove: SoftRemove::All,
        }
    }
}

impl FillerConfig {
    pub fn validate(&self) -> Result<(), FillerError> {
        if !(self.fs_swing_time >= 0.0) {
            return Err(FillerError::InvalidConfig(format!(
                "fs_swing_time must be non-negative, got {}",
                self.fs_swing_time
            )));
        }
        if !(self.fs_swing_time_step > 0.0) {
            return Err(FillerError::InvalidConfig(format!(
                "fs_swing_time_step must be positive, got {}",
                self.fs_swing_time_step
            )));
        }
        if self.max_retries == 0 {
            return Err(FillerError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if !(self.momentum_tolerance > 0.0) {
            return Err(FillerError::InvalidConfig(format!(
                "momentum_tolerance must be positive, got {}",
                self.momentum_tolerance
            )));
        }
        if !(self.pt2_cut >= 0.0 && self.pt2_cut.is_finite()) {
            return Err(FillerError::InvalidConfig(format!(
                "pt2_cut must be non-negative, got {}",
                self.pt2_cut
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, FillerError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FillerError::Serialization(format!("Config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, FillerError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FillerError::Serialization(format!("Config serialization failed: {}", e)))
    }

    /// SHA-256 of the canonical (key-sorted) JSON form
    pub fn config_hash(&self) -> Result<String, FillerError> {
        use serde_json::Value;
        use std::collections::BTreeMap;

        let value = serde_json::to_value(self)
            .map_err(|e| FillerError::Serialization(format!("Config serialization failed: {}", e)))?;

        fn canonicalize(value: Value) -> Value {
            match value {
                Value::Object(map) => {
                    let sorted: BTreeMap<String, Value> =
                        map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                    Value::Object(sorted.into_iter().collect())
                }
                Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
                other => other,
            }
        }

        let json = serde_json::to_string(&canonicalize(value))
            .map_err(|e| FillerError::Serialization(format!("Config serialization failed: {}", e)))?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}
