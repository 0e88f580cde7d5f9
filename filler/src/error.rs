//! Error and warning types
//!
//! Three tiers of failure exist in the filler:
//!
//! - **Soft rejections** (an interaction fails ordering or a kinematic veto)
//!   are ordinary `bool`/[`InteractionStatus`](crate::models::InteractionStatus)
//!   values and never reach this module.
//! - **Recoverable conditions** return an [`Outcome`] carrying a
//!   [`FillerWarning`]; processing continues with the value.
//! - **Fatal conditions** are [`FillerError`]s and abort the event.

use thiserror::Error;

/// Errors that abort processing of the current event
#[derive(Debug, Error, PartialEq)]
pub enum FillerError {
    #[error("Consistency failure: {0}")]
    Consistency(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown parton index {0}")]
    UnknownParton(usize),

    #[error("Unknown dipole index {0}")]
    UnknownDipole(usize),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Recoverable conditions, logged and recorded but never fatal
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FillerWarning {
    #[error("boost equation has no non-negative solution (A^2 = {a2}, B = {b}), momentum left unbalanced")]
    NoBoostSolution { a2: f64, b: f64 },

    #[error("space-like gluons: {0}")]
    SpaceLikeGluons(String),

    #[error("unphysical parton {parton}: {reason}")]
    UnphysicalParton { parton: usize, reason: String },

    #[error("final-state momentum mismatch: {0}")]
    MomentumMismatch(String),
}

/// Result of a step that may complete with a warning
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Warning(T, FillerWarning),
}

impl<T> Outcome<T> {
    pub fn is_warning(&self) -> bool {
        matches!(self, Outcome::Warning(..))
    }

    pub fn warning(&self) -> Option<&FillerWarning> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Warning(_, w) => Some(w),
        }
    }

    /// Discard the warning and keep the value
    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(v) | Outcome::Warning(v, _) => v,
        }
    }

    pub fn into_parts(self) -> (T, Option<FillerWarning>) {
        match self {
            Outcome::Ok(v) => (v, None),
            Outcome::Warning(v, w) => (v, Some(w)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parts() {
        let ok: Outcome<u8> = Outcome::Ok(3);
        assert!(!ok.is_warning());
        assert_eq!(ok.into_parts(), (3, None));

        let warned = Outcome::Warning(4u8, FillerWarning::SpaceLikeGluons("x".into()));
        assert!(warned.is_warning());
        assert!(matches!(
            warned.warning(),
            Some(FillerWarning::SpaceLikeGluons(_))
        ));
        assert_eq!(warned.into_value(), 4);
    }

    #[test]
    fn test_error_display() {
        let err = FillerError::Consistency("recheck failed".to_string());
        assert_eq!(err.to_string(), "Consistency failure: recheck failed");
    }
}
