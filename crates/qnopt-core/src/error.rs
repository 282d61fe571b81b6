//! Error types for quasi-Newton optimization.
//!
//! Two families of errors exist. [`OptimizerError`] reports an invalid
//! configuration and is returned before the objective is ever evaluated.
//! [`LineSearchError`] reports why a line search gave up; drivers surface it
//! through [`TerminationReason::LineSearchFailed`](crate::optimizer::TerminationReason)
//! rather than as an `Err`, because the run still produced a usable point.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors raised while validating an optimizer configuration.
///
/// Validation happens before the first evaluation, so the caller's point is
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    /// The problem has no variables.
    #[error("Invalid number of variables: {n}")]
    InvalidDimension {
        /// Number of variables supplied
        n: usize,
    },

    /// The vector length does not match the dimension declared by the objective.
    #[error("Dimension mismatch: objective expects {expected} variables, got {actual}")]
    DimensionMismatch {
        /// Dimension declared by the objective
        expected: usize,
        /// Length of the starting point
        actual: usize,
    },

    /// Convergence tolerance ε is negative.
    #[error("Invalid convergence tolerance epsilon: {value}")]
    InvalidEpsilon {
        /// Offending value
        value: f64,
    },

    /// Relative-improvement threshold δ is negative.
    #[error("Invalid relative-improvement threshold delta: {value}")]
    InvalidDelta {
        /// Offending value
        value: f64,
    },

    /// Minimum line-search step is not positive.
    #[error("Invalid minimum step: {value}")]
    InvalidMinStep {
        /// Offending value
        value: f64,
    },

    /// Maximum line-search step is below the minimum step.
    #[error("Invalid maximum step {max_step}: must not be below min_step {min_step}")]
    InvalidMaxStep {
        /// Configured maximum step
        max_step: f64,
        /// Configured minimum step
        min_step: f64,
    },

    /// Sufficient-decrease parameter is negative.
    #[error("Invalid sufficient-decrease parameter ftol: {value}")]
    InvalidFtol {
        /// Offending value
        value: f64,
    },

    /// Wolfe curvature parameter is outside (ftol, 1).
    #[error("Invalid Wolfe parameter {wolfe}: must lie in ({ftol}, 1)")]
    InvalidWolfe {
        /// Configured curvature parameter
        wolfe: f64,
        /// Configured sufficient-decrease parameter
        ftol: f64,
    },

    /// Moré–Thuente curvature parameter is negative.
    #[error("Invalid curvature parameter gtol: {value}")]
    InvalidGtol {
        /// Offending value
        value: f64,
    },

    /// Relative interval-width tolerance is negative.
    #[error("Invalid interval tolerance xtol: {value}")]
    InvalidXtol {
        /// Offending value
        value: f64,
    },

    /// Maximum number of line-search trials is zero.
    #[error("Invalid maximum number of line-search trials: {value}")]
    InvalidMaxLineSearch {
        /// Offending value
        value: usize,
    },

    /// Orthant-wise L1 coefficient is negative.
    #[error("Invalid orthant-wise coefficient: {value}")]
    InvalidOrthantwise {
        /// Offending value
        value: f64,
    },

    /// Start of the L1-regularized range is out of bounds.
    #[error("Invalid orthant-wise start {start} for {n} variables")]
    InvalidOrthantwiseStart {
        /// Configured start index
        start: usize,
        /// Number of variables
        n: usize,
    },

    /// End of the L1-regularized range is out of bounds.
    #[error("Invalid orthant-wise end {end} for {n} variables")]
    InvalidOrthantwiseEnd {
        /// Configured end index
        end: usize,
        /// Number of variables
        n: usize,
    },

    /// The requested line search is unknown or not usable with this driver.
    #[error("Invalid line search: {reason}")]
    InvalidLineSearch {
        /// Why the line search was rejected
        reason: String,
    },

    /// The conjugate-gradient update formula is unknown.
    #[error("Invalid conjugate gradient method: {value}")]
    InvalidMomentum {
        /// Offending selector
        value: String,
    },
}

impl OptimizerError {
    /// Create an InvalidLineSearch error with a custom reason.
    pub fn invalid_line_search<S: Into<String>>(reason: S) -> Self {
        Self::InvalidLineSearch {
            reason: reason.into(),
        }
    }

    /// Create an InvalidMomentum error for an unrecognized selector.
    pub fn invalid_momentum<S: std::fmt::Display>(value: S) -> Self {
        Self::InvalidMomentum {
            value: value.to_string(),
        }
    }
}

/// Reasons a line search stops without an acceptable step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineSearchError {
    /// The initial step is not positive.
    #[error("Line search started with a non-positive step")]
    InvalidParameters,

    /// The search direction does not decrease the objective.
    #[error("Search direction is not a descent direction")]
    IncreaseGradient,

    /// The step fell below the configured minimum.
    #[error("Line search step became smaller than the minimum step")]
    MinimumStep,

    /// The step grew beyond the configured maximum.
    #[error("Line search step became larger than the maximum step")]
    MaximumStep,

    /// The trial budget was exhausted.
    #[error("Line search reached the maximum number of trials")]
    MaximumLineSearch,

    /// The bracketing interval collapsed below the relative tolerance.
    #[error("Width of the interval of uncertainty fell below xtol")]
    WidthTooSmall,

    /// Rounding errors prevent further progress.
    #[error("Rounding errors prevent further progress")]
    RoundingError,

    /// A trial step fell outside the interval of uncertainty.
    #[error("Trial step lies outside the interval of uncertainty")]
    OutOfInterval,

    /// The lower bound of the trial interval exceeds the upper bound.
    #[error("Trial interval bounds are inconsistent")]
    IncorrectBounds,
}

/// Result type alias for optimizer configuration and runs.
pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Result type alias for line-search operations.
pub type LineSearchResult<T> = std::result::Result<T, LineSearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OptimizerError::invalid_line_search("orthant-wise updates need backtracking");
        assert!(matches!(err, OptimizerError::InvalidLineSearch { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid line search: orthant-wise updates need backtracking"
        );

        let err = OptimizerError::invalid_momentum(7);
        assert_eq!(err.to_string(), "Invalid conjugate gradient method: 7");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            OptimizerError::InvalidDimension { n: 0 },
            OptimizerError::DimensionMismatch {
                expected: 3,
                actual: 2,
            },
            OptimizerError::InvalidEpsilon { value: -1.0 },
            OptimizerError::InvalidDelta { value: -1e-3 },
            OptimizerError::InvalidMinStep { value: 0.0 },
            OptimizerError::InvalidMaxStep {
                max_step: 1.0,
                min_step: 2.0,
            },
            OptimizerError::InvalidFtol { value: -1.0 },
            OptimizerError::InvalidWolfe {
                wolfe: 1e-5,
                ftol: 1e-4,
            },
            OptimizerError::InvalidGtol { value: -0.5 },
            OptimizerError::InvalidXtol { value: -1.0 },
            OptimizerError::InvalidMaxLineSearch { value: 0 },
            OptimizerError::InvalidOrthantwise { value: -1.0 },
            OptimizerError::InvalidOrthantwiseStart { start: 5, n: 4 },
            OptimizerError::InvalidOrthantwiseEnd { end: 9, n: 4 },
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_line_search_error_display() {
        assert!(LineSearchError::IncreaseGradient
            .to_string()
            .contains("descent"));
        assert!(LineSearchError::MaximumLineSearch
            .to_string()
            .contains("maximum number of trials"));
    }

    #[test]
    fn test_line_search_error_is_copy() {
        let err = LineSearchError::WidthTooSmall;
        let copy = err;
        assert_eq!(err, copy);
    }
}
