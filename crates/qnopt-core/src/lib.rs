//! Core types and line searches for limited-memory quasi-Newton optimization.
//!
//! This crate provides the building blocks shared by the L-BFGS, OWL-QN and
//! nonlinear conjugate gradient drivers of `qnopt-optim`: the objective and
//! callback interfaces, the line search strategies, the curvature history
//! buffer and the configuration and result types.
//!
//! # Modules
//!
//! - [`callback`]: Per-iteration progress callbacks
//! - [`error`]: Configuration and line search errors
//! - [`history`]: Ring buffer of curvature pairs and the two-loop recursion
//! - [`line_search`]: Moré–Thuente and backtracking line searches
//! - [`objective`]: Objective function interface and evaluation counting
//! - [`optimizer`]: Driver parameters, stopping rules and results
//! - [`orthantwise`]: Pseudo-gradient and projections for L1 regularization
//! - [`types`]: Scalar trait, vector alias and constants
//! - [`vector_ops`]: Dense vector primitives
//! - [`workspace`]: Pre-allocated driver buffers

pub mod callback;
pub mod error;
pub mod history;
pub mod line_search;
pub mod objective;
pub mod optimizer;
pub mod orthantwise;
pub mod types;
pub mod vector_ops;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_functions;

// Re-export commonly used items at the crate root
pub use error::{LineSearchError, LineSearchResult, OptimizerError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use qnopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::callback::{
        LoggingCallback, NoOpCallback, ProgressAction, ProgressCallback, ProgressInfo,
    };
    pub use crate::error::{LineSearchError, LineSearchResult, OptimizerError, Result};
    pub use crate::history::{HistoryBuffer, HistoryEntry};
    pub use crate::line_search::{
        BacktrackingCondition, BacktrackingLineSearch, BacktrackingOwlqnLineSearch, LineSearch,
        LineSearchKind, LineSearchParams, LineSearchProblem, LineSearchStrategy,
        MoreThuenteLineSearch,
    };
    pub use crate::objective::{EvaluationContext, ObjectiveFunction};
    pub use crate::optimizer::{
        ImprovementWindow, OptimizationResult, Optimizer, OptimizerParams, TerminationReason,
    };
    pub use crate::orthantwise::OrthantWise;
    pub use crate::types::{constants, DVector, Scalar};
    pub use crate::workspace::Workspace;
}
