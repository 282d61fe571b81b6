//! qnopt Optimization - Quasi-Newton and conjugate gradient drivers.
//!
//! This crate provides the optimization drivers built on the line searches
//! and shared types of `qnopt-core`.
//!
//! # Available Optimizers
//!
//! - **L-BFGS**: Limited memory Broyden-Fletcher-Goldfarb-Shanno, with
//!   OWL-QN for L1-regularized objectives
//! - **Conjugate Gradient**: Nonlinear CG with Fletcher-Reeves, Polak-Ribière,
//!   Hestenes-Stiefel or Gilbert-Nocedal updates
//!
//! # Examples
//!
//! ```rust
//! use qnopt_optim::{LBFGS, LBFGSConfig, LineSearchKind, Optimizer};
//! use nalgebra::DVector;
//!
//! // L1-regularized least squares on a single variable
//! let mut optimizer = LBFGS::new(
//!     LBFGSConfig::new()
//!         .with_line_search(LineSearchKind::BacktrackingWolfe)
//!         .with_orthantwise(1.0, 0, None)
//! );
//!
//! let mut objective = |x: &DVector<f64>, g: &mut DVector<f64>, _step: f64| {
//!     g[0] = 2.0 * (x[0] - 0.2);
//!     (x[0] - 0.2).powi(2)
//! };
//!
//! let mut x = DVector::from_vec(vec![1.0]);
//! let result = optimizer.run(&mut x, &mut objective)?;
//! assert!(result.converged);
//! assert_eq!(x[0], 0.0);
//! # Ok::<(), qnopt_core::OptimizerError>(())
//! ```

pub mod conjugate_gradient;
pub mod lbfgs;

// Re-export main optimizers for convenience
pub use conjugate_gradient::{CGConfig, ConjugateGradient, ConjugateGradientMethod};
pub use lbfgs::{LBFGS, LBFGSConfig};

// Re-export commonly used items from core
pub use qnopt_core::{
    callback::{ProgressAction, ProgressCallback, ProgressInfo},
    line_search::{LineSearchKind, LineSearchParams},
    optimizer::{OptimizationResult, Optimizer, OptimizerParams, TerminationReason},
};
