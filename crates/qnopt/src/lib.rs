//! Limited-memory quasi-Newton and conjugate gradient optimization.
//!
//! `qnopt` bundles the building blocks of [`qnopt_core`] with the drivers of
//! [`qnopt_optim`]:
//!
//! - **L-BFGS** with cautious curvature updates
//! - **OWL-QN** for objectives with an L1 term on a range of variables
//! - **Nonlinear conjugate gradient** with four β formulas
//! - **Line searches**: Moré-Thuente and backtracking (Armijo, Wolfe,
//!   strong Wolfe, orthant-wise)
//!
//! # Quick Start
//!
//! ```rust
//! use qnopt::prelude::*;
//!
//! // Rosenbrock function in two variables
//! let mut rosenbrock = |x: &DVector<f64>, g: &mut DVector<f64>, _step: f64| {
//!     let t1 = 1.0 - x[0];
//!     let t2 = x[1] - x[0] * x[0];
//!     g[0] = -2.0 * t1 - 400.0 * x[0] * t2;
//!     g[1] = 200.0 * t2;
//!     t1 * t1 + 100.0 * t2 * t2
//! };
//!
//! let mut x = DVector::from_vec(vec![-1.2, 1.0]);
//! let mut optimizer = LBFGS::new(LBFGSConfig::new().with_max_iterations(200));
//! let result = optimizer.run(&mut x, &mut rosenbrock)?;
//!
//! assert!(result.converged);
//! assert!((x[0] - 1.0).abs() < 1e-3);
//! # Ok::<(), qnopt::OptimizerError>(())
//! ```

pub use nalgebra;
pub use qnopt_core;
pub use qnopt_optim;

pub use qnopt_core::{LineSearchError, OptimizerError, Result};
pub use qnopt_optim::{CGConfig, ConjugateGradient, ConjugateGradientMethod, LBFGS, LBFGSConfig};

/// Everything needed to configure and run an optimizer.
pub mod prelude {
    pub use qnopt_core::prelude::*;
    pub use qnopt_optim::{CGConfig, ConjugateGradient, ConjugateGradientMethod, LBFGS, LBFGSConfig};
}
