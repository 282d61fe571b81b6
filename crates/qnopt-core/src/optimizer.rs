//! Shared driver configuration, termination bookkeeping and results.
//!
//! Both quasi-Newton drivers run the same outer loop: evaluate, search along
//! a direction, report progress, then test the stopping rules in a fixed
//! order:
//!
//! 1. the progress callback asks to stop,
//! 2. the evaluation budget is exceeded,
//! 3. `‖g‖ / max(1, ‖x‖) ≤ ε` (convergence),
//! 4. the relative improvement over the last `past` iterations is below `δ`,
//! 5. the iteration budget is exhausted.
//!
//! Steps 2 to 5 are implemented once in [`OptimizerParams::stopping_reason`].
//!
//! # Example
//!
//! ```rust
//! # use qnopt_core::prelude::*;
//! let params = OptimizerParams::<f64>::default()
//!     .with_epsilon(1e-8)
//!     .with_past(3, 1e-6)
//!     .with_max_iterations(500)
//!     .with_line_search(LineSearchKind::BacktrackingWolfe);
//!
//! assert!(params.validate(10).is_ok());
//! assert!(params.validate(0).is_err());
//! ```

use crate::callback::{NoOpCallback, ProgressCallback};
use crate::error::{LineSearchError, OptimizerError, Result};
use crate::line_search::{LineSearchKind, LineSearchParams};
use crate::objective::ObjectiveFunction;
use crate::types::{DVector, Scalar};
use num_traits::Float;
use std::fmt::{self, Debug};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters shared by every driver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizerParams<T: Scalar> {
    /// Convergence tolerance on `‖g‖ / max(1, ‖x‖)`.
    pub epsilon: T,

    /// Length of the relative-improvement window (0 disables the test).
    pub past: usize,

    /// Minimum relative improvement over `past` iterations.
    pub delta: T,

    /// Iteration budget (0 means unbounded).
    pub max_iterations: usize,

    /// Evaluation budget (0 means unbounded).
    pub max_evaluations: usize,

    /// Line search algorithm.
    pub line_search: LineSearchKind,

    /// Line search parameters.
    pub line_search_params: LineSearchParams<T>,
}

impl<T: Scalar> Default for OptimizerParams<T> {
    fn default() -> Self {
        Self {
            epsilon: T::DEFAULT_TOLERANCE,
            past: 0,
            delta: <T as Scalar>::from_f64(1e-5),
            max_iterations: 0,
            max_evaluations: 0,
            line_search: LineSearchKind::default(),
            line_search_params: LineSearchParams::default(),
        }
    }
}

impl<T: Scalar> OptimizerParams<T> {
    /// Creates the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the convergence tolerance.
    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Enables the relative-improvement test over `past` iterations.
    pub fn with_past(mut self, past: usize, delta: T) -> Self {
        self.past = past;
        self.delta = delta;
        self
    }

    /// Sets the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the evaluation budget.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Sets the line search algorithm.
    pub fn with_line_search(mut self, kind: LineSearchKind) -> Self {
        self.line_search = kind;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search_params(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search_params = params;
        self
    }

    /// Checks the parameters for a problem with `n` variables.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(OptimizerError::InvalidDimension { n });
        }
        if self.epsilon < T::zero() {
            return Err(OptimizerError::InvalidEpsilon {
                value: Scalar::to_f64(self.epsilon),
            });
        }
        if self.delta < T::zero() {
            return Err(OptimizerError::InvalidDelta {
                value: Scalar::to_f64(self.delta),
            });
        }
        self.line_search_params.validate(self.line_search)
    }

    /// Whether `gnorm / max(1, xnorm) ≤ ε`.
    pub fn is_converged(&self, xnorm: T, gnorm: T) -> bool {
        gnorm / Float::max(xnorm, T::one()) <= self.epsilon
    }

    /// Applies the post-callback stopping rules for iteration `k` (one-based).
    ///
    /// Returns `None` when the driver should compute a new direction.
    pub fn stopping_reason(
        &self,
        k: usize,
        fx: T,
        xnorm: T,
        gnorm: T,
        evaluations: usize,
        window: &mut ImprovementWindow<T>,
    ) -> Option<TerminationReason> {
        if self.max_evaluations != 0 && evaluations > self.max_evaluations {
            return Some(TerminationReason::MaxEvaluations);
        }
        if self.is_converged(xnorm, gnorm) {
            return Some(TerminationReason::Converged);
        }
        if window.stalled(k, fx, self.delta) {
            return Some(TerminationReason::Stopped);
        }
        if self.max_iterations != 0 && self.max_iterations < k + 1 {
            return Some(TerminationReason::MaxIterations);
        }
        None
    }
}

/// Objective values of the last `past` iterations.
///
/// Slot `k mod past` holds the value recorded `past` iterations ago when
/// iteration `k` is tested.
#[derive(Debug, Clone, PartialEq)]
pub struct ImprovementWindow<T: Scalar> {
    values: Vec<T>,
}

impl<T: Scalar> ImprovementWindow<T> {
    /// Creates a window of length `past` seeded with the initial value.
    pub fn new(past: usize, initial: T) -> Self {
        let mut values = vec![T::zero(); past];
        if let Some(first) = values.first_mut() {
            *first = initial;
        }
        Self { values }
    }

    /// Window length.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the test is disabled.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tests `(f_{k-past} - fx) / fx < δ`, then records `fx`.
    ///
    /// The test is skipped while `k < past`.
    pub fn stalled(&mut self, k: usize, fx: T, delta: T) -> bool {
        let past = self.values.len();
        if past == 0 {
            return false;
        }
        let slot = k % past;
        if past <= k {
            let rate = (self.values[slot] - fx) / fx;
            if rate < delta {
                return true;
            }
        }
        self.values[slot] = fx;
        false
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// `‖g‖ / max(1, ‖x‖) ≤ ε` after some iterations.
    Converged,
    /// The starting point already satisfied the convergence test.
    AlreadyMinimized,
    /// The relative improvement over the window fell below `δ`.
    Stopped,
    /// The iteration budget was exhausted.
    MaxIterations,
    /// The evaluation budget was exceeded.
    MaxEvaluations,
    /// The progress callback asked to stop with the given code.
    CallbackRequest(i32),
    /// The line search failed; the point is the last accepted iterate.
    LineSearchFailed(LineSearchError),
}

impl TerminationReason {
    /// Whether the run solved the problem.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Converged | Self::AlreadyMinimized | Self::Stopped)
    }

    /// Whether the run failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::LineSearchFailed(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => f.write_str("converged"),
            Self::AlreadyMinimized => f.write_str("initial point already minimizes the objective"),
            Self::Stopped => f.write_str("relative improvement below delta"),
            Self::MaxIterations => f.write_str("maximum number of iterations reached"),
            Self::MaxEvaluations => f.write_str("maximum number of evaluations exceeded"),
            Self::CallbackRequest(code) => write!(f, "stopped by callback (code {code})"),
            Self::LineSearchFailed(err) => write!(f, "line search failed: {err}"),
        }
    }
}

/// Outcome of a run. The final point is left in the caller's vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizationResult<T: Scalar> {
    /// Objective value at the final point (including the L1 term under OWL-QN).
    pub value: T,

    /// Gradient norm at the final point (pseudo-gradient under OWL-QN).
    pub gradient_norm: T,

    /// Completed iterations.
    pub iterations: usize,

    /// Objective evaluations.
    pub function_evaluations: usize,

    /// Wall-clock time of the run.
    pub duration: Duration,

    /// Why the run stopped.
    pub termination_reason: TerminationReason,

    /// Whether `termination_reason` is a success.
    pub converged: bool,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a result; `converged` is derived from the reason.
    pub fn new(
        value: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            value,
            gradient_norm: T::zero(),
            iterations,
            function_evaluations: 0,
            duration,
            termination_reason,
            converged: termination_reason.is_success(),
        }
    }

    /// Sets the final gradient norm.
    pub fn with_gradient_norm(mut self, norm: T) -> Self {
        self.gradient_norm = norm;
        self
    }

    /// Sets the evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }
}

/// Interface of the optimization drivers.
///
/// Drivers keep their work buffers between runs but no trajectory data, so
/// two runs from the same point with the same objective are identical.
pub trait Optimizer<T: Scalar>: Debug {
    /// Human-readable name of the algorithm.
    fn name(&self) -> &str;

    /// Minimizes `objective` starting from `x`, reporting each iteration
    /// to `callback`. `x` holds the final point on return.
    ///
    /// # Errors
    ///
    /// Returns an [`OptimizerError`] when the configuration is invalid for
    /// `x`; nothing is evaluated and `x` is untouched in that case. Every
    /// other outcome is described by the returned result.
    fn run_with_callback<F, C>(
        &mut self,
        x: &mut DVector<T>,
        objective: &mut F,
        callback: &mut C,
    ) -> Result<OptimizationResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
        C: ProgressCallback<T> + ?Sized;

    /// Minimizes `objective` starting from `x` without a callback.
    fn run<F>(&mut self, x: &mut DVector<T>, objective: &mut F) -> Result<OptimizationResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        self.run_with_callback(x, objective, &mut NoOpCallback)
    }

    /// Releases the cached work buffers.
    fn clear(&mut self);
}
