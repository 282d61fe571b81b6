//! L-BFGS and OWL-QN optimizer.
//!
//! L-BFGS (Limited-memory Broyden-Fletcher-Goldfarb-Shanno) is a quasi-Newton
//! method that approximates the inverse Hessian from the `m` most recent
//! pairs of position and gradient differences.
//!
//! # Algorithm Overview
//!
//! 1. Evaluate `f(x₀)` and `∇f(x₀)`; stop if `x₀` already satisfies the
//!    convergence test. The first direction is `-∇f(x₀)` with step `1/‖d‖`.
//! 2. Search along `d` with the configured line search.
//! 3. Report progress and test the stopping rules.
//! 4. Store `s = xₖ₊₁ - xₖ`, `y = gₖ₊₁ - gₖ` and compute the next direction
//!    `d = -H·g` with the two-loop recursion, then try step 1.
//!
//! ## Two-Loop Recursion
//!
//! ```text
//! q = -g
//! for i = k-1, k-2, ..., k-m:
//!     α_i = <s_i, q> / <y_i, s_i>
//!     q = q - α_i * y_i
//!
//! q = (<y, s> / <y, y>) * q     // newest pair
//!
//! for i = k-m, k-m+1, ..., k-1:
//!     β = <y_i, q> / <y_i, s_i>
//!     q = q + (α_i - β) * s_i
//! ```
//!
//! ## Orthant-Wise Updates (OWL-QN)
//!
//! With a positive `orthantwise_c` the objective becomes
//! `f(x) + c·Σ_{i∈[start,end)} |x_i|`. The recursion then runs on the
//! pseudo-gradient, components of `d` that do not oppose it are zeroed, and
//! the orthant-restricted backtracking line search keeps every iterate in
//! the orthant of the previous one. Components whose gradient stays within
//! `[-c, c]` end up exactly at zero.
//!
//! # References
//!
//! - J. Nocedal, "Updating Quasi-Newton Matrices with Limited Storage",
//!   Mathematics of Computation 35(151), 1980.
//! - G. Andrew and J. Gao, "Scalable training of L1-regularized log-linear
//!   models", ICML 2007.

use log::{debug, warn};
use qnopt_core::{
    callback::{ProgressAction, ProgressCallback, ProgressInfo},
    error::{OptimizerError, Result},
    history::HistoryBuffer,
    line_search::{
        LineSearch, LineSearchKind, LineSearchParams, LineSearchProblem, LineSearchStrategy,
    },
    objective::{EvaluationContext, ObjectiveFunction},
    optimizer::{
        ImprovementWindow, OptimizationResult, Optimizer, OptimizerParams, TerminationReason,
    },
    orthantwise::OrthantWise,
    types::{DVector, Scalar},
    vector_ops,
    workspace::Workspace,
};
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the L-BFGS optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LBFGSConfig<T: Scalar> {
    /// Parameters shared with the other drivers
    pub params: OptimizerParams<T>,
    /// Number of (s, y) pairs to store
    pub memory_size: usize,
    /// Coefficient of the L1 term (0 disables OWL-QN)
    pub orthantwise_c: T,
    /// First index of the L1-regularized range
    pub orthantwise_start: usize,
    /// One past the last regularized index (`None` means the dimension)
    pub orthantwise_end: Option<usize>,
    /// Whether to skip pairs whose curvature `yᵀs` is not safely positive
    pub use_cautious_updates: bool,
}

impl<T: Scalar> Default for LBFGSConfig<T> {
    fn default() -> Self {
        Self {
            params: OptimizerParams::default(),
            memory_size: 6,
            orthantwise_c: T::zero(),
            orthantwise_start: 0,
            orthantwise_end: None,
            use_cautious_updates: true,
        }
    }
}

impl<T: Scalar> LBFGSConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the memory size (number of vector pairs to store).
    pub fn with_memory_size(mut self, size: usize) -> Self {
        self.memory_size = size;
        self
    }

    /// Replaces the shared driver parameters.
    pub fn with_params(mut self, params: OptimizerParams<T>) -> Self {
        self.params = params;
        self
    }

    /// Sets the convergence tolerance.
    pub fn with_epsilon(mut self, epsilon: T) -> Self {
        self.params.epsilon = epsilon;
        self
    }

    /// Enables the relative-improvement test over `past` iterations.
    pub fn with_past(mut self, past: usize, delta: T) -> Self {
        self.params = self.params.with_past(past, delta);
        self
    }

    /// Sets the iteration budget (0 means unbounded).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.params.max_iterations = max_iterations;
        self
    }

    /// Sets the evaluation budget (0 means unbounded).
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.params.max_evaluations = max_evaluations;
        self
    }

    /// Sets the line search algorithm.
    pub fn with_line_search(mut self, kind: LineSearchKind) -> Self {
        self.params.line_search = kind;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search_params(mut self, params: LineSearchParams<T>) -> Self {
        self.params.line_search_params = params;
        self
    }

    /// Enables orthant-wise L1 regularization with coefficient `c` on `[start, end)`.
    pub fn with_orthantwise(mut self, c: T, start: usize, end: Option<usize>) -> Self {
        self.orthantwise_c = c;
        self.orthantwise_start = start;
        self.orthantwise_end = end;
        self
    }

    /// Enables or disables cautious updates.
    pub fn with_cautious_updates(mut self, cautious: bool) -> Self {
        self.use_cautious_updates = cautious;
        self
    }

    /// Validates the configuration for `n` variables and resolves the line
    /// search together with the orthant-wise term, if any.
    pub fn validate(&self, n: usize) -> Result<(LineSearchStrategy<T>, Option<OrthantWise<T>>)> {
        self.params.validate(n)?;

        if self.orthantwise_c < T::zero() {
            return Err(OptimizerError::InvalidOrthantwise {
                value: Scalar::to_f64(self.orthantwise_c),
            });
        }
        let start = self.orthantwise_start;
        if n < start {
            return Err(OptimizerError::InvalidOrthantwiseStart { start, n });
        }
        let end = self.orthantwise_end.unwrap_or(n);
        if n < end || end < start {
            return Err(OptimizerError::InvalidOrthantwiseEnd { end, n });
        }

        let orthant = (self.orthantwise_c != T::zero())
            .then(|| OrthantWise::new(self.orthantwise_c, start, end));
        let strategy = LineSearchStrategy::for_kind(self.params.line_search, orthant)?;
        Ok((strategy, orthant))
    }

    /// Whether a pair with curvature `ys` and `yy = ‖y‖²` may enter the history.
    fn accepts_pair(&self, ys: T, yy: T) -> bool {
        if self.use_cautious_updates {
            ys > <T as Scalar>::EPSILON * yy
        } else {
            ys != T::zero()
        }
    }
}

/// Buffers kept between runs.
#[derive(Debug, Clone)]
struct LBFGSState<T: Scalar> {
    workspace: Workspace<T>,
    history: HistoryBuffer<T>,
}

impl<T: Scalar> LBFGSState<T> {
    fn new(memory_size: usize, n: usize) -> Self {
        Self {
            workspace: Workspace::with_size(n),
            history: HistoryBuffer::new(memory_size, n),
        }
    }

    fn reset(&mut self, memory_size: usize, n: usize) {
        self.workspace.reset(n);
        self.history.reset(memory_size, n);
    }

    fn memory_usage(&self) -> usize {
        self.workspace.memory_usage() + self.history.memory_usage()
    }
}

/// L-BFGS optimizer, with OWL-QN when an L1 term is configured.
///
/// # Examples
///
/// ```rust
/// use qnopt_core::prelude::*;
/// use qnopt_optim::{LBFGS, LBFGSConfig};
///
/// let mut lbfgs = LBFGS::new(LBFGSConfig::new().with_epsilon(1e-8));
/// let mut x = DVector::from_vec(vec![3.0, 4.0]);
/// let mut sphere = |x: &DVector<f64>, g: &mut DVector<f64>, _step: f64| {
///     g.copy_from(&(x * 2.0));
///     x.norm_squared()
/// };
///
/// let result = lbfgs.run(&mut x, &mut sphere)?;
/// assert!(result.converged);
/// assert!(x.norm() < 1e-6);
/// # Ok::<(), qnopt_core::OptimizerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LBFGS<T: Scalar> {
    config: LBFGSConfig<T>,
    state: Option<LBFGSState<T>>,
}

impl<T: Scalar> LBFGS<T> {
    /// Creates a new L-BFGS optimizer with given configuration.
    pub fn new(config: LBFGSConfig<T>) -> Self {
        Self { config, state: None }
    }

    /// Creates a new L-BFGS optimizer with default configuration.
    pub fn with_default_config() -> Self {
        Self::new(LBFGSConfig::default())
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &LBFGSConfig<T> {
        &self.config
    }
}

impl<T: Scalar> Optimizer<T> for LBFGS<T> {
    fn name(&self) -> &str {
        if self.config.orthantwise_c == T::zero() {
            "L-BFGS"
        } else {
            "OWL-QN"
        }
    }

    fn run_with_callback<F, C>(
        &mut self,
        x: &mut DVector<T>,
        objective: &mut F,
        callback: &mut C,
    ) -> Result<OptimizationResult<T>>
    where
        F: ObjectiveFunction<T> + ?Sized,
        C: ProgressCallback<T> + ?Sized,
    {
        let config = self.config;
        let n = x.len();
        let (strategy, orthant) = config.validate(n)?;
        if let Some(expected) = objective.dimension() {
            if expected != n {
                return Err(OptimizerError::DimensionMismatch { expected, actual: n });
            }
        }

        let params = &config.params;
        let ls_params = &params.line_search_params;
        let start_time = Instant::now();

        let state = self
            .state
            .get_or_insert_with(|| LBFGSState::new(config.memory_size, n));
        state.reset(config.memory_size, n);
        debug!(
            "{}: n = {}, m = {}, line search = {}, {} bytes of state",
            if orthant.is_some() { "OWL-QN" } else { "L-BFGS" },
            n,
            config.memory_size,
            strategy.name(),
            state.memory_usage()
        );
        let LBFGSState { workspace: ws, history } = state;

        callback.on_start(n);

        let mut eval = EvaluationContext::new(objective);
        let mut fx = eval.evaluate(x, &mut ws.g, T::zero());
        if let Some(orthant) = &orthant {
            fx += orthant.penalty(x);
            orthant.pseudo_gradient(&mut ws.pg, x, &ws.g);
        }
        let mut window = ImprovementWindow::new(params.past, fx);

        let steepest = if orthant.is_some() { &ws.pg } else { &ws.g };
        vector_ops::negate_copy(&mut ws.d, steepest);
        let mut gnorm = vector_ops::norm2(steepest);

        let mut iterations = 0;
        let reason = if params.is_converged(vector_ops::norm2(x), gnorm) {
            TerminationReason::AlreadyMinimized
        } else {
            let mut step = T::one() / vector_ops::norm2(&ws.d);
            let mut k = 1;

            loop {
                vector_ops::copy(&mut ws.xp, x);
                vector_ops::copy(&mut ws.gp, &ws.g);
                let fp = fx;

                let searched = strategy.search(
                    &mut eval,
                    LineSearchProblem {
                        x: &mut *x,
                        f: &mut fx,
                        g: &mut ws.g,
                        step: &mut step,
                        d: &ws.d,
                        xp: &ws.xp,
                        gp: if orthant.is_some() { &ws.pg } else { &ws.gp },
                        w: &mut ws.w,
                    },
                    ls_params,
                );
                let trials = match searched {
                    Ok(trials) => trials,
                    Err(err) => {
                        vector_ops::copy(x, &ws.xp);
                        vector_ops::copy(&mut ws.g, &ws.gp);
                        fx = fp;
                        debug!("iteration {k}: line search failed: {err}");
                        break TerminationReason::LineSearchFailed(err);
                    }
                };
                iterations = k;
                if let Some(orthant) = &orthant {
                    orthant.pseudo_gradient(&mut ws.pg, x, &ws.g);
                }

                let xnorm = vector_ops::norm2(x);
                gnorm = vector_ops::norm2(if orthant.is_some() { &ws.pg } else { &ws.g });
                debug!(
                    "iteration {}: fx = {}, xnorm = {}, gnorm = {}, step = {}, trials = {}",
                    k, fx, xnorm, gnorm, step, trials
                );

                let info = ProgressInfo {
                    x: &*x,
                    g: &ws.g,
                    fx,
                    xnorm,
                    gnorm,
                    step,
                    n,
                    iteration: k,
                    line_search_trials: trials,
                    evaluations: eval.evaluations(),
                };
                if let ProgressAction::Stop(code) = callback.on_iteration(&info) {
                    break TerminationReason::CallbackRequest(code);
                }
                if let Some(reason) =
                    params.stopping_reason(k, fx, xnorm, gnorm, eval.evaluations(), &mut window)
                {
                    break reason;
                }

                vector_ops::difference(&mut ws.s, x, &ws.xp);
                vector_ops::difference(&mut ws.y, &ws.g, &ws.gp);
                let ys = vector_ops::dot(&ws.y, &ws.s);
                let yy = vector_ops::dot(&ws.y, &ws.y);
                if config.accepts_pair(ys, yy) {
                    history.push(&ws.s, &ws.y, ys);
                } else {
                    warn!("iteration {k}: skipping curvature pair with ys = {ys}, yy = {yy}");
                }
                k += 1;

                vector_ops::negate_copy(
                    &mut ws.d,
                    if orthant.is_some() { &ws.pg } else { &ws.g },
                );
                history.apply_inverse_hessian(&mut ws.d);
                if let Some(orthant) = &orthant {
                    orthant.constrain_direction(&mut ws.d, &ws.pg);
                }

                step = if history.is_empty() {
                    T::one() / vector_ops::norm2(&ws.d)
                } else {
                    T::one()
                };
            }
        };

        if reason.is_failure() {
            gnorm = vector_ops::norm2(if orthant.is_some() { &ws.pg } else { &ws.g });
        }

        let result = OptimizationResult::new(fx, iterations, start_time.elapsed(), reason)
            .with_gradient_norm(gnorm)
            .with_function_evaluations(eval.evaluations());
        debug!(
            "{} finished after {} iterations and {} evaluations: {}",
            self.name(),
            result.iterations,
            result.function_evaluations,
            result.termination_reason
        );
        callback.on_finish(&result);
        Ok(result)
    }

    fn clear(&mut self) {
        self.state = None;
    }
}
