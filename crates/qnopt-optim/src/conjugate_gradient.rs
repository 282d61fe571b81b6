//! Nonlinear conjugate gradient optimizer.
//!
//! Conjugate gradient methods combine the current gradient with the previous
//! search direction. They need only a handful of vectors, which makes them
//! attractive for very large problems, at the price of more iterations than
//! L-BFGS on ill-conditioned objectives.
//!
//! # Algorithm Overview
//!
//! ```text
//! d₀ = -g₀,  step₀ = min(1, 1/‖d₀‖₁)
//! for k = 0, 1, ...:
//!     line search along dₖ
//!     βₖ₊₁ from gₖ₊₁, gₖ and dₖ
//!     dₖ₊₁ = -gₖ₊₁ + βₖ₊₁ dₖ,  step = 1
//! ```
//!
//! ## Supported Methods
//!
//! - **Fletcher-Reeves (FR)**: β = <g_{k+1}, g_{k+1}> / <g_k, g_k>
//! - **Polak-Ribière (PR)**: β = <g_{k+1}, g_{k+1} - g_k> / <g_k, g_k>
//! - **Hestenes-Stiefel (HS)**: β = <g_{k+1}, y_k> / <y_k, d_k> with y_k = g_{k+1} - g_k
//! - **Gilbert-Nocedal (GN)**: the PR value clamped to [-β_FR, β_FR]
//!
//! When β is not finite, or the combined direction is not a descent
//! direction, the method restarts from steepest descent. A positive
//! `restart_period` additionally forces a restart every that many iterations.
//!
//! # References
//!
//! - J. Nocedal and S. Wright, "Numerical Optimization", Chapter 5, 2006.
//! - J. C. Gilbert and J. Nocedal, "Global convergence properties of conjugate
//!   gradient methods for optimization", SIAM J. Optimization 2(1), 1992.

use log::debug;
use qnopt_core::{
    callback::{ProgressAction, ProgressCallback, ProgressInfo},
    error::{OptimizerError, Result},
    line_search::{
        LineSearch, LineSearchKind, LineSearchParams, LineSearchProblem, LineSearchStrategy,
    },
    objective::{EvaluationContext, ObjectiveFunction},
    optimizer::{
        ImprovementWindow, OptimizationResult, Optimizer, OptimizerParams, TerminationReason,
    },
    types::{DVector, Scalar},
    vector_ops,
    workspace::Workspace,
};
use num_traits::Float;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Formula for the momentum coefficient β.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConjugateGradientMethod {
    /// Fletcher-Reeves
    #[default]
    FletcherReeves,
    /// Polak-Ribière
    PolakRibiere,
    /// Hestenes-Stiefel
    HestenesStiefel,
    /// Gilbert-Nocedal (Polak-Ribière bounded by Fletcher-Reeves)
    GilbertNocedal,
}

impl ConjugateGradientMethod {
    /// All selectable methods.
    pub const ALL: [Self; 4] = [
        Self::FletcherReeves,
        Self::PolakRibiere,
        Self::HestenesStiefel,
        Self::GilbertNocedal,
    ];

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FletcherReeves => "fletcher-reeves",
            Self::PolakRibiere => "polak-ribiere",
            Self::HestenesStiefel => "hestenes-stiefel",
            Self::GilbertNocedal => "gilbert-nocedal",
        }
    }

    /// Computes β for the new gradient `g`, the previous gradient `gp` and
    /// the previous direction `dp`. `tmp` receives `g - gp`.
    pub fn beta<T: Scalar>(
        self,
        g: &DVector<T>,
        gp: &DVector<T>,
        dp: &DVector<T>,
        tmp: &mut DVector<T>,
    ) -> T {
        let gpgp = vector_ops::dot(gp, gp);
        match self {
            Self::FletcherReeves => vector_ops::dot(g, g) / gpgp,
            Self::PolakRibiere => {
                vector_ops::difference(tmp, g, gp);
                vector_ops::dot(g, &*tmp) / gpgp
            }
            Self::HestenesStiefel => {
                vector_ops::difference(tmp, g, gp);
                let denominator = vector_ops::dot(&*tmp, dp);
                if denominator == T::zero() {
                    T::zero()
                } else {
                    vector_ops::dot(g, &*tmp) / denominator
                }
            }
            Self::GilbertNocedal => {
                let fr = vector_ops::dot(g, g) / gpgp;
                vector_ops::difference(tmp, g, gp);
                let pr = vector_ops::dot(g, &*tmp) / gpgp;
                Float::max(-fr, Float::min(pr, fr))
            }
        }
    }
}

impl fmt::Display for ConjugateGradientMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConjugateGradientMethod {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "fletcher-reeves" | "fr" => Ok(Self::FletcherReeves),
            "polak-ribiere" | "pr" => Ok(Self::PolakRibiere),
            "hestenes-stiefel" | "hs" => Ok(Self::HestenesStiefel),
            "gilbert-nocedal" | "gn" => Ok(Self::GilbertNocedal),
            _ => Err(OptimizerError::invalid_momentum(s)),
        }
    }
}

impl TryFrom<i32> for ConjugateGradientMethod {
    type Error = OptimizerError;

    /// Integer selectors: 0 FR, 1 PR, 2 HS, 3 GN.
    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::FletcherReeves),
            1 => Ok(Self::PolakRibiere),
            2 => Ok(Self::HestenesStiefel),
            3 => Ok(Self::GilbertNocedal),
            other => Err(OptimizerError::invalid_momentum(other)),
        }
    }
}

/// Configuration for the Conjugate Gradient optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CGConfig<T: Scalar> {
    /// Parameters shared with the other drivers
    pub params: OptimizerParams<T>,
    /// Formula for β
    pub method: ConjugateGradientMethod,
    /// Restart with steepest descent every n iterations (0 means never)
    pub restart_period: usize,
}

impl<T: Scalar> Default for CGConfig<T> {
    fn default() -> Self {
        Self {
            params: OptimizerParams::default(),
            method: ConjugateGradientMethod::default(),
            restart_period: 0,
        }
    }
}

impl<T: Scalar> CGConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the β formula.
    pub fn with_method(mut self, method: ConjugateGradientMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the restart period (0 disables periodic restarts).
    pub fn with_restart_period(mut self, period: usize) -> Self {
        self.restart_period = period;
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

    /// Creates a configuration for Fletcher-Reeves.
    pub fn fletcher_reeves() -> Self {
        Self::new().with_method(ConjugateGradientMethod::FletcherReeves)
    }

    /// Creates a configuration for Polak-Ribière.
    pub fn polak_ribiere() -> Self {
        Self::new().with_method(ConjugateGradientMethod::PolakRibiere)
    }

    /// Creates a configuration for Hestenes-Stiefel.
    pub fn hestenes_stiefel() -> Self {
        Self::new().with_method(ConjugateGradientMethod::HestenesStiefel)
    }

    /// Creates a configuration for Gilbert-Nocedal.
    pub fn gilbert_nocedal() -> Self {
        Self::new().with_method(ConjugateGradientMethod::GilbertNocedal)
    }

    /// Validates the configuration for `n` variables and resolves the line search.
    pub fn validate(&self, n: usize) -> Result<LineSearchStrategy<T>> {
        self.params.validate(n)?;
        if self.params.line_search == LineSearchKind::BacktrackingOwlqn {
            return Err(OptimizerError::invalid_line_search(
                "conjugate gradient does not support orthant-wise backtracking",
            ));
        }
        LineSearchStrategy::for_kind(self.params.line_search, None)
    }
}

/// Nonlinear Conjugate Gradient optimizer.
///
/// # Examples
///
/// ```rust
/// use qnopt_core::prelude::*;
/// use qnopt_optim::{CGConfig, ConjugateGradient};
///
/// let mut cg = ConjugateGradient::new(CGConfig::polak_ribiere().with_epsilon(1e-8));
/// let mut x = DVector::from_vec(vec![3.0, -4.0]);
/// let mut sphere = |x: &DVector<f64>, g: &mut DVector<f64>, _step: f64| {
///     g.copy_from(&(x * 2.0));
///     x.norm_squared()
/// };
///
/// let result = cg.run(&mut x, &mut sphere)?;
/// assert!(result.converged);
/// # Ok::<(), qnopt_core::OptimizerError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConjugateGradient<T: Scalar> {
    config: CGConfig<T>,
    workspace: Option<Workspace<T>>,
}

impl<T: Scalar> ConjugateGradient<T> {
    /// Creates a new Conjugate Gradient optimizer with given configuration.
    pub fn new(config: CGConfig<T>) -> Self {
        Self {
            config,
            workspace: None,
        }
    }

    /// Creates a new optimizer with default configuration.
    pub fn with_default_config() -> Self {
        Self::new(CGConfig::default())
    }

    /// Returns the optimizer configuration.
    pub fn config(&self) -> &CGConfig<T> {
        &self.config
    }
}

impl<T: Scalar> Optimizer<T> for ConjugateGradient<T> {
    fn name(&self) -> &str {
        match self.config.method {
            ConjugateGradientMethod::FletcherReeves => "CG-FR",
            ConjugateGradientMethod::PolakRibiere => "CG-PR",
            ConjugateGradientMethod::HestenesStiefel => "CG-HS",
            ConjugateGradientMethod::GilbertNocedal => "CG-GN",
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
        let strategy = config.validate(n)?;
        if let Some(expected) = objective.dimension() {
            if expected != n {
                return Err(OptimizerError::DimensionMismatch { expected, actual: n });
            }
        }

        let params = &config.params;
        let ls_params = &params.line_search_params;
        let start_time = Instant::now();

        let ws = self
            .workspace
            .get_or_insert_with(|| Workspace::with_size(n));
        ws.reset(n);

        debug!(
            "CG ({}): n = {}, line search = {}, {} bytes of state",
            config.method,
            n,
            strategy.name(),
            ws.memory_usage()
        );
        callback.on_start(n);

        let mut eval = EvaluationContext::new(objective);
        let mut fx = eval.evaluate(x, &mut ws.g, T::zero());
        let mut window = ImprovementWindow::new(params.past, fx);

        vector_ops::negate_copy(&mut ws.d, &ws.g);
        let mut gnorm = vector_ops::norm2(&ws.g);

        let mut iterations = 0;
        let reason = if params.is_converged(vector_ops::norm2(x), gnorm) {
            TerminationReason::AlreadyMinimized
        } else {
            let mut step = Float::min(T::one(), T::one() / vector_ops::norm1(&ws.d, 0..n));
            let mut k = 1;

            loop {
                vector_ops::copy(&mut ws.xp, x);
                vector_ops::copy(&mut ws.gp, &ws.g);
                vector_ops::copy(&mut ws.dp, &ws.d);
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
                        gp: &ws.gp,
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

                let xnorm = vector_ops::norm2(x);
                gnorm = vector_ops::norm2(&ws.g);
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

                let beta = config.method.beta(&ws.g, &ws.gp, &ws.dp, &mut ws.tmp);
                vector_ops::negate_copy(&mut ws.d, &ws.g);
                let periodic = config.restart_period > 0 && k % config.restart_period == 0;
                if Float::is_finite(beta) && !periodic {
                    vector_ops::axpy(&mut ws.d, &ws.dp, beta);
                    if vector_ops::dot(&ws.g, &ws.d) >= T::zero() {
                        debug!("iteration {k}: not a descent direction, restarting");
                        vector_ops::negate_copy(&mut ws.d, &ws.g);
                    }
                } else if !periodic {
                    debug!("iteration {k}: beta = {beta}, restarting");
                }
                k += 1;
                step = T::one();
            }
        };

        if reason.is_failure() {
            gnorm = vector_ops::norm2(&ws.g);
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
        self.workspace = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use qnopt_core::test_functions::Quadratic;

    #[test]
    fn test_cg_config() {
        let config = CGConfig::<f64>::fletcher_reeves()
            .with_restart_period(10)
            .with_epsilon(1e-8)
            .with_max_iterations(50);

        assert_eq!(config.method, ConjugateGradientMethod::FletcherReeves);
        assert_eq!(config.restart_period, 10);
        assert_eq!(config.params.epsilon, 1e-8);
        assert_eq!(config.params.max_iterations, 50);
    }

    #[test]
    fn test_cg_variants() {
        assert_eq!(
            CGConfig::<f64>::fletcher_reeves().method,
            ConjugateGradientMethod::FletcherReeves
        );
        assert_eq!(
            CGConfig::<f64>::polak_ribiere().method,
            ConjugateGradientMethod::PolakRibiere
        );
        assert_eq!(
            CGConfig::<f64>::hestenes_stiefel().method,
            ConjugateGradientMethod::HestenesStiefel
        );
        assert_eq!(
            CGConfig::<f64>::gilbert_nocedal().method,
            ConjugateGradientMethod::GilbertNocedal
        );
        assert_eq!(CGConfig::<f64>::default().method, ConjugateGradientMethod::FletcherReeves);
    }

    #[test]
    fn test_method_selectors() {
        for (i, method) in ConjugateGradientMethod::ALL.into_iter().enumerate() {
            assert_eq!(ConjugateGradientMethod::try_from(i as i32).unwrap(), method);
            assert_eq!(method.as_str().parse::<ConjugateGradientMethod>().unwrap(), method);
        }
        assert_eq!(
            "PR".parse::<ConjugateGradientMethod>().unwrap(),
            ConjugateGradientMethod::PolakRibiere
        );
        assert_eq!(
            "hestenes_stiefel".parse::<ConjugateGradientMethod>().unwrap(),
            ConjugateGradientMethod::HestenesStiefel
        );

        assert!(matches!(
            ConjugateGradientMethod::try_from(4i32),
            Err(OptimizerError::InvalidMomentum { .. })
        ));
        assert!(matches!(
            "dai-yuan".parse::<ConjugateGradientMethod>(),
            Err(OptimizerError::InvalidMomentum { .. })
        ));
    }

    #[test]
    fn test_beta_formulas() {
        let g = DVector::from_vec(vec![1.0, 2.0]);
        let gp = DVector::from_vec(vec![2.0, 0.0]);
        let dp = DVector::from_vec(vec![-1.0, 1.0]);
        let mut tmp = DVector::zeros(2);

        // g·g = 5, gp·gp = 4, g - gp = (-1, 2), g·(g - gp) = 3, (g - gp)·dp = 3
        let fr = ConjugateGradientMethod::FletcherReeves.beta(&g, &gp, &dp, &mut tmp);
        let pr = ConjugateGradientMethod::PolakRibiere.beta(&g, &gp, &dp, &mut tmp);
        let hs = ConjugateGradientMethod::HestenesStiefel.beta(&g, &gp, &dp, &mut tmp);
        let gn = ConjugateGradientMethod::GilbertNocedal.beta(&g, &gp, &dp, &mut tmp);

        assert_relative_eq!(fr, 1.25);
        assert_relative_eq!(pr, 0.75);
        assert_relative_eq!(hs, 1.0);
        assert_relative_eq!(gn, 0.75);
    }

    #[test]
    fn test_gilbert_nocedal_clamps() {
        // g·(g - gp) = -2, gp·gp = 9, g·g = 1: PR = -2/9 lies below -FR = -1/9
        let g = DVector::from_vec(vec![1.0, 0.0]);
        let gp = DVector::from_vec(vec![3.0, 0.0]);
        let dp = DVector::from_vec(vec![-1.0, 0.0]);
        let mut tmp = DVector::zeros(2);

        let gn = ConjugateGradientMethod::GilbertNocedal.beta(&g, &gp, &dp, &mut tmp);
        assert_relative_eq!(gn, -1.0 / 9.0);
    }

    #[test]
    fn test_hestenes_stiefel_zero_denominator() {
        let g = DVector::from_vec(vec![1.0, 1.0]);
        let gp = DVector::from_vec(vec![0.0, 2.0]);
        let dp = DVector::from_vec(vec![1.0, 1.0]);
        let mut tmp = DVector::zeros(2);

        let hs = ConjugateGradientMethod::HestenesStiefel.beta(&g, &gp, &dp, &mut tmp);
        assert_eq!(hs, 0.0);
    }

    #[test]
    fn test_rejects_owlqn_line_search() {
        let config = CGConfig::<f64>::new().with_line_search(LineSearchKind::BacktrackingOwlqn);
        assert!(matches!(config.validate(2), Err(OptimizerError::InvalidLineSearch { .. })));

        let mut cg = ConjugateGradient::new(config);
        let mut x = DVector::from_vec(vec![1.0, 1.0]);
        assert!(cg.run(&mut x, &mut Quadratic::sphere(2)).is_err());
        assert_eq!(x, DVector::from_vec(vec![1.0, 1.0]));
    }

    #[test]
    fn test_name_and_clear() {
        let mut cg = ConjugateGradient::<f64>::new(CGConfig::gilbert_nocedal());
        assert_eq!(cg.name(), "CG-GN");

        let mut x = DVector::from_vec(vec![2.0, -1.0]);
        let result = cg.run(&mut x, &mut Quadratic::sphere(2)).unwrap();
        assert!(result.converged);
        assert!(cg.workspace.is_some());

        cg.clear();
        assert!(cg.workspace.is_none());
    }

    #[test]
    fn test_periodic_restart_still_converges() {
        let mut f = Quadratic::new(
            DVector::from_vec(vec![1.0, 4.0, 9.0]),
            DVector::from_vec(vec![-1.0, 0.5, 2.0]),
        );
        let mut x = DVector::zeros(3);
        let mut cg = ConjugateGradient::new(
            CGConfig::polak_ribiere()
                .with_restart_period(1)
                .with_epsilon(1e-8),
        );

        let result = cg.run(&mut x, &mut f).unwrap();

        assert_eq!(result.termination_reason, TerminationReason::Converged);
        for i in 0..3 {
            assert_relative_eq!(x[i], f.minimizer()[i], epsilon = 1e-6);
        }
    }
}
