//! Line search algorithms for quasi-Newton optimization.
//!
//! A line search chooses the step length `α > 0` along a descent direction
//! `d` from the current point `xₚ`, i.e. it approximately minimizes
//!
//! φ(α) = f(xₚ + α d)
//!
//! subject to conditions that guarantee progress of the outer method.
//!
//! # Acceptance Conditions
//!
//! With `φ'(0) = ∇f(xₚ)ᵀd < 0`:
//!
//! ### Armijo Condition (Sufficient Decrease)
//! φ(α) ≤ φ(0) + ftol · α · φ'(0)
//!
//! ### Wolfe Condition
//! Armijo plus the curvature condition φ'(α) ≥ wolfe · φ'(0).
//!
//! ### Strong Wolfe Condition
//! Armijo plus |φ'(α)| ≤ wolfe · |φ'(0)|.
//!
//! The Moré–Thuente search accepts a step satisfying Armijo together with
//! |φ'(α)| ≤ gtol · |φ'(0)|.
//!
//! # Available Strategies
//!
//! - [`BacktrackingLineSearch`]: shrink by 0.5 or grow by 2.1 until the
//!   configured condition holds.
//! - [`BacktrackingOwlqnLineSearch`]: backtracking restricted to an orthant,
//!   for L1-regularized objectives.
//! - [`MoreThuenteLineSearch`]: safeguarded cubic/quadratic interpolation
//!   with bracketing, driven by [`TrialInterval`].
//!
//! All strategies share [`LineSearchParams`] and communicate failures
//! through [`LineSearchError`].
//!
//! # Protocol
//!
//! A search receives a [`LineSearchProblem`]: the previous point `xp`, the
//! gradient `gp` there (the pseudo-gradient under OWL-QN), the value `f`
//! at `xp`, the direction `d` and an initial step. On success `x`, `f`
//! and `g` hold the accepted point, its value and its gradient, `step`
//! holds the accepted step and the number of trials is returned. On
//! failure they hold the last trial, and the caller is expected to restore
//! the previous point.

mod backtracking;
mod more_thuente;
mod owlqn;
pub mod trial_interval;

pub use backtracking::{BacktrackingCondition, BacktrackingLineSearch};
pub use more_thuente::MoreThuenteLineSearch;
pub use owlqn::BacktrackingOwlqnLineSearch;
pub use trial_interval::{StepPoint, TrialInterval};

use crate::error::{LineSearchError, LineSearchResult, OptimizerError, Result};
use crate::objective::{EvaluationContext, ObjectiveFunction};
use crate::orthantwise::OrthantWise;
use crate::types::{DVector, Scalar};
use std::fmt::{self, Debug};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line search algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LineSearchKind {
    /// Moré–Thuente search with interpolation and bracketing.
    #[default]
    MoreThuente,
    /// Backtracking until the Armijo condition holds.
    BacktrackingArmijo,
    /// Backtracking until the Wolfe conditions hold.
    BacktrackingWolfe,
    /// Backtracking until the strong Wolfe conditions hold.
    BacktrackingStrongWolfe,
    /// Orthant-restricted backtracking for L1-regularized objectives.
    BacktrackingOwlqn,
}

impl LineSearchKind {
    /// All selectable kinds.
    pub const ALL: [Self; 5] = [
        Self::MoreThuente,
        Self::BacktrackingArmijo,
        Self::BacktrackingWolfe,
        Self::BacktrackingStrongWolfe,
        Self::BacktrackingOwlqn,
    ];

    /// Whether this kind is one of the backtracking variants.
    pub fn is_backtracking(self) -> bool {
        !matches!(self, Self::MoreThuente)
    }

    /// Whether validation must check the Wolfe parameter for this kind.
    pub fn uses_wolfe_parameter(self) -> bool {
        matches!(self, Self::BacktrackingWolfe | Self::BacktrackingStrongWolfe)
    }

    /// Short lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MoreThuente => "more-thuente",
            Self::BacktrackingArmijo => "armijo",
            Self::BacktrackingWolfe => "wolfe",
            Self::BacktrackingStrongWolfe => "strong-wolfe",
            Self::BacktrackingOwlqn => "owlqn",
        }
    }
}

impl fmt::Display for LineSearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineSearchKind {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "more-thuente" | "morethuente" | "default" => Ok(Self::MoreThuente),
            "armijo" | "backtracking-armijo" => Ok(Self::BacktrackingArmijo),
            "wolfe" | "backtracking" | "backtracking-wolfe" => Ok(Self::BacktrackingWolfe),
            "strong-wolfe" | "backtracking-strong-wolfe" => Ok(Self::BacktrackingStrongWolfe),
            "owlqn" | "backtracking-owlqn" => Ok(Self::BacktrackingOwlqn),
            other => Err(OptimizerError::invalid_line_search(format!(
                "unknown line search '{other}'"
            ))),
        }
    }
}

impl TryFrom<i32> for LineSearchKind {
    type Error = OptimizerError;

    /// Integer selectors: 0 Moré–Thuente, 1 Armijo, 2 Wolfe, 3 strong Wolfe, 4 OWL-QN.
    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::MoreThuente),
            1 => Ok(Self::BacktrackingArmijo),
            2 => Ok(Self::BacktrackingWolfe),
            3 => Ok(Self::BacktrackingStrongWolfe),
            4 => Ok(Self::BacktrackingOwlqn),
            other => Err(OptimizerError::invalid_line_search(format!(
                "unknown line search selector {other}"
            ))),
        }
    }
}

/// Parameters shared by every line search.
///
/// The defaults are the classic L-BFGS settings:
///
/// ```rust
/// # use qnopt_core::prelude::*;
/// let params = LineSearchParams::<f64>::default();
/// assert_eq!(params.max_trials, 40);
/// assert_eq!(params.ftol, 1e-4);
/// params.validate(LineSearchKind::BacktrackingWolfe)?;
/// # Ok::<(), qnopt_core::OptimizerError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// Maximum number of trials per line search.
    pub max_trials: usize,

    /// Smallest admissible step.
    pub min_step: T,

    /// Largest admissible step.
    pub max_step: T,

    /// Sufficient-decrease parameter, `0 ≤ ftol < 0.5` in practice.
    pub ftol: T,

    /// Curvature parameter of the backtracking Wolfe tests, `ftol < wolfe < 1`.
    pub wolfe: T,

    /// Curvature parameter of the Moré–Thuente acceptance test.
    pub gtol: T,

    /// Relative tolerance on the Moré–Thuente interval width.
    pub xtol: T,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            max_trials: 40,
            min_step: T::MIN_STEP_SIZE,
            max_step: T::MAX_STEP_SIZE,
            ftol: <T as Scalar>::from_f64(1e-4),
            wolfe: <T as Scalar>::from_f64(0.9),
            gtol: <T as Scalar>::from_f64(0.9),
            xtol: <T as Scalar>::from_f64(1e-16),
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Sets the maximum number of trials.
    pub fn with_max_trials(mut self, max_trials: usize) -> Self {
        self.max_trials = max_trials;
        self
    }

    /// Sets the admissible step range.
    pub fn with_step_bounds(mut self, min_step: T, max_step: T) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    /// Sets the sufficient-decrease parameter.
    pub fn with_ftol(mut self, ftol: T) -> Self {
        self.ftol = ftol;
        self
    }

    /// Sets the backtracking curvature parameter.
    pub fn with_wolfe(mut self, wolfe: T) -> Self {
        self.wolfe = wolfe;
        self
    }

    /// Sets the Moré–Thuente curvature parameter.
    pub fn with_gtol(mut self, gtol: T) -> Self {
        self.gtol = gtol;
        self
    }

    /// Sets the relative interval-width tolerance.
    pub fn with_xtol(mut self, xtol: T) -> Self {
        self.xtol = xtol;
        self
    }

    /// Checks the parameters for use with `kind`.
    ///
    /// The Wolfe parameter only matters to the backtracking Wolfe variants
    /// and is not checked otherwise.
    pub fn validate(&self, kind: LineSearchKind) -> Result<()> {
        if self.min_step <= T::zero() {
            return Err(OptimizerError::InvalidMinStep {
                value: Scalar::to_f64(self.min_step),
            });
        }
        if self.max_step < self.min_step {
            return Err(OptimizerError::InvalidMaxStep {
                max_step: Scalar::to_f64(self.max_step),
                min_step: Scalar::to_f64(self.min_step),
            });
        }
        if self.ftol < T::zero() {
            return Err(OptimizerError::InvalidFtol {
                value: Scalar::to_f64(self.ftol),
            });
        }
        if kind.uses_wolfe_parameter() && (self.wolfe <= self.ftol || T::one() <= self.wolfe) {
            return Err(OptimizerError::InvalidWolfe {
                wolfe: Scalar::to_f64(self.wolfe),
                ftol: Scalar::to_f64(self.ftol),
            });
        }
        if self.gtol < T::zero() {
            return Err(OptimizerError::InvalidGtol {
                value: Scalar::to_f64(self.gtol),
            });
        }
        if self.xtol < T::zero() {
            return Err(OptimizerError::InvalidXtol {
                value: Scalar::to_f64(self.xtol),
            });
        }
        if self.max_trials == 0 {
            return Err(OptimizerError::InvalidMaxLineSearch {
                value: self.max_trials,
            });
        }
        Ok(())
    }
}

/// State handed to a line search for one call.
///
/// `x`, `f` and `g` are outputs; `xp`, `gp` and `d` describe the starting
/// point. `w` is scratch space of the problem dimension.
pub struct LineSearchProblem<'a, T: Scalar> {
    /// Accepted point on success, last trial on failure.
    pub x: &'a mut DVector<T>,
    /// Value at `xp` on entry, value at `x` on exit.
    pub f: &'a mut T,
    /// Gradient at `x` on exit.
    pub g: &'a mut DVector<T>,
    /// Initial step on entry, last step on exit.
    pub step: &'a mut T,
    /// Search direction.
    pub d: &'a DVector<T>,
    /// Starting point.
    pub xp: &'a DVector<T>,
    /// Gradient (or pseudo-gradient) at `xp`.
    pub gp: &'a DVector<T>,
    /// Scratch buffer.
    pub w: &'a mut DVector<T>,
}

impl<T: Scalar> Debug for LineSearchProblem<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineSearchProblem")
            .field("f", &*self.f)
            .field("step", &*self.step)
            .field("n", &self.xp.len())
            .finish_non_exhaustive()
    }
}

/// Common interface of the line search strategies.
pub trait LineSearch<T: Scalar>: Debug {
    /// Runs the search and returns the number of trials on success.
    fn search<F>(
        &self,
        eval: &mut EvaluationContext<'_, T, F>,
        problem: LineSearchProblem<'_, T>,
        params: &LineSearchParams<T>,
    ) -> LineSearchResult<usize>
    where
        F: ObjectiveFunction<T> + ?Sized;

    /// Human-readable name.
    fn name(&self) -> &'static str;
}

/// Checks the common preconditions and returns `φ'(0)`.
///
/// A non-finite directional derivative is treated as a non-descent direction.
pub(crate) fn initial_slope<T: Scalar>(
    step: T,
    gp: &DVector<T>,
    d: &DVector<T>,
) -> LineSearchResult<T> {
    if step <= T::zero() {
        return Err(LineSearchError::InvalidParameters);
    }
    let dginit = gp.dot(d);
    if !(dginit < T::zero()) {
        return Err(LineSearchError::IncreaseGradient);
    }
    Ok(dginit)
}

/// A line search selected at run time from a [`LineSearchKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSearchStrategy<T: Scalar> {
    /// Moré–Thuente.
    MoreThuente(MoreThuenteLineSearch),
    /// Plain backtracking.
    Backtracking(BacktrackingLineSearch),
    /// Orthant-restricted backtracking.
    BacktrackingOwlqn(BacktrackingOwlqnLineSearch<T>),
}

impl<T: Scalar> LineSearchStrategy<T> {
    /// Resolves `kind` into a strategy.
    ///
    /// With an orthant-wise term every backtracking kind runs the OWL-QN
    /// search and Moré–Thuente is rejected. Without one, the OWL-QN kind is
    /// rejected.
    pub fn for_kind(kind: LineSearchKind, orthant: Option<OrthantWise<T>>) -> Result<Self> {
        match (kind, orthant) {
            (LineSearchKind::MoreThuente, Some(_)) => Err(OptimizerError::invalid_line_search(
                "orthant-wise updates require a backtracking line search",
            )),
            (_, Some(orthant)) => Ok(Self::BacktrackingOwlqn(BacktrackingOwlqnLineSearch::new(
                orthant,
            ))),
            (LineSearchKind::MoreThuente, None) => Ok(Self::MoreThuente(MoreThuenteLineSearch)),
            (LineSearchKind::BacktrackingArmijo, None) => Ok(Self::Backtracking(
                BacktrackingLineSearch::new(BacktrackingCondition::Armijo),
            )),
            (LineSearchKind::BacktrackingWolfe, None) => Ok(Self::Backtracking(
                BacktrackingLineSearch::new(BacktrackingCondition::Wolfe),
            )),
            (LineSearchKind::BacktrackingStrongWolfe, None) => Ok(Self::Backtracking(
                BacktrackingLineSearch::new(BacktrackingCondition::StrongWolfe),
            )),
            (LineSearchKind::BacktrackingOwlqn, None) => Err(OptimizerError::invalid_line_search(
                "the OWL-QN line search needs a positive orthant-wise coefficient",
            )),
        }
    }
}

impl<T: Scalar> LineSearch<T> for LineSearchStrategy<T> {
    fn search<F>(
        &self,
        eval: &mut EvaluationContext<'_, T, F>,
        problem: LineSearchProblem<'_, T>,
        params: &LineSearchParams<T>,
    ) -> LineSearchResult<usize>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        match self {
            Self::MoreThuente(ls) => ls.search(eval, problem, params),
            Self::Backtracking(ls) => ls.search(eval, problem, params),
            Self::BacktrackingOwlqn(ls) => ls.search(eval, problem, params),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::MoreThuente(ls) => LineSearch::<T>::name(ls),
            Self::Backtracking(ls) => LineSearch::<T>::name(ls),
            Self::BacktrackingOwlqn(ls) => ls.name(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_params() {
        let params = LineSearchParams::<f64>::default();
        assert_eq!(params.max_trials, 40);
        assert_eq!(params.min_step, 1e-20);
        assert_eq!(params.max_step, 1e20);
        assert_eq!(params.wolfe, 0.9);
        assert_eq!(params.gtol, 0.9);
        assert_eq!(params.xtol, 1e-16);
        for kind in LineSearchKind::ALL {
            assert!(params.validate(kind).is_ok());
        }
    }

    #[test]
    fn test_validation_order() {
        let params = LineSearchParams::<f64>::default()
            .with_step_bounds(0.0, -1.0)
            .with_ftol(-1.0);
        assert!(matches!(
            params.validate(LineSearchKind::MoreThuente),
            Err(OptimizerError::InvalidMinStep { .. })
        ));

        let params = LineSearchParams::<f64>::default().with_step_bounds(1.0, 0.5);
        assert!(matches!(
            params.validate(LineSearchKind::MoreThuente),
            Err(OptimizerError::InvalidMaxStep { .. })
        ));

        let params = LineSearchParams::<f64>::default().with_max_trials(0);
        assert_eq!(
            params.validate(LineSearchKind::MoreThuente),
            Err(OptimizerError::InvalidMaxLineSearch { value: 0 })
        );
    }

    #[test]
    fn test_wolfe_checked_only_for_wolfe_kinds() {
        let params = LineSearchParams::<f64>::default().with_wolfe(1e-5);
        assert!(params.validate(LineSearchKind::BacktrackingArmijo).is_ok());
        assert!(params.validate(LineSearchKind::MoreThuente).is_ok());
        assert!(matches!(
            params.validate(LineSearchKind::BacktrackingWolfe),
            Err(OptimizerError::InvalidWolfe { .. })
        ));
        assert!(matches!(
            params
                .with_wolfe(1.0)
                .validate(LineSearchKind::BacktrackingStrongWolfe),
            Err(OptimizerError::InvalidWolfe { .. })
        ));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("More-Thuente".parse::<LineSearchKind>().unwrap(), LineSearchKind::MoreThuente);
        assert_eq!(
            "strong_wolfe".parse::<LineSearchKind>().unwrap(),
            LineSearchKind::BacktrackingStrongWolfe
        );
        assert_eq!(
            "backtracking".parse::<LineSearchKind>().unwrap(),
            LineSearchKind::BacktrackingWolfe
        );
        assert!(matches!(
            "golden".parse::<LineSearchKind>(),
            Err(OptimizerError::InvalidLineSearch { .. })
        ));

        for kind in LineSearchKind::ALL {
            assert_eq!(kind.as_str().parse::<LineSearchKind>().unwrap(), kind);
        }

        assert_eq!(
            LineSearchKind::try_from(3i32).unwrap(),
            LineSearchKind::BacktrackingStrongWolfe
        );
        assert!(LineSearchKind::try_from(9i32).is_err());
    }

    #[test]
    fn test_strategy_resolution() {
        let orthant = Some(OrthantWise::new(1.0, 0, 2));

        assert!(matches!(
            LineSearchStrategy::<f64>::for_kind(LineSearchKind::MoreThuente, None),
            Ok(LineSearchStrategy::MoreThuente(_))
        ));
        assert!(matches!(
            LineSearchStrategy::for_kind(LineSearchKind::BacktrackingWolfe, orthant),
            Ok(LineSearchStrategy::BacktrackingOwlqn(_))
        ));
        assert!(matches!(
            LineSearchStrategy::for_kind(LineSearchKind::MoreThuente, orthant),
            Err(OptimizerError::InvalidLineSearch { .. })
        ));
        assert!(matches!(
            LineSearchStrategy::<f64>::for_kind(LineSearchKind::BacktrackingOwlqn, None),
            Err(OptimizerError::InvalidLineSearch { .. })
        ));
    }

    #[test]
    fn test_every_strategy_rejects_ascent_direction() {
        let orthant = OrthantWise::new(1e-3, 0, 2);
        let strategies = [
            LineSearchStrategy::<f64>::for_kind(LineSearchKind::MoreThuente, None).unwrap(),
            LineSearchStrategy::for_kind(LineSearchKind::BacktrackingArmijo, None).unwrap(),
            LineSearchStrategy::for_kind(LineSearchKind::BacktrackingStrongWolfe, None).unwrap(),
            LineSearchStrategy::for_kind(LineSearchKind::BacktrackingWolfe, Some(orthant)).unwrap(),
        ];

        for strategy in strategies {
            let mut objective = weighted_sphere(vec![1.0, 3.0]);
            let mut fixture = Fixture::new(&mut objective, DVector::from_vec(vec![1.0, -2.0]), 1.0);
            fixture.d = fixture.gp.clone();
            let before = fixture.x.clone();

            let mut eval = EvaluationContext::new(&mut objective);
            let params = LineSearchParams::default();
            let result = strategy.search(&mut eval, fixture.problem(), &params);

            assert_eq!(result, Err(LineSearchError::IncreaseGradient), "{}", strategy.name());
            assert_eq!(eval.evaluations(), 0);
            assert_eq!(fixture.x, before);
        }
    }

    #[test]
    fn test_non_positive_step_is_rejected() {
        let mut objective = weighted_sphere(vec![1.0]);
        let mut fixture = Fixture::new(&mut objective, DVector::from_vec(vec![1.0]), 0.0);
        let strategy =
            LineSearchStrategy::<f64>::for_kind(LineSearchKind::MoreThuente, None).unwrap();
        let mut eval = EvaluationContext::new(&mut objective);
        assert_eq!(
            strategy.search(&mut eval, fixture.problem(), &LineSearchParams::default()),
            Err(LineSearchError::InvalidParameters)
        );
    }
}
