//! Backtracking line search with Armijo, Wolfe or strong Wolfe acceptance.

use super::{initial_slope, LineSearch, LineSearchParams, LineSearchProblem};
use crate::error::{LineSearchError, LineSearchResult};
use crate::objective::{EvaluationContext, ObjectiveFunction};
use crate::types::{constants, Scalar};
use crate::vector_ops;
use num_traits::Float;

/// Acceptance test used by [`BacktrackingLineSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BacktrackingCondition {
    /// Sufficient decrease only.
    Armijo,
    /// Sufficient decrease and `φ'(α) ≥ wolfe·φ'(0)`.
    Wolfe,
    /// Sufficient decrease and `|φ'(α)| ≤ wolfe·|φ'(0)|`.
    StrongWolfe,
}

/// Backtracking line search.
///
/// The step is multiplied by 0.5 when the sufficient-decrease test fails
/// (or, under strong Wolfe, when the slope became too positive) and by 2.1
/// when the slope is still too negative for the curvature test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktrackingLineSearch {
    condition: BacktrackingCondition,
}

impl BacktrackingLineSearch {
    /// Creates a backtracking search with the given acceptance test.
    pub fn new(condition: BacktrackingCondition) -> Self {
        Self { condition }
    }

    /// The acceptance test.
    pub fn condition(&self) -> BacktrackingCondition {
        self.condition
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch {
    fn search<F>(
        &self,
        eval: &mut EvaluationContext<'_, T, F>,
        problem: LineSearchProblem<'_, T>,
        params: &LineSearchParams<T>,
    ) -> LineSearchResult<usize>
    where
        F: ObjectiveFunction<T> + ?Sized,
    {
        let LineSearchProblem {
            x,
            f,
            g,
            step,
            d,
            xp,
            gp,
            ..
        } = problem;

        let dginit = initial_slope(*step, gp, d)?;
        let finit = *f;
        let dgtest = params.ftol * dginit;
        let dec = constants::backtracking_decrease::<T>();
        let inc = constants::backtracking_increase::<T>();

        *step = Float::min(Float::max(*step, params.min_step), params.max_step);
        let mut count = 0;

        loop {
            vector_ops::step_from(x, xp, d, *step);
            *f = eval.evaluate(x, g, *step);
            count += 1;

            let width = if *f > finit + *step * dgtest {
                dec
            } else {
                if self.condition == BacktrackingCondition::Armijo {
                    return Ok(count);
                }
                let dg = g.dot(d);
                if dg < params.wolfe * dginit {
                    inc
                } else if self.condition == BacktrackingCondition::Wolfe {
                    return Ok(count);
                } else if dg > -params.wolfe * dginit {
                    dec
                } else {
                    return Ok(count);
                }
            };

            if params.max_trials <= count {
                return Err(LineSearchError::MaximumLineSearch);
            }

            *step = *step * width;
            if *step < params.min_step {
                return Err(LineSearchError::MinimumStep);
            }
            if *step > params.max_step {
                return Err(LineSearchError::MaximumStep);
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.condition {
            BacktrackingCondition::Armijo => "Backtracking (Armijo)",
            BacktrackingCondition::Wolfe => "Backtracking (Wolfe)",
            BacktrackingCondition::StrongWolfe => "Backtracking (strong Wolfe)",
        }
    }
}
