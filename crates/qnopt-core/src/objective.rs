//! Objective function interface and the run-scoped evaluation context.
//!
//! An objective maps a point to its value and writes the gradient into a
//! caller-provided buffer. Closures with the matching signature implement
//! [`ObjectiveFunction`] directly:
//!
//! ```
//! use qnopt_core::prelude::*;
//!
//! let mut sphere = |x: &DVector<f64>, g: &mut DVector<f64>, _step: f64| {
//!     g.copy_from(&(x * 2.0));
//!     x.norm_squared()
//! };
//! let x = DVector::from_vec(vec![1.0, 2.0]);
//! let mut g = DVector::zeros(2);
//! assert_eq!(sphere.evaluate(&x, &mut g, 0.0), 5.0);
//! ```

use crate::types::{DVector, Scalar};
use log::trace;
use std::marker::PhantomData;

/// A differentiable objective `f: ℝⁿ → ℝ`.
///
/// Implementations must be deterministic in `x`: line searches evaluate the
/// same point more than once and rely on getting the same answer.
pub trait ObjectiveFunction<T: Scalar> {
    /// Returns `f(x)` and writes `∇f(x)` into `gradient`.
    ///
    /// `step` is the line-search step that produced `x` (zero for the
    /// initial evaluation). It is informational only.
    fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, step: T) -> T;

    /// Number of variables the objective expects, if it is fixed.
    ///
    /// Drivers reject a starting point of a different length before the
    /// first evaluation.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

impl<T, F> ObjectiveFunction<T> for F
where
    T: Scalar,
    F: FnMut(&DVector<T>, &mut DVector<T>, T) -> T,
{
    fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, step: T) -> T {
        self(x, gradient, step)
    }
}

/// Counts objective evaluations for the duration of a single run.
///
/// A fresh context is created for every run, so nothing is shared between
/// runs or between optimizers.
pub struct EvaluationContext<'a, T, F: ?Sized> {
    objective: &'a mut F,
    evaluations: usize,
    _phantom: PhantomData<T>,
}

impl<'a, T, F> EvaluationContext<'a, T, F>
where
    T: Scalar,
    F: ObjectiveFunction<T> + ?Sized,
{
    /// Wraps an objective for one run.
    pub fn new(objective: &'a mut F) -> Self {
        Self {
            objective,
            evaluations: 0,
            _phantom: PhantomData,
        }
    }

    /// Evaluates the objective and records the call.
    pub fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, step: T) -> T {
        self.evaluations += 1;
        let fx = self.objective.evaluate(x, gradient, step);
        trace!("evaluation {}: f = {}, step = {}", self.evaluations, fx, step);
        fx
    }

    /// Number of evaluations performed so far in this run.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Dimension declared by the wrapped objective.
    pub fn dimension(&self) -> Option<usize> {
        self.objective.dimension()
    }
}

impl<T, F: ?Sized> std::fmt::Debug for EvaluationContext<'_, T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("evaluations", &self.evaluations)
            .finish_non_exhaustive()
    }
}
