//! Standard test problems for the drivers and line searches.
//!
//! Available to other crates through the `test-utils` feature.

use crate::objective::ObjectiveFunction;
use crate::types::{DVector, Scalar};

/// `f(x) = Σ aᵢ (xᵢ - bᵢ)²`, a separable strictly convex quadratic.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadratic<T: Scalar> {
    weights: DVector<T>,
    center: DVector<T>,
}

impl<T: Scalar> Quadratic<T> {
    /// `f(x) = ‖x‖²` in `n` variables.
    pub fn sphere(n: usize) -> Self {
        Self {
            weights: DVector::from_element(n, T::one()),
            center: DVector::zeros(n),
        }
    }

    /// `f(x) = Σ aᵢ (xᵢ - bᵢ)²`.
    ///
    /// # Panics
    ///
    /// Panics if `weights` and `center` have different lengths.
    pub fn new(weights: DVector<T>, center: DVector<T>) -> Self {
        assert_eq!(weights.len(), center.len(), "weights and center differ in length");
        Self { weights, center }
    }

    /// The unique minimizer.
    pub fn minimizer(&self) -> &DVector<T> {
        &self.center
    }
}

impl<T: Scalar> ObjectiveFunction<T> for Quadratic<T> {
    fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, _step: T) -> T {
        let two = <T as Scalar>::from_f64(2.0);
        let mut fx = T::zero();
        for i in 0..x.len() {
            let r = x[i] - self.center[i];
            gradient[i] = two * self.weights[i] * r;
            fx += self.weights[i] * r * r;
        }
        fx
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.center.len())
    }
}

/// The extended Rosenbrock function on an even number of variables,
/// `Σ (1 - x₂ᵢ)² + 100 (x₂ᵢ₊₁ - x₂ᵢ²)²`, minimized at `(1, …, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rosenbrock {
    n: usize,
}

impl Rosenbrock {
    /// Creates the problem in `n` variables (`n` should be even).
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// The classic starting point `(-1.2, 1, -1.2, 1, …)`.
    pub fn starting_point<T: Scalar>(&self) -> DVector<T> {
        DVector::from_fn(self.n, |i, _| {
            if i % 2 == 0 {
                <T as Scalar>::from_f64(-1.2)
            } else {
                T::one()
            }
        })
    }
}

impl<T: Scalar> ObjectiveFunction<T> for Rosenbrock {
    fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, _step: T) -> T {
        let two = <T as Scalar>::from_f64(2.0);
        let hundred = <T as Scalar>::from_f64(100.0);
        let mut fx = T::zero();
        for i in (0..self.n).step_by(2) {
            let t1 = T::one() - x[i];
            let t2 = x[i + 1] - x[i] * x[i];
            gradient[i] = -two * t1 - <T as Scalar>::from_f64(400.0) * x[i] * t2;
            gradient[i + 1] = two * hundred * t2;
            fx += t1 * t1 + hundred * t2 * t2;
        }
        fx
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.n)
    }
}

/// Wraps an objective and reports the negated gradient, so the steepest
/// descent direction computed from it points uphill.
#[derive(Debug, Clone, PartialEq)]
pub struct AscentCorrupted<F> {
    inner: F,
}

impl<F> AscentCorrupted<F> {
    /// Wraps `inner`.
    pub fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<T: Scalar, F: ObjectiveFunction<T>> ObjectiveFunction<T> for AscentCorrupted<F> {
    fn evaluate(&mut self, x: &DVector<T>, gradient: &mut DVector<T>, step: T) -> T {
        let fx = self.inner.evaluate(x, gradient, step);
        gradient.neg_mut();
        fx
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }
}
