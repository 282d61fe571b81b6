//! Type definitions and aliases for quasi-Newton optimization.
//!
//! This module provides the scalar trait shared by every algorithm, the
//! dense vector alias used for points and gradients, and a few numerical
//! constants.

use nalgebra::{Dyn, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the numeric traits required by the line
/// searches and the optimization drivers.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default convergence tolerance ε on ‖g‖ / max(1, ‖x‖).
    const DEFAULT_TOLERANCE: Self;

    /// Smallest step a line search may take by default.
    const MIN_STEP_SIZE: Self;

    /// Largest step a line search may take by default.
    const MAX_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    ///
    /// Returns None if the conversion fails.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for iteration counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-5;
    const MIN_STEP_SIZE: Self = 1e-20;
    const MAX_STEP_SIZE: Self = 1e20;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-5;
    const MIN_STEP_SIZE: Self = 1e-20;
    const MAX_STEP_SIZE: Self = 1e20;
}

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get default convergence tolerance.
    pub fn default_tolerance<T: Scalar>() -> T {
        T::DEFAULT_TOLERANCE
    }

    /// Factor applied to the step when a backtracking search shrinks it.
    pub fn backtracking_decrease<T: Scalar>() -> T {
        <T as Scalar>::from_f64(0.5)
    }

    /// Factor applied to the step when a backtracking search grows it.
    pub fn backtracking_increase<T: Scalar>() -> T {
        <T as Scalar>::from_f64(2.1)
    }

    /// Fraction of the bracket a safeguarded trial step may reach.
    pub fn bracket_fraction<T: Scalar>() -> T {
        <T as Scalar>::from_f64(0.66)
    }
}
