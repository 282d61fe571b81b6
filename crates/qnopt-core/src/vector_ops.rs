//! Dense vector primitives used by the line searches and the drivers.
//!
//! Thin wrappers over nalgebra so that every algorithm speaks the same
//! vocabulary. All functions assume the operands share the problem
//! dimension; a length mismatch is a caller bug and panics inside nalgebra.

use crate::types::{DVector, Scalar};
use num_traits::Float;
use std::ops::Range;

/// Inner product `aᵀb`.
#[inline]
pub fn dot<T: Scalar>(a: &DVector<T>, b: &DVector<T>) -> T {
    a.dot(b)
}

/// Euclidean norm `‖a‖₂`.
#[inline]
pub fn norm2<T: Scalar>(a: &DVector<T>) -> T {
    a.norm()
}

/// L1 norm of `a` restricted to the index range `range`.
#[inline]
pub fn norm1<T: Scalar>(a: &DVector<T>, range: Range<usize>) -> T {
    a.rows_range(range)
        .iter()
        .fold(T::zero(), |acc, &v| acc + Float::abs(v))
}

/// `dst += scale * src`.
#[inline]
pub fn axpy<T: Scalar>(dst: &mut DVector<T>, src: &DVector<T>, scale: T) {
    dst.axpy(scale, src, T::one());
}

/// `dst = src`.
#[inline]
pub fn copy<T: Scalar>(dst: &mut DVector<T>, src: &DVector<T>) {
    dst.copy_from(src);
}

/// `dst = -src`.
#[inline]
pub fn negate_copy<T: Scalar>(dst: &mut DVector<T>, src: &DVector<T>) {
    dst.zip_apply(src, |d, s| *d = -s);
}

/// `dst = a - b`.
#[inline]
pub fn difference<T: Scalar>(dst: &mut DVector<T>, a: &DVector<T>, b: &DVector<T>) {
    dst.copy_from(a);
    dst.axpy(-T::one(), b, T::one());
}

/// `dst = base + step * direction`, the trial point of a line search.
#[inline]
pub fn step_from<T: Scalar>(
    dst: &mut DVector<T>,
    base: &DVector<T>,
    direction: &DVector<T>,
    step: T,
) {
    dst.copy_from(base);
    dst.axpy(step, direction, T::one());
}
