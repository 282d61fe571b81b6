//! Orthant-wise helpers for L1-regularized objectives (OWL-QN).
//!
//! The regularized objective is `f(x) + c·Σ_{i∈[start,end)} |x_i|`. Because
//! the L1 term is not differentiable at zero, OWL-QN works with a
//! pseudo-gradient and keeps every iterate inside the orthant selected by
//! the previous point.

use crate::types::{DVector, Scalar};
use crate::vector_ops;
use std::ops::Range;

/// L1 coefficient together with the index range it applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthantWise<T: Scalar> {
    /// Coefficient `c` of the L1 term (strictly positive when active).
    pub c: T,
    /// First regularized index.
    pub start: usize,
    /// One past the last regularized index.
    pub end: usize,
}

impl<T: Scalar> OrthantWise<T> {
    /// Creates an orthant-wise description for the range `[start, end)`.
    pub fn new(c: T, start: usize, end: usize) -> Self {
        Self { c, start, end }
    }

    /// The regularized index range.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// `‖x‖₁` over the regularized range.
    #[inline]
    pub fn x1norm(&self, x: &DVector<T>) -> T {
        vector_ops::norm1(x, self.range())
    }

    /// The penalty `c·‖x‖₁` added to the smooth objective.
    #[inline]
    pub fn penalty(&self, x: &DVector<T>) -> T {
        self.c * self.x1norm(x)
    }

    /// Writes the pseudo-gradient of the regularized objective into `pg`.
    ///
    /// Outside the regularized range `pg = g`. Inside it the L1 subgradient
    /// is resolved towards the direction of steepest descent: at `x_i = 0`
    /// the component is zero whenever `|g_i| ≤ c`.
    pub fn pseudo_gradient(&self, pg: &mut DVector<T>, x: &DVector<T>, g: &DVector<T>) {
        pg.copy_from(g);
        for i in self.range() {
            let gi = g[i];
            pg[i] = if x[i] < T::zero() {
                gi - self.c
            } else if x[i] > T::zero() {
                gi + self.c
            } else if gi < -self.c {
                gi + self.c
            } else if gi > self.c {
                gi - self.c
            } else {
                T::zero()
            };
        }
    }

    /// Selects the orthant to search in: `sign(xp_i)`, or `sign(-gp_i)` where `xp_i = 0`.
    ///
    /// `gp` is the pseudo-gradient at `xp`.
    pub fn choose_orthant(&self, w: &mut DVector<T>, xp: &DVector<T>, gp: &DVector<T>) {
        w.zip_zip_apply(xp, gp, |wi, xi, gi| {
            *wi = if xi == T::zero() { -gi } else { xi };
        });
    }

    /// Zeroes every regularized component of `x` that left the orthant `w`.
    pub fn project(&self, x: &mut DVector<T>, w: &DVector<T>) {
        for i in self.range() {
            if x[i] * w[i] <= T::zero() {
                x[i] = T::zero();
            }
        }
    }

    /// Zeroes every regularized component of `d` that does not oppose the pseudo-gradient.
    pub fn constrain_direction(&self, d: &mut DVector<T>, pg: &DVector<T>) {
        for i in self.range() {
            if d[i] * pg[i] >= T::zero() {
                d[i] = T::zero();
            }
        }
    }

    /// Directional term `Σ (x_i - xp_i)·gp_i` used by the OWL-QN decrease test.
    pub fn directional_change(x: &DVector<T>, xp: &DVector<T>, gp: &DVector<T>) -> T {
        x.iter()
            .zip(xp.iter())
            .zip(gp.iter())
            .fold(T::zero(), |acc, ((&xi, &xpi), &gi)| acc + (xi - xpi) * gi)
    }
}
