//! Safeguarded trial-step selection for the Moré–Thuente line search.
//!
//! The interval of uncertainty is described by two [`StepPoint`]s: the best
//! step found so far and the other endpoint. [`TrialInterval::update`] folds a
//! newly evaluated trial into the interval and proposes the next step.
//!
//! The interpolation formulas are pure functions. They return `None` when
//! their denominator vanishes or the result is not finite, and the caller
//! falls back to bisection or to a safeguard bound.

use crate::error::{LineSearchError, LineSearchResult};
use crate::types::{constants, Scalar};
use num_traits::Float;

/// A step together with the objective value and directional derivative there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPoint<T> {
    /// Step length along the search direction.
    pub step: T,
    /// Objective value at the step.
    pub value: T,
    /// Directional derivative at the step.
    pub deriv: T,
}

impl<T: Scalar> StepPoint<T> {
    /// Creates a step point.
    pub fn new(step: T, value: T, deriv: T) -> Self {
        Self { step, value, deriv }
    }

    /// Applies `ψ(α) = φ(α) - α·slope`, the auxiliary function of the first stage.
    pub(crate) fn shifted(self, slope: T) -> Self {
        Self {
            step: self.step,
            value: self.value - self.step * slope,
            deriv: self.deriv - slope,
        }
    }

    /// Inverse of [`StepPoint::shifted`].
    pub(crate) fn unshifted(self, slope: T) -> Self {
        Self {
            step: self.step,
            value: self.value + self.step * slope,
            deriv: self.deriv + slope,
        }
    }
}

fn finite<T: Scalar>(v: T) -> Option<T> {
    if Float::is_finite(v) {
        Some(v)
    } else {
        None
    }
}

fn max3<T: Scalar>(a: T, b: T, c: T) -> T {
    Float::max(Float::max(a, b), c)
}

/// Minimizer of the cubic interpolating values and derivatives at `u` and `v`.
pub fn cubic_minimizer<T: Scalar>(u: &StepPoint<T>, v: &StepPoint<T>) -> Option<T> {
    let d = v.step - u.step;
    let three = <T as Scalar>::from_f64(3.0);
    let theta = (u.value - v.value) * three / d + u.deriv + v.deriv;
    let s = max3(Float::abs(theta), Float::abs(u.deriv), Float::abs(v.deriv));
    if d == T::zero() || s == T::zero() {
        return None;
    }
    let a = theta / s;
    let radicand = a * a - (u.deriv / s) * (v.deriv / s);
    if radicand < T::zero() {
        return None;
    }
    let mut gamma = s * Float::sqrt(radicand);
    if v.step < u.step {
        gamma = -gamma;
    }
    let p = gamma - u.deriv + theta;
    let q = gamma - u.deriv + gamma + v.deriv;
    if q == T::zero() {
        return None;
    }
    finite(u.step + (p / q) * d)
}

/// Cubic minimizer safeguarded to `[xmin, xmax]`.
///
/// When the cubic has no minimizer in the extrapolation direction the
/// result is the bound on that side.
pub fn cubic_minimizer_bounded<T: Scalar>(
    u: &StepPoint<T>,
    v: &StepPoint<T>,
    xmin: T,
    xmax: T,
) -> T {
    let d = v.step - u.step;
    let three = <T as Scalar>::from_f64(3.0);
    let theta = (u.value - v.value) * three / d + u.deriv + v.deriv;
    let s = max3(Float::abs(theta), Float::abs(u.deriv), Float::abs(v.deriv));
    if d == T::zero() || s == T::zero() {
        return if u.step < v.step { xmax } else { xmin };
    }
    let a = theta / s;
    let radicand = Float::max(T::zero(), a * a - (u.deriv / s) * (v.deriv / s));
    let mut gamma = s * Float::sqrt(radicand);
    if u.step < v.step {
        gamma = -gamma;
    }
    let p = gamma - v.deriv + theta;
    let q = gamma - v.deriv + gamma + u.deriv;
    let r = p / q;
    if Float::is_finite(r) && r < T::zero() && gamma != T::zero() {
        v.step - r * d
    } else if a < T::zero() {
        xmax
    } else {
        xmin
    }
}

/// Minimizer of the quadratic interpolating `f(u)`, `f'(u)` and `f(v)`.
pub fn quadratic_minimizer<T: Scalar>(u: &StepPoint<T>, v: &StepPoint<T>) -> Option<T> {
    let a = v.step - u.step;
    if a == T::zero() {
        return None;
    }
    let denom = (u.value - v.value) / a + u.deriv;
    if denom == T::zero() {
        return None;
    }
    let two = <T as Scalar>::from_f64(2.0);
    finite(u.step + u.deriv / denom / two * a)
}

/// Minimizer of the quadratic interpolating `f'(u)` and `f'(v)` (secant step).
pub fn secant_minimizer<T: Scalar>(u: &StepPoint<T>, v: &StepPoint<T>) -> Option<T> {
    let a = u.step - v.step;
    let denom = v.deriv - u.deriv;
    if denom == T::zero() {
        return None;
    }
    finite(v.step + v.deriv / denom * a)
}

/// Whether two derivatives have strictly opposite signs.
fn opposite_signs<T: Scalar>(dt: T, dx: T) -> bool {
    dx != T::zero() && dt * (dx / Float::abs(dx)) < T::zero()
}

fn midpoint<T: Scalar>(a: T, b: T) -> T {
    a + <T as Scalar>::from_f64(0.5) * (b - a)
}

/// Interval of uncertainty maintained by the Moré–Thuente search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialInterval<T> {
    /// Step with the lowest objective value seen so far.
    pub best: StepPoint<T>,
    /// Other endpoint of the interval.
    pub other: StepPoint<T>,
    /// Whether the interval is known to contain a minimizer.
    pub bracketed: bool,
}

impl<T: Scalar> TrialInterval<T> {
    /// Starts an unbracketed interval collapsed on `origin`.
    pub fn new(origin: StepPoint<T>) -> Self {
        Self {
            best: origin,
            other: origin,
            bracketed: false,
        }
    }

    /// Lower end of the interval.
    pub fn lower(&self) -> T {
        Float::min(self.best.step, self.other.step)
    }

    /// Upper end of the interval.
    pub fn upper(&self) -> T {
        Float::max(self.best.step, self.other.step)
    }

    /// Width of the interval.
    pub fn width(&self) -> T {
        Float::abs(self.other.step - self.best.step)
    }

    /// Applies the auxiliary shift `ψ(α) = φ(α) - α·slope` to both endpoints.
    pub(crate) fn shifted(&self, slope: T) -> Self {
        Self {
            best: self.best.shifted(slope),
            other: self.other.shifted(slope),
            bracketed: self.bracketed,
        }
    }

    /// Inverse of [`TrialInterval::shifted`].
    pub(crate) fn unshifted(&self, slope: T) -> Self {
        Self {
            best: self.best.unshifted(slope),
            other: self.other.unshifted(slope),
            bracketed: self.bracketed,
        }
    }

    /// Folds `trial` into the interval and returns the next trial step.
    ///
    /// The next step is clipped into `[tmin, tmax]`. When the trial
    /// brackets the minimizer the step is additionally kept within 0.66 of
    /// the interval measured from the best point.
    pub fn update(&mut self, trial: StepPoint<T>, tmin: T, tmax: T) -> LineSearchResult<T> {
        let x = self.best;
        let t = trial;

        if self.bracketed {
            if t.step <= self.lower() || self.upper() <= t.step {
                return Err(LineSearchError::OutOfInterval);
            }
            if T::zero() <= x.deriv * (t.step - x.step) {
                return Err(LineSearchError::IncreaseGradient);
            }
            if tmax < tmin {
                return Err(LineSearchError::IncorrectBounds);
            }
        }

        let dsign = opposite_signs(t.deriv, x.deriv);
        let bound;
        let mut newt;

        if x.value < t.value {
            // Higher value: the minimizer is bracketed between x and t.
            self.bracketed = true;
            bound = true;
            newt = match (cubic_minimizer(&x, &t), quadratic_minimizer(&x, &t)) {
                (Some(mc), Some(mq)) => {
                    if Float::abs(mc - x.step) < Float::abs(mq - x.step) {
                        mc
                    } else {
                        midpoint(mc, mq)
                    }
                }
                (Some(mc), None) => mc,
                (None, Some(mq)) => mq,
                (None, None) => midpoint(x.step, t.step),
            };
        } else if dsign {
            // Derivatives of opposite sign also bracket the minimizer.
            self.bracketed = true;
            bound = false;
            newt = match (cubic_minimizer(&x, &t), secant_minimizer(&x, &t)) {
                (Some(mc), Some(mq)) => {
                    if Float::abs(mc - t.step) > Float::abs(mq - t.step) {
                        mc
                    } else {
                        mq
                    }
                }
                (Some(mc), None) => mc,
                (None, Some(mq)) => mq,
                (None, None) => midpoint(x.step, t.step),
            };
        } else if Float::abs(t.deriv) < Float::abs(x.deriv) {
            // Same sign, decreasing magnitude.
            bound = true;
            let mc = cubic_minimizer_bounded(&x, &t, tmin, tmax);
            newt = match secant_minimizer(&x, &t) {
                Some(mq) => {
                    let (dc, dq) = (Float::abs(t.step - mc), Float::abs(t.step - mq));
                    let take_cubic = if self.bracketed { dc < dq } else { dc > dq };
                    if take_cubic {
                        mc
                    } else {
                        mq
                    }
                }
                None => mc,
            };
        } else {
            // Same sign, derivative not decreasing.
            bound = false;
            newt = if self.bracketed {
                cubic_minimizer(&t, &self.other)
                    .unwrap_or_else(|| midpoint(t.step, self.other.step))
            } else if x.step < t.step {
                tmax
            } else {
                tmin
            };
        }

        if x.value < t.value {
            self.other = t;
        } else {
            if dsign {
                self.other = x;
            }
            self.best = t;
        }

        newt = Float::min(newt, tmax);
        newt = Float::max(newt, tmin);

        if self.bracketed && bound {
            let limit = self.best.step
                + constants::bracket_fraction::<T>() * (self.other.step - self.best.step);
            newt = if self.best.step < self.other.step {
                Float::min(newt, limit)
            } else {
                Float::max(newt, limit)
            };
        }

        Ok(newt)
    }
}
