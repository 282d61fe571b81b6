//! Moré–Thuente line search.
//!
//! Finds a step satisfying the sufficient-decrease condition together with
//! the strong curvature condition `|φ'(α)| ≤ gtol·|φ'(0)|`, using safeguarded
//! cubic and quadratic interpolation (see [`TrialInterval`]).
//!
//! Until a step with `φ(α) ≤ φ(0) + ftol·α·φ'(0)` and a non-negative
//! auxiliary slope has been seen, the interval is updated on the auxiliary
//! function `ψ(α) = φ(α) - ftol·α·φ'(0)`.
//!
//! When [`TrialInterval::update`] rejects a trial, the rejection is not an
//! error by itself. The interval is left as it was and, once bracketed, the
//! search evaluates the best step again and reports
//! [`LineSearchError::RoundingError`] with `x`, `f` and `g` at that step.
//!
//! Reference: J. J. Moré and D. J. Thuente, "Line search algorithms with
//! guaranteed sufficient decrease", ACM TOMS 20(3), 1994.

use super::trial_interval::{StepPoint, TrialInterval};
use super::{initial_slope, LineSearch, LineSearchParams, LineSearchProblem};
use crate::error::{LineSearchError, LineSearchResult};
use crate::objective::{EvaluationContext, ObjectiveFunction};
use crate::types::{constants, Scalar};
use crate::vector_ops;
use log::trace;
use num_traits::Float;

/// Moré–Thuente line search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoreThuenteLineSearch;

impl<T: Scalar> LineSearch<T> for MoreThuenteLineSearch {
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
        let half = <T as Scalar>::from_f64(0.5);
        let four = <T as Scalar>::from_f64(4.0);
        let fraction = constants::bracket_fraction::<T>();

        let mut stage1 = true;
        let mut width = params.max_step - params.min_step;
        let mut prev_width = width + width;
        let mut interval = TrialInterval::new(StepPoint::new(T::zero(), finit, dginit));
        let mut count = 0;
        let mut stalled = false;

        loop {
            let (stmin, stmax) = if interval.bracketed {
                (interval.lower(), interval.upper())
            } else {
                let stx = interval.best.step;
                (stx, *step + four * (*step - stx))
            };

            *step = Float::min(Float::max(*step, params.min_step), params.max_step);

            // Fall back to the best step when further progress is unlikely.
            if interval.bracketed
                && (*step <= stmin
                    || stmax <= *step
                    || params.max_trials <= count + 1
                    || stalled
                    || stmax - stmin <= params.xtol * stmax)
            {
                *step = interval.best.step;
            }

            vector_ops::step_from(x, xp, d, *step);
            *f = eval.evaluate(x, g, *step);
            let dg = g.dot(d);
            let ftest1 = finit + *step * dgtest;
            count += 1;

            if interval.bracketed && (*step <= stmin || stmax <= *step || stalled) {
                return Err(LineSearchError::RoundingError);
            }
            if *step == params.max_step && *f <= ftest1 && dg <= dgtest {
                return Err(LineSearchError::MaximumStep);
            }
            if *step == params.min_step && (ftest1 < *f || dgtest <= dg) {
                return Err(LineSearchError::MinimumStep);
            }
            if interval.bracketed && stmax - stmin <= params.xtol * stmax {
                return Err(LineSearchError::WidthTooSmall);
            }
            if params.max_trials <= count {
                return Err(LineSearchError::MaximumLineSearch);
            }
            if *f <= ftest1 && Float::abs(dg) <= params.gtol * (-dginit) {
                return Ok(count);
            }

            if stage1 && *f <= ftest1 && Float::min(params.ftol, params.gtol) * dginit <= dg {
                stage1 = false;
            }

            let trial = StepPoint::new(*step, *f, dg);
            let shift = (stage1 && ftest1 < *f && *f <= interval.best.value).then_some(dgtest);
            match next_trial(&mut interval, trial, shift, stmin, stmax) {
                Ok(next) => {
                    *step = next;
                    stalled = false;
                }
                Err(err) => {
                    trace!("more-thuente trial {}: interval update rejected ({})", count, err);
                    stalled = true;
                }
            }

            if interval.bracketed {
                if fraction * prev_width <= interval.width() {
                    *step = interval.best.step + half * (interval.other.step - interval.best.step);
                }
                prev_width = width;
                width = interval.width();
            }

            trace!(
                "more-thuente trial {}: next step = {}, bracketed = {}",
                count,
                *step,
                interval.bracketed
            );
        }
    }

    fn name(&self) -> &'static str {
        "More-Thuente"
    }
}

/// Folds `trial` into `interval`, on the auxiliary function when `shift` is set.
///
/// On error the interval is left untouched.
fn next_trial<T: Scalar>(
    interval: &mut TrialInterval<T>,
    trial: StepPoint<T>,
    shift: Option<T>,
    stmin: T,
    stmax: T,
) -> LineSearchResult<T> {
    match shift {
        Some(slope) => {
            let mut shifted = interval.shifted(slope);
            let next = shifted.update(trial.shifted(slope), stmin, stmax)?;
            *interval = shifted.unshifted(slope);
            Ok(next)
        }
        None => {
            let mut updated = *interval;
            let next = updated.update(trial, stmin, stmax)?;
            *interval = updated;
            Ok(next)
        }
    }
}
