//! Backtracking line search for orthant-wise (L1-regularized) objectives.

use super::{initial_slope, LineSearch, LineSearchParams, LineSearchProblem};
use crate::error::{LineSearchError, LineSearchResult};
use crate::objective::{EvaluationContext, ObjectiveFunction};
use crate::orthantwise::OrthantWise;
use crate::types::{constants, Scalar};
use crate::vector_ops;
use num_traits::Float;

/// Orthant-restricted backtracking used by OWL-QN.
///
/// Every trial point is projected onto the orthant of the starting point,
/// the L1 penalty is added to the objective value, and sufficient decrease
/// is measured against the pseudo-gradient passed as `gp`. The value `f`
/// handed in must already include the penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktrackingOwlqnLineSearch<T: Scalar> {
    orthant: OrthantWise<T>,
}

impl<T: Scalar> BacktrackingOwlqnLineSearch<T> {
    /// Creates the search for the given L1 term.
    pub fn new(orthant: OrthantWise<T>) -> Self {
        Self { orthant }
    }

    /// The L1 term this search regularizes with.
    pub fn orthant(&self) -> &OrthantWise<T> {
        &self.orthant
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingOwlqnLineSearch<T> {
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
            w,
        } = problem;

        initial_slope(*step, gp, d)?;
        let finit = *f;
        let dec = constants::backtracking_decrease::<T>();

        self.orthant.choose_orthant(w, xp, gp);
        *step = Float::min(Float::max(*step, params.min_step), params.max_step);
        let mut count = 0;

        loop {
            vector_ops::step_from(x, xp, d, *step);
            self.orthant.project(x, w);

            *f = eval.evaluate(x, g, *step) + self.orthant.penalty(x);
            count += 1;

            let dgtest = OrthantWise::directional_change(x, xp, gp);
            if *f <= finit + params.ftol * dgtest {
                return Ok(count);
            }

            if params.max_trials <= count {
                return Err(LineSearchError::MaximumLineSearch);
            }

            *step = *step * dec;
            if *step < params.min_step {
                return Err(LineSearchError::MinimumStep);
            }
        }
    }

    fn name(&self) -> &'static str {
        "Backtracking (OWL-QN)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DVector;
    use approx::assert_relative_eq;

    fn square(x: &DVector<f64>, g: &mut DVector<f64>, _step: f64) -> f64 {
        g.copy_from(&(2.0 * x));
        x.norm_squared()
    }

    struct Setup {
        x: DVector<f64>,
        f: f64,
        g: DVector<f64>,
        step: f64,
        d: DVector<f64>,
        xp: DVector<f64>,
        pg: DVector<f64>,
        w: DVector<f64>,
    }

    impl Setup {
        fn new(orthant: &OrthantWise<f64>, xp: Vec<f64>) -> Self {
            let xp = DVector::from_vec(xp);
            let n = xp.len();
            let mut g = DVector::zeros(n);
            let f = square(&xp, &mut g, 0.0) + orthant.penalty(&xp);
            let mut pg = DVector::zeros(n);
            orthant.pseudo_gradient(&mut pg, &xp, &g);
            let d = -&pg;
            let step = 1.0 / d.norm();
            Self {
                x: xp.clone(),
                f,
                g,
                step,
                d,
                xp,
                pg,
                w: DVector::zeros(n),
            }
        }

        fn problem(&mut self) -> LineSearchProblem<'_, f64> {
            LineSearchProblem {
                x: &mut self.x,
                f: &mut self.f,
                g: &mut self.g,
                step: &mut self.step,
                d: &self.d,
                xp: &self.xp,
                gp: &self.pg,
                w: &mut self.w,
            }
        }
    }

    #[test]
    fn test_dominant_penalty_lands_on_zero() {
        let orthant = OrthantWise::new(10.0, 0, 1);
        let mut setup = Setup::new(&orthant, vec![0.5]);
        let mut objective = square;
        let mut eval = EvaluationContext::new(&mut objective);

        let result = BacktrackingOwlqnLineSearch::new(orthant).search(
            &mut eval,
            setup.problem(),
            &LineSearchParams::default(),
        );

        assert_eq!(result, Ok(1));
        assert_eq!(setup.x[0], 0.0);
        assert_relative_eq!(setup.f, 0.0);
    }

    #[test]
    fn test_trial_points_stay_in_orthant() {
        let orthant = OrthantWise::new(0.5, 0, 3);
        let mut setup = Setup::new(&orthant, vec![0.2, -0.3, 2.0]);
        setup.step = 1.0;
        let mut objective = square;
        let mut eval = EvaluationContext::new(&mut objective);

        let result = BacktrackingOwlqnLineSearch::new(orthant).search(
            &mut eval,
            setup.problem(),
            &LineSearchParams::default(),
        );

        assert!(result.is_ok());
        for i in 0..3 {
            assert!(setup.x[i] * setup.xp[i] >= 0.0, "component {i} crossed zero");
        }
        let start = square(&setup.xp, &mut DVector::zeros(3), 0.0) + orthant.penalty(&setup.xp);
        assert!(setup.f < start);
    }

    #[test]
    fn test_unregularized_components_move_freely() {
        let orthant = OrthantWise::new(0.5, 0, 1);
        let mut setup = Setup::new(&orthant, vec![0.2, 0.2]);
        setup.step = 1.0;
        let mut objective = square;
        let mut eval = EvaluationContext::new(&mut objective);

        BacktrackingOwlqnLineSearch::new(orthant)
            .search(&mut eval, setup.problem(), &LineSearchParams::default())
            .unwrap();

        assert_eq!(setup.x[0], 0.0);
        assert!(setup.x[1] < 0.2);
    }

    #[test]
    fn test_trial_cap() {
        let orthant = OrthantWise::new(0.1, 0, 0);
        let mut setup = Setup::new(&orthant, vec![3.0]);
        setup.step = 1e6;
        let mut objective = square;
        let mut eval = EvaluationContext::new(&mut objective);

        let result = BacktrackingOwlqnLineSearch::new(orthant).search(
            &mut eval,
            setup.problem(),
            &LineSearchParams::default().with_max_trials(2),
        );
        assert_eq!(result, Err(LineSearchError::MaximumLineSearch));
        assert_eq!(eval.evaluations(), 2);
    }
}
