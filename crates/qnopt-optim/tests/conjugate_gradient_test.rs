//! Integration tests for the Conjugate Gradient optimizer

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use qnopt_core::{
    callback::{ProgressAction, ProgressInfo},
    error::{LineSearchError, OptimizerError},
    line_search::{LineSearchKind, LineSearchParams},
    optimizer::{Optimizer, TerminationReason},
    test_functions::{AscentCorrupted, Quadratic, Rosenbrock},
    types::DVector,
};
use qnopt_optim::{CGConfig, ConjugateGradient, ConjugateGradientMethod, LBFGS, LBFGSConfig};
use std::time::Duration;

fn diagonal_quadratic() -> Quadratic<f64> {
    Quadratic::new(
        DVector::from_vec(vec![1.0, 3.0, 5.0, 8.0]),
        DVector::from_vec(vec![1.0, -2.0, 0.5, 3.0]),
    )
}

#[test]
fn test_all_methods_on_quadratic() {
    for method in ConjugateGradientMethod::ALL {
        let mut f = diagonal_quadratic();
        let mut x = DVector::zeros(4);
        let mut cg = ConjugateGradient::new(
            CGConfig::new()
                .with_method(method)
                .with_epsilon(1e-8)
                .with_max_iterations(1000),
        );

        let result = cg.run(&mut x, &mut f).unwrap();

        assert_eq!(result.termination_reason, TerminationReason::Converged, "{method}");
        for i in 0..4 {
            assert_relative_eq!(x[i], f.minimizer()[i], epsilon = 1e-6);
        }
    }
}

#[test]
fn test_rosenbrock_with_accurate_line_search() {
    let params = LineSearchParams::default().with_gtol(0.1);
    for method in [
        ConjugateGradientMethod::PolakRibiere,
        ConjugateGradientMethod::HestenesStiefel,
        ConjugateGradientMethod::GilbertNocedal,
    ] {
        let mut f = Rosenbrock::new(2);
        let mut x = f.starting_point::<f64>();
        let mut cg = ConjugateGradient::new(
            CGConfig::new()
                .with_method(method)
                .with_line_search_params(params)
                .with_max_iterations(5000),
        );

        let result = cg.run(&mut x, &mut f).unwrap();

        assert!(result.converged, "{method}: {}", result.termination_reason);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_backtracking_line_searches() {
    for kind in [
        LineSearchKind::BacktrackingArmijo,
        LineSearchKind::BacktrackingWolfe,
        LineSearchKind::BacktrackingStrongWolfe,
    ] {
        let mut f = diagonal_quadratic();
        let mut x = DVector::from_element(4, 2.0);
        let mut cg = ConjugateGradient::new(
            CGConfig::polak_ribiere()
                .with_line_search(kind)
                .with_max_iterations(2000),
        );

        let result = cg.run(&mut x, &mut f).unwrap();

        assert!(result.converged, "{kind}: {}", result.termination_reason);
        assert_relative_eq!(x[3], 3.0, epsilon = 1e-4);
    }
}

#[test]
fn test_initial_step_lengths() {
    // From (3, 4) the steepest descent direction is (-6, -8): ‖d‖₁ = 14, ‖d‖₂ = 10.
    let mut cg_steps = Vec::new();
    let mut cg = ConjugateGradient::new(
        CGConfig::<f64>::new().with_line_search(LineSearchKind::BacktrackingArmijo),
    );
    let mut x = DVector::from_vec(vec![3.0, 4.0]);
    cg.run_with_callback(&mut x, &mut Quadratic::sphere(2), &mut |info: &ProgressInfo<'_, f64>| {
        cg_steps.push(info.step);
        ProgressAction::Stop(0)
    })
    .unwrap();

    let mut lbfgs_steps = Vec::new();
    let mut lbfgs = LBFGS::new(
        LBFGSConfig::<f64>::new().with_line_search(LineSearchKind::BacktrackingArmijo),
    );
    let mut x = DVector::from_vec(vec![3.0, 4.0]);
    lbfgs
        .run_with_callback(&mut x, &mut Quadratic::sphere(2), &mut |info: &ProgressInfo<'_, f64>| {
            lbfgs_steps.push(info.step);
            ProgressAction::Stop(0)
        })
        .unwrap();

    assert_eq!(cg_steps.len(), 1);
    assert_relative_eq!(cg_steps[0], 1.0 / 14.0);
    assert_eq!(lbfgs_steps.len(), 1);
    assert_relative_eq!(lbfgs_steps[0], 1.0 / 10.0);
}

#[test]
fn test_initial_step_capped_at_one() {
    let mut steps = Vec::new();
    let mut callback = |info: &ProgressInfo<'_, f64>| {
        steps.push(info.step);
        ProgressAction::Stop(0)
    };
    let mut cg = ConjugateGradient::new(
        CGConfig::<f64>::new().with_line_search(LineSearchKind::BacktrackingArmijo),
    );
    // ‖d‖₁ = 0.08, so 1/‖d‖₁ would overshoot the minimizer by far.
    let mut x = DVector::from_vec(vec![0.02, 0.02]);

    let result = cg.run_with_callback(&mut x, &mut Quadratic::sphere(2), &mut callback).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::CallbackRequest(0));
    // Step 1 lands on (-0.02, -0.02), not a decrease; one halving reaches 0.
    assert_eq!(steps, vec![0.5]);
    assert_eq!(x, DVector::zeros(2));
}

#[test]
fn test_rejects_owlqn_line_search() {
    let mut x = DVector::from_vec(vec![1.0, 1.0]);
    let mut cg = ConjugateGradient::new(
        CGConfig::<f64>::new().with_line_search(LineSearchKind::BacktrackingOwlqn),
    );

    let err = cg.run(&mut x, &mut Quadratic::sphere(2)).unwrap_err();

    assert!(matches!(err, OptimizerError::InvalidLineSearch { .. }));
}

#[test]
fn test_momentum_selectors() {
    let parsed: Vec<ConjugateGradientMethod> = (0..4i32)
        .map(|i| ConjugateGradientMethod::try_from(i).unwrap())
        .collect();
    assert_eq!(parsed, ConjugateGradientMethod::ALL.to_vec());

    assert_eq!(
        ConjugateGradientMethod::try_from(9i32).unwrap_err().to_string(),
        "Invalid conjugate gradient method: 9"
    );
    assert_eq!(
        "GILBERT_NOCEDAL".parse::<ConjugateGradientMethod>().unwrap(),
        ConjugateGradientMethod::GilbertNocedal
    );
}

#[test]
fn test_ascent_direction_fails_and_restores_point() {
    let cases = [
        (LineSearchKind::MoreThuente, LineSearchError::RoundingError),
        (LineSearchKind::BacktrackingArmijo, LineSearchError::MaximumLineSearch),
    ];
    for (kind, expected) in cases {
        let mut f = AscentCorrupted::new(Quadratic::<f64>::sphere(3));
        let x0 = DVector::from_vec(vec![1.0, 0.0, -1.0]);
        let mut x = x0.clone();
        let mut cg = ConjugateGradient::new(CGConfig::new().with_line_search(kind));

        let result = cg.run(&mut x, &mut f).unwrap();

        assert_eq!(
            result.termination_reason,
            TerminationReason::LineSearchFailed(expected)
        );
        assert_eq!(result.function_evaluations, 41);
        assert_eq!(x, x0);
        assert_relative_eq!(result.value, 2.0);
    }
}

#[test]
fn test_rerun_reproduces_trajectory() {
    let mut f = Rosenbrock::new(2);
    let x0 = f.starting_point::<f64>();

    for method in ConjugateGradientMethod::ALL {
        let config = CGConfig::new().with_method(method).with_max_iterations(100);
        let run = |cg: &mut ConjugateGradient<f64>, f: &mut Rosenbrock| {
            let mut trajectory = Vec::new();
            let mut x = x0.clone();
            let mut result = cg
                .run_with_callback(&mut x, f, &mut |info: &ProgressInfo<'_, f64>| {
                    trajectory.push((info.iteration, info.fx, info.x.clone(), info.step));
                    ProgressAction::Continue
                })
                .unwrap();
            result.duration = Duration::ZERO;
            (trajectory, result, x)
        };
        let mut cg = ConjugateGradient::new(config);

        let first = run(&mut cg, &mut f);
        assert!(!first.0.is_empty(), "{method}");

        assert_eq!(run(&mut ConjugateGradient::new(config), &mut f), first);
        cg.clear();
        assert_eq!(run(&mut cg, &mut f), first);
    }
}

#[test]
fn test_iteration_and_evaluation_caps() {
    let mut f = Rosenbrock::new(2);
    let mut x = f.starting_point::<f64>();
    let mut cg = ConjugateGradient::new(CGConfig::<f64>::polak_ribiere().with_max_iterations(3));

    let result = cg.run(&mut x, &mut f).unwrap();
    assert_eq!(result.termination_reason, TerminationReason::MaxIterations);
    assert_eq!(result.iterations, 3);
    assert!(result.value < 24.2);

    let mut x = f.starting_point::<f64>();
    let mut cg = ConjugateGradient::new(CGConfig::<f64>::polak_ribiere().with_max_evaluations(5));
    let result = cg.run(&mut x, &mut f).unwrap();
    assert_eq!(result.termination_reason, TerminationReason::MaxEvaluations);
    assert!(result.function_evaluations > 5);
}

#[test]
fn test_dimension_mismatch() {
    let mut x = DVector::from_vec(vec![1.0]);
    let mut cg = ConjugateGradient::with_default_config();

    let err = cg.run(&mut x, &mut Quadratic::<f64>::sphere(2)).unwrap_err();

    assert_eq!(err, OptimizerError::DimensionMismatch { expected: 2, actual: 1 });
}

#[test]
fn test_already_minimized() {
    let mut f = diagonal_quadratic();
    let mut x = f.minimizer().clone();
    let mut cg = ConjugateGradient::with_default_config();

    let result = cg.run(&mut x, &mut f).unwrap();

    assert_eq!(result.termination_reason, TerminationReason::AlreadyMinimized);
    assert_eq!(result.function_evaluations, 1);
}
