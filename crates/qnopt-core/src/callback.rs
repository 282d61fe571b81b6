//! Progress callbacks for the optimization drivers.
//!
//! A callback is invoked once per completed iteration with a snapshot of the
//! iterate and may stop the run with a caller-defined code. Closures taking
//! a `&ProgressInfo` and returning a [`ProgressAction`] are callbacks.

use crate::optimizer::OptimizationResult;
use crate::types::{DVector, Scalar};
use log::info;

/// Snapshot handed to a callback after each iteration.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo<'a, T: Scalar> {
    /// Current point.
    pub x: &'a DVector<T>,
    /// Gradient at `x` (without the L1 term).
    pub g: &'a DVector<T>,
    /// Objective value at `x` (including the L1 term under OWL-QN).
    pub fx: T,
    /// `‖x‖₂`.
    pub xnorm: T,
    /// `‖g‖₂`, or the pseudo-gradient norm under OWL-QN.
    pub gnorm: T,
    /// Step accepted by the line search.
    pub step: T,
    /// Number of variables.
    pub n: usize,
    /// One-based index of the completed iteration.
    pub iteration: usize,
    /// Trials used by the line search of this iteration.
    pub line_search_trials: usize,
    /// Objective evaluations so far in this run.
    pub evaluations: usize,
}

/// What the driver should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgressAction {
    /// Keep iterating.
    #[default]
    Continue,
    /// Stop the run and report the given code.
    Stop(i32),
}

/// Trait for optimization callbacks.
pub trait ProgressCallback<T: Scalar> {
    /// Called once after validation, before the first evaluation.
    fn on_start(&mut self, n: usize) {
        let _ = n;
    }

    /// Called after each completed iteration.
    fn on_iteration(&mut self, info: &ProgressInfo<'_, T>) -> ProgressAction;

    /// Called once when the run terminates for any reason.
    fn on_finish(&mut self, result: &OptimizationResult<T>) {
        let _ = result;
    }
}

impl<T, F> ProgressCallback<T> for F
where
    T: Scalar,
    F: FnMut(&ProgressInfo<'_, T>) -> ProgressAction,
{
    fn on_iteration(&mut self, info: &ProgressInfo<'_, T>) -> ProgressAction {
        self(info)
    }
}

/// A callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> ProgressCallback<T> for NoOpCallback {
    fn on_iteration(&mut self, _info: &ProgressInfo<'_, T>) -> ProgressAction {
        ProgressAction::Continue
    }
}

/// A callback that logs progress at `info` level.
#[derive(Debug, Clone, Copy)]
pub struct LoggingCallback {
    log_every: usize,
}

impl LoggingCallback {
    /// Logs every `log_every` iterations (at least every iteration).
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
        }
    }
}

impl Default for LoggingCallback {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<T: Scalar> ProgressCallback<T> for LoggingCallback {
    fn on_start(&mut self, n: usize) {
        info!("starting optimization with {n} variables");
    }

    fn on_iteration(&mut self, info: &ProgressInfo<'_, T>) -> ProgressAction {
        if info.iteration % self.log_every == 0 {
            info!(
                "iteration {}: fx = {}, xnorm = {}, gnorm = {}, step = {}, trials = {}",
                info.iteration,
                info.fx,
                info.xnorm,
                info.gnorm,
                info.step,
                info.line_search_trials
            );
        }
        ProgressAction::Continue
    }

    fn on_finish(&mut self, result: &OptimizationResult<T>) {
        info!(
            "optimization finished after {} iterations ({} evaluations): {}, fx = {}",
            result.iterations, result.function_evaluations, result.termination_reason, result.value
        );
    }
}
