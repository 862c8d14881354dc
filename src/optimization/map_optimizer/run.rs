//! Runs an `argmin` solver on a log-density problem and returns a
//! [`MapOutcome`].
use crate::optimization::{
    errors::OptResult,
    map_optimizer::{Grad, LogDensity, MapOptions, MapOutcome, Theta, adapter::ArgMinAdapter},
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Shared runner for both line-search variants.
///
/// Sets `theta0` on the executor state, applies `max_iter`, attaches the
/// slog observer when `obs_slog` is enabled and `opts.verbose` is set, then
/// converts the final state into a [`MapOutcome`] (best cost negated back
/// to a log density).
///
/// # Errors
/// - Argmin runtime errors (line-search failures, objective errors) via
///   `From<argmin::core::Error>`.
/// - Validation errors from [`MapOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &MapOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<MapOutcome>
where
    F: LogDensity,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&theta0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    MapOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: LogDensity,
{
    let lp0 = -problem.cost(theta0)?;
    let g0n = problem.gradient(theta0).ok().map(|g| g.l2_norm());
    tracing::debug!(log_density = lp0, grad_norm = ?g0n, "MAP search starting point");
    Ok(())
}
