//! Entry point for locating a posterior mode.
use crate::optimization::{
    errors::OptResult,
    map_optimizer::{
        MapOutcome, Theta,
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, LogDensity, MapOptions},
    },
};

/// Maximize a log density with L-BFGS and the configured line search.
///
/// # Behavior
/// - Validates the starting point via `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an [`ArgMinAdapter`] minimizing `-log p`.
/// - Runs the solver and returns the mode in unconstrained coordinates.
///
/// # Errors
/// - Anything returned by `f.check`, the builders or [`run_lbfgs`].
pub fn maximize<F: LogDensity>(
    f: &F, theta0: Theta, data: &F::Data, opts: &MapOptions,
) -> OptResult<MapOutcome> {
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{errors::OptError, map_optimizer::validation::verify_theta};
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    /// Gaussian log density with known mode `mu`.
    struct Gaussian {
        mu: Array1<f64>,
    }

    impl LogDensity for Gaussian {
        type Data = ();
        fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
            Ok(-0.5 * (theta - &self.mu).mapv(|d| d * d).sum())
        }
        fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
            verify_theta(theta, self.mu.len())
        }
    }

    #[test]
    // Purpose
    // -------
    // Both line searches locate the mode of a Gaussian log density.
    //
    // Given
    // -----
    // - Mode `(1.5, −0.7)`, start at the origin.
    //
    // Expect
    // ------
    // - `theta_hat ≈ mode`, `value ≈ 0`.
    fn maximize_finds_gaussian_mode_with_both_line_searches() {
        let model = Gaussian { mu: array![1.5, -0.7] };
        for ls in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            let opts = MapOptions { line_searcher: ls, ..MapOptions::default() };

            let out = maximize(&model, array![0.0, 0.0], &(), &opts).unwrap();

            assert_relative_eq!(out.theta_hat[0], 1.5, epsilon = 1e-4);
            assert_relative_eq!(out.theta_hat[1], -0.7, epsilon = 1e-4);
            assert_relative_eq!(out.value, 0.0, epsilon = 1e-7);
        }
    }

    #[test]
    // Purpose
    // -------
    // A malformed starting point is rejected before the solver runs.
    fn maximize_rejects_bad_starting_point() {
        let model = Gaussian { mu: array![0.0, 0.0] };
        let err = maximize(&model, array![0.0], &(), &MapOptions::default()).unwrap_err();
        assert_eq!(err, OptError::ThetaLengthMismatch { expected: 2, actual: 1 });
    }
}
