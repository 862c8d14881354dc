//! inference::laplace: curvature-based posterior scales at the mode.
//!
//! Purpose
//! -------
//! Turn the curvature of a negative log posterior at its mode into
//! per-coordinate standard deviations (a Laplace approximation). The
//! sampler uses these to size the jitter applied to chain starting points,
//! so chains start overdispersed relative to the posterior but not wildly
//! outside it.
//!
//! Key behaviors
//! -------------
//! - Build the Hessian of `−log p(θ | y)` with [`compute_hessian`] from a
//!   gradient map.
//! - Copy it into a `nalgebra::DMatrix` and take the diagonal of the
//!   Moore–Penrose pseudo-inverse via `symmetric_eigen`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The gradient map is the gradient of the **negative** log density, so
//!   the Hessian is positive semi-definite at a mode.
//! - Eigenvalues at or below [`EIGEN_EPS`] are dropped; coordinates that
//!   only load on dropped directions get a scale of `0` and callers fall
//!   back to a default jitter.
//!
//! Conventions
//! -----------
//! - Scales are in the same unconstrained coordinates as `theta_hat`.
//! - No explicit inverse is formed.
use crate::optimization::{
    errors::OptResult, map_optimizer::finite_diff::compute_hessian,
    numerical_stability::EIGEN_EPS,
};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Laplace standard deviations `sqrt(diag(H⁺))` at `theta_hat`.
///
/// Parameters
/// ----------
/// - `neg_grad`: gradient of `−log p(θ | y)`.
/// - `theta_hat`: mode in unconstrained coordinates.
///
/// Errors
/// ------
/// - Anything [`compute_hessian`] returns (non-finite curvature, shape
///   mismatch).
pub fn laplace_scales<F: Fn(&Array1<f64>) -> Array1<f64>>(
    neg_grad: &F, theta_hat: &Array1<f64>,
) -> OptResult<Array1<f64>> {
    let hess = compute_hessian(neg_grad, theta_hat)?;
    Ok(pseudo_inverse_scales(&hess))
}

fn to_dmatrix(hess: &Array2<f64>) -> DMatrix<f64> {
    let n = hess.nrows();
    DMatrix::from_fn(n, n, |i, j| hess[[i, j]])
}

/// `Var(θ_i) = Σ_{k: λ_k > EIGEN_EPS} Q[i,k]² / λ_k` from `H = Q Λ Qᵀ`.
fn pseudo_inverse_scales(hess: &Array2<f64>) -> Array1<f64> {
    let n = hess.nrows();
    let eigen = to_dmatrix(hess).symmetric_eigen();
    let q = eigen.eigenvectors;
    Array1::from_shape_fn(n, |i| {
        eigen
            .eigenvalues
            .iter()
            .enumerate()
            .filter(|(_, lambda)| **lambda > EIGEN_EPS)
            .map(|(k, &lambda)| q[(i, k)] * q[(i, k)] / lambda)
            .sum::<f64>()
            .sqrt()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Agreement of Laplace scales with analytic Gaussian posteriors and the
    // handling of flat directions.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // For a Gaussian with diagonal precision the scales are `1/sqrt(p_i)`.
    //
    // Given
    // -----
    // - `−log p(θ) = ½ θᵀ diag(4, 1) θ`, gradient `diag(4, 1) θ`.
    //
    // Expect
    // ------
    // - Scales `[0.5, 1.0]`.
    fn laplace_scales_match_gaussian_precision() {
        let a = array![[4.0, 0.0], [0.0, 1.0]];
        let grad = |theta: &Array1<f64>| a.dot(theta);

        let scales = laplace_scales(&grad, &array![1.0, -1.0]).unwrap();

        assert_relative_eq!(scales[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(scales[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // A flat direction contributes nothing instead of dividing by zero.
    fn pseudo_inverse_drops_flat_directions() {
        let hess = array![[2.0, 0.0], [0.0, 0.0]];

        let scales = pseudo_inverse_scales(&hess);

        assert_relative_eq!(scales[0], 0.5_f64.sqrt(), epsilon = 1e-12);
        assert_eq!(scales[1], 0.0);
    }
}
