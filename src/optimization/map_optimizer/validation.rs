//! Consistency checks shared by the posterior-mode optimizer.
//!
//! Each helper returns a specific [`OptError`] variant so failures in the
//! MAP initializer can be reported precisely before the sampler falls back
//! to prior-centred starting points.
use crate::optimization::{
    errors::{OptError, OptResult},
    map_optimizer::{Grad, Theta, types::Hessian},
};

/// Optional gradient-norm tolerance must be finite and > 0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol {
        Some(tol) if !tol.is_finite() => {
            Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." })
        }
        Some(tol) if tol <= 0.0 => {
            Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." })
        }
        _ => Ok(()),
    }
}

/// Optional cost-change tolerance must be finite and > 0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol {
        Some(tol) if !tol.is_finite() => {
            Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." })
        }
        Some(tol) if tol <= 0.0 => {
            Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." })
        }
        _ => Ok(()),
    }
}

/// Unconstrained input must have the model's dimension and finite entries.
pub fn verify_theta(theta: &Theta, expected: usize) -> OptResult<()> {
    if theta.len() != expected {
        return Err(OptError::ThetaLengthMismatch { expected, actual: theta.len() });
    }
    match theta.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidThetaInput { index, value: theta[index] }),
        None => Ok(()),
    }
}

/// Gradient must have length `dim` and finite entries.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Unwrap the solver's best parameter, rejecting missing or non-finite
/// estimates.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let t = theta_hat.ok_or(OptError::MissingThetaHat)?;
    for (index, &value) in t.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaHat {
                index,
                value,
                reason: "Parameter estimates must be finite.",
            });
        }
    }
    Ok(t)
}

pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Hessian must be `dim × dim` with finite entries.
pub fn validate_hessian(hessian: &Hessian, dim: usize) -> OptResult<()> {
    if hessian.nrows() != dim || hessian.ncols() != dim {
        return Err(OptError::HessianDimMismatch {
            expected: dim,
            found: (hessian.nrows(), hessian.ncols()),
        });
    }
    for ((i, j), &value) in hessian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidHessian { row: i, col: j, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `verify_theta` reports length problems before finiteness problems.
    fn verify_theta_checks_length_then_entries() {
        assert_eq!(
            verify_theta(&array![0.0, f64::NAN], 3),
            Err(OptError::ThetaLengthMismatch { expected: 3, actual: 2 })
        );
        assert!(matches!(
            verify_theta(&array![0.0, f64::NAN, 1.0], 3),
            Err(OptError::InvalidThetaInput { index: 1, .. })
        ));
        assert!(verify_theta(&array![0.0, 0.5, 1.0], 3).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Gradient and Hessian validation catch shape and finiteness problems.
    fn grad_and_hessian_validation() {
        assert!(matches!(
            validate_grad(&array![1.0, f64::INFINITY], 2),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
        assert!(matches!(
            validate_hessian(&array![[1.0, 0.0]], 2),
            Err(OptError::HessianDimMismatch { .. })
        ));
        assert!(validate_hessian(&array![[1.0, 0.0], [0.0, 2.0]], 2).is_ok());
    }
}
