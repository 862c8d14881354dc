//! map_optimizer::finite_diff: finite-difference gradients and Hessians.
//!
//! Purpose
//! -------
//! Wrap the `finitediff` crate with validation and error capture so the
//! adapter can fall back to numeric gradients and the Laplace step can
//! build a curvature matrix at the posterior mode.
//!
//! Key behaviors
//! -------------
//! - [`run_fd_diff`]: forward-difference gradient, surfacing any error the
//!   objective parked in the shared `closure_err` cell.
//! - [`compute_hessian`]: central-difference Hessian of a gradient map,
//!   falling back to forward differences when validation fails, then
//!   symmetrized in place.
//!
//! Invariants & assumptions
//! ------------------------
//! - Returned gradients and Hessians pass [`validate_grad`] /
//!   [`validate_hessian`].
//! - Differences are taken in the unconstrained coordinates.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptResult,
    map_optimizer::{
        types::{Grad, Hessian, Theta},
        validation::{validate_grad, validate_hessian},
    },
};
use argmin::core::Error;
use finitediff::FiniteDiff;

/// Forward-difference gradient of `func` at `theta` with error capture.
///
/// Clears `closure_err`, differentiates, returns the first captured error
/// if any, then validates the gradient.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}

/// Finite-difference Hessian of the gradient map `f` at `theta`.
///
/// Errors
/// ------
/// - `OptError::HessianDimMismatch` / `OptError::InvalidHessian` when the
///   forward-difference fallback also fails validation.
pub fn compute_hessian<F: Fn(&Theta) -> Grad>(f: &F, theta: &Theta) -> OptResult<Hessian> {
    let dim = theta.len();
    let mut cent_hess = theta.central_hessian(f);
    if validate_hessian(&cent_hess, dim).is_ok() {
        symmetrize_hess(&mut cent_hess);
        return Ok(cent_hess);
    }
    let mut forward_hess = theta.forward_hessian(f);
    validate_hessian(&forward_hess, dim)?;
    symmetrize_hess(&mut forward_hess);
    Ok(forward_hess)
}

/// Average each off-diagonal pair; the diagonal is untouched.
fn symmetrize_hess(hess: &mut Hessian) {
    for i in 0..hess.nrows() {
        for j in 0..i {
            let avg = 0.5 * (hess[[i, j]] + hess[[j, i]]);
            hess[[i, j]] = avg;
            hess[[j, i]] = avg;
        }
    }
}
