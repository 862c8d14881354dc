//! optimization: posterior-mode search, stable transforms and errors.
//!
//! Purpose
//! -------
//! Provide the deterministic half of model fitting: an Argmin-backed
//! optimizer for log densities, the transforms that move constrained
//! parameters into unconstrained space, and a single error surface.
//! The sampler uses the mode (and the curvature around it) to place chain
//! starting points.
//!
//! Key behaviors
//! -------------
//! - `map_optimizer`: L-BFGS maximization of a [`LogDensity`] with
//!   finite-difference fallbacks.
//! - `numerical_stability`: interval/positive transforms with
//!   log-Jacobians.
//! - `errors`: [`OptError`] / [`OptResult`], converted into the
//!   population error type at the model boundary.
//!
//! Conventions
//! -----------
//! - This module never logs except through the optional `obs_slog`
//!   observer; callers decide how to report failures.
//!
//! [`LogDensity`]: map_optimizer::LogDensity
//! [`OptError`]: errors::OptError
//! [`OptResult`]: errors::OptResult

pub mod errors;
pub mod map_optimizer;
pub mod numerical_stability;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::map_optimizer::{
        LineSearcher, LogDensity, MapOptions, MapOutcome, Theta, Tolerances, maximize,
    };
    pub use super::numerical_stability::{from_interval, interval_log_jacobian, to_interval};
}
