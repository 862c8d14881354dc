//! map_optimizer: argmin-powered posterior-mode search.
//!
//! Purpose
//! -------
//! Locate the mode of a model's marginal log posterior so sampler chains
//! can start near the bulk of the posterior. Callers implement
//! [`LogDensity`] and invoke [`maximize`] to run L-BFGS with a configurable
//! line search, tolerances and finite-difference fallbacks.
//!
//! Key behaviors
//! -------------
//! - [`adapter::ArgMinAdapter`] turns `log p(θ | y)` into the Argmin cost
//!   `c(θ) = -log p(θ | y)`.
//! - [`maximize`] validates the start, picks a solver via [`builders`],
//!   runs it with [`run::run_lbfgs`] and returns a [`MapOutcome`].
//! - [`finite_diff`] supplies numeric gradients and the Hessian used for
//!   Laplace scales.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameters live in unconstrained coordinates; the model layer owns
//!   the constraining transforms and their Jacobians.
//! - [`LogDensity::value`] reports invalid inputs as [`OptError`] values,
//!   never panics.
//!
//! Conventions
//! -----------
//! - All user-facing values ([`MapOutcome::value`]) are log densities, not
//!   costs.
//! - Errors bubble up as [`OptResult<T>`]; the model layer converts them
//!   into `PopError::Optimization` or downgrades them to a warning.
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign handling in [`adapter`], option validation in
//!   [`traits`], derivative helpers in [`finite_diff`] and end-to-end mode
//!   recovery on a Gaussian in [`api`].
//!
//! [`OptError`]: crate::optimization::errors::OptError
//! [`OptResult<T>`]: crate::optimization::errors::OptResult

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::maximize;
pub use self::traits::{LineSearcher, LogDensity, MapOptions, MapOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};
