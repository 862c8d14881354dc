//! numerical_stability: guarded transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Map bounded model parameters (the autoregressive coefficient `b` on its
//! uniform prior support, positive scales) into unconstrained coordinates
//! for the mode search and back, without overflow in the tails.
//!
//! Conventions
//! -----------
//! - Pure functions over `f64`; no logging, no allocation.
//! - Log-Jacobians are returned alongside transforms so densities in
//!   unconstrained coordinates stay proper.

pub mod transformations;

pub use self::transformations::{
    EIGEN_EPS, LOGIT_EPS, from_interval, interval_log_jacobian, safe_logistic, safe_softplus,
    to_interval,
};
