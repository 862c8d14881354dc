//! population::core: data, priors, model registry and sampler settings.
//!
//! Purpose
//! -------
//! Collect the validated building blocks that a fit is assembled from:
//! the observation series and its CSV loader, prior hyperparameters, the
//! fixed model registry, sampler options, shared log densities and a
//! forward simulator.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every type with a `new` constructor validates its inputs and returns
//!   `PopResult`; types deserialized from configuration expose a matching
//!   `validate` method.
//! - Nothing in this module samples from the posterior; see
//!   `population::models`.
//!
//! Testing notes
//! -------------
//! - Each submodule carries its own unit tests for validation paths and
//!   closed-form quantities.

pub mod data;
pub mod densities;
pub mod loader;
pub mod options;
pub mod priors;
pub mod simulate;
pub mod spec;
