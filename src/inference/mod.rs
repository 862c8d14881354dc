//! inference: approximate posterior geometry around the mode.
//!
//! Purpose
//! -------
//! Supply the Laplace step of chain initialization: given the mode found
//! by `optimization::map_optimizer`, estimate per-coordinate posterior
//! scales from the curvature of the negative log posterior.
//!
//! Downstream usage
//! ----------------
//! - `population::models::init` calls [`laplace::laplace_scales`] after a
//!   successful mode search and uses the result to size starting-point
//!   jitter.
//!
//! Testing notes
//! -------------
//! - Unit tests compare scales against analytic Gaussian posteriors.

pub mod laplace;

pub use self::laplace::laplace_scales;
