//! models: posterior sampling for the Gompertz variants.
//!
//! Purpose
//! -------
//! Turn a validated series, priors and sampler options into a
//! [`PosteriorFit`]. This layer sits on top of `population::core` and uses
//! the argmin-backed mode search from `optimization` only to place chain
//! starting points.
//!
//! Key behaviors
//! -------------
//! - [`init`]: mode of the autoregressive marginal posterior plus Laplace
//!   jitter, with a prior-centred fallback.
//! - [`gibbs`]: one chain of the data-augmentation Gibbs sweep.
//! - [`ffbs`]: forward-filtering backward-sampling of latent states.
//! - [`slice`]: slice sampler and adaptive random-walk kernels.
//! - [`fit`]: multi-chain driver, seeding and the fit handle.
//!
//! Conventions
//! -----------
//! - Time is 0-based; `t = 0` is the first observed year.
//! - Scale parameters are updated on the log scale; `b` stays on its
//!   natural scale inside the prior bounds.

pub mod ffbs;
pub mod fit;
pub mod gibbs;
pub mod init;
pub mod slice;

pub use self::fit::{PosteriorFit, SamplerDiagnostics, SamplerWarning, sample_posterior};
pub use self::init::{ChainStart, InitSource};
