//! posterior: summaries, diagnostics and model comparison for fits.
//!
//! Purpose
//! -------
//! Consume a `population::PosteriorFit` and produce the numbers the report
//! prints: parameter and prediction summaries, convergence diagnostics,
//! residual flags, posterior tail probabilities and PSIS-LOO comparisons.
//!
//! Key behaviors
//! -------------
//! - [`summary`]: type-7 quantiles, [`ParamSummary`] and [`PredictionRow`]
//!   tables, and `P(parameter < cutoff)`.
//! - [`convergence`]: split R-hat and multi-chain effective sample size.
//! - [`residuals`]: normal tail threshold and strict residual flags.
//! - [`loo`]: PSIS-LOO estimates and model ranking.
//!
//! Invariants & assumptions
//! ------------------------
//! - Nothing here mutates a fit.
//! - Convergence and LOO problems are warnings; only malformed inputs
//!   (misaligned years, mismatched pointwise counts, empty draws) are
//!   errors.

pub mod convergence;
pub mod loo;
pub mod residuals;
pub mod summary;

pub use self::convergence::{effective_sample_size, split_rhat};
pub use self::loo::{LooComparison, LooEstimate, compare_models, psis_loo};
pub use self::residuals::{
    DEFAULT_TAIL_PROBABILITY, ResidualFlag, flag_fit_residuals, flag_residuals, tail_threshold,
};
pub use self::summary::{
    ParamSummary, PredictionRow, ProbBelowRow, prob_below, quantile, summarize_parameters,
    summarize_predictions, tabulate_prob_below,
};
