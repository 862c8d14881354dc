//! Posterior summaries of parameters and per-year predictions.
//!
//! Purpose
//! -------
//! Reduce the draws held by a [`PosteriorFit`] to the tables the report
//! prints: one [`ParamSummary`] per scalar parameter, one [`PredictionRow`]
//! per observation, and posterior probabilities that a parameter falls
//! below a cutoff.
//!
//! Key behaviors
//! -------------
//! - Quantiles use linear interpolation between order statistics (R type 7,
//!   the `quantile()` default).
//! - Predictions are joined to observations through their year. A year
//!   present on one side only is reported as
//!   [`PopError::MisalignedSeries`]; rows are never matched by position.
//!
//! Invariants & assumptions
//! ------------------------
//! - Summaries contain exactly one row per observation, and each row has
//!   `lower ≤ estimate ≤ upper`.
use crate::{
    population::{
        core::data::ObservationSeries,
        errors::{PopError, PopResult},
        models::fit::PosteriorFit,
    },
    posterior::convergence::{effective_sample_size, split_rhat},
};
use serde::Serialize;

/// Lower and upper credible-interval probabilities.
pub const INTERVAL: (f64, f64) = (0.025, 0.975);

/// Summary of one scalar parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSummary {
    pub name: String,
    pub mean: f64,
    pub sd: f64,
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
    pub rhat: f64,
    pub ess: f64,
}

/// Posterior summary of the prediction for one observed year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub year: i32,
    /// Observed log index.
    pub observed: f64,
    /// Posterior median.
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
    /// `observed − estimate`.
    pub residual: f64,
}

/// Probability that a parameter lies below a cutoff under one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbBelowRow {
    pub model: String,
    pub parameter: String,
    pub cutoff: f64,
    pub probability: f64,
}

fn check_probability(p: f64) -> PopResult<()> {
    if !(0.0..=1.0).contains(&p) {
        return Err(PopError::InvalidProbability { value: p });
    }
    Ok(())
}

/// Type-7 quantile of an ascending slice.
fn sorted_quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Sample quantile with linear interpolation (R type 7).
///
/// Errors
/// ------
/// - [`PopError::InvalidProbability`] for `p` outside `[0, 1]`.
/// - [`PopError::EmptyDraws`] for an empty slice.
pub fn quantile(values: &[f64], p: f64) -> PopResult<f64> {
    check_probability(p)?;
    if values.is_empty() {
        return Err(PopError::EmptyDraws { name: "quantile".to_string() });
    }
    Ok(sorted_quantile(&sorted_copy(values), p))
}

/// `(lower, median, upper)` at the [`INTERVAL`] probabilities.
fn interval(values: &[f64]) -> (f64, f64, f64) {
    let sorted = sorted_copy(values);
    (
        sorted_quantile(&sorted, INTERVAL.0),
        sorted_quantile(&sorted, 0.5),
        sorted_quantile(&sorted, INTERVAL.1),
    )
}

/// Summaries for `names`, or for every model parameter when `names` is
/// empty.
pub fn summarize_parameters(fit: &PosteriorFit, names: &[&str]) -> PopResult<Vec<ParamSummary>> {
    let all = fit.parameter_names();
    let names: Vec<&str> = if names.is_empty() { all } else { names.to_vec() };
    names
        .into_iter()
        .map(|name| {
            let draws = fit.extract(name)?;
            let pooled = fit.pooled(name)?;
            let n = pooled.len() as f64;
            let mean = pooled.iter().sum::<f64>() / n;
            let sd = if n > 1.0 {
                (pooled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            } else {
                0.0
            };
            let (lower, median, upper) = interval(&pooled);
            Ok(ParamSummary {
                name: name.to_string(),
                mean,
                sd,
                lower,
                median,
                upper,
                rhat: split_rhat(draws.view()),
                ess: effective_sample_size(draws.view()),
            })
        })
        .collect()
}

/// One row per observation, joined to the fit's predictions by year.
///
/// Errors
/// ------
/// - [`PopError::MisalignedSeries`] when a year is missing on either side.
pub fn summarize_predictions(
    fit: &PosteriorFit, series: &ObservationSeries,
) -> PopResult<Vec<PredictionRow>> {
    let predictions = fit.predictions();
    if let Some(extra) = predictions.keys().find(|y| !series.years.contains(*y)) {
        return Err(PopError::MisalignedSeries { year: *extra });
    }
    series
        .years
        .iter()
        .zip(series.log_index.iter())
        .map(|(year, observed)| {
            let draws = predictions.get(year).ok_or(PopError::MisalignedSeries { year: *year })?;
            let values = draws.to_vec();
            if values.is_empty() {
                return Err(PopError::EmptyDraws { name: format!("pred[{year}]") });
            }
            let (lower, estimate, upper) = interval(&values);
            Ok(PredictionRow {
                year: *year,
                observed: *observed,
                estimate,
                lower,
                upper,
                residual: observed - estimate,
            })
        })
        .collect()
}

/// Fraction of `draws` strictly below `cutoff`.
pub fn prob_below(draws: &[f64], cutoff: f64) -> PopResult<f64> {
    if draws.is_empty() {
        return Err(PopError::EmptyDraws { name: "prob_below".to_string() });
    }
    Ok(draws.iter().filter(|d| **d < cutoff).count() as f64 / draws.len() as f64)
}

/// `P(parameter < cutoff)` for every fit that carries `parameter`.
pub fn tabulate_prob_below(
    fits: &[&PosteriorFit], parameter: &str, cutoff: f64,
) -> PopResult<Vec<ProbBelowRow>> {
    fits.iter()
        .filter(|fit| fit.parameter_names().iter().any(|name| *name == parameter))
        .map(|fit| {
            Ok(ProbBelowRow {
                model: fit.spec.to_string(),
                parameter: parameter.to_string(),
                cutoff,
                probability: prob_below(&fit.pooled(parameter)?, cutoff)?,
            })
        })
        .collect()
}
