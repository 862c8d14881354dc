//! Tail-probability flags for prediction residuals.
//!
//! A residual is flagged when it falls beyond the upper `1 − p` quantile of
//! `N(0, σ̃)`, where `σ̃` is the posterior median of the process scale. The
//! comparison is two-sided on `|residual|` and strict. No multiple
//! comparison correction is applied.
use crate::{
    population::{
        errors::{PopError, PopResult},
        models::fit::PosteriorFit,
    },
    posterior::summary::{PredictionRow, quantile},
};
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

/// Default tail probability.
pub const DEFAULT_TAIL_PROBABILITY: f64 = 0.001;

/// One residual with its flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualFlag {
    pub year: i32,
    pub residual: f64,
    pub threshold: f64,
    pub flagged: bool,
}

/// `Normal(0, sigma_median).inverse_cdf(1 − tail_probability)`.
///
/// Errors
/// ------
/// - [`PopError::InvalidProbability`] unless `0 < tail_probability < 1`.
/// - [`PopError::Distribution`] for a non-positive or non-finite scale.
pub fn tail_threshold(sigma_median: f64, tail_probability: f64) -> PopResult<f64> {
    if !(tail_probability > 0.0 && tail_probability < 1.0) {
        return Err(PopError::InvalidProbability { value: tail_probability });
    }
    let dist = Normal::new(0.0, sigma_median)?;
    Ok(dist.inverse_cdf(1.0 - tail_probability))
}

/// Flag rows whose absolute residual exceeds `threshold`.
pub fn flag_residuals(rows: &[PredictionRow], threshold: f64) -> Vec<ResidualFlag> {
    rows.iter()
        .map(|row| ResidualFlag {
            year: row.year,
            residual: row.residual,
            threshold,
            flagged: row.residual.abs() > threshold,
        })
        .collect()
}

/// Threshold from the fit's median `sigma_proc`, then [`flag_residuals`].
pub fn flag_fit_residuals(
    fit: &PosteriorFit, rows: &[PredictionRow], tail_probability: f64,
) -> PopResult<Vec<ResidualFlag>> {
    let sigma_median = quantile(&fit.pooled("sigma_proc")?, 0.5)?;
    let threshold = tail_threshold(sigma_median, tail_probability)?;
    let flags = flag_residuals(rows, threshold);
    let flagged = flags.iter().filter(|f| f.flagged).count();
    tracing::info!(model = %fit.spec, threshold, flagged, "residuals flagged");
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Threshold values against standard normal quantiles, the strict
    // comparison at the boundary, and input validation.
    // -------------------------------------------------------------------------

    fn row(year: i32, residual: f64) -> PredictionRow {
        PredictionRow {
            year,
            observed: residual,
            estimate: 0.0,
            lower: -1.0,
            upper: 1.0,
            residual,
        }
    }

    #[test]
    // Purpose
    // -------
    // The threshold is the scaled standard normal quantile.
    //
    // Expect
    // ------
    // - `p = 0.001`, `σ̃ = 0.2` → `0.2 · 3.090232…`.
    fn tail_threshold_scales_normal_quantile() {
        let t = tail_threshold(0.2, 0.001).unwrap();

        assert_relative_eq!(t, 0.2 * 3.090_232_306_167_813, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // A residual exactly at the threshold is not flagged; one beyond it is,
    // in either direction.
    fn flag_residuals_is_strict_and_two_sided() {
        let threshold = tail_threshold(0.5, 0.01).unwrap();
        let rows = [
            row(2000, threshold),
            row(2001, -threshold),
            row(2002, threshold + 1e-9),
            row(2003, -threshold - 1e-9),
            row(2004, 0.0),
        ];

        let flags: Vec<bool> = flag_residuals(&rows, threshold).iter().map(|f| f.flagged).collect();

        assert_eq!(flags, vec![false, false, true, true, false]);
    }

    #[test]
    // Purpose
    // -------
    // Degenerate probabilities and scales are rejected.
    fn tail_threshold_rejects_bad_inputs() {
        assert!(matches!(tail_threshold(0.2, 0.0), Err(PopError::InvalidProbability { .. })));
        assert!(matches!(tail_threshold(0.2, 1.0), Err(PopError::InvalidProbability { .. })));
        assert!(matches!(tail_threshold(-1.0, 0.01), Err(PopError::Distribution { .. })));
    }
}
