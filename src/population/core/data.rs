//! Observation series containers for Gompertz population models.
//!
//! Purpose
//! -------
//! Provide a small, validated container for annual abundance indices and
//! their log transform. All downstream modules (sampler, summaries,
//! residual checks) assume the invariants enforced here.
//!
//! Key behaviors
//! -------------
//! - [`ObservationSeries::new`] validates raw `(year, index)` pairs and
//!   stores `ln(index)` alongside the raw values.
//! - [`ObservationSeries::from_log`] builds a series from values already on
//!   the log scale (used by the simulator).
//! - [`ObservationSeries::year_gaps`] reports places where consecutive rows
//!   skip calendar years.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least [`MIN_OBSERVATIONS`] rows.
//! - Index values are finite and strictly positive.
//! - Years are strictly increasing.
//! - Consecutive rows are treated as consecutive time steps even when the
//!   calendar skips years; gaps are only reported, never interpolated.
//!
//! Conventions
//! -----------
//! - Row positions are 0-based. `log_index[i] = ln(index[i])`.
//! - Years are the join key between observations and posterior
//!   predictions; see `posterior::summary`.
use crate::population::errors::{PopError, PopResult};
use ndarray::Array1;

/// Smallest series the autoregressive models can be fitted to.
pub const MIN_OBSERVATIONS: usize = 3;

/// `ObservationSeries`: validated annual index series on raw and log scale.
///
/// Fields
/// ------
/// - `years`: `Vec<i32>` strictly increasing calendar years.
/// - `index`: `Array1<f64>` raw abundance index (> 0).
/// - `log_index`: `Array1<f64>` natural log of `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    pub years: Vec<i32>,
    pub index: Array1<f64>,
    pub log_index: Array1<f64>,
}

impl ObservationSeries {
    /// Construct a validated [`ObservationSeries`] from raw index values.
    ///
    /// Errors
    /// ------
    /// - `PopError::LengthMismatch` when `years.len() != index.len()`.
    /// - `PopError::TooFewObservations` when fewer than [`MIN_OBSERVATIONS`]
    ///   rows are given.
    /// - `PopError::NonFiniteData` / `PopError::NonPositiveData` for the
    ///   first offending index value.
    /// - `PopError::UnorderedYears` when years are not strictly increasing.
    pub fn new(years: Vec<i32>, index: Array1<f64>) -> PopResult<Self> {
        if years.len() != index.len() {
            return Err(PopError::LengthMismatch { years: years.len(), index: index.len() });
        }
        if index.len() < MIN_OBSERVATIONS {
            return Err(PopError::TooFewObservations { len: index.len(), min: MIN_OBSERVATIONS });
        }
        for (i, &value) in index.iter().enumerate() {
            if !value.is_finite() {
                return Err(PopError::NonFiniteData { index: i, value });
            }
            if value <= 0.0 {
                return Err(PopError::NonPositiveData { index: i, value });
            }
        }
        verify_years(&years)?;
        let log_index = index.mapv(f64::ln);
        Ok(ObservationSeries { years, index, log_index })
    }

    /// Construct a series from values already on the log scale.
    ///
    /// The raw index is recovered as `exp(log_index)`; the same validation
    /// as [`ObservationSeries::new`] applies.
    pub fn from_log(years: Vec<i32>, log_index: Array1<f64>) -> PopResult<Self> {
        for (i, &value) in log_index.iter().enumerate() {
            if !value.is_finite() {
                return Err(PopError::NonFiniteData { index: i, value });
            }
        }
        ObservationSeries::new(years, log_index.mapv(f64::exp))
    }

    /// Number of observations `N`.
    pub fn len(&self) -> usize {
        self.years.len()
    }

    /// Always `false` for a validated series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Pairs of consecutive years that are not one calendar year apart.
    pub fn year_gaps(&self) -> Vec<(i32, i32)> {
        self.years.windows(2).filter(|w| w[1] - w[0] != 1).map(|w| (w[0], w[1])).collect()
    }
}

fn verify_years(years: &[i32]) -> PopResult<()> {
    for (i, pair) in years.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(PopError::UnorderedYears { index: i + 1, previous: pair[0], year: pair[1] });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction behavior of `ObservationSeries::new` and `from_log`.
    // - Enforcement of invariants: length, minimum size, finiteness,
    //   positivity and chronological order.
    // - Detection of calendar gaps.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that a valid series is accepted and log-transformed.
    //
    // Given
    // -----
    // - `years = [2000, 2001, 2002]`, `index = [1, e, e²]`.
    //
    // Expect
    // ------
    // - `log_index = [0, 1, 2]` and the raw values are kept as-is.
    fn new_accepts_valid_series_and_logs_it() {
        let e = std::f64::consts::E;
        let series = ObservationSeries::new(vec![2000, 2001, 2002], array![1.0, e, e * e])
            .expect("valid series");

        assert_eq!(series.len(), 3);
        assert_relative_eq!(series.log_index[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(series.log_index[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(series.log_index[2], 2.0, epsilon = 1e-12);
        assert_eq!(series.index[1], e);
    }

    #[test]
    // Purpose
    // -------
    // Ensure non-positive index values are rejected with their row.
    //
    // Given
    // -----
    // - `index = [3, 0, 2]`.
    //
    // Expect
    // ------
    // - `PopError::NonPositiveData { index: 1, value: 0.0 }`.
    fn new_rejects_non_positive_index() {
        let result = ObservationSeries::new(vec![1, 2, 3], array![3.0, 0.0, 2.0]);

        assert_eq!(result.unwrap_err(), PopError::NonPositiveData { index: 1, value: 0.0 });
    }

    #[test]
    // Purpose
    // -------
    // Ensure non-finite index values are rejected before the positivity check.
    //
    // Given
    // -----
    // - `index = [1, NaN, 2]`.
    //
    // Expect
    // ------
    // - `PopError::NonFiniteData` at row 1.
    fn new_rejects_non_finite_index() {
        let result = ObservationSeries::new(vec![1, 2, 3], array![1.0, f64::NAN, 2.0]);

        assert!(matches!(result.unwrap_err(), PopError::NonFiniteData { index: 1, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Ensure years must be strictly increasing.
    //
    // Given
    // -----
    // - `years = [1990, 1992, 1992]`.
    //
    // Expect
    // ------
    // - `PopError::UnorderedYears { index: 2, previous: 1992, year: 1992 }`.
    fn new_rejects_unordered_years() {
        let result = ObservationSeries::new(vec![1990, 1992, 1992], array![1.0, 2.0, 3.0]);

        assert_eq!(
            result.unwrap_err(),
            PopError::UnorderedYears { index: 2, previous: 1992, year: 1992 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Ensure short and mismatched inputs are rejected.
    //
    // Expect
    // ------
    // - Two rows → `TooFewObservations`; mismatched lengths → `LengthMismatch`.
    fn new_rejects_short_or_mismatched_input() {
        assert_eq!(
            ObservationSeries::new(vec![1, 2], array![1.0, 2.0]).unwrap_err(),
            PopError::TooFewObservations { len: 2, min: MIN_OBSERVATIONS }
        );
        assert_eq!(
            ObservationSeries::new(vec![1, 2, 3], array![1.0, 2.0]).unwrap_err(),
            PopError::LengthMismatch { years: 3, index: 2 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify gap reporting and the `from_log` round trip on the raw scale.
    //
    // Given
    // -----
    // - `years = [2000, 2001, 2004]`, `log_index = [0, ln 2, ln 4]`.
    //
    // Expect
    // ------
    // - One gap `(2001, 2004)`; raw index `[1, 2, 4]`.
    fn from_log_recovers_raw_index_and_reports_gaps() {
        let series = ObservationSeries::from_log(
            vec![2000, 2001, 2004],
            array![0.0, 2.0_f64.ln(), 4.0_f64.ln()],
        )
        .expect("valid log series");

        assert_eq!(series.year_gaps(), vec![(2001, 2004)]);
        assert_relative_eq!(series.index[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(series.index[2], 4.0, epsilon = 1e-12);
    }
}
