//! Errors for Gompertz population models (data loading, priors, sampler
//! options, posterior extraction, model comparison and rendering).
//!
//! This module defines the crate-wide error type, [`PopError`], used by the
//! loader, the sampler, the posterior summaries and the pipeline. It
//! implements `Display`/`Error` and converts to `PyErr` when the
//! `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** row positions in the loaded series.
//! - Index values must be **strictly positive and finite** (they are
//!   log-transformed before modeling).
//! - Sampler convergence problems are *not* errors; they are surfaced as
//!   warnings through `tracing` and recorded in the fit diagnostics.
//! - Optimizer failures from the MAP initializer are normalized to
//!   [`PopError::Optimization`].
use crate::optimization::errors::OptError;

/// Crate-wide result alias for population-model operations.
pub type PopResult<T> = Result<T, PopError>;

/// Unified error type for the population-analysis pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PopError {
    // ---- Input/data validation ----
    /// Series has fewer rows than the models can use.
    TooFewObservations { len: usize, min: usize },

    /// `years` and `index` have different lengths.
    LengthMismatch { years: usize, index: usize },

    /// An index value is NaN/±inf.
    NonFiniteData { index: usize, value: f64 },

    /// An index value is ≤ 0 (log transform undefined).
    NonPositiveData { index: usize, value: f64 },

    /// Years must be strictly increasing.
    UnorderedYears { index: usize, previous: i32, year: i32 },

    /// Generated year labels would not fit in `i32`.
    YearOverflow { start: i32, len: usize },

    // ---- Loader ----
    /// Input file could not be opened or read.
    Io { path: String, reason: String },

    /// Requested column is not present in the CSV header.
    MissingColumn { column: String },

    /// A cell could not be parsed as a number.
    ParseField { row: usize, column: String, value: String },

    /// Underlying CSV reader failure.
    Csv { reason: String },

    // ---- Configuration ----
    /// Configuration file could not be parsed.
    Config { reason: String },

    /// Unknown model registry name.
    UnknownModel { name: String },

    // ---- Priors ----
    /// Prior hyperparameter must be finite and > 0.
    InvalidPriorScale { name: &'static str, value: f64 },

    /// Prior location must be finite.
    InvalidPriorLocation { name: &'static str, value: f64 },

    /// Bounds on `b` must satisfy lower < upper.
    InvalidBounds { lower: f64, upper: f64 },

    // ---- Sampler options ----
    /// Sampler option out of range.
    InvalidSamplerOption { name: &'static str, reason: &'static str },

    // ---- Sampling ----
    /// A Gibbs update produced a non-finite value.
    NonFiniteDraw { parameter: String, chain: usize, iteration: usize, value: f64 },

    /// A sampling distribution rejected its parameters.
    Distribution { reason: String },

    /// MAP initialisation failed in the optimizer layer.
    Optimization { reason: String },

    // ---- Posterior extraction / summaries ----
    /// Parameter name not present in the fit.
    UnknownParameter { name: String },

    /// Not enough draws to summarize.
    EmptyDraws { name: String },

    /// Probability must lie in (0, 1).
    InvalidProbability { value: f64 },

    /// Predictions and observations disagree on a year.
    MisalignedSeries { year: i32 },

    // ---- Model comparison ----
    /// Pointwise log-likelihood matrices have different column counts.
    LooDimensionMismatch { expected: usize, found: usize },

    /// Model comparison needs at least one model.
    NoModelsToCompare,

    // ---- Rendering ----
    /// Plot input is empty or contains no finite values.
    EmptyPlotData { plot: &'static str },

    // ---- Report ----
    /// JSON serialization failure.
    Serialize { reason: String },
}

impl std::error::Error for PopError {}

impl std::fmt::Display for PopError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            PopError::TooFewObservations { len, min } => {
                write!(f, "Series has {len} observations; at least {min} are required.")
            }
            PopError::LengthMismatch { years, index } => {
                write!(f, "Year column has {years} rows but index column has {index}.")
            }
            PopError::NonFiniteData { index, value } => {
                write!(f, "Index value at row {index} is non-finite: {value}")
            }
            PopError::NonPositiveData { index, value } => {
                write!(f, "Index value at row {index} must be > 0; got: {value}")
            }
            PopError::UnorderedYears { index, previous, year } => {
                write!(
                    f,
                    "Years must be strictly increasing; row {index} has {year} after {previous}."
                )
            }
            PopError::YearOverflow { start, len } => {
                write!(f, "{len} years starting at {start} overflow the year range.")
            }
            // ---- Loader ----
            PopError::Io { path, reason } => {
                write!(f, "Could not read '{path}': {reason}")
            }
            PopError::MissingColumn { column } => {
                write!(f, "Column '{column}' not found in CSV header.")
            }
            PopError::ParseField { row, column, value } => {
                write!(f, "Row {row}, column '{column}': cannot parse '{value}' as a number.")
            }
            PopError::Csv { reason } => {
                write!(f, "Malformed CSV input: {reason}")
            }
            // ---- Configuration ----
            PopError::Config { reason } => {
                write!(f, "Invalid configuration: {reason}")
            }
            PopError::UnknownModel { name } => {
                write!(
                    f,
                    "Unknown model '{name}'. Valid options are 'gompertz_normal', 'gompertz_t', \
                     'ss_gompertz_normal' or 'ss_gompertz_t'."
                )
            }
            // ---- Priors ----
            PopError::InvalidPriorScale { name, value } => {
                write!(f, "Prior hyperparameter '{name}' must be finite and > 0; got: {value}")
            }
            PopError::InvalidPriorLocation { name, value } => {
                write!(f, "Prior hyperparameter '{name}' must be finite; got: {value}")
            }
            PopError::InvalidBounds { lower, upper } => {
                write!(f, "Bounds for b must satisfy lower < upper; got [{lower}, {upper}]")
            }
            // ---- Sampler options ----
            PopError::InvalidSamplerOption { name, reason } => {
                write!(f, "Invalid sampler option '{name}': {reason}")
            }
            // ---- Sampling ----
            PopError::NonFiniteDraw { parameter, chain, iteration, value } => {
                write!(
                    f,
                    "Chain {chain} produced a non-finite draw for '{parameter}' at iteration \
                     {iteration}: {value}"
                )
            }
            PopError::Distribution { reason } => {
                write!(f, "Sampling distribution rejected its parameters: {reason}")
            }
            PopError::Optimization { reason } => {
                write!(f, "MAP initialisation failed: {reason}")
            }
            // ---- Posterior extraction / summaries ----
            PopError::UnknownParameter { name } => {
                write!(f, "Parameter '{name}' is not present in the fit.")
            }
            PopError::EmptyDraws { name } => {
                write!(f, "No draws available for '{name}'.")
            }
            PopError::InvalidProbability { value } => {
                write!(f, "Probability must lie strictly between 0 and 1; got: {value}")
            }
            PopError::MisalignedSeries { year } => {
                write!(f, "Predictions and observations disagree at year {year}.")
            }
            // ---- Model comparison ----
            PopError::LooDimensionMismatch { expected, found } => {
                write!(
                    f,
                    "Models are not comparable: expected {expected} pointwise terms, found {found}."
                )
            }
            PopError::NoModelsToCompare => {
                write!(f, "Model comparison needs at least one fitted model.")
            }
            // ---- Rendering ----
            PopError::EmptyPlotData { plot } => {
                write!(f, "Nothing to draw for the {plot} plot.")
            }
            // ---- Report ----
            PopError::Serialize { reason } => {
                write!(f, "Could not serialize report: {reason}")
            }
        }
    }
}

impl From<OptError> for PopError {
    fn from(err: OptError) -> PopError {
        PopError::Optimization { reason: err.to_string() }
    }
}

impl From<csv::Error> for PopError {
    fn from(err: csv::Error) -> PopError {
        PopError::Csv { reason: err.to_string() }
    }
}

impl From<toml::de::Error> for PopError {
    fn from(err: toml::de::Error) -> PopError {
        PopError::Config { reason: err.to_string() }
    }
}

impl From<serde_json::Error> for PopError {
    fn from(err: serde_json::Error) -> PopError {
        PopError::Serialize { reason: err.to_string() }
    }
}

impl From<rand_distr::GammaError> for PopError {
    fn from(err: rand_distr::GammaError) -> PopError {
        PopError::Distribution { reason: err.to_string() }
    }
}

impl From<rand_distr::NormalError> for PopError {
    fn from(err: rand_distr::NormalError) -> PopError {
        PopError::Distribution { reason: err.to_string() }
    }
}

impl From<statrs::distribution::NormalError> for PopError {
    fn from(err: statrs::distribution::NormalError) -> PopError {
        PopError::Distribution { reason: err.to_string() }
    }
}

/// Convert a [`PopError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<PopError> for pyo3::PyErr {
    fn from(err: PopError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Conversion of third-party distribution errors into `PopError`.
    // - Payload values embedded in `Display` messages.
    //
    // They intentionally DO NOT cover:
    // - The `From<PopError> for PyErr` conversion, which needs the Python
    //   C API.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A rejected statrs normal becomes `PopError::Distribution`.
    //
    // Given
    // -----
    // - `statrs::distribution::Normal::new(0, -1)`.
    //
    // Expect
    // ------
    // - `PopError::Distribution` with a non-empty reason.
    fn statrs_normal_error_maps_to_distribution() {
        // Arrange
        let raw = statrs::distribution::Normal::new(0.0, -1.0).unwrap_err();

        // Act
        let err = PopError::from(raw);

        // Assert
        match err {
            PopError::Distribution { reason } => assert!(!reason.trim().is_empty()),
            other => panic!("expected Distribution, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Overflowing year labels name the start year and length.
    fn year_overflow_message_includes_payload() {
        let msg = PopError::YearOverflow { start: 2_147_483_600, len: 100 }.to_string();

        assert!(msg.contains("2147483600") && msg.contains("100"), "{msg}");
    }
}
