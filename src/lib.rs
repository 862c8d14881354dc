//! gompertz_bayes: Bayesian Gompertz population models for short annual
//! abundance series.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers, the library behind the
//! `gompertz-bayes` binary, and the PyO3 bridge exposing the fitted models
//! to Python via the `_gompertz_bayes` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the analysis stages: `population` (data, priors, models,
//!   Gibbs sampler), `posterior` (summaries, convergence, residual flags,
//!   PSIS-LOO), `viz` (text charts) and the `pipeline` that chains them.
//! - Provide the ambient pieces used by the binary: `config` (TOML),
//!   `logging` (tracing subscriber) and `report` (text / JSON output).
//! - When `python-bindings` is enabled, define the `GompertzFit` class and
//!   the `#[pymodule]` initializer.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; the PyO3 items here
//!   perform only input conversion, dispatch and error mapping.
//! - Inputs accepted by a validated constructor keep the invariants
//!   documented in the module that owns the type.
//!
//! Conventions
//! -----------
//! - Abundances are modelled on the natural-log scale; years are `i32`.
//! - Errors are [`population::PopError`] internally and become `ValueError`
//!   at the Python boundary.
//!
//! Downstream usage
//! ----------------
//! - Rust callers typically use [`population::sample_posterior`] and the
//!   `posterior` helpers directly, or [`pipeline::run_pipeline`] for the
//!   full analysis.
//! - The Python package wraps `_gompertz_bayes.models.GompertzFit`.
//!
//! Testing notes
//! -------------
//! - Unit tests sit next to each module; `tests/` drives the pipeline end
//!   to end on simulated series.

pub mod config;
pub mod inference;
pub mod logging;
pub mod optimization;
pub mod pipeline;
pub mod population;
pub mod posterior;
pub mod report;
pub mod utils;
pub mod viz;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    population::{ModelSpec, ObservationSeries, PosteriorFit, PriorSpec, sample_posterior},
    posterior::{prob_below, psis_loo, summarize_parameters, summarize_predictions},
    utils::{extract_sampler_options, extract_series},
};

/// GompertzFit: Python-facing wrapper around a fitted [`PosteriorFit`].
///
/// Purpose
/// -------
/// Let Python callers fit one Gompertz variant to a series and read back
/// summaries, predictions, tail probabilities and LOO scores.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `GompertzFit(years, index, model="gompertz_t", iter=None, warmup=None,
/// chains=None, thin=None, seed=None, parallel=None)`:
/// - `years`: integer sequence, strictly increasing.
/// - `index`: positive abundance values, same length as `years`.
/// - `model`: one of `gompertz_normal`, `gompertz_t`, `ss_gompertz_normal`,
///   `ss_gompertz_t` (case-insensitive).
/// - Sampler keywords default to [`crate::population::SamplerOptions`];
///   `warmup` defaults to half of `iter`.
///
/// Notes
/// -----
/// - Sampling runs with the GIL released.
/// - Priors are the crate defaults.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "gompertz_bayes.models", unsendable)]
pub struct GompertzFit {
    inner: PosteriorFit,
    series: ObservationSeries,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl GompertzFit {
    #[new]
    #[pyo3(
        text_signature = "(years, index, /, model='gompertz_t', iter=None, warmup=None, chains=None, thin=None, seed=None, parallel=None)",
        signature = (years, index, model = "gompertz_t", iter = None, warmup = None, chains = None, thin = None, seed = None, parallel = None)
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn fit<'py>(
        py: Python<'py>, years: &Bound<'py, PyAny>, index: &Bound<'py, PyAny>, model: &str,
        iter: Option<usize>, warmup: Option<usize>, chains: Option<usize>, thin: Option<usize>,
        seed: Option<u64>, parallel: Option<bool>,
    ) -> PyResult<GompertzFit> {
        let spec: ModelSpec = model.parse()?;
        let series = extract_series(py, years, index)?;
        let options = extract_sampler_options(iter, warmup, chains, thin, seed, parallel)?;
        let priors = PriorSpec::default();
        let inner = py.allow_threads(|| sample_posterior(&spec, &series, &priors, &options))?;
        Ok(GompertzFit { inner, series })
    }

    /// Registry name of the fitted model.
    #[getter]
    pub fn model(&self) -> String {
        self.inner.spec.to_string()
    }

    #[getter]
    pub fn parameter_names(&self) -> Vec<String> {
        self.inner.parameter_names().into_iter().map(str::to_string).collect()
    }

    /// Pooled post-warmup draws of one parameter, chain-major.
    pub fn draws<'py>(&self, py: Python<'py>, name: &str) -> PyResult<Bound<'py, PyArray1<f64>>> {
        Ok(self.inner.pooled(name)?.into_pyarray(py))
    }

    /// `(name, mean, sd, q2.5, median, q97.5, rhat, ess)` per parameter.
    #[allow(clippy::type_complexity)]
    pub fn summary(&self) -> PyResult<Vec<(String, f64, f64, f64, f64, f64, f64, f64)>> {
        Ok(summarize_parameters(&self.inner, &[])?
            .into_iter()
            .map(|p| (p.name, p.mean, p.sd, p.lower, p.median, p.upper, p.rhat, p.ess))
            .collect())
    }

    /// `(year, observed, median, q2.5, q97.5, residual)` per observation,
    /// on the log scale.
    pub fn predictions(&self) -> PyResult<Vec<(i32, f64, f64, f64, f64, f64)>> {
        Ok(summarize_predictions(&self.inner, &self.series)?
            .into_iter()
            .map(|r| (r.year, r.observed, r.estimate, r.lower, r.upper, r.residual))
            .collect())
    }

    /// Posterior probability that `name` is strictly below `cutoff`.
    #[pyo3(signature = (cutoff, name = "nu"))]
    pub fn prob_below(&self, cutoff: f64, name: &str) -> PyResult<f64> {
        if !cutoff.is_finite() {
            return Err(PyValueError::new_err("cutoff must be finite"));
        }
        Ok(prob_below(&self.inner.pooled(name)?, cutoff)?)
    }

    /// `(looic, se_looic, p_loo, n_high_k)` from PSIS-LOO.
    pub fn loo(&self) -> PyResult<(f64, f64, f64, usize)> {
        let loo = psis_loo(self.inner.log_lik())?;
        Ok((loo.looic, loo.se_looic, loo.p_loo, loo.high_k))
    }

    fn __repr__(&self) -> String {
        format!(
            "GompertzFit(model={}, observations={}, draws={})",
            self.inner.spec,
            self.series.len(),
            self.inner.total_draws()
        )
    }
}

/// `_gompertz_bayes`: PyO3 module initializer.
///
/// Registers the `models` submodule and inserts it into `sys.modules` so
/// `gompertz_bayes.models` resolves with dot notation.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _gompertz_bayes<'py>(py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let models_mod = PyModule::new(py, "models")?;
    models(py, m, &models_mod)?;

    py.import("sys")?.getattr("modules")?.set_item("gompertz_bayes.models", models_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn models<'py>(
    _py: Python, gompertz_bayes: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<GompertzFit>()?;
    gompertz_bayes.add_submodule(m)?;
    Ok(())
}
