//! Conversion helpers for the Python bindings.
//!
//! Everything here turns loosely-typed Python inputs (numpy arrays,
//! pandas Series, plain sequences) into the validated Rust types used by
//! the sampler. Validation errors surface as `ValueError` / `TypeError`.
#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArrayMethods, PyReadonlyArray1};

#[cfg(feature = "python-bindings")]
use crate::population::{ObservationSeries, SamplerOptions};

/// Borrow `raw_data` as a contiguous `f64` array, copying only when the
/// input is not already a contiguous 1-D float64 ndarray.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Years as `i32`, accepting integer arrays, Series or sequences.
#[cfg(feature = "python-bindings")]
pub fn extract_years(raw_years: &Bound<'_, PyAny>) -> PyResult<Vec<i32>> {
    if let Ok(obj) = raw_years.call_method0("tolist") {
        if let Ok(years) = obj.extract::<Vec<i32>>() {
            return Ok(years);
        }
    }
    raw_years.extract::<Vec<i32>>().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err("expected a 1-D sequence of integer years")
    })
}

/// Build a validated [`ObservationSeries`] from Python years and counts.
#[cfg(feature = "python-bindings")]
pub fn extract_series<'py>(
    py: Python<'py>, raw_years: &Bound<'py, PyAny>, raw_index: &Bound<'py, PyAny>,
) -> PyResult<ObservationSeries> {
    let years = extract_years(raw_years)?;
    let arr = extract_f64_array(py, raw_index)?;
    let index = Array1::from(arr.as_slice()?.to_vec());
    Ok(ObservationSeries::new(years, index)?)
}

/// Sampler options from keyword arguments, falling back to the defaults.
#[cfg(feature = "python-bindings")]
pub fn extract_sampler_options(
    iter: Option<usize>, warmup: Option<usize>, chains: Option<usize>, thin: Option<usize>,
    seed: Option<u64>, parallel: Option<bool>,
) -> PyResult<SamplerOptions> {
    let d = SamplerOptions::default();
    let iter = iter.unwrap_or(d.iter);
    let warmup = warmup.unwrap_or(iter / 2);
    Ok(SamplerOptions::new(
        iter,
        warmup,
        chains.unwrap_or(d.chains),
        thin.unwrap_or(d.thin),
        seed.unwrap_or(d.seed),
        d.max_doublings,
        d.target_accept,
        parallel.unwrap_or(d.parallel),
    )?)
}
