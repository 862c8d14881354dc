//! population: Bayesian Gompertz population models.
//!
//! Purpose
//! -------
//! Provide the data and model layers of the pipeline: loading an abundance
//! index series, describing the four Gompertz variants and their priors,
//! and sampling their joint posterior.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds validated inputs: [`ObservationSeries`] and its CSV
//!   loader, [`PriorSpec`], the [`ModelSpec`] registry, [`SamplerOptions`],
//!   shared log densities and a forward simulator.
//! - [`models`] runs the sampler and returns an immutable [`PosteriorFit`].
//! - [`errors`] centralizes [`PopError`] / [`PopResult`] for every fatal
//!   condition of the pipeline.
//!
//! Invariants & assumptions
//! ------------------------
//! - Abundance indices are strictly positive and finite; models operate on
//!   their natural logarithm.
//! - Consecutive rows are consecutive time steps even when years skip;
//!   gaps are logged when a series is built.
//! - A fit never changes after it is returned.
//!
//! Conventions
//! -----------
//! - The process equation is `x_t = lambda + b·x_{t−1} + ε_t` on the log
//!   scale, with `b = 1` meaning density independence.
//! - Library code logs through `tracing` and never installs a subscriber.
//!
//! Downstream usage
//! ----------------
//! - Typical flow:
//!   1. [`load_series_csv`] (or [`ObservationSeries::new`]).
//!   2. Pick a [`ModelSpec`] by name, e.g. `"ss_gompertz_t".parse()`.
//!   3. [`sample_posterior`] with a [`PriorSpec`] and [`SamplerOptions`].
//!   4. Hand the fit to `posterior` for summaries, residual flags and LOO.
//!
//! Testing notes
//! -------------
//! - Unit tests beside each submodule; end-to-end statistical properties
//!   live in `tests/integration_gompertz_pipeline.rs`.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::{
    data::{MIN_OBSERVATIONS, ObservationSeries},
    loader::{ColumnSelection, load_series_csv, read_series_csv},
    options::SamplerOptions,
    priors::PriorSpec,
    simulate::{GompertzSimulation, SimulatedSeries},
    spec::{ModelSpec, ObservationModel, ProcessError},
};

pub use self::errors::{PopError, PopResult};

pub use self::models::{PosteriorFit, SamplerDiagnostics, SamplerWarning, sample_posterior};

pub mod prelude {
    pub use super::{
        ColumnSelection, GompertzSimulation, ModelSpec, ObservationSeries, PopError, PopResult,
        PosteriorFit, PriorSpec, SamplerOptions, load_series_csv, sample_posterior,
    };
}
