//! Posterior fit handle and the multi-chain driver.
//!
//! Purpose
//! -------
//! [`sample_posterior`] is the model invoker: it validates its inputs,
//! derives chain starting points, runs the chains (on the rayon pool when
//! requested) and assembles an immutable [`PosteriorFit`].
//!
//! Key behaviors
//! -------------
//! - Chain `c` uses a xoshiro stream obtained from the base seed by `c + 1`
//!   calls to `jump()`; initialization uses the base stream. The same seed
//!   therefore reproduces the same draws whether chains run serially or in
//!   parallel.
//! - Scalar draws are stored `draws × chains`; predictions and pointwise
//!   log-likelihood are pooled `(draws·chains) × N`, chain-major.
//! - Predictions are stored against their year so that summaries join them
//!   to observations by year rather than by position.
//! - Sampler warnings (doubling saturation, low `ν` acceptance, R-hat above
//!   [`RHAT_WARN`], ESS below [`ESS_WARN_PER_CHAIN`] per chain) are logged
//!   and collected in [`SamplerDiagnostics`]; none of them is fatal.
use std::collections::BTreeMap;

use crate::{
    population::{
        core::{
            data::ObservationSeries, options::SamplerOptions, priors::PriorSpec, spec::ModelSpec,
        },
        errors::{PopError, PopResult},
        models::{
            gibbs::{ChainDraws, ChainStats, run_chain},
            init::{InitSource, initialize_chains},
        },
    },
    posterior::convergence::{effective_sample_size, split_rhat},
};
use ndarray::{Array1, Array2, ArrayView1, s};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::Serialize;

/// R-hat above this triggers a warning.
pub const RHAT_WARN: f64 = 1.05;

/// Bulk ESS below this many draws per chain triggers a warning.
pub const ESS_WARN_PER_CHAIN: f64 = 100.0;

/// `ν` random-walk acceptance below this triggers a warning.
pub const LOW_ACCEPTANCE: f64 = 0.15;

/// A non-fatal sampler warning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SamplerWarning {
    DoublingSaturation { chain: usize, count: usize, updates: usize },
    LowAcceptance { chain: usize, rate: f64 },
    HighRhat { parameter: String, rhat: f64 },
    LowEss { parameter: String, ess: f64 },
}

impl std::fmt::Display for SamplerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SamplerWarning::DoublingSaturation { chain, count, updates } => write!(
                f,
                "chain {chain}: {count} of {updates} slice updates hit the doubling limit"
            ),
            SamplerWarning::LowAcceptance { chain, rate } => {
                write!(f, "chain {chain}: nu acceptance rate {rate:.3} is low")
            }
            SamplerWarning::HighRhat { parameter, rhat } => {
                write!(f, "{parameter}: R-hat {rhat:.3} exceeds {RHAT_WARN}")
            }
            SamplerWarning::LowEss { parameter, ess } => {
                write!(f, "{parameter}: effective sample size {ess:.0} is low")
            }
        }
    }
}

/// Sampler bookkeeping carried by a fit.
#[derive(Debug, Clone, Serialize)]
pub struct SamplerDiagnostics {
    pub chains: Vec<ChainStats>,
    pub warnings: Vec<SamplerWarning>,
    /// `true` when chain starts came from the posterior mode.
    pub map_init: bool,
}

/// Immutable result of [`sample_posterior`].
#[derive(Debug, Clone)]
pub struct PosteriorFit {
    pub spec: ModelSpec,
    pub options: SamplerOptions,
    draws: BTreeMap<&'static str, Array2<f64>>,
    pred: BTreeMap<i32, Array1<f64>>,
    log_lik: Array2<f64>,
    pub diagnostics: SamplerDiagnostics,
}

impl PosteriorFit {
    /// Names of the scalar parameters, in model order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.spec.parameter_names()
    }

    /// `draws × chains` matrix for a scalar parameter.
    ///
    /// Errors
    /// ------
    /// - [`PopError::UnknownParameter`] for names the model does not carry.
    pub fn extract(&self, name: &str) -> PopResult<Array2<f64>> {
        self.draws
            .get(name)
            .cloned()
            .ok_or_else(|| PopError::UnknownParameter { name: name.to_string() })
    }

    /// All draws of a scalar parameter, chain-major.
    pub fn pooled(&self, name: &str) -> PopResult<Vec<f64>> {
        let draws = self.extract(name)?;
        let pooled: Vec<f64> = draws.t().iter().copied().collect();
        if pooled.is_empty() {
            return Err(PopError::EmptyDraws { name: name.to_string() });
        }
        Ok(pooled)
    }

    /// Prediction draws keyed by year.
    pub fn predictions(&self) -> &BTreeMap<i32, Array1<f64>> {
        &self.pred
    }

    /// Prediction draws for one year.
    pub fn prediction_draws(&self, year: i32) -> Option<ArrayView1<'_, f64>> {
        self.pred.get(&year).map(|p| p.view())
    }

    /// `(draws·chains) × n_lik` pointwise log-likelihood.
    pub fn log_lik(&self) -> &Array2<f64> {
        &self.log_lik
    }

    pub fn total_draws(&self) -> usize {
        self.options.draws_per_chain() * self.options.chains
    }
}

/// Run the sampler for `spec` on `series`.
///
/// Errors
/// ------
/// - Prior or option validation errors.
/// - Any chain failure ([`PopError::NonFiniteDraw`], distribution errors).
pub fn sample_posterior(
    spec: &ModelSpec, series: &ObservationSeries, priors: &PriorSpec, options: &SamplerOptions,
) -> PopResult<PosteriorFit> {
    priors.validate()?;
    options.validate()?;
    let spec = *spec;
    let y = &series.log_index;

    let mut base = Xoshiro256PlusPlus::seed_from_u64(options.seed);
    let (starts, source) = initialize_chains(spec, y, priors, options.chains, &mut base)?;
    let mut streams = Vec::with_capacity(options.chains);
    let mut stream = base.clone();
    for _ in 0..options.chains {
        stream.jump();
        streams.push(stream.clone());
    }

    tracing::info!(
        model = %spec,
        n = series.len(),
        chains = options.chains,
        iter = options.iter,
        warmup = options.warmup,
        parallel = options.parallel,
        "sampling posterior"
    );
    let run = |(chain, (start, mut rng)): (usize, (_, Xoshiro256PlusPlus))| {
        run_chain(chain, spec, y, priors, options, start, &mut rng)
    };
    let jobs: Vec<_> = starts.iter().zip(streams).enumerate().collect();
    let results: Vec<PopResult<ChainDraws>> = if options.parallel {
        jobs.into_par_iter().map(run).collect()
    } else {
        jobs.into_iter().map(run).collect()
    };
    let chains = results.into_iter().collect::<PopResult<Vec<_>>>()?;

    assemble(spec, series, options, chains, source)
}

fn assemble(
    spec: ModelSpec, series: &ObservationSeries, options: &SamplerOptions,
    chains: Vec<ChainDraws>, source: InitSource,
) -> PopResult<PosteriorFit> {
    let per_chain = options.draws_per_chain();
    let mut draws = BTreeMap::new();
    for name in spec.parameter_names() {
        let mut matrix = Array2::<f64>::zeros((per_chain, chains.len()));
        for (c, chain) in chains.iter().enumerate() {
            let column = chain
                .scalars
                .get(name)
                .ok_or_else(|| PopError::UnknownParameter { name: name.to_string() })?;
            matrix.column_mut(c).assign(&ArrayView1::from(column.as_slice()));
        }
        draws.insert(name, matrix);
    }

    let total = per_chain * chains.len();
    let n = series.len();
    let n_lik = chains.first().map_or(0, |c| c.log_lik.ncols());
    let mut pred_all = Array2::<f64>::zeros((total, n));
    let mut log_lik = Array2::<f64>::zeros((total, n_lik));
    for (c, chain) in chains.iter().enumerate() {
        let rows = c * per_chain..(c + 1) * per_chain;
        pred_all.slice_mut(s![rows.clone(), ..]).assign(&chain.pred);
        log_lik.slice_mut(s![rows, ..]).assign(&chain.log_lik);
    }
    let pred = series
        .years
        .iter()
        .enumerate()
        .map(|(t, year)| (*year, pred_all.column(t).to_owned()))
        .collect();

    let stats: Vec<ChainStats> = chains.into_iter().map(|c| c.stats).collect();
    let mut warnings = chain_warnings(&stats);
    warnings.extend(convergence_warnings(&draws, options.chains));
    for warning in &warnings {
        tracing::warn!(model = %spec, "{warning}");
    }
    let map_init = matches!(source, InitSource::Map { .. });

    Ok(PosteriorFit {
        spec,
        options: *options,
        draws,
        pred,
        log_lik,
        diagnostics: SamplerDiagnostics { chains: stats, warnings, map_init },
    })
}

fn chain_warnings(stats: &[ChainStats]) -> Vec<SamplerWarning> {
    let mut warnings = Vec::new();
    for s in stats {
        if s.doubling_saturations > 0 {
            warnings.push(SamplerWarning::DoublingSaturation {
                chain: s.chain,
                count: s.doubling_saturations,
                updates: s.slice_updates,
            });
        }
        if let Some(rate) = s.nu_acceptance.filter(|r| *r < LOW_ACCEPTANCE) {
            warnings.push(SamplerWarning::LowAcceptance { chain: s.chain, rate });
        }
    }
    warnings
}

fn convergence_warnings(
    draws: &BTreeMap<&'static str, Array2<f64>>, chains: usize,
) -> Vec<SamplerWarning> {
    let mut warnings = Vec::new();
    for (name, matrix) in draws {
        let rhat = split_rhat(matrix.view());
        if rhat > RHAT_WARN {
            warnings.push(SamplerWarning::HighRhat { parameter: name.to_string(), rhat });
        }
        let ess = effective_sample_size(matrix.view());
        if ess < ESS_WARN_PER_CHAIN * chains as f64 {
            warnings.push(SamplerWarning::LowEss { parameter: name.to_string(), ess });
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::core::simulate::GompertzSimulation;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Layout of the fit handle, seed reproducibility across serial and
    // parallel execution, and input validation.
    // -------------------------------------------------------------------------

    fn series() -> ObservationSeries {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(8);
        GompertzSimulation::new(0.8, 0.6, 0.15).simulate(&mut rng, 30).unwrap().series
    }

    fn opts(parallel: bool) -> SamplerOptions {
        SamplerOptions { iter: 400, warmup: 200, chains: 3, parallel, ..SamplerOptions::default() }
    }

    #[test]
    // Purpose
    // -------
    // Extracted draws are `draws × chains`, predictions are keyed by every
    // observed year and the pooled vector concatenates chains.
    fn fit_layout_matches_options() {
        let s = series();
        let spec: ModelSpec = "gompertz_t".parse().unwrap();

        let fit = sample_posterior(&spec, &s, &PriorSpec::default(), &opts(false)).unwrap();

        assert_eq!(fit.extract("nu").unwrap().dim(), (200, 3));
        assert_eq!(fit.pooled("b").unwrap().len(), 600);
        assert_eq!(fit.log_lik().dim(), (600, 29));
        assert!(s.years.iter().all(|y| fit.prediction_draws(*y).map(|p| p.len()) == Some(600)));
        assert!(matches!(fit.extract("sigma_obs"), Err(PopError::UnknownParameter { .. })));
        assert_eq!(fit.diagnostics.chains.len(), 3);
    }

    #[test]
    // Purpose
    // -------
    // The seed alone determines the draws; serial and parallel runs agree.
    fn same_seed_reproduces_draws_serial_and_parallel() {
        let s = series();
        let spec: ModelSpec = "ss_gompertz_normal".parse().unwrap();

        let a = sample_posterior(&spec, &s, &PriorSpec::default(), &opts(false)).unwrap();
        let b = sample_posterior(&spec, &s, &PriorSpec::default(), &opts(true)).unwrap();

        for name in spec.parameter_names() {
            assert_eq!(a.extract(name).unwrap(), b.extract(name).unwrap());
        }
        assert_eq!(a.log_lik(), b.log_lik());
    }

    #[test]
    // Purpose
    // -------
    // Chains use distinct streams.
    fn chains_are_not_copies() {
        let s = series();
        let spec: ModelSpec = "gompertz_normal".parse().unwrap();

        let fit = sample_posterior(&spec, &s, &PriorSpec::default(), &opts(false)).unwrap();
        let b = fit.extract("b").unwrap();

        assert_ne!(b.column(0), b.column(1));
    }

    #[test]
    // Purpose
    // -------
    // Invalid options are rejected before sampling.
    fn invalid_options_are_rejected() {
        let s = series();
        let spec: ModelSpec = "gompertz_normal".parse().unwrap();
        let bad = SamplerOptions { warmup: 500, iter: 400, ..SamplerOptions::default() };

        let err = sample_posterior(&spec, &s, &PriorSpec::default(), &bad).unwrap_err();

        assert!(matches!(err, PopError::InvalidSamplerOption { name: "warmup", .. }));
    }
}
