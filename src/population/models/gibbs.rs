//! Data-augmentation Gibbs sampler for the four Gompertz variants.
//!
//! Purpose
//! -------
//! Run one chain of the sampler and return its retained draws together
//! with the per-draw predictions and pointwise log-likelihood the summary
//! and LOO layers consume.
//!
//! Key behaviors
//! -------------
//! One sweep updates, in order:
//! 1. latent states `x_{0..N}` by forward-filtering backward-sampling
//!    (state-space variants only; otherwise `x = y`),
//! 2. `(lambda, b)` jointly: `b` from its conjugate normal conditional
//!    with `lambda` integrated out, truncated to the prior bounds, then
//!    `lambda | b` from its conjugate normal,
//! 3. `σ` by slice sampling `ln σ`,
//! 4. `ν` by adaptive random-walk Metropolis on `ln(ν − ν_lower)` against
//!    the Student-t likelihood with the precisions integrated out, then the
//!    mixing precisions `q_t ~ Gamma((ν+1)/2, (ν + r_t²/σ²)/2)`,
//! 5. `σ_obs` by slice sampling `ln σ_obs` (state-space variants only).
//!
//! Invariants & assumptions
//! ------------------------
//! - Time is 0-based; process terms run over `t = 1..N`. `q[0]` is unused
//!   and stays at `1`; with normal process error every `q_t = 1`.
//! - Every sweep ends with a finiteness check; a non-finite parameter
//!   aborts the chain with [`PopError::NonFiniteDraw`].
//!
//! Conventions
//! -----------
//! - Autoregressive predictions are one-step-ahead means
//!   `lambda + b·y_{t−1}`, with the first observation predicting itself;
//!   their log-likelihood covers `t = 1..N`. State-space predictions are
//!   the latent states and their log-likelihood covers all `N`
//!   observations.
use std::collections::BTreeMap;

use crate::population::{
    core::{
        densities::{normal_ln_pdf, student_t_ln_pdf},
        options::SamplerOptions,
        priors::PriorSpec,
        spec::ModelSpec,
    },
    errors::{PopError, PopResult},
    models::{
        ffbs::{StateSpace, sample_states},
        init::ChainStart,
        slice::{RandomWalk, slice_sample},
    },
};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};
use statrs::distribution::{ContinuousCDF, Normal};

/// Initial slice width on the log-scale parameters.
const SLICE_WIDTH: f64 = 1.0;

/// Initial random-walk step for `ln(ν − ν_lower)`.
const NU_INITIAL_STEP: f64 = 0.5;

/// Conditional precisions below this are treated as flat.
const MIN_PRECISION: f64 = 1e-12;

/// Per-chain sampler bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ChainStats {
    pub chain: usize,
    pub slice_updates: usize,
    pub doubling_saturations: usize,
    pub nu_acceptance: Option<f64>,
    pub nu_step: Option<f64>,
}

/// Retained output of one chain.
#[derive(Debug, Clone)]
pub struct ChainDraws {
    /// Scalar parameters keyed by name, one entry per retained draw.
    pub scalars: BTreeMap<&'static str, Vec<f64>>,
    /// `draws × N` predictions.
    pub pred: Array2<f64>,
    /// `draws × n_lik` pointwise log-likelihood.
    pub log_lik: Array2<f64>,
    pub stats: ChainStats,
}

/// Number of pointwise log-likelihood terms for a series of length `n`.
pub fn log_lik_len(spec: ModelSpec, n: usize) -> usize {
    if spec.is_state_space() { n } else { n - 1 }
}

#[derive(Debug, Clone)]
struct ChainState {
    lambda: f64,
    b: f64,
    sigma: f64,
    nu: Option<f64>,
    sigma_obs: Option<f64>,
    q: Vec<f64>,
    x: Array1<f64>,
}

impl ChainState {
    fn from_start(start: &ChainStart, y: &Array1<f64>) -> Self {
        ChainState {
            lambda: start.lambda,
            b: start.b,
            sigma: start.sigma_proc,
            nu: start.nu,
            sigma_obs: start.sigma_obs,
            q: vec![1.0; y.len()],
            x: y.clone(),
        }
    }

    /// Process residual `x_t − lambda − b·x_{t−1}` for `t ≥ 1`.
    fn residual(&self, t: usize) -> f64 {
        self.x[t] - self.lambda - self.b * self.x[t - 1]
    }

    fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        let mut values = vec![("lambda", self.lambda), ("b", self.b), ("sigma_proc", self.sigma)];
        values.extend(self.nu.map(|v| ("nu", v)));
        values.extend(self.sigma_obs.map(|v| ("sigma_obs", v)));
        if let Some(v) = self.x.iter().find(|v| !v.is_finite()) {
            values.push(("x", *v));
        }
        values.into_iter().find(|(_, v)| !v.is_finite())
    }
}

/// One chain's sampling context.
struct Sweep<'a> {
    spec: ModelSpec,
    y: &'a Array1<f64>,
    priors: &'a PriorSpec,
    max_doublings: usize,
    nu_walk: RandomWalk,
    stats: ChainStats,
}

impl<'a> Sweep<'a> {
    fn update_states<R: Rng + ?Sized>(&self, state: &mut ChainState, rng: &mut R) {
        let Some(sigma_obs) = state.sigma_obs else { return };
        let process_var: Vec<f64> = state.q.iter().map(|q| state.sigma * state.sigma / q).collect();
        let model = StateSpace {
            y: self.y,
            lambda: state.lambda,
            b: state.b,
            process_var: &process_var,
            obs_var: sigma_obs * sigma_obs,
            init_mean: self.y[0],
            init_var: self.priors.init_sd * self.priors.init_sd,
        };
        state.x = sample_states(&model, rng);
    }

    /// Joint draw of `(lambda, b)`: `b` from its marginal normal full
    /// conditional truncated to the prior bounds, then `lambda | b`.
    fn update_regression<R: Rng + ?Sized>(
        &self, state: &mut ChainState, rng: &mut R,
    ) -> PopResult<()> {
        let p = self.priors;
        let s2 = state.sigma * state.sigma;
        let prior_prec = (p.lambda_sd * p.lambda_sd).recip();
        let (mut p_ll, mut p_lb, mut p_bb) = (prior_prec, 0.0, 0.0);
        let (mut h_l, mut h_b) = (p.lambda_mean * prior_prec, 0.0);
        for t in 1..state.x.len() {
            let (w, prev, cur) = (state.q[t] / s2, state.x[t - 1], state.x[t]);
            p_ll += w;
            p_lb += w * prev;
            p_bb += w * prev * prev;
            h_l += w * cur;
            h_b += w * prev * cur;
        }
        let det = p_ll * p_bb - p_lb * p_lb;
        if !(s2 > 0.0 && p_ll.is_finite() && det.is_finite() && h_l.is_finite() && h_b.is_finite()) {
            return Err(PopError::Distribution {
                reason: format!(
                    "regression conditional is degenerate (sigma_proc = {}); the series may be constant",
                    state.sigma
                ),
            });
        }
        let marginal_prec = det / p_ll;
        state.b = if marginal_prec < MIN_PRECISION {
            p.b_lower + rng.gen::<f64>() * (p.b_upper - p.b_lower)
        } else {
            let mean = (p_ll * h_b - p_lb * h_l) / det;
            truncated_normal(mean, marginal_prec.sqrt().recip(), p.b_lower, p.b_upper, rng)?
        };
        let z: f64 = StandardNormal.sample(rng);
        state.lambda = (h_l - p_lb * state.b) / p_ll + z / p_ll.sqrt();
        Ok(())
    }

    fn update_sigma<R: Rng + ?Sized>(&mut self, state: &mut ChainState, rng: &mut R) {
        let n = (state.x.len() - 1) as f64;
        let ss: f64 = (1..state.x.len()).map(|t| state.q[t] * state.residual(t).powi(2)).sum();
        let priors = self.priors;
        let log_f =
            |u: f64| -n * u - 0.5 * ss * (-2.0 * u).exp() + priors.sigma_proc_ln_pdf(u.exp()) + u;
        let step = slice_sample(state.sigma.ln(), log_f, SLICE_WIDTH, self.max_doublings, rng);
        self.record_slice(step.saturated);
        state.sigma = step.value.exp();
    }

    fn update_nu_block<R: Rng + ?Sized>(
        &mut self, state: &mut ChainState, warmup: bool, rng: &mut R,
    ) -> PopResult<()> {
        let Some(nu) = state.nu else { return Ok(()) };
        let priors = self.priors;
        let residuals: Vec<f64> = (1..state.x.len()).map(|t| state.residual(t)).collect();
        let sigma = state.sigma;
        let log_target = |eta: f64| {
            let nu = priors.nu_lower + eta.exp();
            residuals.iter().map(|r| student_t_ln_pdf(*r, nu, 0.0, sigma)).sum::<f64>()
                + priors.nu_ln_pdf(nu)
                + eta
        };
        let eta = self.nu_walk.step((nu - priors.nu_lower).ln(), log_target, warmup, rng);
        let nu = priors.nu_lower + eta.exp();
        state.nu = Some(nu);

        let shape = 0.5 * (nu + 1.0);
        for (t, r) in (1..state.x.len()).zip(residuals.iter()) {
            let rate = 0.5 * (nu + (r / sigma).powi(2));
            state.q[t] = Gamma::new(shape, rate.recip())?.sample(rng);
        }
        Ok(())
    }

    fn update_sigma_obs<R: Rng + ?Sized>(&mut self, state: &mut ChainState, rng: &mut R) {
        let Some(sigma_obs) = state.sigma_obs else { return };
        let n = state.x.len() as f64;
        let ss: f64 = self.y.iter().zip(state.x.iter()).map(|(y, x)| (y - x).powi(2)).sum();
        let priors = self.priors;
        let log_f =
            |u: f64| -n * u - 0.5 * ss * (-2.0 * u).exp() + priors.sigma_obs_ln_pdf(u.exp()) + u;
        let step = slice_sample(sigma_obs.ln(), log_f, SLICE_WIDTH, self.max_doublings, rng);
        self.record_slice(step.saturated);
        state.sigma_obs = Some(step.value.exp());
    }

    fn record_slice(&mut self, saturated: bool) {
        self.stats.slice_updates += 1;
        if saturated {
            self.stats.doubling_saturations += 1;
        }
    }

    fn predictions(&self, state: &ChainState) -> Array1<f64> {
        if self.spec.is_state_space() {
            return state.x.clone();
        }
        Array1::from_shape_fn(self.y.len(), |t| {
            if t == 0 { self.y[0] } else { state.lambda + state.b * self.y[t - 1] }
        })
    }

    fn log_likelihood(&self, state: &ChainState, pred: &Array1<f64>) -> Array1<f64> {
        match state.sigma_obs {
            Some(tau) => Array1::from_shape_fn(self.y.len(), |t| normal_ln_pdf(self.y[t], pred[t], tau)),
            None => Array1::from_shape_fn(self.y.len() - 1, |i| {
                let t = i + 1;
                match state.nu {
                    Some(nu) => student_t_ln_pdf(self.y[t], nu, pred[t], state.sigma),
                    None => normal_ln_pdf(self.y[t], pred[t], state.sigma),
                }
            }),
        }
    }
}

/// Run one chain from `start` and return its retained draws.
///
/// Errors
/// ------
/// - [`PopError::NonFiniteDraw`] when a sweep produces a non-finite value.
/// - [`PopError::Distribution`] when a full conditional cannot be built.
pub fn run_chain<R: Rng + ?Sized>(
    chain: usize, spec: ModelSpec, y: &Array1<f64>, priors: &PriorSpec, opts: &SamplerOptions,
    start: &ChainStart, rng: &mut R,
) -> PopResult<ChainDraws> {
    let n = y.len();
    let draws = opts.draws_per_chain();
    let names = spec.parameter_names();
    let mut scalars: BTreeMap<&'static str, Vec<f64>> =
        names.iter().map(|name| (*name, Vec::with_capacity(draws))).collect();
    let mut pred = Array2::<f64>::zeros((draws, n));
    let mut log_lik = Array2::<f64>::zeros((draws, log_lik_len(spec, n)));

    let mut sweep = Sweep {
        spec,
        y,
        priors,
        max_doublings: opts.max_doublings,
        nu_walk: RandomWalk::new(NU_INITIAL_STEP, opts.target_accept),
        stats: ChainStats { chain, ..ChainStats::default() },
    };
    let mut state = ChainState::from_start(start, y);
    let report_every = (opts.iter / 10).max(1);
    let mut kept = 0;

    for it in 0..opts.iter {
        let warmup = it < opts.warmup;
        sweep.update_states(&mut state, rng);
        sweep.update_regression(&mut state, rng)?;
        sweep.update_sigma(&mut state, rng);
        sweep.update_nu_block(&mut state, warmup, rng)?;
        sweep.update_sigma_obs(&mut state, rng);

        if let Some((parameter, value)) = state.first_non_finite() {
            return Err(PopError::NonFiniteDraw {
                parameter: parameter.to_string(),
                chain,
                iteration: it,
                value,
            });
        }

        if opts.keeps(it) && kept < draws {
            for name in &names {
                let value = match *name {
                    "lambda" => state.lambda,
                    "b" => state.b,
                    "sigma_proc" => state.sigma,
                    "nu" => state.nu.unwrap_or(f64::NAN),
                    _ => state.sigma_obs.unwrap_or(f64::NAN),
                };
                if let Some(column) = scalars.get_mut(name) {
                    column.push(value);
                }
            }
            let p = sweep.predictions(&state);
            log_lik.row_mut(kept).assign(&sweep.log_likelihood(&state, &p));
            pred.row_mut(kept).assign(&p);
            kept += 1;
        }

        if (it + 1) % report_every == 0 {
            tracing::debug!(
                chain,
                iteration = it + 1,
                total = opts.iter,
                warmup,
                lambda = state.lambda,
                b = state.b,
                sigma_proc = state.sigma,
                "sampler progress"
            );
        }
    }

    if spec.is_heavy_tailed() {
        sweep.stats.nu_acceptance = sweep.nu_walk.acceptance_rate();
        sweep.stats.nu_step = Some(sweep.nu_walk.step_size());
    }
    Ok(ChainDraws { scalars, pred, log_lik, stats: sweep.stats })
}

/// Draw from `N(mean, sd²)` truncated to `[lo, hi]` by inverting the CDF.
///
/// When the mass sits far in the upper tail the reflected problem is
/// inverted instead, which keeps the CDF differences away from `1 − ε`.
/// If the interval carries no representable mass the mean is clamped into
/// it.
///
/// Errors
/// ------
/// - [`PopError::Distribution`] when `mean` is non-finite or `sd` is not
///   finite and positive.
pub fn truncated_normal<R: Rng + ?Sized>(
    mean: f64, sd: f64, lo: f64, hi: f64, rng: &mut R,
) -> PopResult<f64> {
    if !mean.is_finite() || !(sd.is_finite() && sd > 0.0) {
        return Err(PopError::Distribution {
            reason: format!("truncated normal needs a finite mean and sd > 0; got mean {mean}, sd {sd}"),
        });
    }
    let std = Normal::new(0.0, 1.0)?;
    let (a, b) = ((lo - mean) / sd, (hi - mean) / sd);
    let (flip, a, b) = if a > 0.0 { (true, -b, -a) } else { (false, a, b) };
    let (fa, fb) = (std.cdf(a), std.cdf(b));
    if fb <= fa {
        return Ok(mean.clamp(lo, hi));
    }
    let u: f64 = rng.gen();
    let z = std.inverse_cdf((fa + u * (fb - fa)).clamp(0.0, 1.0));
    let z = if flip { -z } else { z };
    Ok((mean + sd * z).clamp(lo, hi))
}
