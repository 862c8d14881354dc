//! Chain starting points from a posterior-mode search.
//!
//! Purpose
//! -------
//! Place every chain near the bulk of the posterior before Gibbs sampling
//! starts, so short warmups suffice for short series.
//!
//! Key behaviors
//! -------------
//! - [`ArMarginalPosterior`] is the log posterior of the autoregressive
//!   model with the Student-t mixing precisions integrated out, written in
//!   unconstrained coordinates `θ = (λ, logit b, ln σ[, ln(ν − ν_lower)])`.
//!   It implements [`LogDensity`] so the argmin L-BFGS optimizer can find
//!   its mode.
//! - [`initialize_chains`] runs the mode search, derives Laplace scales
//!   from the curvature at the mode and jitters each chain's start by
//!   those scales. When the search fails the failure is logged and
//!   prior-centred starts are used instead.
//!
//! Invariants & assumptions
//! ------------------------
//! - State-space variants are initialized from the same autoregressive
//!   marginal; observation error is started at half the process scale.
//! - Starts always satisfy the support constraints (`b` strictly inside
//!   its bounds, positive scales, `ν > ν_lower`).
use crate::{
    inference::laplace_scales,
    optimization::{
        errors::OptResult,
        map_optimizer::{
            LogDensity, MapOptions, Theta, adapter::ArgMinAdapter, maximize,
            validation::verify_theta,
        },
        numerical_stability::{from_interval, interval_log_jacobian, to_interval},
    },
    population::{
        core::{
            densities::{normal_ln_pdf, student_t_ln_pdf},
            priors::PriorSpec,
            spec::ModelSpec,
        },
        errors::PopResult,
    },
};
use argmin::core::Gradient;
use ndarray::{Array1, s};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Jitter scale used when no curvature information is available.
const DEFAULT_JITTER: f64 = 0.5;

/// Laplace scales are clamped into this range before jittering.
const JITTER_RANGE: (f64, f64) = (0.02, 1.0);

/// Starting values of one chain, on the constrained scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStart {
    pub lambda: f64,
    pub b: f64,
    pub sigma_proc: f64,
    pub nu: Option<f64>,
    pub sigma_obs: Option<f64>,
}

/// How the starting points were obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum InitSource {
    /// Mode found; `log_density` is the marginal log posterior at it.
    Map { log_density: f64, iterations: usize, converged: bool },
    /// Mode search failed with the given reason.
    PriorFallback { reason: String },
}

/// Marginal log posterior of the autoregressive Gompertz model.
#[derive(Debug, Clone, Copy)]
pub struct ArMarginalPosterior {
    pub spec: ModelSpec,
    pub priors: PriorSpec,
}

impl ArMarginalPosterior {
    pub fn new(spec: ModelSpec, priors: PriorSpec) -> Self {
        ArMarginalPosterior { spec, priors }
    }

    pub fn dim(&self) -> usize {
        if self.spec.is_heavy_tailed() { 4 } else { 3 }
    }

    /// Map `θ` to a constrained [`ChainStart`] (observation scale unset).
    pub fn constrain(&self, theta: &Theta) -> ChainStart {
        let p = &self.priors;
        ChainStart {
            lambda: theta[0],
            b: to_interval(theta[1], p.b_lower, p.b_upper),
            sigma_proc: theta[2].exp(),
            nu: self.spec.is_heavy_tailed().then(|| p.nu_lower + theta[3].exp()),
            sigma_obs: None,
        }
    }

    /// Inverse of [`constrain`](Self::constrain).
    pub fn unconstrain(&self, start: &ChainStart) -> Theta {
        let p = &self.priors;
        let mut theta = vec![
            start.lambda,
            from_interval(start.b, p.b_lower, p.b_upper),
            start.sigma_proc.ln(),
        ];
        if let Some(nu) = start.nu {
            theta.push((nu - p.nu_lower).max(1e-8).ln());
        }
        Array1::from(theta)
    }

    /// Least-squares starting point for the mode search.
    pub fn least_squares_start(&self, y: &Array1<f64>) -> Theta {
        let p = &self.priors;
        let n = y.len() - 1;
        let prev = y.slice(s![..n]);
        let next = y.slice(s![1..]);
        let (mx, my) = (prev.mean().unwrap_or(0.0), next.mean().unwrap_or(0.0));
        let sxx: f64 = prev.iter().map(|x| (x - mx).powi(2)).sum();
        let sxy: f64 = prev.iter().zip(next.iter()).map(|(x, z)| (x - mx) * (z - my)).sum();
        let margin = 0.05 * (p.b_upper - p.b_lower);
        let b = if sxx > 0.0 { sxy / sxx } else { 0.5 * (p.b_lower + p.b_upper) }
            .clamp(p.b_lower + margin, p.b_upper - margin);
        let lambda = my - b * mx;
        let ss: f64 = prev.iter().zip(next.iter()).map(|(x, z)| (z - lambda - b * x).powi(2)).sum();
        let sigma = (ss / n as f64).sqrt().max(0.05);
        let start = ChainStart {
            lambda,
            b,
            sigma_proc: sigma,
            nu: self.spec.is_heavy_tailed().then(|| p.nu_lower + 10.0),
            sigma_obs: None,
        };
        self.unconstrain(&start)
    }
}

impl LogDensity for ArMarginalPosterior {
    type Data = Array1<f64>;

    fn value(&self, theta: &Theta, y: &Array1<f64>) -> OptResult<f64> {
        let p = &self.priors;
        let start = self.constrain(theta);
        let (lambda, b, sigma) = (start.lambda, start.b, start.sigma_proc);
        let loglik: f64 = (1..y.len())
            .map(|t| {
                let mean = lambda + b * y[t - 1];
                match start.nu {
                    Some(nu) => student_t_ln_pdf(y[t], nu, mean, sigma),
                    None => normal_ln_pdf(y[t], mean, sigma),
                }
            })
            .sum();
        let mut lp = loglik
            + p.lambda_ln_pdf(lambda)
            + p.b_ln_pdf(b)
            + interval_log_jacobian(theta[1], p.b_lower, p.b_upper)
            + p.sigma_proc_ln_pdf(sigma)
            + theta[2];
        if let Some(nu) = start.nu {
            lp += p.nu_ln_pdf(nu) + theta[3];
        }
        Ok(lp)
    }

    fn check(&self, theta: &Theta, _y: &Array1<f64>) -> OptResult<()> {
        verify_theta(theta, self.dim())
    }
}

/// Starting points for `chains` chains plus how they were obtained.
pub fn initialize_chains<R: Rng + ?Sized>(
    spec: ModelSpec, y: &Array1<f64>, priors: &PriorSpec, chains: usize, rng: &mut R,
) -> PopResult<(Vec<ChainStart>, InitSource)> {
    let target = ArMarginalPosterior::new(spec, *priors);
    let theta0 = target.least_squares_start(y);
    let opts = MapOptions::default();

    let (centre, scales, source) = match locate_mode(&target, theta0, y, &opts) {
        Ok((theta_hat, scales, log_density, iterations, converged)) => {
            tracing::debug!(
                model = %spec,
                log_density,
                iterations,
                converged,
                mode = ?target.constrain(&theta_hat),
                "posterior mode located"
            );
            (theta_hat, scales, InitSource::Map { log_density, iterations, converged })
        }
        Err(err) => {
            tracing::warn!(
                model = %spec,
                error = %err,
                "posterior mode search failed; using prior-centred starting points"
            );
            let centre = target.unconstrain(&prior_centre(spec, priors, y));
            let scales = Array1::from_elem(target.dim(), DEFAULT_JITTER);
            (centre, scales, InitSource::PriorFallback { reason: err.to_string() })
        }
    };

    let starts = (0..chains)
        .map(|_| {
            let jittered = &centre
                + &scales.mapv(|s| {
                    let z: f64 = StandardNormal.sample(rng);
                    z * s
                });
            let mut start = target.constrain(&jittered);
            if spec.is_state_space() {
                start.sigma_obs = Some(0.5 * start.sigma_proc);
            }
            start
        })
        .collect();
    Ok((starts, source))
}

type ModeResult = (Theta, Array1<f64>, f64, usize, bool);

fn locate_mode(
    target: &ArMarginalPosterior, theta0: Theta, y: &Array1<f64>, opts: &MapOptions,
) -> OptResult<ModeResult> {
    let outcome = maximize(target, theta0, y, opts)?;
    let adapter = ArgMinAdapter::new(target, y);
    let neg_grad = |theta: &Array1<f64>| {
        adapter.gradient(theta).unwrap_or_else(|_| Array1::from_elem(theta.len(), f64::NAN))
    };
    let scales = match laplace_scales(&neg_grad, &outcome.theta_hat) {
        Ok(s) => s.mapv(|v| {
            if v.is_finite() && v > 0.0 {
                v.clamp(JITTER_RANGE.0, JITTER_RANGE.1)
            } else {
                DEFAULT_JITTER
            }
        }),
        Err(err) => {
            tracing::debug!(error = %err, "Laplace scales unavailable; using default jitter");
            Array1::from_elem(outcome.theta_hat.len(), DEFAULT_JITTER)
        }
    };
    Ok((outcome.theta_hat, scales, outcome.value, outcome.iterations, outcome.converged))
}

fn prior_centre(spec: ModelSpec, priors: &PriorSpec, y: &Array1<f64>) -> ChainStart {
    let b = 0.5 * (priors.b_lower + priors.b_upper);
    let level = y.mean().unwrap_or(priors.lambda_mean);
    ChainStart {
        lambda: level * (1.0 - b),
        b,
        sigma_proc: priors.sigma_proc_scale.min(1.0),
        nu: spec.is_heavy_tailed().then(|| priors.nu_lower + 10.0),
        sigma_obs: None,
    }
}
