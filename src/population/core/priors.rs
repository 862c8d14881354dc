//! Prior hyperparameters for the Gompertz model family.
//!
//! Purpose
//! -------
//! Hold the scalar hyperparameters passed into every fit and expose the
//! prior log density for each parameter block, the closed-form prior
//! probability `P(ν < c)` and prior-only draws of `ν` for predictive
//! checks.
//!
//! Key behaviors
//! -------------
//! - [`PriorSpec::new`] validates every hyperparameter; [`Default`] gives
//!   the reference settings.
//! - [`PriorSpec::nu_prob_below`] evaluates `P(ν < c)` analytically.
//! - [`PriorSpec::sample_nu`] draws from the shifted exponential prior.
//!
//! Invariants & assumptions
//! ------------------------
//! - Scales and rates are finite and strictly positive.
//! - `b_lower < b_upper`, both finite.
//! - `nu_lower ≥ 1` so the Student-t process error has a finite mean.
//!
//! Conventions
//! -----------
//! - Distributions are parameterized the way they are reported:
//!   `lambda ~ N(lambda_mean, lambda_sd)`, `b ~ U(b_lower, b_upper)`,
//!   `σ ~ HalfCauchy(0, sigma_proc_scale)`,
//!   `σ_obs ~ HalfCauchy(0, sigma_obs_scale)`,
//!   `ν = nu_lower + Exp(nu_rate)`, `x_1 ~ N(y_1, init_sd)`.
use crate::population::{
    core::densities::{half_cauchy_ln_pdf, normal_ln_pdf, shifted_exponential_ln_pdf},
    errors::{PopError, PopResult},
};
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};

/// `PriorSpec`: validated prior hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorSpec {
    pub lambda_mean: f64,
    pub lambda_sd: f64,
    pub b_lower: f64,
    pub b_upper: f64,
    pub sigma_proc_scale: f64,
    pub sigma_obs_scale: f64,
    pub nu_rate: f64,
    pub nu_lower: f64,
    pub init_sd: f64,
}

impl Default for PriorSpec {
    fn default() -> Self {
        PriorSpec {
            lambda_mean: 0.0,
            lambda_sd: 10.0,
            b_lower: -1.0,
            b_upper: 1.0,
            sigma_proc_scale: 2.5,
            sigma_obs_scale: 1.0,
            nu_rate: 0.01,
            nu_lower: 2.0,
            init_sd: 1.0,
        }
    }
}

impl PriorSpec {
    /// Construct validated priors.
    ///
    /// Errors
    /// ------
    /// - `PopError::InvalidPriorLocation` for a non-finite `lambda_mean`.
    /// - `PopError::InvalidPriorScale` for any non-positive or non-finite
    ///   scale, rate or `nu_lower < 1`.
    /// - `PopError::InvalidBounds` unless `b_lower < b_upper`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lambda_mean: f64, lambda_sd: f64, b_lower: f64, b_upper: f64, sigma_proc_scale: f64,
        sigma_obs_scale: f64, nu_rate: f64, nu_lower: f64, init_sd: f64,
    ) -> PopResult<Self> {
        let spec = PriorSpec {
            lambda_mean,
            lambda_sd,
            b_lower,
            b_upper,
            sigma_proc_scale,
            sigma_obs_scale,
            nu_rate,
            nu_lower,
            init_sd,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Re-check a spec built field by field (e.g. from a config file).
    pub fn validate(&self) -> PopResult<()> {
        if !self.lambda_mean.is_finite() {
            return Err(PopError::InvalidPriorLocation {
                name: "lambda_mean",
                value: self.lambda_mean,
            });
        }
        for (name, value) in [
            ("lambda_sd", self.lambda_sd),
            ("sigma_proc_scale", self.sigma_proc_scale),
            ("sigma_obs_scale", self.sigma_obs_scale),
            ("nu_rate", self.nu_rate),
            ("init_sd", self.init_sd),
        ] {
            verify_scale(name, value)?;
        }
        if !self.nu_lower.is_finite() || self.nu_lower < 1.0 {
            return Err(PopError::InvalidPriorScale { name: "nu_lower", value: self.nu_lower });
        }
        if !(self.b_lower.is_finite() && self.b_upper.is_finite() && self.b_lower < self.b_upper) {
            return Err(PopError::InvalidBounds { lower: self.b_lower, upper: self.b_upper });
        }
        Ok(())
    }

    pub fn lambda_ln_pdf(&self, lambda: f64) -> f64 {
        normal_ln_pdf(lambda, self.lambda_mean, self.lambda_sd)
    }

    /// Uniform density on `(b_lower, b_upper)`; `-inf` outside.
    pub fn b_ln_pdf(&self, b: f64) -> f64 {
        if b <= self.b_lower || b >= self.b_upper {
            f64::NEG_INFINITY
        } else {
            -(self.b_upper - self.b_lower).ln()
        }
    }

    pub fn sigma_proc_ln_pdf(&self, sigma: f64) -> f64 {
        half_cauchy_ln_pdf(sigma, self.sigma_proc_scale)
    }

    pub fn sigma_obs_ln_pdf(&self, sigma: f64) -> f64 {
        half_cauchy_ln_pdf(sigma, self.sigma_obs_scale)
    }

    pub fn nu_ln_pdf(&self, nu: f64) -> f64 {
        shifted_exponential_ln_pdf(nu, self.nu_rate, self.nu_lower)
    }

    /// Prior mean of `ν`.
    pub fn nu_mean(&self) -> f64 {
        self.nu_lower + 1.0 / self.nu_rate
    }

    /// Closed-form prior probability `P(ν < cutoff)`.
    ///
    /// Zero for `cutoff ≤ nu_lower`, otherwise
    /// `1 − exp(−nu_rate · (cutoff − nu_lower))`.
    pub fn nu_prob_below(&self, cutoff: f64) -> f64 {
        if cutoff <= self.nu_lower {
            0.0
        } else {
            -(-self.nu_rate * (cutoff - self.nu_lower)).exp_m1()
        }
    }

    /// Draw `n` values of `ν` from the prior.
    pub fn sample_nu<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> PopResult<Vec<f64>> {
        let exp = Exp::new(self.nu_rate)
            .map_err(|e| PopError::Distribution { reason: e.to_string() })?;
        Ok((0..n).map(|_| self.nu_lower + exp.sample(rng)).collect())
    }
}

fn verify_scale(name: &'static str, value: f64) -> PopResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PopError::InvalidPriorScale { name, value });
    }
    Ok(())
}
