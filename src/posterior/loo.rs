//! Pareto-smoothed importance-sampling leave-one-out cross-validation.
//!
//! Purpose
//! -------
//! Estimate the expected log pointwise predictive density of a fit from
//! its `draws × observations` log-likelihood matrix, and rank models by it.
//!
//! Key behaviors
//! -------------
//! - For each observation the raw importance ratios `1 / p(y_i | θ_s)` are
//!   stabilized by fitting a generalized Pareto distribution to the largest
//!   `M = ceil(min(0.2·S, 3·√S))` ratios (Zhang & Stephens, 2009, with the
//!   weakly informative shape adjustment) and replacing them by the fitted
//!   quantiles. Smoothed weights are truncated at the largest raw weight.
//! - The fitted shape `k̂` is reported per observation; values above
//!   [`K_WARN`] are logged with `tracing::warn!` and counted. Nothing is
//!   refitted and nothing is gated on `k̂`.
//! - [`compare_models`] sorts models by `elpd_loo` and reports differences
//!   to the best model with standard errors from the paired pointwise
//!   differences.
//!
//! Conventions
//! -----------
//! - `looic = −2·elpd_loo`; standard errors are `√(n·Var(pointwise))`.
//! - Tails with fewer than five draws, or with no spread above the cutoff,
//!   are left unsmoothed and get `k̂ = 0`.
use crate::population::{
    core::densities::log_sum_exp,
    errors::{PopError, PopResult},
};
use ndarray::{Array2, Axis};
use serde::Serialize;

/// Pareto `k̂` above this marks an unreliable pointwise estimate.
pub const K_WARN: f64 = 0.7;

/// Minimum tail length for the generalized Pareto fit.
const MIN_TAIL: usize = 5;

/// Leave-one-out estimate for one fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LooEstimate {
    pub elpd_loo: f64,
    pub se_elpd_loo: f64,
    pub p_loo: f64,
    pub se_p_loo: f64,
    pub looic: f64,
    pub se_looic: f64,
    pub pointwise_elpd: Vec<f64>,
    pub pareto_k: Vec<f64>,
    /// Observations with `k̂ > K_WARN`.
    pub high_k: usize,
}

impl LooEstimate {
    pub fn n_points(&self) -> usize {
        self.pointwise_elpd.len()
    }
}

/// One row of a model comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LooComparison {
    pub model: String,
    pub elpd_loo: f64,
    pub elpd_diff: f64,
    pub se_diff: f64,
    pub p_loo: f64,
    pub looic: f64,
    pub se_looic: f64,
}

fn sum_and_se(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let total = values.iter().sum::<f64>();
    if values.len() < 2 {
        return (total, 0.0);
    }
    let mean = total / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (total, (n * var).sqrt())
}

/// PSIS-LOO from a `draws × observations` log-likelihood matrix.
///
/// Errors
/// ------
/// - [`PopError::EmptyDraws`] when there are fewer than two draws or no
///   observations.
pub fn psis_loo(log_lik: &Array2<f64>) -> PopResult<LooEstimate> {
    let (draws, points) = log_lik.dim();
    if draws < 2 || points == 0 {
        return Err(PopError::EmptyDraws { name: "log_lik".to_string() });
    }
    let ln_s = (draws as f64).ln();
    let mut pointwise_elpd = Vec::with_capacity(points);
    let mut pointwise_p = Vec::with_capacity(points);
    let mut pareto_k = Vec::with_capacity(points);

    for column in log_lik.axis_iter(Axis(1)) {
        let ll: Vec<f64> = column.to_vec();
        let ratios: Vec<f64> = ll.iter().map(|v| -v).collect();
        let (log_weights, k) = psis_smooth(&ratios);
        let elpd = log_sum_exp(
            log_weights.iter().zip(ll.iter()).map(|(w, l)| w + l).collect::<Vec<_>>().iter(),
        );
        let lpd = log_sum_exp(ll.iter()) - ln_s;
        pointwise_elpd.push(elpd);
        pointwise_p.push(lpd - elpd);
        pareto_k.push(k);
    }

    let high_k = pareto_k.iter().filter(|k| **k > K_WARN).count();
    if high_k > 0 {
        tracing::warn!(
            high_k,
            points,
            threshold = K_WARN,
            "some Pareto k estimates are high; LOO estimates may be unreliable"
        );
    }
    let (elpd_loo, se_elpd_loo) = sum_and_se(&pointwise_elpd);
    let (p_loo, se_p_loo) = sum_and_se(&pointwise_p);
    Ok(LooEstimate {
        elpd_loo,
        se_elpd_loo,
        p_loo,
        se_p_loo,
        looic: -2.0 * elpd_loo,
        se_looic: 2.0 * se_elpd_loo,
        pointwise_elpd,
        pareto_k,
        high_k,
    })
}

/// Normalized smoothed log weights and `k̂` for one observation.
fn psis_smooth(log_ratios: &[f64]) -> (Vec<f64>, f64) {
    let s = log_ratios.len();
    let max = log_ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut lw: Vec<f64> = log_ratios.iter().map(|r| r - max).collect();

    let tail_len = (0.2 * s as f64).min(3.0 * (s as f64).sqrt()).ceil() as usize;
    let mut k = 0.0;
    if tail_len >= MIN_TAIL && tail_len < s {
        let mut order: Vec<usize> = (0..s).collect();
        order.sort_by(|a, b| lw[*a].total_cmp(&lw[*b]));
        let tail = &order[s - tail_len..];
        let cutoff = lw[order[s - tail_len - 1]];
        let exp_cutoff = cutoff.exp();
        let excess: Vec<f64> = tail.iter().map(|i| lw[*i].exp() - exp_cutoff).collect();
        if let Some((shape, scale)) = gpd_fit(&excess) {
            k = shape;
            for (j, i) in tail.iter().enumerate() {
                let p = (j as f64 + 0.5) / tail_len as f64;
                lw[*i] = (gpd_quantile(p, shape, scale) + exp_cutoff).ln().min(0.0);
            }
        } else if excess.iter().any(|v| *v > 0.0) {
            k = f64::INFINITY;
        }
    }
    let norm = log_sum_exp(lw.iter());
    lw.iter_mut().for_each(|w| *w -= norm);
    (lw, k)
}

/// Generalized Pareto fit `(k, σ)` to ascending exceedances (Zhang &
/// Stephens, 2009) with the weakly informative shape adjustment
/// `(n·k + 5) / (n + 10)`. `None` for degenerate samples.
pub fn gpd_fit(x: &[f64]) -> Option<(f64, f64)> {
    let n = x.len();
    let x_max = *x.last()?;
    if n < MIN_TAIL || !(x_max > 0.0) {
        return None;
    }
    let prior = 3.0;
    let m = 30 + (n as f64).sqrt().floor() as usize;
    let quartile = x[((n as f64 / 4.0 + 0.5).floor() as usize).max(1) - 1];
    if !(quartile > 0.0) {
        return None;
    }
    let profile = |theta: f64| {
        let k = x.iter().map(|v| (-theta * v).ln_1p()).sum::<f64>() / n as f64;
        n as f64 * ((-theta / k).ln() - k - 1.0)
    };
    let thetas: Vec<f64> = (1..=m)
        .map(|j| 1.0 / x_max + (1.0 - (m as f64 / (j as f64 - 0.5)).sqrt()) / (prior * quartile))
        .collect();
    let profiles: Vec<f64> = thetas.iter().map(|t| profile(*t)).collect();
    let weights: Vec<f64> = profiles
        .iter()
        .map(|lj| {
            let denom: f64 = profiles.iter().map(|li| (li - lj).exp()).sum();
            if denom.is_finite() && denom > 0.0 { 1.0 / denom } else { 0.0 }
        })
        .collect();
    let weight_sum: f64 = weights.iter().sum();
    if !(weight_sum > 0.0) {
        return None;
    }
    let theta_hat = thetas.iter().zip(weights.iter()).map(|(t, w)| t * w).sum::<f64>() / weight_sum;
    let k = x.iter().map(|v| (-theta_hat * v).ln_1p()).sum::<f64>() / n as f64;
    let sigma = -k / theta_hat;
    if !(k.is_finite() && sigma.is_finite() && sigma > 0.0) {
        return None;
    }
    let k = (k * n as f64 + 0.5 * 10.0) / (n as f64 + 10.0);
    Some((k, sigma))
}

/// Quantile function of the generalized Pareto distribution.
fn gpd_quantile(p: f64, k: f64, sigma: f64) -> f64 {
    if k.abs() < 1e-12 {
        -sigma * (-p).ln_1p()
    } else {
        sigma * (-k * (-p).ln_1p()).exp_m1() / k
    }
}

/// Rank models by `elpd_loo`, best first.
///
/// Errors
/// ------
/// - [`PopError::NoModelsToCompare`] for an empty list.
/// - [`PopError::LooDimensionMismatch`] when pointwise counts differ.
pub fn compare_models(models: &[(&str, &LooEstimate)]) -> PopResult<Vec<LooComparison>> {
    let (_, first) = models.first().ok_or(PopError::NoModelsToCompare)?;
    let expected = first.n_points();
    if let Some((_, bad)) = models.iter().find(|(_, loo)| loo.n_points() != expected) {
        return Err(PopError::LooDimensionMismatch { expected, found: bad.n_points() });
    }
    let mut ranked: Vec<&(&str, &LooEstimate)> = models.iter().collect();
    ranked.sort_by(|a, b| b.1.elpd_loo.total_cmp(&a.1.elpd_loo));
    let best = ranked[0].1;

    Ok(ranked
        .into_iter()
        .map(|(name, loo)| {
            let diffs: Vec<f64> = loo
                .pointwise_elpd
                .iter()
                .zip(best.pointwise_elpd.iter())
                .map(|(a, b)| a - b)
                .collect();
            let (elpd_diff, se_diff) = sum_and_se(&diffs);
            LooComparison {
                model: name.to_string(),
                elpd_loo: loo.elpd_loo,
                elpd_diff,
                se_diff,
                p_loo: loo.p_loo,
                looic: loo.looic,
                se_looic: loo.se_looic,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::core::densities::normal_ln_pdf;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Normal};
    use rand_xoshiro::Xoshiro256PlusPlus;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Generalized Pareto shape recovery, PSIS-LOO on a well-specified normal
    // model against its closed-form leave-one-out density, and model
    // comparison bookkeeping.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The Zhang–Stephens fit recovers a known shape.
    //
    // Given
    // -----
    // - 4000 exceedances from a GPD with `k = 0.5`, `σ = 1`.
    //
    // Expect
    // ------
    // - `k̂` within 0.1 of 0.5 and `σ̂` within 0.15 of 1.
    fn gpd_fit_recovers_shape() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let mut x: Vec<f64> =
            (0..4000).map(|_| gpd_quantile(rng.gen::<f64>(), 0.5, 1.0)).collect();
        x.sort_by(f64::total_cmp);

        let (k, sigma) = gpd_fit(&x).unwrap();

        assert!((k - 0.5).abs() < 0.1, "k = {k}");
        assert!((sigma - 1.0).abs() < 0.15, "sigma = {sigma}");
    }

    #[test]
    // Purpose
    // -------
    // On a conjugate normal-mean model PSIS-LOO matches the exact
    // leave-one-out predictive density.
    //
    // Given
    // -----
    // - 20 observations from `N(0, 1)`, flat prior on the mean, known unit
    //   variance; 4000 posterior draws `μ ~ N(ȳ, 1/n)`.
    // - Exact LOO predictive: `y_i ~ N(ȳ_{−i}, 1 + 1/(n−1))`.
    //
    // Expect
    // ------
    // - `elpd_loo` within 0.3 of the exact value; every `k̂ < 0.7`;
    //   `p_loo` near 1 (one mean parameter).
    fn psis_loo_matches_exact_normal_loo() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12);
        let n = 20;
        let y: Vec<f64> = (0..n).map(|_| Normal::new(0.0, 1.0).unwrap().sample(&mut rng)).collect();
        let ybar = y.iter().sum::<f64>() / n as f64;
        let post = Normal::new(ybar, (1.0 / n as f64).sqrt()).unwrap();
        let mus: Vec<f64> = (0..4000).map(|_| post.sample(&mut rng)).collect();
        let log_lik = Array2::from_shape_fn((4000, n), |(s, i)| normal_ln_pdf(y[i], mus[s], 1.0));

        let loo = psis_loo(&log_lik).unwrap();

        let exact: f64 = (0..n)
            .map(|i| {
                let mean = (ybar * n as f64 - y[i]) / (n as f64 - 1.0);
                normal_ln_pdf(y[i], mean, (1.0 + 1.0 / (n as f64 - 1.0)).sqrt())
            })
            .sum();
        assert!((loo.elpd_loo - exact).abs() < 0.3, "{} vs {exact}", loo.elpd_loo);
        assert!(loo.pareto_k.iter().all(|k| *k < K_WARN));
        assert!(loo.p_loo > 0.6 && loo.p_loo < 1.6, "p_loo = {}", loo.p_loo);
        assert_relative_eq!(loo.looic, -2.0 * loo.elpd_loo);
        assert_eq!(loo.high_k, 0);
    }

    fn estimate(pointwise: Vec<f64>) -> LooEstimate {
        let (elpd_loo, se) = sum_and_se(&pointwise);
        LooEstimate {
            elpd_loo,
            se_elpd_loo: se,
            p_loo: 1.0,
            se_p_loo: 0.1,
            looic: -2.0 * elpd_loo,
            se_looic: 2.0 * se,
            pareto_k: vec![0.1; pointwise.len()],
            pointwise_elpd: pointwise,
            high_k: 0,
        }
    }

    #[test]
    // Purpose
    // -------
    // Models are ranked best first with differences relative to the best.
    //
    // Given
    // -----
    // - Pointwise elpd `a = (−1, −1, −1)`, `b = (−1, −2, −1)`.
    //
    // Expect
    // ------
    // - Order `a, b`; `b.elpd_diff = −1`; `a` has zero difference.
    fn compare_models_ranks_by_elpd() {
        let a = estimate(vec![-1.0, -1.0, -1.0]);
        let b = estimate(vec![-1.0, -2.0, -1.0]);

        let rows = compare_models(&[("b", &b), ("a", &a)]).unwrap();

        assert_eq!(rows[0].model, "a");
        assert_eq!(rows[0].elpd_diff, 0.0);
        assert_eq!(rows[0].se_diff, 0.0);
        assert_relative_eq!(rows[1].elpd_diff, -1.0);
        assert!(rows[1].se_diff > 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Fits with different pointwise counts and empty inputs are rejected.
    fn compare_models_rejects_bad_inputs() {
        let a = estimate(vec![-1.0; 3]);
        let b = estimate(vec![-1.0; 4]);

        let err = compare_models(&[("a", &a), ("b", &b)]).unwrap_err();

        assert_eq!(err, PopError::LooDimensionMismatch { expected: 3, found: 4 });
        assert_eq!(compare_models(&[]).unwrap_err(), PopError::NoModelsToCompare);
    }
}
