//! Between-chain convergence diagnostics.
//!
//! - [`split_rhat`]: potential scale reduction on chains split in half.
//! - [`effective_sample_size`]: multi-chain ESS with Geyer's initial
//!   monotone positive-sequence truncation of the autocorrelations.
//!
//! Both take a `draws × chains` matrix. Degenerate inputs (constant draws,
//! fewer than four draws per chain) return conservative values instead of
//! errors since these diagnostics only ever produce warnings.
use ndarray::{ArrayView1, ArrayView2, Axis};

/// Split R-hat (Gelman et al., BDA3 §11.4).
///
/// Each chain is split into a first and second half (the middle draw is
/// dropped for odd lengths). Returns `1.0` for constant draws and
/// `f64::INFINITY` when halves are constant but disagree.
pub fn split_rhat(draws: ArrayView2<'_, f64>) -> f64 {
    let half = draws.nrows() / 2;
    if half < 2 {
        return f64::NAN;
    }
    let offset = draws.nrows() - half;
    let pieces: Vec<ArrayView1<'_, f64>> = draws
        .axis_iter(Axis(1))
        .flat_map(|chain| {
            let (head, tail) = chain.split_at(Axis(0), half);
            let tail = tail.slice_move(ndarray::s![offset - half..]);
            [head, tail]
        })
        .collect();
    rhat_from_chains(&pieces)
}

fn rhat_from_chains(chains: &[ArrayView1<'_, f64>]) -> f64 {
    let (within, var_plus) = variance_components(chains);
    if within <= 0.0 {
        return if var_plus <= 0.0 { 1.0 } else { f64::INFINITY };
    }
    (var_plus / within).sqrt()
}

/// `(W, var⁺)` for equally long chains.
fn variance_components(chains: &[ArrayView1<'_, f64>]) -> (f64, f64) {
    let m = chains.len() as f64;
    let n = chains[0].len() as f64;
    let means: Vec<f64> = chains.iter().map(|c| c.mean().unwrap_or(0.0)).collect();
    let grand = means.iter().sum::<f64>() / m;
    let between = if m > 1.0 {
        n / (m - 1.0) * means.iter().map(|mu| (mu - grand).powi(2)).sum::<f64>()
    } else {
        0.0
    };
    let within = chains.iter().map(|c| c.var(1.0)).sum::<f64>() / m;
    (within, (n - 1.0) / n * within + between / n)
}

fn autocovariance(chain: ArrayView1<'_, f64>, mean: f64, lag: usize) -> f64 {
    let n = chain.len();
    (0..n - lag).map(|i| (chain[i] - mean) * (chain[i + lag] - mean)).sum::<f64>() / n as f64
}

/// Multi-chain effective sample size.
///
/// Autocorrelations are combined across chains as
/// `ρ_t = 1 − (W − mean_c γ_{c,t}) / var⁺`, summed in adjacent pairs while
/// the pair sums stay positive and made monotone, and
/// `ESS = M·N / (−1 + 2·Σ P_k)`.
pub fn effective_sample_size(draws: ArrayView2<'_, f64>) -> f64 {
    let (n, m) = draws.dim();
    let total = (n * m) as f64;
    if n < 4 {
        return total;
    }
    let chains: Vec<ArrayView1<'_, f64>> = draws.axis_iter(Axis(1)).collect();
    let means: Vec<f64> = chains.iter().map(|c| c.mean().unwrap_or(0.0)).collect();
    let (_, var_plus) = variance_components(&chains);
    if var_plus <= 0.0 {
        return total;
    }
    let within = chains.iter().map(|c| c.var(1.0)).sum::<f64>() / m as f64;
    let rho = |lag: usize| {
        let mean_acov = chains
            .iter()
            .zip(means.iter())
            .map(|(c, mu)| autocovariance(*c, *mu, lag))
            .sum::<f64>()
            / m as f64;
        1.0 - (within - mean_acov) / var_plus
    };

    let mut tau = -1.0;
    let mut previous_pair = f64::INFINITY;
    let mut lag = 0;
    while lag + 1 < n {
        let pair = rho(lag) + rho(lag + 1);
        if pair <= 0.0 {
            break;
        }
        let pair = pair.min(previous_pair);
        tau += 2.0 * pair;
        previous_pair = pair;
        lag += 2;
    }
    let tau = tau.max(1.0 / total.log10().max(1.0));
    (total / tau).min(total * total.log10().max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand_distr::{Distribution, StandardNormal};
    use rand_xoshiro::Xoshiro256PlusPlus;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // R-hat and ESS on independent draws, on chains stuck at different
    // locations and on a strongly autocorrelated AR(1) chain.
    // -------------------------------------------------------------------------

    fn iid(n: usize, m: usize, seed: u64) -> Array2<f64> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        Array2::from_shape_fn((n, m), |_| StandardNormal.sample(&mut rng))
    }

    #[test]
    // Purpose
    // -------
    // Independent draws give R-hat near 1 and ESS near the draw count.
    fn iid_draws_look_converged() {
        let draws = iid(1000, 4, 1);

        let rhat = split_rhat(draws.view());
        let ess = effective_sample_size(draws.view());

        assert!((rhat - 1.0).abs() < 0.01, "rhat = {rhat}");
        assert!(ess > 3000.0 && ess < 5000.0, "ess = {ess}");
    }

    #[test]
    // Purpose
    // -------
    // Chains centred at different values are flagged by R-hat.
    //
    // Given
    // -----
    // - Four iid chains, the last shifted by 3.
    //
    // Expect
    // ------
    // - R-hat well above 1.05.
    fn shifted_chain_inflates_rhat() {
        let mut draws = iid(500, 4, 2);
        draws.column_mut(3).mapv_inplace(|v| v + 3.0);

        assert!(split_rhat(draws.view()) > 1.3);
    }

    #[test]
    // Purpose
    // -------
    // A drifting chain is caught by the split.
    fn trending_chain_inflates_split_rhat() {
        let draws = Array2::from_shape_fn((400, 1), |(i, _)| i as f64 / 100.0);

        assert!(split_rhat(draws.view()) > 1.5);
    }

    #[test]
    // Purpose
    // -------
    // Autocorrelation shrinks ESS toward `N (1 − φ) / (1 + φ)`.
    //
    // Given
    // -----
    // - Two AR(1) chains with `φ = 0.9`, 5000 draws each.
    //
    // Expect
    // ------
    // - ESS roughly `10 000 · 0.1 / 1.9 ≈ 526`, accepted in (250, 1000).
    fn ar1_chain_has_reduced_ess() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut draws = Array2::<f64>::zeros((5000, 2));
        for c in 0..2 {
            let mut x = 0.0;
            for i in 0..5000 {
                let z: f64 = StandardNormal.sample(&mut rng);
                x = 0.9 * x + z;
                draws[[i, c]] = x;
            }
        }

        let ess = effective_sample_size(draws.view());

        assert!(ess > 250.0 && ess < 1000.0, "ess = {ess}");
    }

    #[test]
    // Purpose
    // -------
    // Constant draws do not divide by zero.
    fn constant_draws_are_handled() {
        let draws = Array2::from_elem((100, 2), 1.5);

        assert_eq!(split_rhat(draws.view()), 1.0);
        assert_eq!(effective_sample_size(draws.view()), 200.0);
    }
}
