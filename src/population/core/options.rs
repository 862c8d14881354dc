//! Sampler configuration.
//!
//! [`SamplerOptions`] bundles the run length, chain count, thinning, seed
//! and the two tuning knobs of the Gibbs sweep: the slice-sampler doubling
//! budget and the target acceptance rate of the adaptive Metropolis step
//! for `ν`. Validation happens once in [`SamplerOptions::new`] (or
//! [`SamplerOptions::validate`] after deserialization); the sampler treats
//! an accepted value as internally consistent.
use crate::population::errors::{PopError, PopResult};
use serde::{Deserialize, Serialize};

/// Fewest retained draws, pooled over chains, that the summaries and
/// PSIS-LOO can work with.
const MIN_TOTAL_DRAWS: usize = 2;

/// `SamplerOptions`: validated Gibbs sampler settings.
///
/// Fields
/// ------
/// - `iter`: total iterations per chain, warmup included.
/// - `warmup`: leading iterations discarded and used for adaptation.
/// - `chains`: number of independent chains.
/// - `thin`: keep every `thin`-th post-warmup iteration.
/// - `seed`: base seed; chain `c` uses the stream after `c` jumps.
/// - `max_doublings`: cap on slice-interval doublings per update.
/// - `target_accept`: target acceptance for the `ν` random walk.
/// - `parallel`: run chains on the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplerOptions {
    pub iter: usize,
    pub warmup: usize,
    pub chains: usize,
    pub thin: usize,
    pub seed: u64,
    pub max_doublings: usize,
    pub target_accept: f64,
    pub parallel: bool,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        SamplerOptions {
            iter: 4000,
            warmup: 2000,
            chains: 4,
            thin: 1,
            seed: 20_240_601,
            max_doublings: 10,
            target_accept: 0.44,
            parallel: true,
        }
    }
}

impl SamplerOptions {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        iter: usize, warmup: usize, chains: usize, thin: usize, seed: u64, max_doublings: usize,
        target_accept: f64, parallel: bool,
    ) -> PopResult<Self> {
        let opts =
            SamplerOptions { iter, warmup, chains, thin, seed, max_doublings, target_accept, parallel };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> PopResult<()> {
        if self.warmup >= self.iter {
            return Err(PopError::InvalidSamplerOption {
                name: "warmup",
                reason: "warmup must be smaller than iter.",
            });
        }
        if self.chains == 0 {
            return Err(PopError::InvalidSamplerOption {
                name: "chains",
                reason: "at least one chain is required.",
            });
        }
        if self.thin == 0 {
            return Err(PopError::InvalidSamplerOption {
                name: "thin",
                reason: "thin must be at least 1.",
            });
        }
        if self.max_doublings == 0 {
            return Err(PopError::InvalidSamplerOption {
                name: "max_doublings",
                reason: "max_doublings must be at least 1.",
            });
        }
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(PopError::InvalidSamplerOption {
                name: "target_accept",
                reason: "target_accept must lie strictly between 0 and 1.",
            });
        }
        if self.total_draws() < MIN_TOTAL_DRAWS {
            return Err(PopError::InvalidSamplerOption {
                name: "iter",
                reason: "settings retain fewer than 2 draws across all chains.",
            });
        }
        Ok(())
    }

    /// Retained draws per chain.
    pub fn draws_per_chain(&self) -> usize {
        (self.iter - self.warmup).div_ceil(self.thin)
    }

    /// Retained draws pooled over all chains.
    pub fn total_draws(&self) -> usize {
        self.draws_per_chain() * self.chains
    }

    /// Whether iteration `it` (0-based, warmup included) is retained.
    pub fn keeps(&self, it: usize) -> bool {
        it >= self.warmup && (it - self.warmup) % self.thin == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Out-of-range options are rejected by name.
    fn validate_rejects_out_of_range_options() {
        let d = SamplerOptions::default();
        let cases = [
            (SamplerOptions { warmup: 10, iter: 10, ..d }, "warmup"),
            (SamplerOptions { chains: 0, ..d }, "chains"),
            (SamplerOptions { thin: 0, ..d }, "thin"),
            (SamplerOptions { max_doublings: 0, ..d }, "max_doublings"),
            (SamplerOptions { target_accept: 1.0, ..d }, "target_accept"),
            (SamplerOptions { iter: 2, warmup: 1, chains: 1, ..d }, "iter"),
        ];
        for (opts, expected) in cases {
            match opts.validate() {
                Err(PopError::InvalidSamplerOption { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected {expected} rejection, got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Thinning keeps the first post-warmup draw and every `thin`-th after.
    //
    // Given
    // -----
    // - `iter = 11`, `warmup = 4`, `thin = 3`.
    //
    // Expect
    // ------
    // - Iterations 4, 7, 10 kept; `draws_per_chain = 3`.
    fn keeps_and_draws_per_chain_agree() {
        let opts = SamplerOptions::new(11, 4, 1, 3, 1, 10, 0.44, false).unwrap();
        let kept: Vec<usize> = (0..opts.iter).filter(|&it| opts.keeps(it)).collect();
        assert_eq!(kept, vec![4, 7, 10]);
        assert_eq!(opts.draws_per_chain(), kept.len());
    }

    #[test]
    // Purpose
    // -------
    // The pooled-draw floor counts every chain.
    //
    // Given
    // -----
    // - One post-warmup iteration per chain.
    //
    // Expect
    // ------
    // - One chain is rejected; two chains retain 2 draws and pass.
    fn validate_counts_draws_across_chains() {
        assert!(SamplerOptions::new(2, 1, 1, 1, 1, 10, 0.44, false).is_err());
        let two = SamplerOptions::new(2, 1, 2, 1, 1, 10, 0.44, false).unwrap();
        assert_eq!(two.total_draws(), 2);
    }
}
