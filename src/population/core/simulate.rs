//! Forward simulation of Gompertz series on the log scale.
//!
//! `x_t = lambda + b·x_{t−1} + ε_t`, with normal or Student-t shocks, plus
//! optional Gaussian observation error. Extra deterministic shocks can be
//! injected at chosen steps to build series with known outliers.
use crate::population::{
    core::data::ObservationSeries,
    errors::{PopError, PopResult},
};
use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, Normal, StudentT};

/// `GompertzSimulation`: generative settings for one series.
///
/// Fields
/// ------
/// - `lambda`, `b`, `sigma_proc`: process parameters.
/// - `nu`: `Some(ν)` for Student-t shocks, `None` for normal.
/// - `sigma_obs`: `Some(σ_obs)` adds observation error.
/// - `x0`: initial log-abundance; defaults to the stationary mean
///   `lambda / (1 − b)` when `|b| < 1`, else `0`.
/// - `start_year`: year of the first row.
/// - `shocks`: `(step, size)` pairs added to `ε_step` (steps ≥ 1).
#[derive(Debug, Clone, PartialEq)]
pub struct GompertzSimulation {
    pub lambda: f64,
    pub b: f64,
    pub sigma_proc: f64,
    pub nu: Option<f64>,
    pub sigma_obs: Option<f64>,
    pub x0: Option<f64>,
    pub start_year: i32,
    pub shocks: Vec<(usize, f64)>,
}

/// Output of [`GompertzSimulation::simulate`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSeries {
    pub series: ObservationSeries,
    pub states: Array1<f64>,
}

impl GompertzSimulation {
    pub fn new(lambda: f64, b: f64, sigma_proc: f64) -> Self {
        GompertzSimulation {
            lambda,
            b,
            sigma_proc,
            nu: None,
            sigma_obs: None,
            x0: None,
            start_year: 1970,
            shocks: Vec::new(),
        }
    }

    pub fn with_nu(mut self, nu: f64) -> Self {
        self.nu = Some(nu);
        self
    }

    pub fn with_sigma_obs(mut self, sigma_obs: f64) -> Self {
        self.sigma_obs = Some(sigma_obs);
        self
    }

    pub fn with_shock(mut self, step: usize, size: f64) -> Self {
        self.shocks.push((step, size));
        self
    }

    pub fn starting_at(mut self, year: i32) -> Self {
        self.start_year = year;
        self
    }

    /// Simulate `n` years.
    ///
    /// Errors
    /// ------
    /// - `PopError::TooFewObservations` / validation errors from
    ///   [`ObservationSeries::from_log`].
    /// - `PopError::Distribution` when a scale or `ν` is not positive.
    /// - `PopError::YearOverflow` when `start_year + n − 1` exceeds `i32`.
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> PopResult<SimulatedSeries> {
        let years = (0..n)
            .map(|i| i32::try_from(i).ok().and_then(|i| self.start_year.checked_add(i)))
            .collect::<Option<Vec<i32>>>()
            .ok_or(PopError::YearOverflow { start: self.start_year, len: n })?;
        let unit = Normal::new(0.0, 1.0)?;
        let heavy = match self.nu {
            Some(nu) => Some(
                StudentT::new(nu).map_err(|e| PopError::Distribution { reason: e.to_string() })?,
            ),
            None => None,
        };
        if !(self.sigma_proc.is_finite() && self.sigma_proc > 0.0) {
            return Err(PopError::Distribution {
                reason: format!("sigma_proc must be > 0; got {}", self.sigma_proc),
            });
        }

        let x0 = self.x0.unwrap_or_else(|| {
            if self.b.abs() < 1.0 { self.lambda / (1.0 - self.b) } else { 0.0 }
        });
        let mut states = Array1::<f64>::zeros(n);
        if n > 0 {
            states[0] = x0;
        }
        for t in 1..n {
            let z = match &heavy {
                Some(dist) => dist.sample(rng),
                None => unit.sample(rng),
            };
            let injected: f64 =
                self.shocks.iter().filter(|(step, _)| *step == t).map(|(_, size)| size).sum();
            states[t] = self.lambda + self.b * states[t - 1] + self.sigma_proc * z + injected;
        }

        let observed = match self.sigma_obs {
            Some(sd) => {
                let noise = Normal::new(0.0, sd)?;
                states.mapv(|x| x + noise.sample(rng))
            }
            None => states.clone(),
        };
        let series = ObservationSeries::from_log(years, observed)?;
        Ok(SimulatedSeries { series, states })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    // Purpose
    // -------
    // Without observation error the observed log series equals the latent
    // states, and an injected shock shows up at its step.
    //
    // Given
    // -----
    // - `lambda = 1`, `b = 0.5`, tiny `σ`, shock `+3` at step 5.
    //
    // Expect
    // ------
    // - `x_0 = 2` (stationary mean); `x_5 − (1 + 0.5·x_4) ≈ 3`.
    fn simulate_exact_series_tracks_states_and_shocks() {
        let sim = GompertzSimulation::new(1.0, 0.5, 1e-9).with_shock(5, 3.0).starting_at(2000);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let out = sim.simulate(&mut rng, 10).unwrap();

        assert_eq!(out.series.years[0], 2000);
        assert_eq!(out.series.len(), 10);
        assert_relative_eq!(out.states[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(out.states[5] - (1.0 + 0.5 * out.states[4]), 3.0, epsilon = 1e-6);
        for t in 0..10 {
            assert_relative_eq!(out.series.log_index[t], out.states[t], epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // Identical seeds give identical series.
    fn simulate_is_reproducible_for_a_seed() {
        let sim = GompertzSimulation::new(0.2, 0.9, 0.1).with_nu(3.0).with_sigma_obs(0.05);
        let a = sim.simulate(&mut Xoshiro256PlusPlus::seed_from_u64(11), 25).unwrap();
        let b = sim.simulate(&mut Xoshiro256PlusPlus::seed_from_u64(11), 25).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    // Purpose
    // -------
    // Non-positive process scale is rejected.
    fn simulate_rejects_non_positive_sigma() {
        let sim = GompertzSimulation::new(0.0, 0.5, 0.0);
        let err = sim.simulate(&mut Xoshiro256PlusPlus::seed_from_u64(1), 5).unwrap_err();
        assert!(matches!(err, PopError::Distribution { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Year labels that would pass `i32::MAX` are an error, not a wrap.
    //
    // Given
    // -----
    // - `start_year = i32::MAX − 2` with 3 and 4 years.
    //
    // Expect
    // ------
    // - 3 years fit exactly; 4 years give `YearOverflow`.
    fn simulate_rejects_year_overflow() {
        let sim = GompertzSimulation::new(0.5, 0.5, 0.1).starting_at(i32::MAX - 2);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);

        let fits = sim.simulate(&mut rng, 3).unwrap();
        let err = sim.simulate(&mut rng, 4).unwrap_err();

        assert_eq!(fits.series.years[2], i32::MAX);
        assert_eq!(err, PopError::YearOverflow { start: i32::MAX - 2, len: 4 });
    }
}
