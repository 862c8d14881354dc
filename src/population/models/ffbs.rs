//! Forward-filtering backward-sampling for the latent log-abundance path.
//!
//! Model (0-based `t`):
//! - `x_0 ~ N(init_mean, init_var)`
//! - `x_t = lambda + b·x_{t−1} + η_t`, `η_t ~ N(0, V_t)` for `t ≥ 1`
//! - `y_t ~ N(x_t, obs_var)`
//!
//! `V_t = σ² / q_t` carries the Student-t scale mixture, so the same pass
//! serves both process-error families. A Kalman filter runs forward; the
//! path is then drawn backward from `p(x_t | x_{t+1}, y_{0..=t})`.
use ndarray::Array1;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Inputs of one FFBS draw.
#[derive(Debug, Clone, Copy)]
pub struct StateSpace<'a> {
    pub y: &'a Array1<f64>,
    pub lambda: f64,
    pub b: f64,
    /// `V_t`; entry `0` is unused.
    pub process_var: &'a [f64],
    pub obs_var: f64,
    pub init_mean: f64,
    pub init_var: f64,
}

/// Filtered means and variances `m_t`, `P_t`.
pub fn kalman_filter(model: &StateSpace<'_>) -> (Vec<f64>, Vec<f64>) {
    let n = model.y.len();
    let mut means = Vec::with_capacity(n);
    let mut vars = Vec::with_capacity(n);
    let (mut a, mut r) = (model.init_mean, model.init_var);
    for t in 0..n {
        if t > 0 {
            a = model.lambda + model.b * means[t - 1];
            r = model.b * model.b * vars[t - 1] + model.process_var[t];
        }
        let gain = r / (r + model.obs_var);
        means.push(a + gain * (model.y[t] - a));
        vars.push(((1.0 - gain) * r).max(0.0));
    }
    (means, vars)
}

/// Draw one latent path.
pub fn sample_states<R: Rng + ?Sized>(model: &StateSpace<'_>, rng: &mut R) -> Array1<f64> {
    let n = model.y.len();
    let (means, vars) = kalman_filter(model);
    let mut x = Array1::<f64>::zeros(n);
    let z: f64 = StandardNormal.sample(rng);
    x[n - 1] = means[n - 1] + vars[n - 1].sqrt() * z;
    for t in (0..n - 1).rev() {
        let (m, p) = (means[t], vars[t]);
        let pred_var = model.b * model.b * p + model.process_var[t + 1];
        let gain = if pred_var > 0.0 { p * model.b / pred_var } else { 0.0 };
        let mean = m + gain * (x[t + 1] - model.lambda - model.b * m);
        let var = (p * (1.0 - gain * model.b)).max(0.0);
        let z: f64 = StandardNormal.sample(rng);
        x[t] = mean + var.sqrt() * z;
    }
    x
}
