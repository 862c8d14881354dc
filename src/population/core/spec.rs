//! Model registry for the Gompertz family.
//!
//! A [`ModelSpec`] is the product of a process-error family and an
//! observation model. The four combinations are addressed by fixed
//! registry names:
//!
//! | name                 | process error | observation |
//! |----------------------|---------------|-------------|
//! | `gompertz_normal`    | normal        | exact       |
//! | `gompertz_t`         | Student-t     | exact       |
//! | `ss_gompertz_normal` | normal        | noisy       |
//! | `ss_gompertz_t`      | Student-t     | noisy       |
use crate::population::errors::{PopError, PopResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Distribution of the process shocks `ε_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessError {
    Normal,
    StudentT,
}

/// Relationship between latent log-abundance `x_t` and the observed log
/// index `y_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationModel {
    /// `y_t = x_t` (autoregressive model on the observed series).
    Exact,
    /// `y_t ~ N(x_t, σ_obs²)` (state-space model).
    Noisy,
}

/// One entry of the model registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelSpec {
    pub process: ProcessError,
    pub observation: ObservationModel,
}

impl ModelSpec {
    pub const ALL: [ModelSpec; 4] = [
        ModelSpec::new(ProcessError::Normal, ObservationModel::Exact),
        ModelSpec::new(ProcessError::StudentT, ObservationModel::Exact),
        ModelSpec::new(ProcessError::Normal, ObservationModel::Noisy),
        ModelSpec::new(ProcessError::StudentT, ObservationModel::Noisy),
    ];

    pub const fn new(process: ProcessError, observation: ObservationModel) -> Self {
        ModelSpec { process, observation }
    }

    pub fn name(&self) -> &'static str {
        match (self.process, self.observation) {
            (ProcessError::Normal, ObservationModel::Exact) => "gompertz_normal",
            (ProcessError::StudentT, ObservationModel::Exact) => "gompertz_t",
            (ProcessError::Normal, ObservationModel::Noisy) => "ss_gompertz_normal",
            (ProcessError::StudentT, ObservationModel::Noisy) => "ss_gompertz_t",
        }
    }

    pub fn is_heavy_tailed(&self) -> bool {
        self.process == ProcessError::StudentT
    }

    pub fn is_state_space(&self) -> bool {
        self.observation == ObservationModel::Noisy
    }

    /// Scalar parameters in reporting order.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        let mut names = vec!["lambda", "b", "sigma_proc"];
        if self.is_heavy_tailed() {
            names.push("nu");
        }
        if self.is_state_space() {
            names.push("sigma_obs");
        }
        names
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelSpec {
    type Err = PopError;

    /// Parse a registry name (case-insensitive, surrounding whitespace
    /// ignored).
    fn from_str(s: &str) -> PopResult<Self> {
        let key = s.trim().to_lowercase();
        ModelSpec::ALL
            .into_iter()
            .find(|m| m.name() == key)
            .ok_or_else(|| PopError::UnknownModel { name: s.to_string() })
    }
}

impl Serialize for ModelSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ModelSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
