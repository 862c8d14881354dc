//! Pipeline configuration loaded from TOML.
//!
//! Sections
//! --------
//! - `[data]`: CSV path and the year / index column names.
//! - `[priors]`: [`PriorSpec`] hyperparameters.
//! - `[sampler]`: [`SamplerOptions`].
//! - `[analysis]`: models to fit, residual tail probability, the `ν`
//!   cutoff for tail-probability tables and chart settings.
//!
//! Every section and field has a default, so an empty file is valid.
//! Unknown keys are rejected. [`PipelineConfig::validate`] applies the
//! same checks as the validated constructors.
use std::path::{Path, PathBuf};

use crate::{
    population::{
        core::{
            loader::ColumnSelection, options::SamplerOptions, priors::PriorSpec, spec::ModelSpec,
        },
        errors::{PopError, PopResult},
    },
    posterior::residuals::DEFAULT_TAIL_PROBABILITY,
    viz::PlotSize,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub path: Option<PathBuf>,
    pub year_column: String,
    pub index_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        let columns = ColumnSelection::default();
        DataConfig { path: None, year_column: columns.year, index_column: columns.index }
    }
}

impl DataConfig {
    pub fn columns(&self) -> ColumnSelection {
        ColumnSelection::new(self.year_column.as_str(), self.index_column.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub models: Vec<ModelSpec>,
    pub tail_probability: f64,
    pub nu_cutoff: f64,
    pub plots: bool,
    pub histogram_bins: usize,
    pub plot_size: PlotSize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            models: ModelSpec::ALL.to_vec(),
            tail_probability: DEFAULT_TAIL_PROBABILITY,
            nu_cutoff: 10.0,
            plots: true,
            histogram_bins: 30,
            plot_size: PlotSize::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub priors: PriorSpec,
    pub sampler: SamplerOptions,
    pub analysis: AnalysisConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> PopResult<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: &Path) -> PopResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PopError::Io { path: path.display().to_string(), reason: e.to_string() })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> PopResult<()> {
        self.priors.validate()?;
        self.sampler.validate()?;
        let a = &self.analysis;
        if a.models.is_empty() {
            return Err(PopError::Config { reason: "analysis.models must name at least one model".into() });
        }
        if !(a.tail_probability > 0.0 && a.tail_probability < 1.0) {
            return Err(PopError::InvalidProbability { value: a.tail_probability });
        }
        if !a.nu_cutoff.is_finite() {
            return Err(PopError::Config { reason: "analysis.nu_cutoff must be finite".into() });
        }
        if a.histogram_bins == 0 {
            return Err(PopError::Config { reason: "analysis.histogram_bins must be at least 1".into() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Defaults for an empty document, section overrides, and rejection of
    // unknown keys and invalid values.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // An empty document yields the defaults of every section.
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();

        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.analysis.models.len(), 4);
        assert_eq!(config.data.columns(), ColumnSelection::default());
    }

    #[test]
    // Purpose
    // -------
    // Values in each section override the defaults.
    fn sections_override_defaults() {
        let text = r#"
            [data]
            path = "counts.csv"
            year_column = "Year"
            index_column = "N"

            [priors]
            nu_rate = 0.1

            [sampler]
            iter = 1000
            warmup = 500
            chains = 2

            [analysis]
            models = ["gompertz_t", "SS_Gompertz_T"]
            tail_probability = 0.01
        "#;

        let config = PipelineConfig::from_toml_str(text).unwrap();

        assert_eq!(config.data.path, Some(PathBuf::from("counts.csv")));
        assert_eq!(config.data.columns(), ColumnSelection::new("Year", "N"));
        assert_eq!(config.priors.nu_rate, 0.1);
        assert_eq!(config.sampler.chains, 2);
        assert_eq!(config.analysis.models.len(), 2);
        assert!(config.analysis.models.iter().all(|m| m.is_heavy_tailed()));
        assert_eq!(config.analysis.tail_probability, 0.01);
    }

    #[test]
    // Purpose
    // -------
    // Typos and invalid values are fatal.
    fn invalid_documents_are_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[sampler]\niters = 10"),
            Err(PopError::Config { .. })
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[sampler]\niter = 10\nwarmup = 10"),
            Err(PopError::InvalidSamplerOption { name: "warmup", .. })
        ));
        assert!(matches!(
            PipelineConfig::from_toml_str("[analysis]\ntail_probability = 0.0"),
            Err(PopError::InvalidProbability { .. })
        ));
        assert!(PipelineConfig::from_toml_str("[analysis]\nmodels = [\"logistic\"]").is_err());
    }
}
