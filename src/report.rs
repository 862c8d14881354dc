//! Report assembled by the pipeline, printable as text or JSON.
use std::fmt::Write as _;

use crate::{
    population::{errors::PopResult, models::fit::SamplerDiagnostics},
    posterior::{
        loo::{LooComparison, LooEstimate},
        residuals::ResidualFlag,
        summary::{ParamSummary, PredictionRow, ProbBelowRow},
    },
};
use serde::Serialize;

/// Basic facts about the analysed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub observations: usize,
    pub first_year: i32,
    pub last_year: i32,
}

/// A rendered text chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    pub title: String,
    pub body: String,
}

/// Everything reported for one fitted model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub model: String,
    pub parameters: Vec<ParamSummary>,
    pub predictions: Vec<PredictionRow>,
    pub residual_threshold: f64,
    pub residual_flags: Vec<ResidualFlag>,
    pub loo: LooEstimate,
    pub diagnostics: SamplerDiagnostics,
    #[serde(skip)]
    pub charts: Vec<RenderedChart>,
}

/// LOO ranking among models that share pointwise observations.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonGroup {
    pub observation_model: String,
    pub rows: Vec<LooComparison>,
}

/// Prior and posterior probabilities that `ν` is below a cutoff.
#[derive(Debug, Clone, Serialize)]
pub struct TailTable {
    pub cutoff: f64,
    pub prior: f64,
    pub posterior: Vec<ProbBelowRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub series: SeriesInfo,
    pub models: Vec<ModelReport>,
    pub comparisons: Vec<ComparisonGroup>,
    pub nu_below: TailTable,
}

impl PipelineReport {
    pub fn to_json(&self) -> PopResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Plain-text rendering: tables first, then charts when `charts` is set.
    pub fn render_text(&self, charts: bool) -> String {
        let mut out = String::new();
        let s = &self.series;
        let _ = writeln!(
            out,
            "Series: {} observations, {}-{}\n",
            s.observations, s.first_year, s.last_year
        );
        for model in &self.models {
            write_model(&mut out, model);
        }
        for group in &self.comparisons {
            write_comparison(&mut out, group);
        }
        write_tail_table(&mut out, &self.nu_below);
        if charts {
            for chart in self.models.iter().flat_map(|m| m.charts.iter()) {
                let _ = writeln!(out, "{}\n{}", chart.title, chart.body);
            }
        }
        out
    }
}

fn write_model(out: &mut String, m: &ModelReport) {
    let _ = writeln!(out, "== {} ==", m.model);
    let _ = writeln!(
        out,
        "{:<12} {:>10} {:>10} {:>10} {:>10} {:>10} {:>7} {:>8}",
        "parameter", "mean", "sd", "2.5%", "median", "97.5%", "R-hat", "ESS"
    );
    for p in &m.parameters {
        let _ = writeln!(
            out,
            "{:<12} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>7.3} {:>8.0}",
            p.name, p.mean, p.sd, p.lower, p.median, p.upper, p.rhat, p.ess
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<6} {:>10} {:>10} {:>10} {:>10} {:>10}  flag (|r| > {:.4})",
        "year", "observed", "estimate", "2.5%", "97.5%", "residual", m.residual_threshold
    );
    for (row, flag) in m.predictions.iter().zip(m.residual_flags.iter()) {
        let _ = writeln!(
            out,
            "{:<6} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}  {}",
            row.year,
            row.observed,
            row.estimate,
            row.lower,
            row.upper,
            row.residual,
            if flag.flagged { "*" } else { "" }
        );
    }
    let l = &m.loo;
    let _ = writeln!(
        out,
        "\nLOOIC {:.2} (se {:.2}), elpd_loo {:.2}, p_loo {:.2}, Pareto k > 0.7: {}",
        l.looic, l.se_looic, l.elpd_loo, l.p_loo, l.high_k
    );
    for warning in &m.diagnostics.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    let _ = writeln!(out);
}

fn write_comparison(out: &mut String, group: &ComparisonGroup) {
    let _ = writeln!(out, "== LOO comparison ({} observation models) ==", group.observation_model);
    let _ = writeln!(
        out,
        "{:<20} {:>10} {:>10} {:>9} {:>8} {:>10}",
        "model", "elpd_loo", "elpd_diff", "se_diff", "p_loo", "looic"
    );
    for r in &group.rows {
        let _ = writeln!(
            out,
            "{:<20} {:>10.2} {:>10.2} {:>9.2} {:>8.2} {:>10.2}",
            r.model, r.elpd_loo, r.elpd_diff, r.se_diff, r.p_loo, r.looic
        );
    }
    let _ = writeln!(out);
}

fn write_tail_table(out: &mut String, table: &TailTable) {
    let _ = writeln!(out, "== P(nu < {}) ==", table.cutoff);
    let _ = writeln!(out, "{:<20} {:>10.4}", "prior", table.prior);
    for r in &table.posterior {
        let _ = writeln!(out, "{:<20} {:>10.4}", r.model, r.probability);
    }
    let _ = writeln!(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Layout of the comparison and tail-probability sections and the JSON
    // shape. Model sections are covered by the pipeline integration test.
    // -------------------------------------------------------------------------

    fn small_report() -> PipelineReport {
        PipelineReport {
            series: SeriesInfo { observations: 12, first_year: 2000, last_year: 2011 },
            models: Vec::new(),
            comparisons: vec![ComparisonGroup {
                observation_model: "autoregressive".to_string(),
                rows: vec![LooComparison {
                    model: "gompertz_t".to_string(),
                    elpd_loo: -4.25,
                    elpd_diff: 0.0,
                    se_diff: 0.0,
                    p_loo: 2.5,
                    looic: 8.5,
                    se_looic: 1.0,
                }],
            }],
            nu_below: TailTable {
                cutoff: 10.0,
                prior: 0.0769,
                posterior: vec![ProbBelowRow {
                    model: "gompertz_t".to_string(),
                    parameter: "nu".to_string(),
                    cutoff: 10.0,
                    probability: 0.4,
                }],
            },
        }
    }

    #[test]
    // Purpose
    // -------
    // The text report lists the series span, each comparison group and the
    // prior / posterior tail probabilities.
    fn render_text_lists_sections() {
        let text = small_report().render_text(true);

        assert!(text.starts_with("Series: 12 observations, 2000-2011"));
        assert!(text.contains("== LOO comparison (autoregressive observation models) =="));
        assert!(text.contains("== P(nu < 10) =="));
        assert!(text.contains("0.0769"));
        assert!(text.lines().any(|l| l.starts_with("gompertz_t") && l.ends_with("0.4000")));
    }

    #[test]
    // Purpose
    // -------
    // JSON output carries the same tables under stable keys.
    fn to_json_exposes_tables() {
        let json: serde_json::Value = serde_json::from_str(&small_report().to_json().unwrap()).unwrap();

        assert_eq!(json["series"]["observations"], 12);
        assert_eq!(json["comparisons"][0]["rows"][0]["model"], "gompertz_t");
        assert_eq!(json["nu_below"]["posterior"][0]["probability"], 0.4);
    }
}
