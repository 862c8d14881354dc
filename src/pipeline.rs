//! End-to-end analysis: load, fit every configured model, summarize,
//! flag, compare, chart.
//!
//! Stages run in order on one thread; only the chains inside each fit run
//! in parallel. Any fatal error aborts the run. Sampler and LOO warnings
//! are logged and carried in the report.
use std::collections::BTreeMap;

use crate::{
    config::PipelineConfig,
    population::{
        core::{data::ObservationSeries, loader::load_series_csv},
        errors::{PopError, PopResult},
        models::fit::{PosteriorFit, sample_posterior},
    },
    posterior::{
        loo::{LooEstimate, compare_models, psis_loo},
        residuals::flag_fit_residuals,
        summary::{
            PredictionRow, summarize_parameters, summarize_predictions, tabulate_prob_below,
        },
    },
    report::{
        ComparisonGroup, ModelReport, PipelineReport, RenderedChart, SeriesInfo, TailTable,
    },
    viz::{render_histogram, render_ribbon, render_trace},
};

/// Load the configured CSV and run [`run_pipeline`] on it.
///
/// Errors
/// ------
/// - [`PopError::Config`] when `data.path` is unset.
/// - Loader errors, then anything [`run_pipeline`] returns.
pub fn load_and_run(config: &PipelineConfig) -> PopResult<PipelineReport> {
    let path = config
        .data
        .path
        .as_deref()
        .ok_or_else(|| PopError::Config { reason: "data.path is not set".into() })?;
    let series = load_series_csv(path, &config.data.columns())?;
    run_pipeline(config, &series)
}

/// Fit every model in `config.analysis.models` to `series` and assemble
/// the report.
pub fn run_pipeline(config: &PipelineConfig, series: &ObservationSeries) -> PopResult<PipelineReport> {
    config.validate()?;
    let analysis = &config.analysis;

    let mut fits = Vec::with_capacity(analysis.models.len());
    let mut models = Vec::with_capacity(analysis.models.len());
    for spec in &analysis.models {
        tracing::info!(model = %spec, "fitting model");
        let fit = sample_posterior(spec, series, &config.priors, &config.sampler)?;
        models.push(model_report(config, series, &fit)?);
        fits.push(fit);
    }

    let comparisons = compare_within_observation_models(&fits, &models)?;
    let fit_refs: Vec<&PosteriorFit> = fits.iter().collect();
    let nu_below = TailTable {
        cutoff: analysis.nu_cutoff,
        prior: config.priors.nu_prob_below(analysis.nu_cutoff),
        posterior: tabulate_prob_below(&fit_refs, "nu", analysis.nu_cutoff)?,
    };
    tracing::info!(models = models.len(), "pipeline finished");

    Ok(PipelineReport {
        series: SeriesInfo {
            observations: series.len(),
            first_year: series.years[0],
            last_year: series.years[series.len() - 1],
        },
        models,
        comparisons,
        nu_below,
    })
}

fn model_report(
    config: &PipelineConfig, series: &ObservationSeries, fit: &PosteriorFit,
) -> PopResult<ModelReport> {
    let analysis = &config.analysis;
    let parameters = summarize_parameters(fit, &[])?;
    let predictions = summarize_predictions(fit, series)?;
    let residual_flags = flag_fit_residuals(fit, &predictions, analysis.tail_probability)?;
    let residual_threshold = residual_flags.first().map_or(f64::NAN, |f| f.threshold);
    let loo = psis_loo(fit.log_lik())?;
    let charts = if analysis.plots { model_charts(config, fit, &predictions)? } else { Vec::new() };

    Ok(ModelReport {
        model: fit.spec.to_string(),
        parameters,
        predictions,
        residual_threshold,
        residual_flags,
        loo,
        diagnostics: fit.diagnostics.clone(),
        charts,
    })
}

fn model_charts(
    config: &PipelineConfig, fit: &PosteriorFit,
    predictions: &[PredictionRow],
) -> PopResult<Vec<RenderedChart>> {
    let size = config.analysis.plot_size;
    let model = fit.spec.name();
    let mut charts = Vec::new();
    for name in fit.parameter_names() {
        charts.push(RenderedChart {
            title: format!("{model}: trace of {name}"),
            body: render_trace(&fit.extract(name)?, name, size)?,
        });
    }
    let hist_param = if fit.spec.is_heavy_tailed() { "nu" } else { "sigma_proc" };
    charts.push(RenderedChart {
        title: format!("{model}: posterior of {hist_param}"),
        body: render_histogram(&fit.pooled(hist_param)?, hist_param, config.analysis.histogram_bins, size)?,
    });
    charts.push(RenderedChart {
        title: format!("{model}: predictions"),
        body: render_ribbon(predictions, model, size)?,
    });
    Ok(charts)
}

/// LOO rankings among models with the same observation model.
///
/// Autoregressive and state-space fits score different pointwise sets
/// (`N − 1` transitions vs `N` observations), so they are ranked
/// separately.
fn compare_within_observation_models(
    fits: &[PosteriorFit], reports: &[ModelReport],
) -> PopResult<Vec<ComparisonGroup>> {
    let mut groups: BTreeMap<&'static str, Vec<(&str, &LooEstimate)>> =
        BTreeMap::new();
    for (fit, report) in fits.iter().zip(reports.iter()) {
        let key = if fit.spec.is_state_space() { "state-space" } else { "autoregressive" };
        groups.entry(key).or_default().push((report.model.as_str(), &report.loo));
    }
    groups
        .into_iter()
        .map(|(key, members)| {
            Ok(ComparisonGroup { observation_model: key.to_string(), rows: compare_models(&members)? })
        })
        .collect()
}
