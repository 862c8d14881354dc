//! viz: text charts for posterior draws and predictions.
//!
//! Purpose
//! -------
//! Render trace plots, histograms and prediction ribbons as plain text so
//! the report can print them to a terminal or a log file.
//!
//! Key behaviors
//! -------------
//! - Every chart is drawn with `ratatui` widgets into an off-screen
//!   [`Buffer`] and flattened to a `String`, one line per buffer row with
//!   trailing blanks trimmed.
//! - [`render_trace`] draws one line per chain against the draw index.
//! - [`render_histogram`] bins pooled draws into a bar chart.
//! - [`render_ribbon`] draws the 95% band and median of the predictions
//!   with the observations overlaid as points.
//!
//! Invariants & assumptions
//! ------------------------
//! - Empty input is [`PopError::EmptyPlotData`]; non-finite values are
//!   skipped.
//! - Charts carry no analysis logic; everything they show is computed in
//!   `posterior`.
use crate::{
    population::errors::{PopError, PopResult},
    posterior::summary::PredictionRow,
};
use ndarray::{Array2, Axis as NdAxis};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    symbols::Marker,
    text::Line,
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Chart, Dataset, GraphType, Widget},
};
use serde::{Deserialize, Serialize};

/// Character-cell size of a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotSize {
    pub width: u16,
    pub height: u16,
}

impl Default for PlotSize {
    fn default() -> Self {
        PlotSize { width: 72, height: 16 }
    }
}

fn buffer_to_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let line: String = (area.left()..area.right())
            .map(|x| buf.cell((x, y)).map_or(" ", |cell| cell.symbol()))
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn draw<W: Widget>(widget: W, size: PlotSize) -> String {
    let area = Rect::new(0, 0, size.width.max(10), size.height.max(5));
    let mut buf = Buffer::empty(area);
    widget.render(area, &mut buf);
    buffer_to_string(&buf)
}

/// `[lo, hi]` over finite values, widened when degenerate.
fn bounds<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<[f64; 2]> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if lo > hi {
        return None;
    }
    if hi - lo < 1e-12 { Some([lo - 0.5, hi + 0.5]) } else { Some([lo, hi]) }
}

fn axis_labels(range: [f64; 2]) -> Vec<String> {
    let mid = 0.5 * (range[0] + range[1]);
    vec![format!("{:.2}", range[0]), format!("{mid:.2}"), format!("{:.2}", range[1])]
}

/// Trace plot of a `draws × chains` matrix.
pub fn render_trace(draws: &Array2<f64>, name: &str, size: PlotSize) -> PopResult<String> {
    if draws.is_empty() {
        return Err(PopError::EmptyPlotData { plot: "trace" });
    }
    let y_range = bounds(draws.iter()).ok_or(PopError::EmptyPlotData { plot: "trace" })?;
    let series: Vec<Vec<(f64, f64)>> = draws
        .axis_iter(NdAxis(1))
        .map(|chain| {
            chain
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .map(|(i, v)| (i as f64, *v))
                .collect()
        })
        .collect();
    let datasets: Vec<Dataset<'_>> = series
        .iter()
        .map(|points| Dataset::default().marker(Marker::Braille).graph_type(GraphType::Line).data(points))
        .collect();
    let x_max = (draws.nrows().saturating_sub(1)).max(1) as f64;
    let chart = Chart::new(datasets)
        .block(Block::bordered().title(format!("trace: {name} ({} chains)", draws.ncols())))
        .x_axis(
            Axis::default()
                .bounds([0.0, x_max])
                .labels(vec!["0".to_string(), format!("{}", draws.nrows())]),
        )
        .y_axis(Axis::default().bounds(y_range).labels(axis_labels(y_range)));
    Ok(draw(chart, size))
}

/// Bin counts of `values` over `bins` equal-width bins.
pub fn histogram_counts(values: &[f64], bins: usize) -> Option<(Vec<u64>, [f64; 2])> {
    let range = bounds(values.iter())?;
    let bins = bins.max(1);
    let width = (range[1] - range[0]) / bins as f64;
    let mut counts = vec![0_u64; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - range[0]) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some((counts, range))
}

/// Histogram of pooled draws.
pub fn render_histogram(values: &[f64], name: &str, bins: usize, size: PlotSize) -> PopResult<String> {
    let (counts, range) =
        histogram_counts(values, bins).ok_or(PopError::EmptyPlotData { plot: "histogram" })?;
    let bar_width = ((size.width.saturating_sub(2)) / counts.len().max(1) as u16).max(1);
    let bars: Vec<Bar<'_>> = counts.iter().map(|c| Bar::default().value(*c).text_value(String::new())).collect();
    let chart = BarChart::default()
        .block(Block::bordered().title(format!(
            "histogram: {name} [{:.3}, {:.3}]",
            range[0], range[1]
        )))
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(0);
    Ok(draw(chart, size))
}

/// Prediction ribbon with observations overlaid.
pub fn render_ribbon(rows: &[PredictionRow], title: &str, size: PlotSize) -> PopResult<String> {
    if rows.is_empty() {
        return Err(PopError::EmptyPlotData { plot: "ribbon" });
    }
    let pick = |f: fn(&PredictionRow) -> f64| -> Vec<(f64, f64)> {
        rows.iter().map(|r| (r.year as f64, f(r))).filter(|(_, v)| v.is_finite()).collect()
    };
    let lower = pick(|r| r.lower);
    let upper = pick(|r| r.upper);
    let median = pick(|r| r.estimate);
    let observed = pick(|r| r.observed);
    let y_values: Vec<f64> = lower.iter().chain(upper.iter()).chain(observed.iter()).map(|p| p.1).collect();
    let y_range = bounds(y_values.iter()).ok_or(PopError::EmptyPlotData { plot: "ribbon" })?;
    let first = rows[0].year as f64;
    let last = rows[rows.len() - 1].year as f64;
    let x_range = if last > first { [first, last] } else { [first - 0.5, first + 0.5] };

    let datasets = vec![
        Dataset::default().name("2.5%").marker(Marker::Braille).graph_type(GraphType::Line).data(&lower),
        Dataset::default().name("97.5%").marker(Marker::Braille).graph_type(GraphType::Line).data(&upper),
        Dataset::default().name("median").marker(Marker::Braille).graph_type(GraphType::Line).data(&median),
        Dataset::default().name("observed").marker(Marker::Dot).graph_type(GraphType::Scatter).data(&observed),
    ];
    let chart = Chart::new(datasets)
        .block(Block::bordered().title(Line::from(title.to_string())))
        .x_axis(
            Axis::default()
                .title("year")
                .bounds(x_range)
                .labels(vec![format!("{}", rows[0].year), format!("{}", rows[rows.len() - 1].year)]),
        )
        .y_axis(Axis::default().title("log index").bounds(y_range).labels(axis_labels(y_range)));
    Ok(draw(chart, size))
}
