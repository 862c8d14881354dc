//! CSV loader for annual abundance series.
//!
//! Reads a headered CSV, keeps two columns (year and index) selected by
//! header name, relabels them and hands them to
//! [`ObservationSeries::new`]. Every other column is ignored. Any failure
//! (missing file, missing column, unparsable cell) is fatal.
use crate::population::{
    core::data::ObservationSeries,
    errors::{PopError, PopResult},
};
use csv::ReaderBuilder;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Read, path::Path};

/// Header names of the two consumed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSelection {
    pub year: String,
    pub index: String,
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self { year: "year".to_string(), index: "index".to_string() }
    }
}

impl ColumnSelection {
    pub fn new(year: impl Into<String>, index: impl Into<String>) -> Self {
        Self { year: year.into(), index: index.into() }
    }
}

/// Load a series from a CSV file on disk.
///
/// # Errors
/// - [`PopError::Io`] when the file cannot be opened.
/// - Everything [`read_series_csv`] can return.
pub fn load_series_csv(path: &Path, columns: &ColumnSelection) -> PopResult<ObservationSeries> {
    let file = File::open(path)
        .map_err(|e| PopError::Io { path: path.display().to_string(), reason: e.to_string() })?;
    let series = read_series_csv(file, columns)?;
    tracing::info!(
        path = %path.display(),
        rows = series.len(),
        first_year = series.years[0],
        "loaded observation series"
    );
    let gaps = series.year_gaps();
    if !gaps.is_empty() {
        tracing::warn!(
            ?gaps,
            "series skips calendar years; consecutive rows are modeled as consecutive steps"
        );
    }
    Ok(series)
}

/// Parse a series from any CSV reader.
///
/// Header matching is exact after trimming whitespace. Year cells may be
/// written as integers or as floats with no fractional part (`1990.0`).
///
/// # Errors
/// - [`PopError::MissingColumn`] when either header is absent.
/// - [`PopError::ParseField`] for a cell that is not a number.
/// - [`PopError::Csv`] for structural CSV problems (ragged rows, bad UTF-8).
/// - Validation errors from [`ObservationSeries::new`].
pub fn read_series_csv<R: Read>(reader: R, columns: &ColumnSelection) -> PopResult<ObservationSeries> {
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let year_col = find_column(&headers, &columns.year)?;
    let index_col = find_column(&headers, &columns.index)?;

    let mut years = Vec::new();
    let mut index = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let raw_year = record.get(year_col).unwrap_or_default();
        let raw_index = record.get(index_col).unwrap_or_default();
        years.push(parse_year(raw_year, row, &columns.year)?);
        index.push(parse_number(raw_index, row, &columns.index)?);
    }
    ObservationSeries::new(years, Array1::from(index))
}

fn find_column(headers: &csv::StringRecord, name: &str) -> PopResult<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PopError::MissingColumn { column: name.to_string() })
}

fn parse_number(raw: &str, row: usize, column: &str) -> PopResult<f64> {
    raw.parse::<f64>().map_err(|_| PopError::ParseField {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

fn parse_year(raw: &str, row: usize, column: &str) -> PopResult<i32> {
    if let Ok(year) = raw.parse::<i32>() {
        return Ok(year);
    }
    let value = parse_number(raw, row, column)?;
    if value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
        Ok(value as i32)
    } else {
        Err(PopError::ParseField { row, column: column.to_string(), value: raw.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover column selection/relabeling, tolerant year parsing,
    // and the fatal error paths of the loader.
    // -------------------------------------------------------------------------

    const THREE_COLUMNS: &str = "\
Year,species,count
1990,wolf,10
1991,wolf,12.5
1992,wolf,9
";

    #[test]
    // Purpose
    // -------
    // Verify that only the selected columns are consumed and relabeled.
    //
    // Given
    // -----
    // - A CSV with `Year, species, count` and a selection of
    //   `Year` → year, `count` → index.
    //
    // Expect
    // ------
    // - Three rows with years 1990..1992 and the count values.
    fn read_series_csv_selects_and_relabels_columns() {
        let cols = ColumnSelection::new("Year", "count");

        let series = read_series_csv(THREE_COLUMNS.as_bytes(), &cols).expect("valid csv");

        assert_eq!(series.years, vec![1990, 1991, 1992]);
        assert_relative_eq!(series.index[1], 12.5);
        assert_relative_eq!(series.log_index[0], 10.0_f64.ln());
    }

    #[test]
    // Purpose
    // -------
    // Ensure a missing header is reported by name.
    fn read_series_csv_reports_missing_column() {
        let cols = ColumnSelection::new("Year", "abundance");

        let err = read_series_csv(THREE_COLUMNS.as_bytes(), &cols).unwrap_err();

        assert_eq!(err, PopError::MissingColumn { column: "abundance".to_string() });
    }

    #[test]
    // Purpose
    // -------
    // Ensure an unparsable cell aborts the load with its row and column.
    fn read_series_csv_rejects_unparsable_cells() {
        let input = "year,index\n2000,1.0\n2001,n/a\n2002,3.0\n";

        let err = read_series_csv(input.as_bytes(), &ColumnSelection::default()).unwrap_err();

        assert_eq!(
            err,
            PopError::ParseField { row: 1, column: "index".to_string(), value: "n/a".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Years written as floats with no fractional part are accepted.
    fn read_series_csv_accepts_float_years() {
        let input = "year,index\n2000.0,1.0\n2001.0,2.0\n2002.0,3.0\n";

        let series = read_series_csv(input.as_bytes(), &ColumnSelection::default()).unwrap();

        assert_eq!(series.years, vec![2000, 2001, 2002]);
    }

    #[test]
    // Purpose
    // -------
    // A missing file is a fatal I/O error naming the path.
    fn load_series_csv_reports_missing_file() {
        let path = Path::new("/definitely/not/here.csv");

        let err = load_series_csv(path, &ColumnSelection::default()).unwrap_err();

        assert!(matches!(err, PopError::Io { .. }));
    }
}
