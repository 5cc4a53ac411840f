//! Statistical validation of aggregated datums.
//!
//! [`validate`] checks a [`CsvDatums`] table for missing cells, per-column
//! z-score outliers and gaps in the timestamp series. Failures carry 1-based
//! CSV line numbers (header included) so a reader can locate the offending
//! rows in the raw text.

#![forbid(unsafe_code)]

use datums_types::CsvDatums;
use thiserror::Error;

/// Post-aggregation validation failure.
///
/// At the query orchestration boundary this error is downgraded to a logged
/// warning; everywhere else it propagates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DataError(pub String);

/// Result type for validation.
pub type Result<T> = std::result::Result<T, DataError>;

/// Validates aggregated datums.
///
/// Checks run in order and the first failure wins:
///
/// 1. an empty table is an error outright,
/// 2. missing or unparsable cells,
/// 3. values whose z-score exceeds `z_score_threshold` (the `timestamp`
///    column and any column named in `exclude_outliers` are exempt),
/// 4. consecutive timestamps that are not exactly one interval apart.
///
/// # Errors
///
/// Returns a [`DataError`] describing the first offending lines and columns.
pub fn validate(
    datums: &CsvDatums,
    exclude_outliers: Option<&[String]>,
    z_score_threshold: f64,
) -> Result<()> {
    let table = Table::parse(&datums.csv);
    if table.row_count == 0 {
        return Err(DataError("no data has been found".to_string()));
    }

    check_missing(&table)?;
    check_outliers(&table, exclude_outliers.unwrap_or(&[]), z_score_threshold)?;
    check_index_interval(&table, datums.interval.seconds())?;
    Ok(())
}

/// Column-major view of the CSV text. A cell that is empty or fails to parse
/// as a number is `None`.
struct Table {
    columns: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
    row_count: usize,
}

impl Table {
    fn parse(csv: &str) -> Self {
        let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
        let columns: Vec<String> = lines
            .next()
            .map(|header| header.split(',').map(str::to_string).collect())
            .unwrap_or_default();

        let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); columns.len()];
        let mut row_count = 0;
        for line in lines {
            let mut fields = line.split(',');
            for column in &mut cells {
                // A short row leaves its tail cells missing.
                column.push(fields.next().and_then(|f| {
                    let f = f.trim();
                    if f.is_empty() { None } else { f.parse().ok() }
                }));
            }
            row_count += 1;
        }

        Self {
            columns,
            cells,
            row_count,
        }
    }

    /// Index of a column by name.
    fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.cells[i].as_slice())
    }
}

/// CSV line number of a 0-based data row: +1 for 1-based counting, +1 for
/// the header line.
fn to_line(row: usize) -> usize {
    row + 2
}

fn report(label: &str, rows: &[usize], columns: &[&str]) -> DataError {
    let lines: Vec<String> = rows.iter().map(|r| to_line(*r).to_string()).collect();
    DataError(format!(
        "{label} data found at lines {}, columns {}",
        lines.join(", "),
        columns.join(", ")
    ))
}

fn check_missing(table: &Table) -> Result<()> {
    let mut rows = Vec::new();
    let mut columns = Vec::new();
    for (name, cells) in table.columns.iter().zip(&table.cells) {
        let missing: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            columns.push(name.as_str());
            for row in missing {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
    }

    if columns.is_empty() {
        return Ok(());
    }
    rows.sort_unstable();
    Err(report("missing", &rows, &columns))
}

fn check_outliers(table: &Table, exclude: &[String], threshold: f64) -> Result<()> {
    let mut rows = Vec::new();
    let mut columns = Vec::new();
    for (name, cells) in table.columns.iter().zip(&table.cells) {
        if name == "timestamp" || exclude.iter().any(|e| e == name) {
            continue;
        }

        let outliers = outlier_rows(cells, threshold);
        if !outliers.is_empty() {
            columns.push(name.as_str());
            for row in outliers {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
    }

    if columns.is_empty() {
        return Ok(());
    }
    rows.sort_unstable();
    Err(report("outlier", &rows, &columns))
}

/// Rows whose z-score against the column's population statistics exceeds the
/// threshold. A constant column has no spread and therefore no outliers.
fn outlier_rows(cells: &[Option<f64>], threshold: f64) -> Vec<usize> {
    let values: Vec<f64> = cells.iter().flatten().copied().collect();
    if values.is_empty() {
        return Vec::new();
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return Vec::new();
    }

    cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.is_some_and(|v| ((v - mean) / std_dev).abs() > threshold))
        .map(|(i, _)| i)
        .collect()
}

fn check_index_interval(table: &Table, interval: i64) -> Result<()> {
    let Some(timestamps) = table.column("timestamp") else {
        return Ok(());
    };

    let values: Vec<i64> = timestamps.iter().flatten().map(|t| *t as i64).collect();
    let gaps: Vec<String> = values
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1] - pair[0] != interval)
        .map(|(i, _)| to_line(i).to_string())
        .collect();

    if gaps.is_empty() {
        return Ok(());
    }
    Err(DataError(format!(
        "gap in the time series found at lines {}",
        gaps.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datums_types::Interval;

    fn datums(csv: &str) -> CsvDatums {
        CsvDatums::new(Interval::from_minutes(1), csv.to_string())
    }

    fn rows(lines: &[&str]) -> String {
        let mut csv = String::from("timestamp,open,high,low,close,vwap,volume,count");
        for line in lines {
            csv.push('\n');
            csv.push_str(line);
        }
        csv
    }

    #[test]
    fn test_empty_datums_fail() {
        let err = validate(&datums("timestamp,open"), None, 10.0).unwrap_err();
        assert_eq!(err.0, "no data has been found");
    }

    #[test]
    fn test_contiguous_data_passes() {
        let csv = rows(&[
            "0,10,11,9,10.5,10.4,1.0,3",
            "60,10.5,11,10,10.7,10.6,2.0,4",
            "120,10.7,12,10.5,11.0,10.9,1.5,2",
        ]);
        assert_eq!(validate(&datums(&csv), None, 10.0), Ok(()));
    }

    #[test]
    fn test_missing_cell_is_reported_with_line_and_column() {
        let csv = rows(&[
            "0,10,11,9,10.5,10.4,1.0,3",
            "60,,11,10,10.7,10.6,2.0,4",
        ]);

        let err = validate(&datums(&csv), None, 10.0).unwrap_err();

        assert_eq!(err.0, "missing data found at lines 3, columns open");
    }

    #[test]
    fn test_outlier_is_reported() {
        let csv = rows(&[
            "0,10,10,10,10,10,1.0,1",
            "60,10,10,10,10,10,1.0,1",
            "120,10,10,10,10,10,1.0,1",
            "180,10,10,10,10,10,1.0,1",
            "240,10,10,10,10,10,1.0,1",
            "300,10,10,10,10,10,9000.0,1",
        ]);

        let err = validate(&datums(&csv), None, 2.0).unwrap_err();

        assert_eq!(err.0, "outlier data found at lines 7, columns volume");
    }

    #[test]
    fn test_excluded_columns_are_exempt_from_outlier_check() {
        let csv = rows(&[
            "0,10,10,10,10,10,1.0,1",
            "60,10,10,10,10,10,1.0,1",
            "120,10,10,10,10,10,1.0,1",
            "180,10,10,10,10,10,1.0,1",
            "240,10,10,10,10,10,1.0,1",
            "300,10,10,10,10,10,9000.0,1",
        ]);
        let exclude = vec!["volume".to_string()];

        assert_eq!(validate(&datums(&csv), Some(&exclude), 2.0), Ok(()));
    }

    #[test]
    fn test_gap_is_reported() {
        let csv = rows(&[
            "0,10,10,10,10,10,1.0,1",
            "60,10,10,10,10,10,1.0,1",
            "240,10,10,10,10,10,1.0,1",
        ]);

        let err = validate(&datums(&csv), None, 10.0).unwrap_err();

        assert_eq!(err.0, "gap in the time series found at lines 3");
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let csv = rows(&[
            "0,10,10,10,10,10,1.0,1",
            "60,10,10,10,10,10,1.0,1",
        ]);
        assert_eq!(validate(&datums(&csv), None, 0.1), Ok(()));
    }
}
