//! Gzip CSV window files with append/merge semantics.

use datums_types::{CsvDatums, Interval};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The datums to store carry no rows.
    #[error("invalid datum: {0}")]
    InvalidDatum(String),

    /// No window file exists for the requested interval.
    #[error("no stored datums for interval {0}")]
    NoData(Interval),

    /// A window file's contents do not match its expected CSV shape.
    #[error("malformed storage file {path}: {reason}")]
    Malformed {
        /// The offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// I/O error while reading or writing window files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// One parsed window file: the CSV header plus rows keyed by timestamp.
#[derive(Debug, Clone)]
struct Window {
    header: String,
    rows: Vec<(i64, String)>,
}

impl Window {
    fn first(&self) -> i64 {
        self.rows.first().map_or(0, |(ts, _)| *ts)
    }

    fn last(&self) -> i64 {
        self.rows.last().map_or(0, |(ts, _)| *ts)
    }

    fn to_csv(&self) -> String {
        let mut csv = self.header.clone();
        for (_, line) in &self.rows {
            csv.push('\n');
            csv.push_str(line);
        }
        csv
    }
}

/// Append/merge store of aggregated bars, one directory per pair.
#[derive(Debug, Clone)]
pub struct Storage {
    directory: PathBuf,
}

impl Storage {
    /// Creates a storage handle over the given pair directory.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns true if at least one window file exists for the interval.
    #[must_use]
    pub fn exists(&self, interval: Interval) -> bool {
        self.window_paths(interval)
            .is_ok_and(|paths| !paths.is_empty())
    }

    /// Stores datums, merging them into a connecting window when possible.
    ///
    /// New rows connect to an existing window when they start at or before
    /// its end (or exactly one interval after it) and strictly after its
    /// first row. Rows sharing a timestamp are deduplicated with the new row
    /// winning. The superseded window file is removed after the merged one
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidDatum`] when the CSV has no rows.
    pub fn store(&self, datums: &CsvDatums) -> Result<()> {
        if datums.csv.is_empty() {
            return Err(StorageError::InvalidDatum(
                "the datum values are empty".to_string(),
            ));
        }
        let new = parse_csv(&datums.csv);
        if new.rows.is_empty() {
            return Err(StorageError::InvalidDatum(format!(
                "the datum string has no values:\n{}",
                datums.csv
            )));
        }

        fs::create_dir_all(&self.directory)?;
        let (merged, superseded) = self.merge_with_existing(new, datums.interval)?;

        let file = self.directory.join(format!(
            "{}__{}_{}.gz",
            datums.interval,
            merged.first(),
            merged.last()
        ));
        write_gz(&file, &merged.to_csv())?;

        match superseded {
            None => tracing::info!(file = %file.display(), "creating new csv storage"),
            Some(previous) if previous != file => fs::remove_file(previous)?,
            Some(_) => {}
        }
        Ok(())
    }

    /// Returns the last stored timestamp for the interval.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoData`] when nothing is stored yet.
    pub fn last_time_of(&self, interval: Interval) -> Result<i64> {
        let (window, _) = self.newest_window(interval, None)?;
        Ok(window.last())
    }

    /// Returns the stored datums for the interval, optionally restricted to
    /// `since <= timestamp <= until`.
    ///
    /// The newest window starting at or before `until` is selected, then
    /// filtered row-wise.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoData`] when nothing is stored yet.
    pub fn get(
        &self,
        interval: Interval,
        since: Option<i64>,
        until: Option<i64>,
    ) -> Result<CsvDatums> {
        let (mut window, _) = self.newest_window(interval, until)?;
        window.rows.retain(|(ts, _)| {
            since.is_none_or(|s| *ts >= s) && until.is_none_or(|u| *ts <= u)
        });
        Ok(CsvDatums::new(interval, window.to_csv()))
    }

    /// Merges new rows into the first connecting window, if any.
    ///
    /// Returns the window to write plus the path of the file it supersedes.
    fn merge_with_existing(
        &self,
        new: Window,
        interval: Interval,
    ) -> Result<(Window, Option<PathBuf>)> {
        for path in self.window_paths(interval)? {
            let previous = read_window(&path)?;
            if !can_concatenate(&new, &previous, interval) {
                continue;
            }

            let mut rows: Vec<(i64, String)> = previous
                .rows
                .into_iter()
                .filter(|(ts, _)| !new.rows.iter().any(|(nts, _)| nts == ts))
                .collect();
            rows.extend(new.rows);
            return Ok((
                Window {
                    header: new.header,
                    rows,
                },
                Some(path),
            ));
        }
        Ok((new, None))
    }

    /// The newest window whose first row is at or before `until`.
    fn newest_window(
        &self,
        interval: Interval,
        until: Option<i64>,
    ) -> Result<(Window, PathBuf)> {
        let mut newest: Option<(Window, PathBuf)> = None;
        for path in self.window_paths(interval)? {
            let window = read_window(&path)?;
            if until.is_some_and(|u| window.first() > u) {
                continue;
            }
            if newest
                .as_ref()
                .is_none_or(|(best, _)| window.last() > best.last())
            {
                newest = Some((window, path));
            }
        }
        newest.ok_or(StorageError::NoData(interval))
    }

    /// All window files for the interval, matched by filename prefix.
    fn window_paths(&self, interval: Interval) -> Result<Vec<PathBuf>> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }

        let prefix = format!("{interval}__");
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with(&prefix) && name.ends_with(".gz") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Two windows connect when the new one begins inside or exactly one
/// interval after the previous one, and strictly after its start.
fn can_concatenate(new: &Window, previous: &Window, interval: Interval) -> bool {
    let first = new.first();
    let last = previous.last();
    let frequency_connects = first <= last || first - last == interval.seconds();
    frequency_connects && first > previous.first()
}

fn parse_csv(csv: &str) -> Window {
    let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().unwrap_or_default().to_string();
    let rows = lines
        .map(|line| {
            let ts = line
                .split(',')
                .next()
                .and_then(|f| f.trim().parse().ok())
                .unwrap_or(0);
            (ts, line.to_string())
        })
        .collect();
    Window { header, rows }
}

fn read_window(path: &Path) -> Result<Window> {
    let mut csv = String::new();
    GzDecoder::new(File::open(path)?)
        .read_to_string(&mut csv)
        .map_err(|e| StorageError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(parse_csv(&csv))
}

fn write_gz(path: &Path, csv: &str) -> Result<()> {
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(csv.as_bytes())?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "timestamp,open,high,low,close,vwap,volume,count";

    fn datums(interval: u32, rows: &[&str]) -> CsvDatums {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        CsvDatums::new(Interval::from_minutes(interval), csv)
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let stored = datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]);

        storage.store(&stored).unwrap();

        let got = storage.get(Interval::from_minutes(1), None, None).unwrap();
        assert_eq!(got, stored);
    }

    #[test]
    fn test_empty_datums_are_rejected() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        let header_only = CsvDatums::new(Interval::from_minutes(1), HEADER.to_string());
        assert!(matches!(
            storage.store(&header_only),
            Err(StorageError::InvalidDatum(_))
        ));

        let empty = CsvDatums::new(Interval::from_minutes(1), String::new());
        assert!(matches!(
            storage.store(&empty),
            Err(StorageError::InvalidDatum(_))
        ));
    }

    #[test]
    fn test_exists_and_last_time_of() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let interval = Interval::from_minutes(1);
        assert!(!storage.exists(interval));

        storage
            .store(&datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]))
            .unwrap();

        assert!(storage.exists(interval));
        assert!(!storage.exists(Interval::from_minutes(5)));
        assert_eq!(storage.last_time_of(interval).unwrap(), 60);
    }

    #[test]
    fn test_connecting_windows_are_merged_into_one_file() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let interval = Interval::from_minutes(1);

        storage
            .store(&datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]))
            .unwrap();
        // Starts exactly one interval after the previous window's end.
        storage
            .store(&datums(1, &["120,3,3,3,3,3,3,1", "180,4,4,4,4,4,4,1"]))
            .unwrap();

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
        assert_eq!(storage.last_time_of(interval).unwrap(), 180);
        let got = storage.get(interval, None, None).unwrap();
        assert_eq!(got.csv.lines().count(), 5);
    }

    #[test]
    fn test_overlapping_rows_are_deduplicated_keeping_the_new_row() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let interval = Interval::from_minutes(1);

        storage
            .store(&datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]))
            .unwrap();
        storage
            .store(&datums(1, &["60,9,9,9,9,9,9,1", "120,3,3,3,3,3,3,1"]))
            .unwrap();

        let got = storage.get(interval, None, None).unwrap();
        let lines: Vec<&str> = got.csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                HEADER,
                "0,1,1,1,1,1,1,1",
                "60,9,9,9,9,9,9,1",
                "120,3,3,3,3,3,3,1",
            ]
        );
    }

    #[test]
    fn test_disconnected_windows_stay_separate() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        storage
            .store(&datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]))
            .unwrap();
        // A gap of two intervals does not connect.
        storage
            .store(&datums(1, &["240,3,3,3,3,3,3,1"]))
            .unwrap();

        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_get_with_range_filter() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let interval = Interval::from_minutes(1);
        storage
            .store(&datums(
                1,
                &[
                    "0,1,1,1,1,1,1,1",
                    "60,2,2,2,2,2,2,1",
                    "120,3,3,3,3,3,3,1",
                    "180,4,4,4,4,4,4,1",
                ],
            ))
            .unwrap();

        let got = storage.get(interval, Some(60), Some(120)).unwrap();

        let lines: Vec<&str> = got.csv.lines().collect();
        assert_eq!(lines, vec![HEADER, "60,2,2,2,2,2,2,1", "120,3,3,3,3,3,3,1"]);
    }

    #[test]
    fn test_get_without_data_is_an_error() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        assert!(matches!(
            storage.get(Interval::from_minutes(1), None, None),
            Err(StorageError::NoData(_))
        ));
    }

    #[test]
    fn test_intervals_are_kept_apart() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        storage
            .store(&datums(1, &["0,1,1,1,1,1,1,1", "60,2,2,2,2,2,2,1"]))
            .unwrap();
        storage
            .store(&datums(5, &["0,1,1,1,1,1,1,1", "300,2,2,2,2,2,2,1"]))
            .unwrap();

        assert_eq!(storage.last_time_of(Interval::from_minutes(1)).unwrap(), 60);
        assert_eq!(
            storage.last_time_of(Interval::from_minutes(5)).unwrap(),
            300
        );
    }
}
