//! Fixtures for integration tests
//!
//! Temporary files are removed on drop. Series generators produce the shape of
//! the real input: a two-column workbook export with a metadata preamble
//! above the header row.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use energy_forecast::TimeSeries;
use tempfile::NamedTempFile;

/// Rows above the header in generated input files
pub const PREAMBLE_ROWS: usize = 11;

/// Temporary file with a given extension, deleted on drop
pub struct TempTestFile {
    file: NamedTempFile,
}

impl TempTestFile {
    pub fn new(test_name: &str, extension: &str) -> Self {
        let file = tempfile::Builder::new()
            .prefix(&format!("energy_forecast_{}_", test_name))
            .suffix(&format!(".{}", extension))
            .tempfile()
            .unwrap();
        TempTestFile { file }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2019, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Smooth saturating values below `cap`, with a weekly wiggle
pub fn synthetic_values(n: usize, cap: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let trend = 0.8 * cap / (1.0 + (-(x - n as f64 / 2.0) / (n as f64 / 8.0)).exp());
            trend + 0.05 * (2.0 * std::f64::consts::PI * x / 7.0).sin() + 0.1
        })
        .collect()
}

/// `n` consecutive days of synthetic values
pub fn daily_series(n: usize) -> TimeSeries {
    let timestamps = (0..n).map(|i| start() + Duration::days(i as i64)).collect();
    TimeSeries::from_vecs(timestamps, synthetic_values(n, 4.0), Some("y".to_string())).unwrap()
}

/// Write `series` as CSV with a metadata preamble and a header row
pub fn create_test_csv(test_name: &str, series: &TimeSeries) -> TempTestFile {
    let file = TempTestFile::new(test_name, "csv");
    let mut out = fs::File::create(file.path()).unwrap();
    for i in 0..PREAMBLE_ROWS {
        writeln!(out, "metadata line {},", i + 1).unwrap();
    }
    writeln!(out, "Date,Value").unwrap();
    for row in series.rows() {
        writeln!(out, "{},{}", row.timestamp.format("%Y-%m-%d %H:%M:%S"), row.value).unwrap();
    }
    file
}
