//! Loading a two-column (timestamp, value) series from spreadsheets and CSV files

pub mod csv;
pub mod excel;

use std::path::Path;

use chrono::NaiveDateTime;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::temporal::{parse_timestamp, TimeSeries, TimeSeriesRow};

pub use self::csv::read_csv_series;
pub use self::excel::{list_sheet_names, read_excel_series};

/// Number of metadata rows above the data block in the energy workbook
pub const DEFAULT_SKIP_ROWS: usize = 11;

/// Layout of the sheet being read
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    /// Sheet to read; the first sheet when `None`
    pub sheet: Option<String>,
    /// Leading rows to discard before the column header
    pub skip_rows: usize,
    /// Whether the first row after `skip_rows` is a column header to discard
    pub header: bool,
    /// Name given to the loaded series
    pub name: Option<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            sheet: None,
            skip_rows: DEFAULT_SKIP_ROWS,
            header: true,
            name: None,
        }
    }
}

impl LoaderOptions {
    /// Index of the first data row, counted from the top of the sheet
    pub fn first_data_row(&self) -> usize {
        self.skip_rows + usize::from(self.header)
    }
}

/// A single cell as seen by the loader, independent of file format
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawCell<'a> {
    Empty,
    Text(&'a str),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl RawCell<'_> {
    fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// Read a series, choosing the reader from the file extension
///
/// Fails with [`Error::EmptyData`] when no data rows remain after the skipped rows.
pub fn read_series<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> Result<TimeSeries> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let series = match extension.as_str() {
        "csv" | "txt" => read_csv_series(path, options)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_excel_series(path, options)?,
        other => {
            return Err(Error::InvalidInput(format!(
                "Unsupported input format '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    if series.is_empty() {
        return Err(Error::EmptyData(format!(
            "{} contains no rows after skipping {} leading rows",
            path.display(),
            options.first_data_row()
        )));
    }
    if !series.is_sorted() {
        warn!(
            "Timestamps in {} are not strictly increasing; keeping source order",
            path.display()
        );
    }
    info!("Loaded {} rows from {}", series.len(), path.display());
    Ok(series)
}

/// Convert raw (timestamp, value) cells into a series
///
/// `sheet_row` is the 0-based row in the source sheet, used in error messages.
/// Rows where both cells are blank are skipped.
pub(crate) fn build_series<'a, I>(rows: I, name: Option<String>) -> Result<TimeSeries>
where
    I: IntoIterator<Item = (usize, RawCell<'a>, RawCell<'a>)>,
{
    let mut out = Vec::new();
    for (sheet_row, ts_cell, value_cell) in rows {
        if ts_cell.is_empty() && value_cell.is_empty() {
            continue;
        }
        let row = sheet_row + 1;
        let timestamp = cell_timestamp(ts_cell).map_err(|e| Error::MalformedRow {
            row,
            message: e.to_string(),
        })?;
        let value = cell_value(value_cell).map_err(|e| Error::MalformedRow {
            row,
            message: e.to_string(),
        })?;
        out.push(TimeSeriesRow::new(timestamp, value));
    }
    Ok(TimeSeries::new(out, name))
}

fn cell_timestamp(cell: RawCell<'_>) -> Result<NaiveDateTime> {
    match cell {
        RawCell::DateTime(dt) => Ok(dt),
        RawCell::Text(s) => parse_timestamp(s),
        RawCell::Number(serial) => excel_serial_to_datetime(serial),
        RawCell::Empty => Err(Error::InvalidValue("missing timestamp".to_string())),
    }
}

fn cell_value(cell: RawCell<'_>) -> Result<f64> {
    let value = match cell {
        RawCell::Number(v) => v,
        RawCell::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidValue(format!("'{}' is not a number", s.trim())))?,
        RawCell::DateTime(dt) => {
            return Err(Error::InvalidValue(format!(
                "expected a number, found the date {}",
                dt
            )))
        }
        RawCell::Empty => return Err(Error::InvalidValue("missing value".to_string())),
    };
    if !value.is_finite() {
        return Err(Error::InvalidValue(format!("{} is not finite", value)));
    }
    Ok(value)
}

/// Convert an Excel serial day number (1900 date system) to a timestamp
pub fn excel_serial_to_datetime(serial: f64) -> Result<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(Error::InvalidValue(format!(
            "{} is not a valid spreadsheet date",
            serial
        )));
    }
    // Day 0 is 1899-12-30 once the 1900 leap-year bug is accounted for
    let epoch = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .ok_or_else(|| Error::InvalidValue("invalid spreadsheet epoch".to_string()))?;
    let millis = (serial * 86_400_000.0).round() as i64;
    chrono::Duration::try_milliseconds(millis)
        .and_then(|d| epoch.checked_add_signed(d))
        .ok_or_else(|| Error::InvalidValue(format!("{} is out of the date range", serial)))
}
