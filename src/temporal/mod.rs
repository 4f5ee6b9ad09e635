//! Time-indexed series used throughout the pipeline

mod frequency;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};

pub use self::frequency::Frequency;

/// Formats accepted by [`parse_timestamp`], tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

/// Parse a timestamp written as a date or a date-time
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .map_err(|e| Error::InvalidValue(format!("Unrecognized timestamp '{}': {}", s, e)))
}

/// One observation of the series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRow {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// Upper asymptote for logistic growth
    pub cap: Option<f64>,
}

impl TimeSeriesRow {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        TimeSeriesRow {
            timestamp,
            value,
            cap: None,
        }
    }
}

/// Ordered sequence of observations
///
/// Rows keep their source order; chronological order is assumed, not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    rows: Vec<TimeSeriesRow>,
    name: Option<String>,
}

impl TimeSeries {
    pub fn new(rows: Vec<TimeSeriesRow>, name: Option<String>) -> Self {
        TimeSeries { rows, name }
    }

    /// Build a series from parallel timestamp and value vectors
    pub fn from_vecs(
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
        name: Option<String>,
    ) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(Error::LengthMismatch {
                expected: timestamps.len(),
                actual: values.len(),
            });
        }
        let rows = timestamps
            .into_iter()
            .zip(values)
            .map(|(timestamp, value)| TimeSeriesRow::new(timestamp, value))
            .collect();
        Ok(TimeSeries { rows, name })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn first(&self) -> Option<&TimeSeriesRow> {
        self.rows.first()
    }

    pub fn last(&self) -> Option<&TimeSeriesRow> {
        self.rows.last()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.value).collect()
    }

    pub fn caps(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.cap).collect()
    }

    /// Attach the same cap to every row
    pub fn with_cap(mut self, cap: f64) -> Self {
        for row in &mut self.rows {
            row.cap = Some(cap);
        }
        self
    }

    /// Rows in `range`, by position
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.rows.len() {
            return Err(Error::InvalidInput(format!(
                "Row range {}..{} is outside a series of length {}",
                range.start,
                range.end,
                self.rows.len()
            )));
        }
        Ok(TimeSeries {
            rows: self.rows[range].to_vec(),
            name: self.name.clone(),
        })
    }

    /// This series followed by `other`
    pub fn concat(&self, other: &TimeSeries) -> Self {
        let mut rows = self.rows.clone();
        rows.extend_from_slice(&other.rows);
        TimeSeries {
            rows,
            name: self.name.clone(),
        }
    }

    /// Whether timestamps are strictly increasing
    pub fn is_sorted(&self) -> bool {
        self.rows
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Rows whose timestamp lies in `[start, end]`
    pub fn filter_by_time(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .copied()
            .collect();
        TimeSeries {
            rows,
            name: self.name.clone(),
        }
    }
}

impl FromIterator<TimeSeriesRow> for TimeSeries {
    fn from_iter<I: IntoIterator<Item = TimeSeriesRow>>(iter: I) -> Self {
        TimeSeries::new(iter.into_iter().collect(), None)
    }
}
