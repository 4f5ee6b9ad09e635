//! Chronological train/test partitioning

use log::debug;

use crate::error::{Error, Result};
use crate::temporal::TimeSeries;

/// Shortest series that can be split into non-empty train and test parts
pub const MIN_SPLIT_ROWS: usize = 3;

/// Leading training rows and trailing test rows of one series
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: TimeSeries,
    pub test: TimeSeries,
}

/// Number of rows held out for `test_size` of `n_rows`, rounded up
pub fn test_rows_for(n_rows: usize, test_size: f64) -> usize {
    // Round away float noise first so 0.33 * 100 stays 33
    let exact = (n_rows as f64 * test_size * 1e9).round() / 1e9;
    exact.ceil() as usize
}

/// Split a series into training and test parts without shuffling
///
/// The test part is the trailing `ceil(test_size * N)` rows and the training
/// part is everything before it, so concatenating the two gives back the
/// input. Row position is the only criterion; rows are never reordered, which
/// keeps later observations out of the training data.
///
/// # Errors
///
/// * `InvalidInput` when `test_size` is not strictly between 0 and 1
/// * `InsufficientData` when the series has fewer than [`MIN_SPLIT_ROWS`] rows
///   or either side would end up empty
pub fn temporal_train_test_split(series: &TimeSeries, test_size: f64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidInput(format!(
            "test_size must be between 0 and 1, got {}",
            test_size
        )));
    }
    let n_rows = series.len();
    if n_rows < MIN_SPLIT_ROWS {
        return Err(Error::InsufficientData(format!(
            "a series needs at least {} rows to be split, got {}",
            MIN_SPLIT_ROWS, n_rows
        )));
    }

    let n_test = test_rows_for(n_rows, test_size);
    if n_test >= n_rows {
        return Err(Error::InsufficientData(format!(
            "test_size {} leaves no training rows out of {}",
            test_size, n_rows
        )));
    }
    let split_at = n_rows - n_test;
    debug!("Splitting {} rows at position {}", n_rows, split_at);

    Ok(TrainTestSplit {
        train: series.slice(0..split_at)?,
        test: series.slice(split_at..n_rows)?,
    })
}
