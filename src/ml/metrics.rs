//! Forecast accuracy on held-out observations

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::temporal::TimeSeries;
use crate::time_series::ForecastPoint;

fn check_lengths(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::LengthMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(Error::EmptyData(
            "cannot compute an error metric without observations".to_string(),
        ));
    }
    Ok(())
}

/// Mean squared error
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sum_squared_error = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&true_val, &pred_val)| {
            let error = true_val - pred_val;
            error * error
        })
        .sum::<f64>();
    Ok(sum_squared_error / y_true.len() as f64)
}

/// Mean absolute error
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let sum_absolute_error = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&true_val, &pred_val)| (true_val - pred_val).abs())
        .sum::<f64>();
    Ok(sum_absolute_error / y_true.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(y_true, y_pred)?.sqrt())
}

/// Mean absolute percentage error, in percent
///
/// Observations equal to zero are left out; `None` when every one is zero.
pub fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Result<Option<f64>> {
    check_lengths(y_true, y_pred)?;
    let ratios: Vec<f64> = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, _)| **t != 0.0)
        .map(|(t, p)| ((t - p) / t).abs())
        .collect();
    if ratios.is_empty() {
        return Ok(None);
    }
    Ok(Some(100.0 * ratios.iter().sum::<f64>() / ratios.len() as f64))
}

/// Share of observations inside `[lower, upper]`
pub fn interval_coverage(y_true: &[f64], lower: &[f64], upper: &[f64]) -> Result<f64> {
    check_lengths(y_true, lower)?;
    check_lengths(y_true, upper)?;
    let inside = y_true
        .iter()
        .zip(lower.iter().zip(upper.iter()))
        .filter(|(y, (lo, hi))| *y >= *lo && *y <= *hi)
        .count();
    Ok(inside as f64 / y_true.len() as f64)
}

/// Accuracy of a forecast against held-out rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastMetrics {
    /// Test rows that had a prediction at the same timestamp
    pub matched: usize,
    pub mae: f64,
    pub rmse: f64,
    pub mape: Option<f64>,
    pub coverage: f64,
}

/// Compare predictions with the test rows they share a timestamp with
///
/// Test rows outside the forecast timeline are ignored.
pub fn evaluate_forecast(predictions: &[ForecastPoint], test: &TimeSeries) -> Result<ForecastMetrics> {
    let by_time: HashMap<NaiveDateTime, &ForecastPoint> =
        predictions.iter().map(|p| (p.timestamp, p)).collect();

    let mut y_true = Vec::new();
    let mut y_pred = Vec::new();
    let mut lower = Vec::new();
    let mut upper = Vec::new();
    for row in test.rows() {
        if let Some(point) = by_time.get(&row.timestamp) {
            y_true.push(row.value);
            y_pred.push(point.yhat);
            lower.push(point.yhat_lower);
            upper.push(point.yhat_upper);
        }
    }
    if y_true.is_empty() {
        return Err(Error::EmptyData(
            "no test rows fall on forecast timestamps".to_string(),
        ));
    }

    Ok(ForecastMetrics {
        matched: y_true.len(),
        mae: mean_absolute_error(&y_true, &y_pred)?,
        rmse: root_mean_squared_error(&y_true, &y_pred)?,
        mape: mean_absolute_percentage_error(&y_true, &y_pred)?,
        coverage: interval_coverage(&y_true, &lower, &upper)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_errors() {
        let y_true = [1.0, 2.0, 3.0];
        let y_pred = [1.0, 3.0, 1.0];
        assert!((mean_absolute_error(&y_true, &y_pred).unwrap() - 1.0).abs() < 1e-12);
        assert!((mean_squared_error(&y_true, &y_pred).unwrap() - 5.0 / 3.0).abs() < 1e-12);
        let mape = mean_absolute_percentage_error(&y_true, &y_pred).unwrap().unwrap();
        assert!((mape - 100.0 * (0.5 + 2.0 / 3.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert!(matches!(
            mean_absolute_error(&[1.0], &[1.0, 2.0]),
            Err(Error::LengthMismatch { .. })
        ));
        assert_eq!(mean_absolute_percentage_error(&[0.0], &[1.0]).unwrap(), None);
    }
}
