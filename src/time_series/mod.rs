//! Time series forecasting
//!
//! The pipeline only talks to a forecaster through the [`Forecaster`] trait:
//! fit a model to a training series, extend the timeline past the end of the
//! training data, and predict over that timeline. [`GrowthForecaster`] is the
//! capped-growth implementation (piecewise logistic or linear trend with
//! changepoints, Fourier seasonality and simulated uncertainty intervals).

pub mod growth;
pub mod optimize;
pub mod seasonality;
pub mod trend;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::temporal::TimeSeries;

pub use growth::{GrowthConfig, GrowthForecaster, GrowthModel};
pub use seasonality::{Seasonality, SeasonalityMode, SeasonalitySetting};
pub use trend::{Growth, TrendParams};

/// One timestamp to forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub timestamp: NaiveDateTime,
    /// Carrying capacity at this timestamp
    pub cap: Option<f64>,
}

/// Timestamps a model is asked to predict, history first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    rows: Vec<TimelineRow>,
}

impl Timeline {
    pub fn new(rows: Vec<TimelineRow>) -> Self {
        Timeline { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[TimelineRow] {
        &self.rows
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    pub fn caps(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.cap).collect()
    }
}

/// Prediction for one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: NaiveDateTime,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
    pub cap: Option<f64>,
}

/// A fitted model together with its predictions
#[derive(Debug, Clone)]
pub struct ForecastResult<M> {
    pub model: M,
    pub predictions: Vec<ForecastPoint>,
}

impl<M> ForecastResult<M> {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.predictions.iter().map(|p| p.timestamp).collect()
    }

    pub fn yhat(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.yhat).collect()
    }

    pub fn lower(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.yhat_lower).collect()
    }

    pub fn upper(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.yhat_upper).collect()
    }

    /// First and last predicted timestamps
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.predictions.first(), self.predictions.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }

    /// Predictions as a JSON array
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.predictions)?)
    }
}

/// Read access a plot needs from a fitted model
pub trait FittedModel {
    /// Training series the model was fitted on
    fn history(&self) -> &TimeSeries;

    /// Number of simulated paths behind the uncertainty bounds; 0 means none
    fn uncertainty_samples(&self) -> usize;
}

/// Fit / extend / predict capability of a forecasting model
pub trait Forecaster {
    type Model: FittedModel;

    /// Fit a model to a training series
    fn fit(&self, series: &TimeSeries) -> Result<Self::Model>;

    /// Training timestamps followed by `horizon` future periods
    fn extend(&self, model: &Self::Model, horizon: usize) -> Result<Timeline>;

    /// Point forecasts and bounds for every timeline row
    fn predict(&self, model: &Self::Model, timeline: &Timeline) -> Result<Vec<ForecastPoint>>;

    /// Fit, extend by `horizon` and predict in one call
    fn forecast(&self, series: &TimeSeries, horizon: usize) -> Result<ForecastResult<Self::Model>> {
        let model = self.fit(series)?;
        let timeline = self.extend(&model, horizon)?;
        let predictions = self.predict(&model, &timeline)?;
        Ok(ForecastResult { model, predictions })
    }
}
