//! Forecast evaluation
//!
//! Chronological train/test splitting and accuracy metrics for forecasts.

pub mod metrics;
pub mod model_selection;

pub use metrics::{evaluate_forecast, ForecastMetrics};
pub use model_selection::{temporal_train_test_split, TrainTestSplit};
