//! Capped-growth forecasting of a univariate time series
//!
//! The crate loads a two-column (timestamp, value) series from a spreadsheet or
//! CSV file, holds out its most recent rows, fits a logistic-growth model with
//! a fixed carrying capacity to the rest, and plots the forecast against the
//! held-out data.
//!
//! ```no_run
//! use energy_forecast::{pipeline, PipelineConfig};
//!
//! # fn main() -> energy_forecast::Result<()> {
//! let output = pipeline::run(&PipelineConfig::default())?;
//! output.figure.save("forecast.png")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod ml;
pub mod pipeline;
pub mod temporal;
pub mod time_series;
pub mod vis;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use ml::{temporal_train_test_split, TrainTestSplit};
pub use pipeline::PipelineOutput;
pub use temporal::{Frequency, TimeSeries, TimeSeriesRow};
pub use time_series::{
    ForecastPoint, ForecastResult, Forecaster, FittedModel, GrowthConfig, GrowthForecaster,
    GrowthModel, Timeline,
};
pub use vis::{forecast_figure, Figure};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
