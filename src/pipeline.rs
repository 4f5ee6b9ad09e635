//! End-to-end forecasting run
//!
//! Load the series, attach the carrying capacity, split it chronologically,
//! forecast from the training part, score the forecast on the test part and
//! build the diagnostic figure. Each stage depends on the previous one, so
//! the run stops at the first failure.

use log::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::io::read_series;
use crate::ml::metrics::{evaluate_forecast, ForecastMetrics};
use crate::ml::model_selection::{temporal_train_test_split, TrainTestSplit};
use crate::temporal::{Frequency, TimeSeries};
use crate::time_series::{ForecastResult, Forecaster, GrowthForecaster, GrowthModel};
use crate::vis::{forecast_figure, Figure};

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput<M> {
    pub split: TrainTestSplit,
    pub forecast: ForecastResult<M>,
    /// `None` when no test row falls on a forecast timestamp
    pub metrics: Option<ForecastMetrics>,
    pub figure: Figure,
}

/// Run with the capped-growth forecaster described by `config`
pub fn run(config: &PipelineConfig) -> Result<PipelineOutput<GrowthModel>> {
    config.validate()?;
    let series = read_series(&config.input, &config.loader_options())?;

    let frequency = resolve_frequency(config, &series)?;
    let forecaster = GrowthForecaster::new(config.growth_config(frequency)?);
    run_with(config, &forecaster, series)
}

/// Run the stages after loading with any [`Forecaster`]
pub fn run_with<F: Forecaster>(
    config: &PipelineConfig,
    forecaster: &F,
    series: TimeSeries,
) -> Result<PipelineOutput<F::Model>> {
    if series.is_empty() {
        return Err(Error::EmptyData("input series has no rows".to_string()));
    }
    let series = series.with_cap(config.cap);

    let split = temporal_train_test_split(&series, config.test_size)?;
    info!(
        "Split into {} training and {} test rows",
        split.train.len(),
        split.test.len()
    );

    let forecast = forecaster.forecast(&split.train, config.horizon)?;
    if let Some((start, end)) = forecast.time_range() {
        info!(
            "Forecast {} timestamps from {} to {}",
            forecast.len(),
            start,
            end
        );
    }

    let metrics = match evaluate_forecast(&forecast.predictions, &split.test) {
        Ok(metrics) => {
            info!(
                "Test MAE {:.4}, RMSE {:.4}, interval coverage {:.1}% over {} rows",
                metrics.mae,
                metrics.rmse,
                metrics.coverage * 100.0,
                metrics.matched
            );
            Some(metrics)
        }
        Err(Error::EmptyData(msg)) => {
            warn!("Skipping evaluation: {}", msg);
            None
        }
        Err(e) => return Err(e),
    };

    let figure = forecast_figure(
        &forecast.model,
        &forecast.predictions,
        &split.test,
        &config.x_label,
        &config.y_label,
    );
    if let Some(path) = &config.output {
        figure.save(path)?;
    }

    Ok(PipelineOutput {
        split,
        forecast,
        metrics,
        figure,
    })
}

/// Configured forecast spacing, or the median spacing of the data for "auto"
fn resolve_frequency(config: &PipelineConfig, series: &TimeSeries) -> Result<Frequency> {
    match config.frequency_mode()? {
        Some(frequency) => Ok(frequency),
        None => {
            let frequency = Frequency::infer(&series.timestamps()).ok_or_else(|| {
                Error::InsufficientData(
                    "cannot infer a frequency from fewer than 2 distinct timestamps".to_string(),
                )
            })?;
            info!("Inferred frequency {}", frequency);
            Ok(frequency)
        }
    }
}
