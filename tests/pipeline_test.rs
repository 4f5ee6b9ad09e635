mod common;

use common::{create_test_csv, daily_series, TempTestFile};
use energy_forecast::error::{Error, Result};
use energy_forecast::time_series::{
    FittedModel, ForecastPoint, Forecaster, Timeline, TimelineRow,
};
use energy_forecast::vis::LayerKind;
use energy_forecast::{pipeline, PipelineConfig, TimeSeries};

fn config_for(input: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        input: input.to_path_buf(),
        uncertainty_samples: 25,
        seed: Some(11),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_end_to_end_from_csv() {
    let input = create_test_csv("pipeline_input", &daily_series(100));
    let chart = TempTestFile::new("pipeline_chart", "svg");
    let config = PipelineConfig {
        output: Some(chart.path().to_path_buf()),
        ..config_for(input.path())
    };

    let output = pipeline::run(&config).unwrap();
    assert_eq!(output.split.train.len(), 67);
    assert_eq!(output.split.test.len(), 33);
    assert!(output.split.train.caps().iter().all(|c| *c == Some(4.0)));

    assert_eq!(output.forecast.len(), 67 + 3103);
    assert!(output.forecast.predictions.iter().all(|p| p.cap == Some(4.0)));

    let metrics = output.metrics.expect("test rows fall inside the forecast");
    assert_eq!(metrics.matched, 33);
    assert!(metrics.mae.is_finite());
    assert!((0.0..=1.0).contains(&metrics.coverage));

    assert_eq!(output.figure.layers().len(), 4);
    assert!(std::fs::metadata(chart.path()).unwrap().len() > 0);
}

#[test]
fn test_missing_input_fails_fast() {
    let config = PipelineConfig {
        input: "/nonexistent/forecasting_take_home_data.xlsx".into(),
        ..PipelineConfig::default()
    };
    assert!(pipeline::run(&config).is_err());
}

#[test]
fn test_invalid_config_is_rejected() {
    let input = create_test_csv("pipeline_bad_config", &daily_series(10));
    let config = PipelineConfig {
        test_size: 1.5,
        ..config_for(input.path())
    };
    assert!(matches!(pipeline::run(&config), Err(Error::Config(_))));
}

/// Predicts the last training value everywhere
struct LastValue;

#[derive(Debug)]
struct LastValueModel {
    history: TimeSeries,
}

impl FittedModel for LastValueModel {
    fn history(&self) -> &TimeSeries {
        &self.history
    }

    fn uncertainty_samples(&self) -> usize {
        0
    }
}

impl Forecaster for LastValue {
    type Model = LastValueModel;

    fn fit(&self, series: &TimeSeries) -> Result<LastValueModel> {
        Ok(LastValueModel {
            history: series.clone(),
        })
    }

    fn extend(&self, model: &LastValueModel, horizon: usize) -> Result<Timeline> {
        let last = model.history.last().ok_or_else(|| Error::EmptyData("empty".into()))?;
        let mut rows: Vec<TimelineRow> = model
            .history
            .rows()
            .iter()
            .map(|r| TimelineRow {
                timestamp: r.timestamp,
                cap: r.cap,
            })
            .collect();
        rows.extend((1..=horizon as i64).map(|i| TimelineRow {
            timestamp: last.timestamp + chrono::Duration::days(i),
            cap: last.cap,
        }));
        Ok(Timeline::new(rows))
    }

    fn predict(&self, model: &LastValueModel, timeline: &Timeline) -> Result<Vec<ForecastPoint>> {
        let value = model.history.last().map(|r| r.value).unwrap_or_default();
        Ok(timeline
            .rows()
            .iter()
            .map(|r| ForecastPoint {
                timestamp: r.timestamp,
                yhat: value,
                yhat_lower: value,
                yhat_upper: value,
                trend: value,
                cap: r.cap,
            })
            .collect())
    }
}

#[test]
fn test_pipeline_accepts_any_forecaster() {
    let config = PipelineConfig {
        horizon: 50,
        ..PipelineConfig::default()
    };
    let series = daily_series(30);
    let output = pipeline::run_with(&config, &LastValue, series).unwrap();

    assert_eq!(output.split.train.len(), 20);
    assert_eq!(output.split.test.len(), 10);
    assert_eq!(output.forecast.len(), 70);
    assert_eq!(
        output.figure.layer_kinds(),
        vec![
            LayerKind::TrainingPoints,
            LayerKind::ForecastLine,
            LayerKind::TestPoints,
        ]
    );

    let metrics = output.metrics.unwrap();
    assert_eq!(metrics.matched, 10);
    // flat bounds only cover exact hits
    assert!(metrics.coverage < 0.5);
}

#[test]
fn test_short_horizon_skips_evaluation() {
    let config = PipelineConfig {
        horizon: 0,
        ..PipelineConfig::default()
    };
    let output = pipeline::run_with(&config, &LastValue, daily_series(30)).unwrap();
    assert_eq!(output.forecast.len(), 20);
    assert!(output.metrics.is_none());
}

#[test]
fn test_empty_series_is_rejected() {
    let config = PipelineConfig::default();
    let err = pipeline::run_with(&config, &LastValue, TimeSeries::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyData(_)));
}
