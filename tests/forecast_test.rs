mod common;

use chrono::Duration;
use common::daily_series;
use energy_forecast::error::Error;
use energy_forecast::time_series::{
    Forecaster, GrowthConfig, GrowthForecaster, Growth, Timeline, TimelineRow,
};
use energy_forecast::{FittedModel, TimeSeries};

const CAP: f64 = 4.0;
const HORIZON: usize = 3103;

fn training_data() -> TimeSeries {
    daily_series(67).with_cap(CAP)
}

fn forecaster(samples: usize) -> GrowthForecaster {
    GrowthForecaster::new(
        GrowthConfig::logistic()
            .with_uncertainty_samples(samples)
            .with_seed(7),
    )
}

#[test]
fn test_extend_appends_horizon_with_cap() {
    let train = training_data();
    let forecaster = forecaster(0);
    let model = forecaster.fit(&train).unwrap();
    let timeline = forecaster.extend(&model, HORIZON).unwrap();

    assert_eq!(timeline.len(), train.len() + HORIZON);
    assert!(timeline.caps().iter().all(|c| *c == Some(CAP)));
    assert_eq!(&timeline.timestamps()[..train.len()], &train.timestamps()[..]);

    let end = train.last().unwrap().timestamp;
    assert_eq!(timeline.rows()[train.len()].timestamp, end + Duration::days(1));
    assert_eq!(
        timeline.rows().last().unwrap().timestamp,
        end + Duration::days(HORIZON as i64)
    );
}

#[test]
fn test_forecast_covers_timeline() {
    let train = training_data();
    let result = forecaster(20).forecast(&train, HORIZON).unwrap();

    assert_eq!(result.len(), 67 + HORIZON);
    assert_eq!(result.model.history(), &train);
    assert_eq!(result.model.uncertainty_samples(), 20);
    assert!(result.predictions.iter().all(|p| p.yhat.is_finite()
        && p.yhat_lower.is_finite()
        && p.yhat_upper.is_finite()
        && p.yhat_lower <= p.yhat_upper));
}

#[test]
fn test_logistic_trend_respects_cap() {
    let train = training_data();
    let result = forecaster(0).forecast(&train, HORIZON).unwrap();
    assert!(result
        .predictions
        .iter()
        .all(|p| p.trend <= CAP * (1.0 + 1e-9) && p.trend >= 0.0));
}

#[test]
fn test_repeated_runs_share_timestamps() {
    let train = training_data();
    let unseeded = GrowthForecaster::new(GrowthConfig::logistic().with_uncertainty_samples(10));
    let a = unseeded.forecast(&train, 30).unwrap();
    let b = unseeded.forecast(&train, 30).unwrap();

    assert_eq!(a.timestamps(), b.timestamps());
    assert_eq!(a.time_range(), b.time_range());
    // the fit itself is deterministic; only the simulated bounds may differ
    assert_eq!(a.yhat(), b.yhat());
}

#[test]
fn test_seed_makes_bounds_reproducible() {
    let train = training_data();
    let a = forecaster(30).forecast(&train, 60).unwrap();
    let b = forecaster(30).forecast(&train, 60).unwrap();
    assert_eq!(a.predictions, b.predictions);
}

#[test]
fn test_zero_samples_collapse_bounds() {
    let train = training_data();
    let result = forecaster(0).forecast(&train, 10).unwrap();
    for p in &result.predictions {
        assert_eq!(p.yhat_lower, p.yhat);
        assert_eq!(p.yhat_upper, p.yhat);
    }
}

#[test]
fn test_logistic_requires_cap() {
    let train = daily_series(67);
    let err = forecaster(0).fit(&train).unwrap_err();
    assert!(matches!(err, Error::MissingCap(1)), "got {:?}", err);
}

#[test]
fn test_predict_rejects_timeline_without_cap() {
    let train = training_data();
    let forecaster = forecaster(0);
    let model = forecaster.fit(&train).unwrap();

    let mut rows = forecaster.extend(&model, 5).unwrap().rows().to_vec();
    rows[3] = TimelineRow {
        timestamp: rows[3].timestamp,
        cap: None,
    };
    let err = forecaster.predict(&model, &Timeline::new(rows)).unwrap_err();
    assert!(matches!(err, Error::MissingCap(4)), "got {:?}", err);
}

#[test]
fn test_linear_growth_without_cap() {
    let train = daily_series(67);
    let forecaster = GrowthForecaster::new(
        GrowthConfig::default()
            .with_growth(Growth::Linear)
            .with_uncertainty_samples(0),
    );
    let result = forecaster.forecast(&train, 14).unwrap();
    assert_eq!(result.len(), 81);
    assert!(result.predictions.iter().all(|p| p.cap.is_none()));

    // in-sample fit tracks the data
    let mae: f64 = result
        .predictions
        .iter()
        .zip(train.values())
        .map(|(p, y)| (p.yhat - y).abs())
        .sum::<f64>()
        / train.len() as f64;
    assert!(mae < 0.3, "in-sample MAE {}", mae);
}

#[test]
fn test_fit_rejects_tiny_series() {
    let err = forecaster(0).fit(&daily_series(1).with_cap(CAP)).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}
