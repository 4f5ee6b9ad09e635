//! Forecasting Benchmarks
//!
//! Fit, predict and interval simulation cost of the capped-growth model at a
//! few history lengths.

use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use energy_forecast::time_series::{Forecaster, GrowthConfig, GrowthForecaster};
use energy_forecast::TimeSeries;

/// Daily saturating series with a weekly cycle, capped at 4
fn create_series(n: usize) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2018, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let timestamps = (0..n).map(|i| start + Duration::days(i as i64)).collect();
    let values = (0..n)
        .map(|i| {
            let x = i as f64;
            3.0 / (1.0 + (-(x - n as f64 / 2.0) / (n as f64 / 8.0)).exp())
                + 0.1 * (2.0 * std::f64::consts::PI * x / 7.0).sin()
        })
        .collect();
    TimeSeries::from_vecs(timestamps, values, None)
        .unwrap()
        .with_cap(4.0)
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("fit");
    group.sample_size(10);
    let forecaster = GrowthForecaster::new(GrowthConfig::logistic().with_uncertainty_samples(0));

    for n in [100, 365, 1000] {
        let series = create_series(n);
        group.bench_with_input(BenchmarkId::new("logistic", n), &series, |b, series| {
            b.iter(|| forecaster.fit(series).unwrap());
        });
    }

    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict");
    group.sample_size(10);
    let series = create_series(365);

    for samples in [0, 100, 1000] {
        let forecaster = GrowthForecaster::new(
            GrowthConfig::logistic()
                .with_uncertainty_samples(samples)
                .with_seed(42),
        );
        let model = forecaster.fit(&series).unwrap();
        let timeline = forecaster.extend(&model, 365).unwrap();
        group.bench_with_input(BenchmarkId::new("samples", samples), &timeline, |b, timeline| {
            b.iter(|| forecaster.predict(&model, timeline).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fit, bench_predict);

criterion_main!(benches);
