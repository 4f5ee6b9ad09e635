mod common;

use common::daily_series;
use energy_forecast::error::Error;
use energy_forecast::ml::model_selection::{temporal_train_test_split, test_rows_for};
use energy_forecast::TimeSeries;

#[test]
fn test_split_sizes() {
    let series = daily_series(100);
    let split = temporal_train_test_split(&series, 0.33).unwrap();
    assert_eq!(split.train.len(), 67);
    assert_eq!(split.test.len(), 33);

    assert_eq!(test_rows_for(10, 0.33), 4);
    assert_eq!(test_rows_for(3, 0.33), 1);
    assert_eq!(test_rows_for(1000, 0.25), 250);
}

#[test]
fn test_split_is_chronological_partition() {
    let series = daily_series(50);
    let split = temporal_train_test_split(&series, 0.2).unwrap();

    // train followed by test gives back the input
    assert_eq!(split.train.concat(&split.test), series);

    let last_train = split.train.last().unwrap().timestamp;
    assert!(split.test.rows().iter().all(|r| r.timestamp > last_train));
}

#[test]
fn test_split_keeps_source_order() {
    let mut rows = daily_series(6).rows().to_vec();
    rows.swap(0, 5);
    let series = TimeSeries::new(rows.clone(), None);

    let split = temporal_train_test_split(&series, 0.5).unwrap();
    assert_eq!(split.train.rows(), &rows[..3]);
    assert_eq!(split.test.rows(), &rows[3..]);
}

#[test]
fn test_split_rejects_short_series() {
    for n in [0, 1, 2] {
        let err = temporal_train_test_split(&daily_series(n), 0.33).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)), "n = {}: {:?}", n, err);
    }
    assert!(temporal_train_test_split(&daily_series(3), 0.33).is_ok());
}

#[test]
fn test_split_rejects_bad_fraction() {
    let series = daily_series(10);
    for size in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
        let err = temporal_train_test_split(&series, size).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
    // rounding up the test part can consume every row
    let err = temporal_train_test_split(&daily_series(3), 0.9).unwrap_err();
    assert!(matches!(err, Error::InsufficientData(_)));
}
