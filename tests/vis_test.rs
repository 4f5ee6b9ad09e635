mod common;

use common::{daily_series, TempTestFile};
use energy_forecast::ml::model_selection::temporal_train_test_split;
use energy_forecast::time_series::{Forecaster, GrowthConfig, GrowthForecaster};
use energy_forecast::vis::{forecast_figure, DateUnit, LayerKind};

fn figure_with_samples(samples: usize) -> energy_forecast::Figure {
    let series = daily_series(100).with_cap(4.0);
    let split = temporal_train_test_split(&series, 0.33).unwrap();
    let forecaster = GrowthForecaster::new(
        GrowthConfig::logistic()
            .with_uncertainty_samples(samples)
            .with_seed(3),
    );
    let result = forecaster.forecast(&split.train, 40).unwrap();
    forecast_figure(&result.model, &result.predictions, &split.test, "Date", "Value")
}

#[test]
fn test_layers_with_uncertainty() {
    let figure = figure_with_samples(20);
    assert_eq!(
        figure.layer_kinds(),
        vec![
            LayerKind::TrainingPoints,
            LayerKind::ForecastLine,
            LayerKind::UncertaintyBand,
            LayerKind::TestPoints,
        ]
    );
    assert_eq!(figure.layers()[0].len(), 67);
    assert_eq!(figure.layers()[1].len(), 67 + 40);
    assert_eq!(figure.layers()[3].len(), 33);
    assert_eq!(figure.settings().x_label, "Date");
    assert_eq!(figure.settings().y_label, "Value");
}

#[test]
fn test_no_band_without_uncertainty() {
    let figure = figure_with_samples(0);
    assert_eq!(
        figure.layer_kinds(),
        vec![
            LayerKind::TrainingPoints,
            LayerKind::ForecastLine,
            LayerKind::TestPoints,
        ]
    );
}

#[test]
fn test_date_ticks_follow_span() {
    let figure = figure_with_samples(0);
    // 106 days: too few whole months, so two-week steps
    let (step, ticks) = figure.x_ticks().unwrap();
    assert_eq!(step.unit, DateUnit::Day);
    assert_eq!(step.interval, 14);
    assert_eq!(ticks.len(), 8);
    assert_eq!(figure.x_tick_labels()[0], "2019-01-01");
    assert_eq!(figure.x_tick_labels()[1], "2019-01-15");
}

#[test]
fn test_render_svg() {
    let figure = figure_with_samples(20);
    let svg = figure.to_svg_string().unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("<polygon") || svg.contains("<path"));
    assert!(svg.contains("<circle"));
}

#[test]
fn test_save_by_extension() {
    let figure = figure_with_samples(0);

    let svg = TempTestFile::new("figure", "svg");
    figure.save(svg.path()).unwrap();
    let text = std::fs::read_to_string(svg.path()).unwrap();
    assert!(text.contains("<svg"));

    let png = TempTestFile::new("figure", "png");
    figure.save(png.path()).unwrap();
    let bytes = std::fs::read(png.path()).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}
