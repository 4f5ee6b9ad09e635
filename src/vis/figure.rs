//! Forecast figure model
//!
//! A [`Figure`] is the description of a plot: settings plus an ordered list of
//! layers. It can be inspected in tests and rendered with plotters (see
//! [`Figure::to_svg_string`] and [`Figure::save`]).

use chrono::NaiveDateTime;

use crate::temporal::TimeSeries;
use crate::time_series::{FittedModel, ForecastPoint};
use crate::vis::dates::{AutoDateFormatter, AutoDateLocator, TickStep};

/// Training observations
pub const TRAIN_COLOR: (u8, u8, u8) = (0, 0, 0);
/// Forecast line and band
pub const FORECAST_COLOR: (u8, u8, u8) = (0, 114, 178);
/// Held-out observations
pub const TEST_COLOR: (u8, u8, u8) = (255, 0, 0);
/// Opacity of the uncertainty band
pub const BAND_ALPHA: f64 = 0.2;

/// Output format of a saved figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// PNG image
    PNG,
    /// SVG document
    SVG,
}

impl OutputType {
    /// Format implied by a file extension; anything but `svg` is a bitmap
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(|e| e.to_ascii_lowercase()) {
            Some(e) if e == "svg" => OutputType::SVG,
            _ => OutputType::PNG,
        }
    }
}

/// Plot settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSettings {
    pub title: Option<String>,
    pub x_label: String,
    pub y_label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub show_legend: bool,
    pub show_grid: bool,
}

impl Default for PlotSettings {
    fn default() -> Self {
        PlotSettings {
            title: None,
            x_label: "ds".to_string(),
            y_label: "y".to_string(),
            width: 1000,
            height: 600,
            show_legend: true,
            show_grid: true,
        }
    }
}

/// Kind of a drawn layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    TrainingPoints,
    ForecastLine,
    UncertaintyBand,
    TestPoints,
}

/// One drawn layer, in back-to-front order inside a [`Figure`]
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// Scatter of the series the model was fitted on
    TrainingPoints(Vec<(NaiveDateTime, f64)>),
    /// Point forecast over the whole timeline
    ForecastLine(Vec<(NaiveDateTime, f64)>),
    /// Shaded region between lower and upper bounds
    UncertaintyBand(Vec<(NaiveDateTime, f64, f64)>),
    /// Scatter of the held-out series
    TestPoints(Vec<(NaiveDateTime, f64)>),
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::TrainingPoints(_) => LayerKind::TrainingPoints,
            Layer::ForecastLine(_) => LayerKind::ForecastLine,
            Layer::UncertaintyBand(_) => LayerKind::UncertaintyBand,
            Layer::TestPoints(_) => LayerKind::TestPoints,
        }
    }

    /// Legend entry, if the layer has one
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Layer::TrainingPoints(_) => Some("training set"),
            Layer::ForecastLine(_) => Some("forecast"),
            Layer::UncertaintyBand(_) => None,
            Layer::TestPoints(_) => Some("test set"),
        }
    }

    pub fn color(&self) -> (u8, u8, u8) {
        match self {
            Layer::TrainingPoints(_) => TRAIN_COLOR,
            Layer::ForecastLine(_) | Layer::UncertaintyBand(_) => FORECAST_COLOR,
            Layer::TestPoints(_) => TEST_COLOR,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Layer::TrainingPoints(p) | Layer::ForecastLine(p) | Layer::TestPoints(p) => p.len(),
            Layer::UncertaintyBand(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn timestamps(&self) -> Vec<NaiveDateTime> {
        match self {
            Layer::TrainingPoints(p) | Layer::ForecastLine(p) | Layer::TestPoints(p) => {
                p.iter().map(|(t, _)| *t).collect()
            }
            Layer::UncertaintyBand(b) => b.iter().map(|(t, _, _)| *t).collect(),
        }
    }

    fn values(&self) -> Vec<f64> {
        match self {
            Layer::TrainingPoints(p) | Layer::ForecastLine(p) | Layer::TestPoints(p) => {
                p.iter().map(|(_, v)| *v).collect()
            }
            Layer::UncertaintyBand(b) => b.iter().flat_map(|(_, lo, hi)| [*lo, *hi]).collect(),
        }
    }
}

/// A renderable plot description
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    settings: PlotSettings,
    layers: Vec<Layer>,
    locator: AutoDateLocator,
    formatter: AutoDateFormatter,
}

impl Figure {
    pub fn new(settings: PlotSettings) -> Self {
        Figure {
            settings,
            layers: Vec::new(),
            locator: AutoDateLocator::default(),
            formatter: AutoDateFormatter,
        }
    }

    /// Add a layer on top of the existing ones
    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    pub fn settings(&self) -> &PlotSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }

    pub fn formatter(&self) -> &AutoDateFormatter {
        &self.formatter
    }

    /// Earliest and latest timestamp over all layers
    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let all: Vec<NaiveDateTime> = self.layers.iter().flat_map(Layer::timestamps).collect();
        let min = all.iter().min()?;
        let max = all.iter().max()?;
        Some((*min, *max))
    }

    /// Smallest and largest finite value over all layers
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let values: Vec<f64> = self
            .layers
            .iter()
            .flat_map(Layer::values)
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return None;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    /// Date ticks for the x axis, empty when there is nothing to plot
    pub fn x_ticks(&self) -> Option<(TickStep, Vec<NaiveDateTime>)> {
        let (start, end) = self.time_range()?;
        Some(self.locator.ticks(start, end))
    }

    pub(crate) fn locator_ticks(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> (TickStep, Vec<NaiveDateTime>) {
        self.locator.ticks(start, end)
    }

    /// Formatted labels of [`Figure::x_ticks`]
    pub fn x_tick_labels(&self) -> Vec<String> {
        match self.x_ticks() {
            Some((step, ticks)) => ticks
                .iter()
                .map(|t| self.formatter.format(step.unit, t))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Plot a fitted model's history, its forecast and the held-out series
///
/// Layers, back to front: training points, forecast line, uncertainty band
/// (only when the model simulated uncertainty) and test points.
pub fn forecast_figure<M: FittedModel>(
    model: &M,
    predictions: &[ForecastPoint],
    test: &TimeSeries,
    x_label: &str,
    y_label: &str,
) -> Figure {
    let settings = PlotSettings {
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        ..PlotSettings::default()
    };
    let mut figure = Figure::new(settings);

    let history = model.history();
    figure.push(Layer::TrainingPoints(
        history.rows().iter().map(|r| (r.timestamp, r.value)).collect(),
    ));
    figure.push(Layer::ForecastLine(
        predictions.iter().map(|p| (p.timestamp, p.yhat)).collect(),
    ));
    if model.uncertainty_samples() > 0 {
        figure.push(Layer::UncertaintyBand(
            predictions
                .iter()
                .map(|p| (p.timestamp, p.yhat_lower, p.yhat_upper))
                .collect(),
        ));
    }
    figure.push(Layer::TestPoints(
        test.rows().iter().map(|r| (r.timestamp, r.value)).collect(),
    ));
    figure
}
