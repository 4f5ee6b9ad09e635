//! Plotters rendering of a [`Figure`]

use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use log::info;
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, Ranged, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::{Error, Result};
use crate::time_series::seasonality::days_since_epoch;
use crate::vis::dates::{AutoDateFormatter, DateUnit};
use crate::vis::figure::{Figure, Layer, OutputType, BAND_ALPHA};

/// Plot coordinates are fractional days since the Unix epoch
fn to_x(ts: &NaiveDateTime) -> f64 {
    days_since_epoch(ts)
}

fn from_x(x: f64) -> Option<NaiveDateTime> {
    let millis = (x * 86_400_000.0).round();
    if !millis.is_finite() {
        return None;
    }
    chrono::DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
}

/// Time axis in days since the epoch, ticked and labelled on calendar units
#[derive(Clone)]
struct DateAxis {
    days: RangedCoordf64,
    ticks: Vec<f64>,
    unit: DateUnit,
    formatter: AutoDateFormatter,
}

impl DateAxis {
    fn new(figure: &Figure, start: NaiveDateTime, end: NaiveDateTime, margin: f64) -> Self {
        let (step, ticks) = figure.locator_ticks(start, end);
        Self {
            days: ((to_x(&start) - margin)..(to_x(&end) + margin)).into(),
            ticks: ticks.iter().map(to_x).collect(),
            unit: step.unit,
            formatter: *figure.formatter(),
        }
    }
}

impl Ranged for DateAxis {
    type FormatOption = NoDefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.days.map(value, limit)
    }

    // Locator ticks are the bold lines; there are no light lines in between
    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<f64> {
        if hint.weight().allow_light_points() {
            Vec::new()
        } else {
            self.ticks.clone()
        }
    }

    fn range(&self) -> std::ops::Range<f64> {
        self.days.range()
    }
}

impl ValueFormatter<f64> for DateAxis {
    fn format_ext(&self, value: &f64) -> String {
        from_x(*value)
            .map(|ts| self.formatter.format(self.unit, &ts))
            .unwrap_or_default()
    }
}

fn rgb(c: (u8, u8, u8)) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

impl Figure {
    /// Render to an SVG document in memory
    pub fn to_svg_string(&self) -> Result<String> {
        let mut buf = String::new();
        {
            let root = SVGBackend::with_string(&mut buf, (self.settings().width, self.settings().height))
                .into_drawing_area();
            draw_figure(self, &root)?;
        }
        Ok(buf)
    }

    /// Write the figure to `path`; `.svg` gives SVG, anything else PNG
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let ext = path.as_ref().extension().and_then(|e| e.to_str());
        self.save_as(path.as_ref(), OutputType::from_extension(ext))
    }

    pub fn save_as<P: AsRef<Path>>(&self, path: P, output: OutputType) -> Result<()> {
        let path = path.as_ref();
        let size = (self.settings().width, self.settings().height);
        match output {
            OutputType::SVG => {
                let root = SVGBackend::new(path, size).into_drawing_area();
                draw_figure(self, &root)?;
            }
            OutputType::PNG => {
                let root = BitMapBackend::new(path, size).into_drawing_area();
                draw_figure(self, &root)?;
            }
        }
        info!("Saved figure to {}", path.display());
        Ok(())
    }
}

fn draw_figure<DB>(figure: &Figure, root: &DrawingArea<DB, Shift>) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (start, end) = figure
        .time_range()
        .ok_or_else(|| Error::Visualization("figure has no data to plot".to_string()))?;
    let (y_min, y_max) = figure
        .value_range()
        .ok_or_else(|| Error::Visualization("figure has no finite values".to_string()))?;

    // Pad both axes by 5%; a single instant or a flat series still gets a range
    let (start, end) = if start == end {
        (start - Duration::days(1), end + Duration::days(1))
    } else {
        (start, end)
    };
    let x_margin = (to_x(&end) - to_x(&start)) * 0.05;
    let y_margin = if y_max > y_min { (y_max - y_min) * 0.05 } else { 1.0 };

    root.fill(&WHITE)?;
    let settings = figure.settings();
    let mut builder = ChartBuilder::on(root);
    builder.margin(10).x_label_area_size(40).y_label_area_size(50);
    if let Some(title) = &settings.title {
        builder.caption(title, ("sans-serif", 24).into_font());
    }
    let mut chart = builder.build_cartesian_2d(
        DateAxis::new(figure, start, end, x_margin),
        (y_min - y_margin)..(y_max + y_margin),
    )?;

    let y_formatter = |y: &f64| format!("{:.2}", y);
    let mut mesh = chart.configure_mesh();
    mesh.y_label_formatter(&y_formatter)
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str())
        .max_light_lines(0);
    if settings.show_grid {
        mesh.bold_line_style(RGBColor(128, 128, 128).mix(0.2));
    } else {
        mesh.disable_mesh();
    }
    mesh.draw()?;

    for layer in figure.layers() {
        let color = rgb(layer.color());
        match layer {
            Layer::TrainingPoints(points) | Layer::TestPoints(points) => {
                let series = points
                    .iter()
                    .filter(|(_, y)| y.is_finite())
                    .map(move |(t, y)| Circle::new((to_x(t), *y), 2, color.filled()));
                let anno = chart.draw_series(series)?;
                if let Some(label) = layer.label() {
                    anno.label(label)
                        .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
                }
            }
            Layer::ForecastLine(points) => {
                let series = LineSeries::new(
                    points
                        .iter()
                        .filter(|(_, y)| y.is_finite())
                        .map(|(t, y)| (to_x(t), *y)),
                    color.stroke_width(2),
                );
                let anno = chart.draw_series(series)?;
                if let Some(label) = layer.label() {
                    anno.label(label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
            }
            Layer::UncertaintyBand(band) => {
                let band: Vec<_> = band
                    .iter()
                    .filter(|(_, lo, hi)| lo.is_finite() && hi.is_finite())
                    .collect();
                // Upper edge left to right, then lower edge back
                let mut outline: Vec<(f64, f64)> =
                    band.iter().map(|(t, _, hi)| (to_x(t), *hi)).collect();
                outline.extend(band.iter().rev().map(|(t, lo, _)| (to_x(t), *lo)));
                if outline.len() >= 3 {
                    chart.draw_series(std::iter::once(Polygon::new(
                        outline,
                        color.mix(BAND_ALPHA).filled(),
                    )))?;
                }
            }
        }
    }

    if settings.show_legend {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
