//! Forecast visualization
//!
//! [`forecast_figure`] builds a [`Figure`] from a fitted model, its predictions
//! and the held-out series. Figures render through plotters to SVG or PNG, with
//! x-axis ticks chosen by [`AutoDateLocator`] and labelled by
//! [`AutoDateFormatter`].

pub mod dates;
pub mod figure;
mod render;

pub use self::dates::{AutoDateFormatter, AutoDateLocator, DateUnit, TickStep};
pub use self::figure::{forecast_figure, Figure, Layer, LayerKind, OutputType, PlotSettings};
