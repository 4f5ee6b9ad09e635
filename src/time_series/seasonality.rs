//! Fourier seasonality features

use std::f64::consts::PI;

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

/// Whether a built-in seasonality is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalitySetting {
    /// Decide from the span and spacing of the history
    Auto,
    Enabled,
    Disabled,
}

/// How seasonal terms combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// `trend + seasonal`
    Additive,
    /// `trend * (1 + seasonal)`
    Multiplicative,
}

/// One periodic component
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seasonality {
    pub name: String,
    /// Period in days
    pub period: f64,
    pub fourier_order: usize,
}

impl Seasonality {
    pub fn new(name: &str, period: f64, fourier_order: usize) -> Self {
        Seasonality {
            name: name.to_string(),
            period,
            fourier_order,
        }
    }

    pub fn yearly() -> Self {
        Seasonality::new("yearly", 365.25, 10)
    }

    pub fn weekly() -> Self {
        Seasonality::new("weekly", 7.0, 3)
    }

    pub fn daily() -> Self {
        Seasonality::new("daily", 1.0, 4)
    }

    /// Number of feature columns this component contributes
    pub fn width(&self) -> usize {
        2 * self.fourier_order
    }
}

/// Days since the Unix epoch, so features line up across fits
pub fn days_since_epoch(ts: &NaiveDateTime) -> f64 {
    ts.and_utc().timestamp_millis() as f64 / 86_400_000.0
}

/// Pick the built-in seasonalities to fit
///
/// In `Auto` mode yearly seasonality needs two years of history, weekly needs
/// two weeks with sub-weekly spacing, and daily needs two days with
/// sub-daily spacing.
pub fn resolve_seasonalities(
    timestamps: &[NaiveDateTime],
    yearly: SeasonalitySetting,
    weekly: SeasonalitySetting,
    daily: SeasonalitySetting,
) -> Vec<Seasonality> {
    let days: Vec<f64> = timestamps.iter().map(days_since_epoch).collect();
    let span = match (days.first(), days.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    };
    let min_gap = days
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|gap| *gap > 0.0)
        .fold(f64::INFINITY, f64::min);

    let decide = |setting: SeasonalitySetting, name: &str, auto: bool| -> bool {
        let enabled = match setting {
            SeasonalitySetting::Auto => auto,
            SeasonalitySetting::Enabled => true,
            SeasonalitySetting::Disabled => false,
        };
        debug!("{} seasonality: {}", name, if enabled { "on" } else { "off" });
        enabled
    };

    let mut out = Vec::new();
    if decide(yearly, "yearly", span >= 730.0) {
        out.push(Seasonality::yearly());
    }
    if decide(weekly, "weekly", span >= 14.0 && min_gap < 7.0) {
        out.push(Seasonality::weekly());
    }
    if decide(daily, "daily", span >= 2.0 && min_gap < 1.0) {
        out.push(Seasonality::daily());
    }
    out
}

/// Sine/cosine pairs for orders `1..=order` of a period, one row per time
pub fn fourier_series(t_days: &[f64], period: f64, order: usize) -> Vec<Vec<f64>> {
    t_days
        .iter()
        .map(|&t| {
            let mut row = Vec::with_capacity(2 * order);
            for i in 1..=order {
                let x = 2.0 * PI * i as f64 * t / period;
                row.push(x.sin());
                row.push(x.cos());
            }
            row
        })
        .collect()
}

/// Feature matrix of all seasonalities side by side, one row per timestamp
pub fn seasonal_features(timestamps: &[NaiveDateTime], seasonalities: &[Seasonality]) -> Vec<Vec<f64>> {
    let t_days: Vec<f64> = timestamps.iter().map(days_since_epoch).collect();
    let mut rows: Vec<Vec<f64>> = vec![Vec::new(); t_days.len()];
    for s in seasonalities {
        let block = fourier_series(&t_days, s.period, s.fourier_order);
        for (row, part) in rows.iter_mut().zip(block) {
            row.extend(part);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn daily(n: i64) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| start + Duration::days(i)).collect()
    }

    #[test]
    fn auto_picks_weekly_for_short_daily_data() {
        let s = resolve_seasonalities(
            &daily(67),
            SeasonalitySetting::Auto,
            SeasonalitySetting::Auto,
            SeasonalitySetting::Auto,
        );
        let names: Vec<_> = s.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["weekly"]);

        let s = resolve_seasonalities(
            &daily(800),
            SeasonalitySetting::Auto,
            SeasonalitySetting::Disabled,
            SeasonalitySetting::Auto,
        );
        assert_eq!(s, vec![Seasonality::yearly()]);
    }

    #[test]
    fn feature_width_matches_orders() {
        let x = seasonal_features(&daily(10), &[Seasonality::yearly(), Seasonality::weekly()]);
        assert_eq!(x.len(), 10);
        assert!(x.iter().all(|row| row.len() == 26));
        // weekly terms repeat every 7 days
        assert!((x[0][20] - x[7][20]).abs() < 1e-9);
    }
}
