//! Piecewise trend curves with changepoints
//!
//! Time is expressed in model units: 0 at the first training timestamp and 1 at
//! the last one. Changepoints must be sorted ascending and `deltas[j]` is the
//! change in growth rate at `changepoints[j]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of the trend component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    /// Unbounded piecewise-linear growth
    Linear,
    /// Growth saturating at a carrying capacity (the cap)
    Logistic,
    /// Constant level
    Flat,
}

impl FromStr for Growth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(Growth::Linear),
            "logistic" => Ok(Growth::Logistic),
            "flat" => Ok(Growth::Flat),
            other => Err(Error::InvalidInput(format!(
                "Unknown growth mode '{}'; expected 'logistic', 'linear' or 'flat'",
                other
            ))),
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Growth::Linear => write!(f, "linear"),
            Growth::Logistic => write!(f, "logistic"),
            Growth::Flat => write!(f, "flat"),
        }
    }
}

/// Base rate, offset and rate adjustments of a trend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendParams {
    pub k: f64,
    pub m: f64,
    pub delta: Vec<f64>,
}

/// Evenly spaced changepoints over the first `range` share of the history
///
/// `t` must be sorted. Fewer than `n` changepoints are placed when the
/// history is too short to support them.
pub fn select_changepoints(t: &[f64], n: usize, range: f64) -> Vec<f64> {
    let hist_size = ((t.len() as f64) * range).floor() as usize;
    let n = n.min(hist_size.saturating_sub(1));
    if n == 0 {
        return Vec::new();
    }
    (1..=n)
        .map(|i| {
            let pos = (i as f64 * (hist_size - 1) as f64 / n as f64).round() as usize;
            t[pos]
        })
        .collect()
}

/// Running sums of `values` over the changepoints at or before each time
fn prefix_sums(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out = vec![0.0];
    let mut acc = 0.0;
    for v in values {
        acc += v;
        out.push(acc);
    }
    out
}

/// Number of changepoints at or before `t`
fn active(changepoints: &[f64], t: f64) -> usize {
    changepoints.partition_point(|&s| s <= t)
}

/// Piecewise-linear trend
pub fn piecewise_linear(t: &[f64], params: &TrendParams, changepoints: &[f64]) -> Vec<f64> {
    let rate = prefix_sums(params.delta.iter().copied());
    let offset = prefix_sums(
        changepoints
            .iter()
            .zip(params.delta.iter())
            .map(|(s, d)| -s * d),
    );
    t.iter()
        .map(|&ti| {
            let j = active(changepoints, ti);
            (params.k + rate[j]) * ti + params.m + offset[j]
        })
        .collect()
}

/// Offset adjustments that keep a logistic trend continuous at each changepoint
pub fn logistic_gamma(params: &TrendParams, changepoints: &[f64]) -> Vec<f64> {
    let mut gamma = Vec::with_capacity(changepoints.len());
    let mut k_prev = params.k;
    let mut m_prev = params.m;
    for (s, d) in changepoints.iter().zip(params.delta.iter()) {
        let mut k_next = k_prev + d;
        if k_next.abs() < 1e-12 {
            k_next = 1e-12_f64.copysign(k_next);
        }
        let g = (s - m_prev) * (1.0 - k_prev / k_next);
        gamma.push(g);
        m_prev += g;
        k_prev = k_next;
    }
    gamma
}

/// Piecewise-logistic trend bounded by `cap`
pub fn piecewise_logistic(
    t: &[f64],
    cap: &[f64],
    params: &TrendParams,
    changepoints: &[f64],
) -> Vec<f64> {
    let rate = prefix_sums(params.delta.iter().copied());
    let offset = prefix_sums(logistic_gamma(params, changepoints).into_iter());
    t.iter()
        .zip(cap.iter())
        .map(|(&ti, &c)| {
            let j = active(changepoints, ti);
            let k_t = params.k + rate[j];
            let m_t = params.m + offset[j];
            c / (1.0 + (-k_t * (ti - m_t)).exp())
        })
        .collect()
}

/// Constant trend
pub fn flat_trend(t: &[f64], params: &TrendParams) -> Vec<f64> {
    vec![params.m; t.len()]
}

/// Evaluate the trend selected by `growth`
///
/// `cap` is only read for logistic growth and must then match `t` in length.
pub fn evaluate(
    growth: Growth,
    t: &[f64],
    cap: &[f64],
    params: &TrendParams,
    changepoints: &[f64],
) -> Vec<f64> {
    match growth {
        Growth::Linear => piecewise_linear(t, params, changepoints),
        Growth::Logistic => piecewise_logistic(t, cap, params, changepoints),
        Growth::Flat => flat_trend(t, params),
    }
}

/// Initial rate and offset for a linear trend through the first and last points
pub fn linear_init(t: &[f64], y: &[f64]) -> (f64, f64) {
    let (i0, i1) = (0, t.len() - 1);
    let span = t[i1] - t[i0];
    let k = if span > 0.0 { (y[i1] - y[i0]) / span } else { 0.0 };
    let m = y[i0] - k * t[i0];
    (k, m)
}

/// Initial rate and offset for a logistic trend through the first and last points
pub fn logistic_init(t: &[f64], y: &[f64], cap: &[f64]) -> (f64, f64) {
    let (i0, i1) = (0, t.len() - 1);
    let span = t[i1] - t[i0];
    let (c0, c1) = (cap[i0], cap[i1]);
    let y0 = (0.01 * c0).max((0.99 * c0).min(y[i0]));
    let y1 = (0.01 * c1).max((0.99 * c1).min(y[i1]));

    let mut r0 = c0 / y0;
    let r1 = c1 / y1;
    if (r0 - r1).abs() <= 0.01 {
        r0 *= 1.05;
    }
    let l0 = (r0 - 1.0).ln();
    let l1 = (r1 - 1.0).ln();
    let m = l0 * span / (l0 - l1);
    let k = (l0 - l1) / span;
    (k, m)
}
