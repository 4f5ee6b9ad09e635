//! Capped-growth forecaster
//!
//! Decomposes a series into a piecewise trend (logistic, linear or flat) with
//! automatically placed changepoints, plus Fourier seasonality. Parameters are
//! the posterior mode under Gaussian priors, found with Levenberg-Marquardt.
//! Uncertainty bounds come from simulating future changepoints and
//! observation noise.

use chrono::NaiveDateTime;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Exp1, Normal};

use crate::error::{Error, Result};
use crate::temporal::{Frequency, TimeSeries};
use crate::time_series::optimize::{levenberg_marquardt, LeastSquares, SolverOptions};
use crate::time_series::seasonality::{
    resolve_seasonalities, seasonal_features, Seasonality, SeasonalityMode, SeasonalitySetting,
};
use crate::time_series::trend::{self, Growth, TrendParams};
use crate::time_series::{FittedModel, ForecastPoint, Forecaster, Timeline, TimelineRow};

/// Prior scale of the base rate and offset
const TREND_PRIOR_SCALE: f64 = 5.0;
/// Observation noise assumed for the first pass of the fit, in scaled units
const NOMINAL_SIGMA: f64 = 0.1;
/// Smallest observation noise used for weighting and sampling
const MIN_SIGMA: f64 = 1e-3;

/// Settings of the capped-growth model
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthConfig {
    pub growth: Growth,
    /// Maximum number of trend changepoints
    pub n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of changepoint rate adjustments; larger means a more flexible trend
    pub changepoint_prior_scale: f64,
    /// Prior scale of seasonal coefficients
    pub seasonality_prior_scale: f64,
    pub yearly_seasonality: SeasonalitySetting,
    pub weekly_seasonality: SeasonalitySetting,
    pub daily_seasonality: SeasonalitySetting,
    pub seasonality_mode: SeasonalityMode,
    /// Probability mass inside the uncertainty bounds
    pub interval_width: f64,
    /// Simulated paths per prediction; 0 disables the bounds
    pub uncertainty_samples: usize,
    /// Seed for the simulation; entropy-seeded when `None`
    pub seed: Option<u64>,
    /// Spacing of future periods
    pub frequency: Frequency,
    pub max_iterations: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        GrowthConfig {
            growth: Growth::Linear,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_seasonality: SeasonalitySetting::Auto,
            weekly_seasonality: SeasonalitySetting::Auto,
            daily_seasonality: SeasonalitySetting::Auto,
            seasonality_mode: SeasonalityMode::Additive,
            interval_width: 0.80,
            uncertainty_samples: 1000,
            seed: None,
            frequency: Frequency::Daily,
            max_iterations: 200,
        }
    }
}

impl GrowthConfig {
    pub fn logistic() -> Self {
        GrowthConfig {
            growth: Growth::Logistic,
            ..GrowthConfig::default()
        }
    }

    pub fn with_growth(mut self, growth: Growth) -> Self {
        self.growth = growth;
        self
    }

    pub fn with_uncertainty_samples(mut self, samples: usize) -> Self {
        self.uncertainty_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_seasonality_mode(mut self, mode: SeasonalityMode) -> Self {
        self.seasonality_mode = mode;
        self
    }

    pub fn without_seasonality(mut self) -> Self {
        self.yearly_seasonality = SeasonalitySetting::Disabled;
        self.weekly_seasonality = SeasonalitySetting::Disabled;
        self.daily_seasonality = SeasonalitySetting::Disabled;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if !(self.changepoint_prior_scale > 0.0 && self.seasonality_prior_scale > 0.0) {
            return Err(Error::InvalidInput(
                "prior scales must be positive".to_string(),
            ));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(Error::InvalidInput(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        Ok(())
    }
}

/// A fitted capped-growth model
#[derive(Debug, Clone)]
pub struct GrowthModel {
    config: GrowthConfig,
    history: TimeSeries,
    /// Cap attached to the training rows, reused for every forecast row
    cap: Option<f64>,
    start: NaiveDateTime,
    end: NaiveDateTime,
    /// Seconds per model time unit
    t_scale: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    params: TrendParams,
    beta: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    /// Residual standard deviation in scaled units
    sigma_obs: f64,
    converged: bool,
}

impl GrowthModel {
    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    pub fn growth(&self) -> Growth {
        self.config.growth
    }

    pub fn cap(&self) -> Option<f64> {
        self.cap
    }

    /// Trend parameters in scaled units
    pub fn params(&self) -> &TrendParams {
        &self.params
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    /// Residual standard deviation in the units of the series
    pub fn sigma_obs(&self) -> f64 {
        self.sigma_obs * self.y_scale
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Changepoint locations as timestamps
    pub fn changepoint_timestamps(&self) -> Vec<NaiveDateTime> {
        self.changepoints
            .iter()
            .filter_map(|t| self.to_timestamp(*t))
            .collect()
    }

    fn to_model_time(&self, ts: &NaiveDateTime) -> f64 {
        (*ts - self.start).num_milliseconds() as f64 / 1000.0 / self.t_scale
    }

    fn to_timestamp(&self, t: f64) -> Option<NaiveDateTime> {
        let millis = (t * self.t_scale * 1000.0).round() as i64;
        chrono::Duration::try_milliseconds(millis).and_then(|d| self.start.checked_add_signed(d))
    }

    /// Combine trend and seasonal terms according to the seasonality mode
    fn combine(&self, trend: f64, seasonal: f64) -> f64 {
        match self.config.seasonality_mode {
            SeasonalityMode::Additive => trend + seasonal,
            SeasonalityMode::Multiplicative => trend * (1.0 + seasonal),
        }
    }
}

impl FittedModel for GrowthModel {
    fn history(&self) -> &TimeSeries {
        &self.history
    }

    fn uncertainty_samples(&self) -> usize {
        self.config.uncertainty_samples
    }
}

/// Capped-growth implementation of [`Forecaster`]
///
/// # Example
///
/// ```no_run
/// use energy_forecast::time_series::{Forecaster, GrowthConfig, GrowthForecaster};
/// # fn run(train: energy_forecast::temporal::TimeSeries) -> energy_forecast::error::Result<()> {
/// let forecaster = GrowthForecaster::new(GrowthConfig::logistic());
/// let result = forecaster.forecast(&train.with_cap(4.0), 365)?;
/// println!("{} predictions", result.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GrowthForecaster {
    config: GrowthConfig,
}

impl GrowthForecaster {
    pub fn new(config: GrowthConfig) -> Self {
        GrowthForecaster { config }
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }
}

/// Data and weights of one least-squares pass
struct FitProblem<'a> {
    growth: Growth,
    mode: SeasonalityMode,
    t: &'a [f64],
    y: &'a [f64],
    cap: &'a [f64],
    features: &'a [Vec<f64>],
    changepoints: &'a [f64],
    sigma: f64,
    delta_scale: f64,
    beta_scale: f64,
}

impl FitProblem<'_> {
    fn n_trend(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn trend_params(&self, p: &[f64]) -> TrendParams {
        TrendParams {
            k: p[0],
            m: p[1],
            delta: p[2..self.n_trend()].to_vec(),
        }
    }

    fn trend(&self, p: &[f64]) -> Vec<f64> {
        trend::evaluate(
            self.growth,
            self.t,
            self.cap,
            &self.trend_params(p),
            self.changepoints,
        )
    }

    fn seasonal(&self, p: &[f64]) -> Vec<f64> {
        let beta = &p[self.n_trend()..];
        self.features
            .iter()
            .map(|row| row.iter().zip(beta).map(|(x, b)| x * b).sum())
            .collect()
    }

    fn fitted(&self, p: &[f64]) -> Vec<f64> {
        let trend = self.trend(p);
        let seasonal = self.seasonal(p);
        trend
            .iter()
            .zip(seasonal.iter())
            .map(|(tr, s)| match self.mode {
                SeasonalityMode::Additive => tr + s,
                SeasonalityMode::Multiplicative => tr * (1.0 + s),
            })
            .collect()
    }

    /// Unweighted residual standard deviation
    fn residual_sd(&self, p: &[f64]) -> f64 {
        rms(self
            .fitted(p)
            .iter()
            .zip(self.y.iter())
            .map(|(f, obs)| f - obs))
    }

    fn prior_scales(&self, n_params: usize) -> Vec<f64> {
        let n_trend = self.n_trend();
        (0..n_params)
            .map(|i| match i {
                0 | 1 => TREND_PRIOR_SCALE,
                i if i < n_trend => self.delta_scale,
                _ => self.beta_scale,
            })
            .collect()
    }
}

impl LeastSquares for FitProblem<'_> {
    fn residuals(&self, p: &[f64]) -> Vec<f64> {
        let mut r: Vec<f64> = self
            .fitted(p)
            .iter()
            .zip(self.y.iter())
            .map(|(f, y)| (f - y) / self.sigma)
            .collect();
        r.extend(
            p.iter()
                .zip(self.prior_scales(p.len()))
                .map(|(v, scale)| v / scale),
        );
        r
    }

    fn jacobian(&self, p: &[f64]) -> Vec<Vec<f64>> {
        let n_obs = self.t.len();
        let n_params = p.len();
        let n_trend = self.n_trend();
        let trend = self.trend(p);
        let seasonal = self.seasonal(p);
        let mut jac = vec![vec![0.0; n_params]; n_obs + n_params];

        // Trend columns by central differences
        let mut shifted = p.to_vec();
        for j in 0..n_trend {
            let h = 1e-6 * (1.0 + p[j].abs());
            shifted[j] = p[j] + h;
            let up = self.trend(&shifted);
            shifted[j] = p[j] - h;
            let down = self.trend(&shifted);
            shifted[j] = p[j];
            for i in 0..n_obs {
                let d_trend = (up[i] - down[i]) / (2.0 * h);
                let d = match self.mode {
                    SeasonalityMode::Additive => d_trend,
                    SeasonalityMode::Multiplicative => d_trend * (1.0 + seasonal[i]),
                };
                jac[i][j] = d / self.sigma;
            }
        }

        // Seasonal columns are linear in beta
        for i in 0..n_obs {
            let weight = match self.mode {
                SeasonalityMode::Additive => 1.0,
                SeasonalityMode::Multiplicative => trend[i],
            };
            for (l, x) in self.features[i].iter().enumerate() {
                jac[i][n_trend + l] = weight * x / self.sigma;
            }
        }

        for (j, scale) in self.prior_scales(n_params).into_iter().enumerate() {
            jac[n_obs + j][j] = 1.0 / scale;
        }
        jac
    }
}

fn rms(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v * v, c + 1));
    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}

/// Linear-interpolated percentile of sorted values, `q` in [0, 100]
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

impl Forecaster for GrowthForecaster {
    type Model = GrowthModel;

    fn fit(&self, series: &TimeSeries) -> Result<GrowthModel> {
        let config = &self.config;
        config.validate()?;
        if series.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "fitting needs at least 2 rows, got {}",
                series.len()
            )));
        }

        // Chronological order for changepoint placement; the history keeps source order
        let mut rows = series.rows().to_vec();
        rows.sort_by_key(|r| r.timestamp);

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| !r.value.is_finite()) {
            return Err(Error::InvalidValue(format!(
                "value at {} (row {}) is not finite",
                row.timestamp,
                i + 1
            )));
        }
        let cap = match config.growth {
            Growth::Logistic => {
                let mut caps = Vec::with_capacity(rows.len());
                for (i, row) in rows.iter().enumerate() {
                    match row.cap {
                        Some(c) if c.is_finite() && c > 0.0 => caps.push(c),
                        Some(c) => {
                            return Err(Error::InvalidValue(format!(
                                "cap must be positive, got {} at row {}",
                                c,
                                i + 1
                            )))
                        }
                        None => return Err(Error::MissingCap(i + 1)),
                    }
                }
                caps.last().copied()
            }
            _ => rows.last().and_then(|r| r.cap),
        };

        let start = rows[0].timestamp;
        let end = rows[rows.len() - 1].timestamp;
        let t_scale = (end - start).num_milliseconds() as f64 / 1000.0;
        if !(t_scale > 0.0) {
            return Err(Error::InsufficientData(
                "fitting needs at least two distinct timestamps".to_string(),
            ));
        }

        let y_scale = rows
            .iter()
            .map(|r| r.value.abs())
            .fold(0.0, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let timestamps: Vec<NaiveDateTime> = rows.iter().map(|r| r.timestamp).collect();
        let t: Vec<f64> = timestamps
            .iter()
            .map(|ts| (*ts - start).num_milliseconds() as f64 / 1000.0 / t_scale)
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| r.value / y_scale).collect();
        let cap_scaled: Vec<f64> = rows
            .iter()
            .map(|r| r.cap.unwrap_or(f64::INFINITY) / y_scale)
            .collect();

        let changepoints = match config.growth {
            Growth::Flat => Vec::new(),
            _ => trend::select_changepoints(&t, config.n_changepoints, config.changepoint_range),
        };
        let seasonalities = resolve_seasonalities(
            &timestamps,
            config.yearly_seasonality,
            config.weekly_seasonality,
            config.daily_seasonality,
        );
        let features = seasonal_features(&timestamps, &seasonalities);
        let n_features: usize = seasonalities.iter().map(|s| s.width()).sum();

        let (k0, m0) = match config.growth {
            Growth::Linear => trend::linear_init(&t, &y),
            Growth::Logistic => trend::logistic_init(&t, &y, &cap_scaled),
            Growth::Flat => (0.0, y.iter().sum::<f64>() / y.len() as f64),
        };
        let mut initial = vec![k0, m0];
        initial.extend(std::iter::repeat(0.0).take(changepoints.len() + n_features));

        info!(
            "Fitting {} growth on {} rows ({} changepoints, {} seasonal terms)",
            config.growth,
            rows.len(),
            changepoints.len(),
            n_features
        );

        let options = SolverOptions {
            max_iterations: config.max_iterations,
            ..SolverOptions::default()
        };
        let mut problem = FitProblem {
            growth: config.growth,
            mode: config.seasonality_mode,
            t: &t,
            y: &y,
            cap: &cap_scaled,
            features: &features,
            changepoints: &changepoints,
            sigma: NOMINAL_SIGMA,
            delta_scale: config.changepoint_prior_scale,
            beta_scale: config.seasonality_prior_scale,
        };

        // The noise level weights the priors: fit once at a nominal level, then
        // refit at the level of the first pass residuals
        let first = levenberg_marquardt(&problem, initial, &options)?;
        problem.sigma = problem.residual_sd(&first.params).max(MIN_SIGMA);
        let solution = levenberg_marquardt(&problem, first.params, &options)?;

        let fitted = problem.fitted(&solution.params);
        if fitted.iter().any(|v| !v.is_finite()) {
            return Err(Error::ModelFit(
                "fitted values are not finite".to_string(),
            ));
        }
        let sigma_obs = problem.residual_sd(&solution.params).max(MIN_SIGMA);
        debug!(
            "Fit finished after {} + {} iterations, sigma {:.4e}",
            first.iterations, solution.iterations, sigma_obs
        );

        let n_trend = problem.n_trend();
        let params = problem.trend_params(&solution.params);
        let beta = solution.params[n_trend..].to_vec();

        Ok(GrowthModel {
            config: config.clone(),
            history: series.clone(),
            cap,
            start,
            end,
            t_scale,
            y_scale,
            changepoints,
            params,
            beta,
            seasonalities,
            sigma_obs,
            converged: solution.converged,
        })
    }

    fn extend(&self, model: &GrowthModel, horizon: usize) -> Result<Timeline> {
        let mut rows: Vec<TimelineRow> = model
            .history
            .rows()
            .iter()
            .map(|r| TimelineRow {
                timestamp: r.timestamp,
                cap: model.cap,
            })
            .collect();

        let frequency = model.config.frequency;
        for period in 1..=horizon {
            let periods = u32::try_from(period).map_err(|_| {
                Error::InvalidInput(format!("horizon {} is too large", horizon))
            })?;
            rows.push(TimelineRow {
                timestamp: frequency.advance(model.end, periods)?,
                cap: model.cap,
            });
        }
        debug!(
            "Extended {} history rows by {} periods of {}",
            model.history.len(),
            horizon,
            frequency
        );
        Ok(Timeline::new(rows))
    }

    fn predict(&self, model: &GrowthModel, timeline: &Timeline) -> Result<Vec<ForecastPoint>> {
        let timestamps = timeline.timestamps();
        let t: Vec<f64> = timestamps.iter().map(|ts| model.to_model_time(ts)).collect();

        let cap_scaled: Vec<f64> = match model.config.growth {
            Growth::Logistic => timeline
                .rows()
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    r.cap
                        .map(|c| c / model.y_scale)
                        .ok_or(Error::MissingCap(i + 1))
                })
                .collect::<Result<_>>()?,
            _ => vec![f64::INFINITY; t.len()],
        };

        let trend = trend::evaluate(
            model.config.growth,
            &t,
            &cap_scaled,
            &model.params,
            &model.changepoints,
        );
        let features = seasonal_features(&timestamps, &model.seasonalities);
        let seasonal: Vec<f64> = features
            .iter()
            .map(|row| row.iter().zip(&model.beta).map(|(x, b)| x * b).sum())
            .collect();
        let yhat: Vec<f64> = trend
            .iter()
            .zip(seasonal.iter())
            .map(|(tr, s)| model.combine(*tr, *s))
            .collect();

        let (lower, upper) = if model.config.uncertainty_samples == 0 {
            (yhat.clone(), yhat.clone())
        } else {
            sample_intervals(model, &t, &cap_scaled, &seasonal)?
        };

        let y_scale = model.y_scale;
        Ok(timeline
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| ForecastPoint {
                timestamp: row.timestamp,
                yhat: yhat[i] * y_scale,
                yhat_lower: lower[i] * y_scale,
                yhat_upper: upper[i] * y_scale,
                trend: trend[i] * y_scale,
                cap: row.cap,
            })
            .collect())
    }
}

/// Quantile bounds of simulated paths, in scaled units
///
/// Each path draws new changepoints past the end of the history as a Poisson
/// process with the historical changepoint density, with Laplace rate
/// adjustments at the historical mean magnitude, then adds Gaussian noise.
fn sample_intervals(
    model: &GrowthModel,
    t: &[f64],
    cap: &[f64],
    seasonal: &[f64],
) -> Result<(Vec<f64>, Vec<f64>)> {
    let config = &model.config;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let t_max = t.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n_hist_changepoints = model.changepoints.len();
    let delta_scale = if n_hist_changepoints == 0 {
        1e-8
    } else {
        model.params.delta.iter().map(|d| d.abs()).sum::<f64>() / n_hist_changepoints as f64 + 1e-8
    };
    let noise = Normal::new(0.0, model.sigma_obs)
        .map_err(|e| Error::ModelFit(format!("invalid noise scale: {}", e)))?;
    let arrivals = if n_hist_changepoints > 0 && t_max > 1.0 {
        Some(
            Exp::new(n_hist_changepoints as f64)
                .map_err(|e| Error::ModelFit(format!("invalid changepoint rate: {}", e)))?,
        )
    } else {
        None
    };

    let n_samples = config.uncertainty_samples;
    let mut paths: Vec<Vec<f64>> = vec![Vec::with_capacity(n_samples); t.len()];
    for _ in 0..n_samples {
        let mut changepoints = model.changepoints.clone();
        let mut delta = model.params.delta.clone();
        if let Some(arrivals) = &arrivals {
            let mut at = 1.0 + arrivals.sample(&mut rng);
            while at < t_max {
                let e1: f64 = Exp1.sample(&mut rng);
                let e2: f64 = Exp1.sample(&mut rng);
                changepoints.push(at);
                delta.push(delta_scale * (e1 - e2));
                at += arrivals.sample(&mut rng);
            }
        }
        let params = TrendParams {
            k: model.params.k,
            m: model.params.m,
            delta,
        };
        let trend = trend::evaluate(config.growth, t, cap, &params, &changepoints);
        for (i, path) in paths.iter_mut().enumerate() {
            let y = model.combine(trend[i], seasonal[i]) + noise.sample(&mut rng);
            path.push(y);
        }
    }

    let lower_q = 100.0 * (1.0 - config.interval_width) / 2.0;
    let upper_q = 100.0 * (1.0 + config.interval_width) / 2.0;
    let mut lower = Vec::with_capacity(t.len());
    let mut upper = Vec::with_capacity(t.len());
    for mut path in paths {
        path.sort_by(|a, b| a.total_cmp(b));
        lower.push(percentile(&path, lower_q));
        upper.push(percentile(&path, upper_q));
    }
    Ok((lower, upper))
}
