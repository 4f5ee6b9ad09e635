//! Run configuration
//!
//! The defaults reproduce the fuel price forecast this crate was built for.
//! [`DEFAULT_CAP`] and [`DEFAULT_HORIZON`] are properties of that dataset
//! rather than general recommendations; set them explicitly for other data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::{LoaderOptions, DEFAULT_SKIP_ROWS};
use crate::temporal::Frequency;
use crate::time_series::{Growth, GrowthConfig};

/// Workbook read when no input is configured
pub const DEFAULT_INPUT: &str = "notebooks/forecasting_take_home_data.xlsx";
/// Share of the latest rows held out for testing
pub const DEFAULT_TEST_SIZE: f64 = 0.33;
/// Carrying capacity of the logistic trend, in the units of the series
pub const DEFAULT_CAP: f64 = 4.0;
/// Periods forecast past the end of the training data
pub const DEFAULT_HORIZON: usize = 3103;

/// Everything a pipeline run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub sheet: Option<String>,
    pub skip_rows: usize,
    pub header: bool,
    pub test_size: f64,
    pub cap: f64,
    pub horizon: usize,
    /// "logistic", "linear" or "flat"
    pub growth: String,
    /// Spacing of forecast periods ("D", "H", "W", "M", "auto", ...)
    pub frequency: String,
    pub uncertainty_samples: usize,
    pub interval_width: f64,
    pub seed: Option<u64>,
    pub x_label: String,
    pub y_label: String,
    /// Where to save the chart; nothing is written when unset
    pub output: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input: PathBuf::from(DEFAULT_INPUT),
            sheet: None,
            skip_rows: DEFAULT_SKIP_ROWS,
            header: true,
            test_size: DEFAULT_TEST_SIZE,
            cap: DEFAULT_CAP,
            horizon: DEFAULT_HORIZON,
            growth: "logistic".to_string(),
            frequency: "D".to_string(),
            uncertainty_samples: 1000,
            interval_width: 0.80,
            seed: None,
            x_label: "Date".to_string(),
            y_label: "Fuel Price in dollars".to_string(),
            output: None,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration file, TOML or YAML by extension
    ///
    /// Keys missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&text)?,
            Some("toml") | None => toml::from_str(&text)?,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Unsupported configuration format '{}'",
                    other
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(Error::Config(format!(
                "test_size must be between 0 and 1, got {}",
                self.test_size
            )));
        }
        if !(self.cap.is_finite() && self.cap > 0.0) {
            return Err(Error::Config(format!(
                "cap must be a positive number, got {}",
                self.cap
            )));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(Error::Config(format!(
                "interval_width must be between 0 and 1, got {}",
                self.interval_width
            )));
        }
        self.growth_mode()?;
        self.frequency_mode()?;
        Ok(())
    }

    pub fn growth_mode(&self) -> Result<Growth> {
        self.growth.parse()
    }

    /// Configured frequency, or `None` when it should be inferred from the data
    pub fn frequency_mode(&self) -> Result<Option<Frequency>> {
        if self.frequency.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        Frequency::from_str(&self.frequency)
            .map(Some)
            .ok_or_else(|| Error::Config(format!("Unknown frequency '{}'", self.frequency)))
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            sheet: self.sheet.clone(),
            skip_rows: self.skip_rows,
            header: self.header,
            name: None,
        }
    }

    /// Model settings for this run
    ///
    /// `frequency` is the resolved spacing of forecast periods.
    pub fn growth_config(&self, frequency: Frequency) -> Result<GrowthConfig> {
        Ok(GrowthConfig {
            growth: self.growth_mode()?,
            frequency,
            uncertainty_samples: self.uncertainty_samples,
            interval_width: self.interval_width,
            seed: self.seed,
            ..GrowthConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_fuel_price_run() {
        let config = PipelineConfig::default();
        assert_eq!(config.x_label, "Date");
        assert_eq!(config.y_label, "Fuel Price in dollars");
        assert_eq!(config.test_size, 0.33);
        assert_eq!(config.cap, 4.0);
        assert_eq!(config.horizon, 3103);
        assert_eq!(config.growth_mode().unwrap(), Growth::Logistic);
        assert_eq!(config.skip_rows, 11);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str("cap = 10.0\nhorizon = 30\n").unwrap();
        assert_eq!(config.cap, 10.0);
        assert_eq!(config.horizon, 30);
        assert_eq!(config.test_size, DEFAULT_TEST_SIZE);
    }

    #[test]
    fn rejects_bad_values() {
        let config = PipelineConfig {
            test_size: 1.5,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = PipelineConfig {
            growth: "exponential".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            frequency: "100000000000W".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
