use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Intervals shorter than this skip the derivative term (seconds).
pub const DEFAULT_MIN_DT: f64 = 1e-3;

// ---------------------------------------------------------------------------
// Controller configuration
// ---------------------------------------------------------------------------

/// Gains and output bounds for a [`PidController`](crate::PidController).
///
/// Bounds are fixed for the lifetime of a controller; gains can be retuned
/// live through the controller's setters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidConfig {
    #[serde(default)]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Elapsed intervals below this many seconds contribute no derivative.
    #[serde(default = "default_min_dt")]
    pub min_dt: f64,
}

fn default_min_dt() -> f64 {
    DEFAULT_MIN_DT
}

impl PidConfig {
    pub fn new(kp: f64, ki: f64, kd: f64, output_max: f64, output_min: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            output_min,
            output_max,
            min_dt: DEFAULT_MIN_DT,
        }
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = min_dt;
        self
    }

    /// Check that bounds are finite and ordered, gains are finite and the
    /// derivative interval threshold is a usable duration.
    pub fn validate(&self) -> Result<()> {
        if !self.output_min.is_finite()
            || !self.output_max.is_finite()
            || self.output_min > self.output_max
        {
            return Err(ConfigError::InvalidOutputLimits {
                min: self.output_min,
                max: self.output_max,
            });
        }
        check_gain("kp", self.kp)?;
        check_gain("ki", self.ki)?;
        check_gain("kd", self.kd)?;
        if !self.min_dt.is_finite() || self.min_dt < 0.0 {
            return Err(ConfigError::InvalidMinDt(self.min_dt));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// ```toml
    /// kp = 2.0
    /// ki = 0.5
    /// kd = 0.1
    /// output_min = 0.0
    /// output_max = 100.0
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PidConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

pub(crate) fn check_gain(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFiniteGain { name, value })
    }
}
