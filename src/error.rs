use std::io;

/// Errors raised while building or loading a controller configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("output limits are invalid: min {min} must be finite and not exceed max {max}")]
    InvalidOutputLimits { min: f64, max: f64 },

    #[error("gain {name} must be finite, got {value}")]
    NonFiniteGain { name: &'static str, value: f64 },

    #[error("minimum derivative interval must be finite and non-negative, got {0}")]
    InvalidMinDt(f64),

    #[error("simulation timing is invalid: dt {dt} must be finite and positive, max_time {max_time} finite and non-negative")]
    InvalidSimTiming { dt: f64, max_time: f64 },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
