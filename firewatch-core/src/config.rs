//! Configuration of a Firewatch pipeline
use std::{collections::HashMap, str::FromStr, time::Duration};

use bon::Builder;
use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    operators::time::{PeriodicWatermarks, WatermarkInterval},
    types::EventTime,
};

/// Which clock decides when windows fire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeCharacteristic {
    /// Windows fire when the watermark passes their end
    #[default]
    EventTime,
    /// Windows fire once they existed for their size on the wall clock
    ProcessingTime,
}

impl FromStr for TimeCharacteristic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "eventtime" => Ok(Self::EventTime),
            "processingtime" => Ok(Self::ProcessingTime),
            _ => Err(ConfigError::UnknownTimeCharacteristic(s.to_owned())),
        }
    }
}

/// Invalid configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A size, interval or count is zero or negative
    #[error("`{0}` must be positive")]
    NotPositive(&'static str),
    /// A value is negative
    #[error("`{0}` must not be negative")]
    Negative(&'static str),
    /// A float is NaN
    #[error("`{0}` must be a number")]
    NotANumber(&'static str),
    /// Not a valid time characteristic
    #[error("unknown time characteristic `{0}`, expected `EventTime` or `ProcessingTime`")]
    UnknownTimeCharacteristic(String),
    /// Reading the environment failed
    #[error("cannot read configuration from environment: {0}")]
    Env(String),
}

/// Configuration of a pipeline, passed explicitly to the runtime and the jobs.
///
/// Build it with [PipelineConfig::builder], read it from `FIREWATCH_*` environment
/// variables with [PipelineConfig::from_env] or deserialize it.
#[derive(Debug, Clone, PartialEq, Builder, Envconfig, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Size of tumbling windows in milliseconds
    #[builder(default = 5000)]
    #[envconfig(from = "FIREWATCH_WINDOW_SIZE_MS", default = "5000")]
    pub window_size_ms: EventTime,

    /// Minimum distance between two watermarks of a source, in milliseconds of event
    /// time, or of wall clock time in processing time mode
    #[builder(default = 1000)]
    #[envconfig(from = "FIREWATCH_WATERMARK_INTERVAL_MS", default = "1000")]
    pub watermark_interval_ms: EventTime,

    /// How far records may be out of order without being late
    #[builder(default = 0)]
    #[envconfig(from = "FIREWATCH_ALLOWED_LATENESS_MS", default = "0")]
    pub allowed_lateness_ms: EventTime,

    /// Number of parallel partitions
    #[builder(default = 4)]
    #[envconfig(from = "FIREWATCH_PARTITION_COUNT", default = "4")]
    pub partition_count: u64,

    /// Temperature above which a reading raises an alert while smoke is high
    #[builder(default = 100.0)]
    #[envconfig(from = "FIREWATCH_ALERT_THRESHOLD", default = "100.0")]
    pub alert_threshold: f64,

    /// Convert readings from Fahrenheit to Celsius before averaging
    #[builder(default = false)]
    #[envconfig(from = "FIREWATCH_CONVERT_FAHRENHEIT", default = "false")]
    pub convert_fahrenheit: bool,

    /// Capacity of each partition's input queue
    #[builder(default = 1024)]
    #[envconfig(from = "FIREWATCH_QUEUE_CAPACITY", default = "1024")]
    pub queue_capacity: usize,

    /// Which clock fires windows
    #[builder(default)]
    #[envconfig(from = "FIREWATCH_TIME_CHARACTERISTIC", default = "EventTime")]
    pub time_characteristic: TimeCharacteristic,

    /// How often partitions run their scheduled work, in milliseconds
    #[builder(default = 100)]
    #[envconfig(from = "FIREWATCH_TICK_INTERVAL_MS", default = "100")]
    pub tick_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Read the configuration from `FIREWATCH_*` environment variables and validate it
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::init_from_env().map_err(|e| ConfigError::Env(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the configuration from a map of variables, as [PipelineConfig::from_env] does
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let config = Self::init_from_hashmap(vars).map_err(|e| ConfigError::Env(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check all values are within their allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size_ms <= 0 {
            return Err(ConfigError::NotPositive("window_size_ms"));
        }
        if self.watermark_interval_ms <= 0 {
            return Err(ConfigError::NotPositive("watermark_interval_ms"));
        }
        if self.allowed_lateness_ms < 0 {
            return Err(ConfigError::Negative("allowed_lateness_ms"));
        }
        if self.partition_count == 0 {
            return Err(ConfigError::NotPositive("partition_count"));
        }
        if self.alert_threshold.is_nan() {
            return Err(ConfigError::NotANumber("alert_threshold"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NotPositive("queue_capacity"));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::NotPositive("tick_interval_ms"));
        }
        Ok(())
    }

    /// Interval of scheduled partition work
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// A watermark generator configured for this pipeline
    pub fn watermarks(&self) -> PeriodicWatermarks {
        let interval = match self.time_characteristic {
            TimeCharacteristic::EventTime => {
                WatermarkInterval::EventTime(self.watermark_interval_ms)
            }
            TimeCharacteristic::ProcessingTime => WatermarkInterval::WallClock(
                Duration::from_millis(self.watermark_interval_ms.unsigned_abs()),
            ),
        };
        PeriodicWatermarks::new(interval, self.allowed_lateness_ms)
    }
}
