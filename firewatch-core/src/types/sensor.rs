//! Domain types of the fire detection jobs: temperature readings, smoke levels and alerts.
use std::convert::Infallible;
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::EventTime;
use crate::runtime::IngestError;

/// A single temperature measurement of one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor identifier, used as the partitioning key
    pub id: String,
    /// Event time of the measurement in milliseconds
    pub timestamp: EventTime,
    /// Measured temperature
    pub temperature: f64,
}

impl SensorReading {
    /// Create a new reading
    pub fn new(id: impl Into<String>, timestamp: EventTime, temperature: f64) -> Self {
        Self {
            id: id.into(),
            timestamp,
            temperature,
        }
    }

    /// Key extractor for readings
    pub fn key(reading: &SensorReading) -> String {
        reading.id.clone()
    }

    /// Timestamp assigner for readings
    pub fn event_time(reading: &SensorReading) -> EventTime {
        reading.timestamp
    }

    /// Reject readings that can not be routed or aggregated.
    ///
    /// An empty id has no owning partition and a NaN temperature would poison
    /// every aggregate it takes part in.
    pub fn validate(reading: &SensorReading) -> Result<(), IngestError> {
        if reading.id.is_empty() {
            return Err(IngestError::MissingKey);
        }
        if reading.temperature.is_nan() {
            return Err(IngestError::NotANumber {
                key: reading.id.clone(),
            });
        }
        Ok(())
    }
}

impl Display for SensorReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.timestamp, self.temperature)
    }
}

/// Smoke level reported by the control stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmokeLevel {
    /// No smoke detected. Never raises an alert.
    #[default]
    Low,
    /// Smoke detected
    High,
}

impl SmokeLevel {
    /// Interpret a raw numeric level. `1` is high, everything else is low.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => SmokeLevel::High,
            _ => SmokeLevel::Low,
        }
    }
}

impl FromStr for SmokeLevel {
    type Err = Infallible;

    /// Parsing fails closed: anything that is not recognizably "high" is `Low`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "1" => SmokeLevel::High,
            _ => SmokeLevel::Low,
        };
        Ok(level)
    }
}

/// An event on the broadcast control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    /// The new smoke level
    pub level: SmokeLevel,
}

impl ControlEvent {
    /// Create a control event carrying the given level
    pub fn new(level: SmokeLevel) -> Self {
        Self { level }
    }
}

impl From<SmokeLevel> for ControlEvent {
    fn from(level: SmokeLevel) -> Self {
        Self::new(level)
    }
}

/// Alert raised by the fire detection job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Human readable alert text
    pub message: String,
    /// Event time of the reading which raised the alert
    pub timestamp: EventTime,
}

impl Alert {
    /// Alert for a reading exceeding the threshold while smoke is high
    pub fn risk_of_fire(reading: &SensorReading) -> Self {
        Self {
            message: format!("Risk of fire! {reading}"),
            timestamp: reading.timestamp,
        }
    }
}

impl Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Alert({}, {})", self.message, self.timestamp)
    }
}

/// Convert degrees Fahrenheit to degrees Celsius
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * (5.0 / 9.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_level_fails_closed() {
        assert_eq!("HIGH".parse::<SmokeLevel>(), Ok(SmokeLevel::High));
        assert_eq!(" high ".parse::<SmokeLevel>(), Ok(SmokeLevel::High));
        assert_eq!("LOW".parse::<SmokeLevel>(), Ok(SmokeLevel::Low));
        assert_eq!("MEDIUM".parse::<SmokeLevel>(), Ok(SmokeLevel::Low));
        assert_eq!("".parse::<SmokeLevel>(), Ok(SmokeLevel::Low));
        assert_eq!(SmokeLevel::from_raw(1), SmokeLevel::High);
        assert_eq!(SmokeLevel::from_raw(7), SmokeLevel::Low);
        assert_eq!(SmokeLevel::default(), SmokeLevel::Low);
    }

    #[test]
    fn alert_message_contains_reading() {
        let alert = Alert::risk_of_fire(&SensorReading::new("sensor_3", 4000, 150.5));
        assert_eq!(alert.message, "Risk of fire! (sensor_3, 4000, 150.5)");
        assert_eq!(alert.timestamp, 4000);
    }

    #[test]
    fn validate_readings() {
        assert!(SensorReading::validate(&SensorReading::new("a", 0, 1.0)).is_ok());
        assert!(matches!(
            SensorReading::validate(&SensorReading::new("", 0, 1.0)),
            Err(IngestError::MissingKey)
        ));
        assert!(matches!(
            SensorReading::validate(&SensorReading::new("a", 0, f64::NAN)),
            Err(IngestError::NotANumber { .. })
        ));
    }

    #[test]
    fn converts_fahrenheit() {
        assert!((fahrenheit_to_celsius(32.0)).abs() < 1e-9);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 1e-9);
    }
}
