//! Demo sources generating random sensor readings and smoke levels
use std::time::Duration;

use bon::bon;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{SourceError, SourceImpl};
use crate::types::{
    sensor::{ControlEvent, SensorReading, SmokeLevel},
    EventTime,
};

/// Generates temperature readings in Fahrenheit for a fixed set of sensors.
///
/// Every sensor starts somewhere around 65°F and then performs a random walk. One reading
/// per sensor is emitted for every step of model time.
pub struct SensorSource {
    rng: StdRng,
    sensors: Vec<(String, f64)>,
    cursor: usize,
    now: EventTime,
    step_ms: EventTime,
    remaining: Option<u64>,
    delay: Option<Duration>,
}

#[bon]
impl SensorSource {
    /// Create a new source.
    ///
    /// - `sensors`: number of sensors, named `sensor_0` to `sensor_{n-1}`
    /// - `step_ms`: model time between two rounds of readings
    /// - `seed`: seed for reproducible output
    /// - `limit`: total number of readings after which the source is exhausted
    /// - `delay`: wall clock pause between two rounds
    #[builder]
    pub fn new(
        #[builder(default = 10)] sensors: usize,
        #[builder(default = 100)] step_ms: EventTime,
        #[builder(default = 0)] start: EventTime,
        seed: Option<u64>,
        limit: Option<u64>,
        delay: Option<Duration>,
    ) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let sensors = (0..sensors)
            .map(|i| (format!("sensor_{i}"), 65.0 + rng.gen_range(-20.0..20.0)))
            .collect();
        Self {
            rng,
            sensors,
            cursor: 0,
            now: start,
            step_ms,
            remaining: limit,
            delay,
        }
    }
}

impl SourceImpl<SensorReading> for SensorSource {
    fn next(&mut self) -> Option<Result<SensorReading, SourceError>> {
        if self.sensors.is_empty() || self.remaining == Some(0) {
            return None;
        }
        if self.cursor == self.sensors.len() {
            self.cursor = 0;
            self.now += self.step_ms;
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        let (id, temperature) = &mut self.sensors[self.cursor];
        *temperature += self.rng.gen_range(-0.5..0.5);
        let reading = SensorReading::new(id.clone(), self.now, *temperature);
        self.cursor += 1;
        Some(Ok(reading))
    }
}

/// Generates smoke levels, most of them low
pub struct SmokeLevelSource {
    rng: StdRng,
    remaining: Option<u64>,
    delay: Option<Duration>,
}

#[bon]
impl SmokeLevelSource {
    /// Create a new source.
    ///
    /// - `seed`: seed for reproducible output
    /// - `limit`: number of events after which the source is exhausted
    /// - `delay`: wall clock pause between two events
    #[builder]
    pub fn new(seed: Option<u64>, limit: Option<u64>, delay: Option<Duration>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            remaining: limit,
            delay,
        }
    }
}

impl SourceImpl<ControlEvent> for SmokeLevelSource {
    fn next(&mut self) -> Option<Result<ControlEvent, SourceError>> {
        match self.remaining.as_mut() {
            Some(0) => return None,
            Some(remaining) => *remaining -= 1,
            None => (),
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let level = if self.rng.gen_bool(0.2) {
            SmokeLevel::High
        } else {
            SmokeLevel::Low
        };
        Some(Ok(ControlEvent::new(level)))
    }
}
