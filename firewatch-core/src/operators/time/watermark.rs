use std::time::{Duration, Instant};

use crate::types::EventTime;

/// How often a [PeriodicWatermarks] generator may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkInterval {
    /// Emit whenever the observed event time advanced by at least this many milliseconds
    /// since the last emission
    EventTime(EventTime),
    /// Emit whenever this much wall clock time passed since the last emission
    WallClock(Duration),
}

/// Periodic watermark generator for one source.
///
/// The watermark is the maximum event time observed so far minus the allowed lateness.
/// It only ever moves forward, an old record arriving late never lowers it.
#[derive(Debug, Clone)]
pub struct PeriodicWatermarks {
    max_seen: Option<EventTime>,
    lateness: EventTime,
    interval: WatermarkInterval,
    last_emitted: Option<EventTime>,
    // max_seen at the time of the last emission
    emitted_at: Option<EventTime>,
    last_tick: Instant,
}

impl PeriodicWatermarks {
    /// Create a generator allowing records to be `lateness` milliseconds out of order
    pub fn new(interval: WatermarkInterval, lateness: EventTime) -> Self {
        Self {
            max_seen: None,
            lateness: lateness.max(0),
            interval,
            last_emitted: None,
            emitted_at: None,
            last_tick: Instant::now(),
        }
    }

    /// Record the event time of an ingested record
    pub fn observe(&mut self, event_time: EventTime) {
        self.max_seen = Some(self.max_seen.map_or(event_time, |m| m.max(event_time)));
    }

    /// The watermark as of now, `None` before any record was observed
    pub fn current(&self) -> Option<EventTime> {
        self.max_seen.map(|m| m.saturating_sub(self.lateness))
    }

    /// The last watermark returned by [PeriodicWatermarks::on_periodic]
    pub fn last_emitted(&self) -> Option<EventTime> {
        self.last_emitted
    }

    /// Check whether a watermark is due and return it.
    /// Returns `None` if the interval has not elapsed or the watermark did not increase.
    pub fn on_periodic(&mut self) -> Option<EventTime> {
        let due = match self.interval {
            WatermarkInterval::EventTime(step) => match (self.max_seen, self.emitted_at) {
                (Some(max), Some(prev)) => max.saturating_sub(prev) >= step,
                (Some(_), None) => true,
                (None, _) => false,
            },
            WatermarkInterval::WallClock(period) => self.last_tick.elapsed() >= period,
        };
        if !due {
            return None;
        }
        self.last_tick = Instant::now();
        let candidate = self.current()?;
        if self.last_emitted.is_some_and(|prev| prev >= candidate) {
            return None;
        }
        self.last_emitted = Some(candidate);
        self.emitted_at = self.max_seen;
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_before_first_record() {
        let mut wm = PeriodicWatermarks::new(WatermarkInterval::EventTime(1000), 0);
        assert_eq!(wm.current(), None);
        assert_eq!(wm.on_periodic(), None);
    }

    #[test]
    fn emits_once_per_interval() {
        let mut wm = PeriodicWatermarks::new(WatermarkInterval::EventTime(1000), 0);
        wm.observe(0);
        assert_eq!(wm.on_periodic(), Some(0));
        wm.observe(500);
        assert_eq!(wm.on_periodic(), None);
        wm.observe(1000);
        assert_eq!(wm.on_periodic(), Some(1000));
        assert_eq!(wm.on_periodic(), None);
    }

    #[test]
    fn max_seen_never_decreases() {
        let mut wm = PeriodicWatermarks::new(WatermarkInterval::EventTime(1), 0);
        wm.observe(3000);
        wm.observe(1000);
        assert_eq!(wm.current(), Some(3000));
        assert_eq!(wm.on_periodic(), Some(3000));
        wm.observe(2000);
        assert_eq!(wm.on_periodic(), None);
        assert_eq!(wm.last_emitted(), Some(3000));
    }

    #[test]
    fn subtracts_lateness() {
        let mut wm = PeriodicWatermarks::new(WatermarkInterval::EventTime(1000), 250);
        wm.observe(5000);
        assert_eq!(wm.on_periodic(), Some(4750));
    }

    #[test]
    fn wall_clock_interval() {
        let mut wm = PeriodicWatermarks::new(WatermarkInterval::WallClock(Duration::ZERO), 0);
        wm.observe(10);
        assert_eq!(wm.on_periodic(), Some(10));
        assert_eq!(wm.on_periodic(), None);
        wm.observe(11);
        assert_eq!(wm.on_periodic(), Some(11));
    }
}
