use std::sync::Arc;

use tracing::debug;

use crate::{
    channels::partition_io::Output,
    config::PipelineConfig,
    operators::{CoLogic, Correlator, PartitionContext},
    runtime::{ControlStream, MultiThreadRuntime, PrimaryStream},
    sinks::StatelessSinkImpl,
    sources::SourceImpl,
    types::{
        sensor::{Alert, ControlEvent, SensorReading, SmokeLevel},
        DataMessage, EventTime, Message, PartitionIndex,
    },
};

/// Control state of one partition.
/// Every partition holds its own copy, which may lag behind other partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionState {
    /// Latest smoke level seen by this partition, low until the first control event
    pub current_level: SmokeLevel,
}

/// Raises an alert for readings above the threshold while the smoke level is high
#[derive(Debug, Clone)]
pub struct FireAlert {
    state: PartitionState,
    threshold: f64,
}

impl FireAlert {
    /// Alert on readings strictly above `threshold`
    pub fn new(threshold: f64) -> Self {
        Self {
            state: PartitionState::default(),
            threshold,
        }
    }

    /// Current control state
    pub fn state(&self) -> &PartitionState {
        &self.state
    }
}

impl CoLogic<String, SensorReading, EventTime, ControlEvent> for FireAlert {
    type Output = Alert;

    fn on_primary(
        &mut self,
        msg: DataMessage<String, SensorReading, EventTime>,
        output: &mut Output<String, Alert, EventTime>,
        _ctx: &mut PartitionContext,
    ) {
        if self.state.current_level == SmokeLevel::High && msg.value.temperature > self.threshold {
            let alert = Alert::risk_of_fire(&msg.value);
            output.send(Message::Data(DataMessage::new(msg.key, alert, msg.timestamp)));
        }
    }

    fn on_control(&mut self, event: ControlEvent, ctx: &mut PartitionContext) {
        if event.level != self.state.current_level {
            debug!(partition = ctx.partition, level = ?event.level, "smoke level changed");
        }
        self.state.current_level = event.level;
    }
}

/// Partition logic of [fire_alerts]
pub type FireAlertLogic = Correlator<FireAlert>;

/// Correlates temperature readings with broadcast smoke levels and raises fire alerts.
pub fn fire_alerts<S>(
    config: &PipelineConfig,
    readings: impl SourceImpl<SensorReading>,
    smoke_levels: impl SourceImpl<ControlEvent>,
    sink: S,
) -> MultiThreadRuntime<String, SensorReading, ControlEvent, FireAlertLogic, S>
where
    S: StatelessSinkImpl<String, Alert, EventTime> + Clone,
{
    let readings = PrimaryStream::new(
        "sensor-readings",
        readings,
        SensorReading::key,
        SensorReading::event_time,
        config.watermarks(),
    )
    .validate(SensorReading::validate);

    let threshold = config.alert_threshold;
    MultiThreadRuntime::builder()
        .config(config.clone())
        .logic(Arc::new(move |_: PartitionIndex| {
            Correlator::new(FireAlert::new(threshold))
        }))
        .sink(sink)
        .build()
        .primary(readings)
        .control(ControlStream::new("smoke-levels", smoke_levels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PartitionTester;

    type Tester = PartitionTester<String, SensorReading, ControlEvent>;

    fn reading(t: EventTime, temperature: f64) -> SensorReading {
        SensorReading::new("sensor_1", t, temperature)
    }

    #[test]
    fn alerts_only_after_high_arrives() {
        let (out, metrics) = Tester::new(1, 1)
            .control(ControlEvent::new(SmokeLevel::Low))
            .data("sensor_1".to_owned(), reading(1000, 50.0), 1000)
            .control(ControlEvent::new(SmokeLevel::High))
            .data("sensor_1".to_owned(), reading(2000, 150.0), 2000)
            .run(Correlator::new(FireAlert::new(100.0)));

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value.message, "Risk of fire! (sensor_1, 2000, 150)");
        assert_eq!(out[0].timestamp, 2000);
        assert_eq!(metrics.control_events, 2);
    }

    #[test]
    fn defaults_to_low_before_any_control() {
        let (out, _) = Tester::new(1, 1)
            .data("sensor_1".to_owned(), reading(0, 500.0), 0)
            .run(Correlator::new(FireAlert::new(100.0)));
        assert!(out.is_empty());
    }

    #[test]
    fn later_control_does_not_change_earlier_outcome() {
        let (out, _) = Tester::new(1, 1)
            .control(ControlEvent::new(SmokeLevel::High))
            .data("sensor_1".to_owned(), reading(0, 101.0), 0)
            .control(ControlEvent::new(SmokeLevel::Low))
            .data("sensor_1".to_owned(), reading(1, 101.0), 1)
            .run(Correlator::new(FireAlert::new(100.0)));
        let times: Vec<_> = out.iter().map(|m| m.timestamp).collect();
        assert_eq!(times, vec![0]);
    }

    #[test]
    fn threshold_is_exclusive() {
        let (out, _) = Tester::new(1, 1)
            .control(ControlEvent::new(SmokeLevel::High))
            .data("sensor_1".to_owned(), reading(0, 100.0), 0)
            .run(Correlator::new(FireAlert::new(100.0)));
        assert!(out.is_empty());
    }
}
