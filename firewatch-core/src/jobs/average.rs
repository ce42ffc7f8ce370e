use std::sync::Arc;

use crate::{
    config::PipelineConfig,
    operators::{
        window::{Average, KeyWindows, WindowAggregator},
        StatefulOp,
    },
    runtime::{MultiThreadRuntime, PrimaryStream},
    sinks::StatelessSinkImpl,
    sources::SourceImpl,
    types::{
        sensor::{fahrenheit_to_celsius, SensorReading},
        EventTime, NoControl, PartitionIndex,
    },
};

/// Partition logic of [average_temperatures]
pub type AverageLogic = StatefulOp<WindowAggregator<Average>, String, KeyWindows<Average>>;

/// Average temperature per sensor over tumbling windows.
///
/// Emits one record per sensor and window, timestamped with the window's end. Readings
/// are converted from Fahrenheit to Celsius first if `convert_fahrenheit` is set.
pub fn average_temperatures<S>(
    config: &PipelineConfig,
    source: impl SourceImpl<SensorReading>,
    sink: S,
) -> MultiThreadRuntime<String, f64, NoControl, AverageLogic, S>
where
    S: StatelessSinkImpl<String, f64, EventTime> + Clone,
{
    let convert = config.convert_fahrenheit;
    let readings = PrimaryStream::new(
        "sensor-readings",
        source,
        SensorReading::key,
        SensorReading::event_time,
        config.watermarks(),
    )
    .validate(SensorReading::validate)
    .map(move |r: SensorReading| {
        if convert {
            fahrenheit_to_celsius(r.temperature)
        } else {
            r.temperature
        }
    });

    let window_size = config.window_size_ms;
    let trigger = config.time_characteristic;
    MultiThreadRuntime::builder()
        .config(config.clone())
        .logic(Arc::new(move |_: PartitionIndex| {
            StatefulOp::new(WindowAggregator::new(window_size, trigger))
        }))
        .sink(sink)
        .build()
        .primary(readings)
}
