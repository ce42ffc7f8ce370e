//! Average temperature per sensor over 5 second windows, converted to Celsius.
//!
//! Configure with `FIREWATCH_*` environment variables, e.g.
//! `FIREWATCH_PARTITION_COUNT=2 cargo run --example average_sensor_readings`
use firewatch::config::PipelineConfig;
use firewatch::errorhandling::FirewatchFatal;
use firewatch::jobs::average_temperatures;
use firewatch::sinks::StdOutSink;
use firewatch::sources::SensorSource;

fn main() {
    tracing_subscriber::fmt::init();
    let mut config = PipelineConfig::from_env().firewatch_fatal();
    config.convert_fahrenheit = true;

    // one minute of readings from 10 sensors
    let readings = SensorSource::builder()
        .sensors(10)
        .step_ms(100)
        .limit(6000)
        .build();

    let report = average_temperatures(&config, readings, StdOutSink::default())
        .execute()
        .firewatch_fatal();
    println!("{report:#?}");
}
