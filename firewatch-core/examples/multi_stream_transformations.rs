//! Raise fire alerts for hot readings while the broadcast smoke level is high.
//!
//! Both sources are endless, the job is shut down gracefully after ten seconds.
use std::time::Duration;

use firewatch::config::PipelineConfig;
use firewatch::errorhandling::FirewatchFatal;
use firewatch::jobs::fire_alerts;
use firewatch::runtime::ShutdownMode;
use firewatch::sinks::StdOutSink;
use firewatch::sources::{SensorSource, SmokeLevelSource};

fn main() {
    tracing_subscriber::fmt::init();
    let config = PipelineConfig::from_env().firewatch_fatal();

    let readings = SensorSource::builder()
        .sensors(10)
        .step_ms(100)
        .delay(Duration::from_millis(100))
        .build();
    let smoke_levels = SmokeLevelSource::builder()
        .delay(Duration::from_millis(500))
        .build();

    let job = fire_alerts(&config, readings, smoke_levels, StdOutSink::default());
    let handle = job.handle();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(10));
        handle.shutdown(ShutdownMode::Graceful);
    });

    let report = job.execute().firewatch_fatal();
    println!("{report:#?}");
}
