//! Rolling sum of the second field of a few tuples, keyed by the first field
use firewatch::config::PipelineConfig;
use firewatch::errorhandling::FirewatchFatal;
use firewatch::jobs::rolling_sum;
use firewatch::sinks::StdOutSink;
use firewatch::sources::SingleIteratorSource;

fn main() {
    tracing_subscriber::fmt::init();
    let config = PipelineConfig::from_env().firewatch_fatal();
    let tuples = SingleIteratorSource::new([(1, 2, 2), (2, 3, 1), (2, 2, 4), (1, 5, 3)]);

    rolling_sum(&config, tuples, StdOutSink::default())
        .execute()
        .firewatch_fatal();
}
