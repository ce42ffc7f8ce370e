use std::sync::Arc;

use crate::{
    config::PipelineConfig,
    operators::{RollingFold, StatefulOp},
    runtime::{MultiThreadRuntime, PrimaryStream},
    sinks::StatelessSinkImpl,
    sources::SourceImpl,
    types::{EventTime, NoControl, PartitionIndex},
};

/// A record of the rolling sum job: (key, summed field, other field)
pub type Triple = (i32, i32, i32);

/// Sums the second field, the other fields take the values of the latest record.
/// The sum wraps around on overflow.
pub fn sum_second_field(acc: &Triple, next: Triple) -> Triple {
    (next.0, acc.1.wrapping_add(next.1), next.2)
}

/// Key extractor of the rolling sum job
pub fn first_field(t: &Triple) -> i32 {
    t.0
}

/// Partition logic of [rolling_sum]
pub type RollingSumLogic =
    StatefulOp<RollingFold<fn(&Triple, Triple) -> Triple>, i32, Option<Triple>>;

/// Rolling sum of the second field of every triple, keyed by the first field.
///
/// Emits the running total after every record. Records carry no event time, they are
/// timestamped with their position in the source.
pub fn rolling_sum<S>(
    config: &PipelineConfig,
    source: impl SourceImpl<Triple>,
    sink: S,
) -> MultiThreadRuntime<i32, Triple, NoControl, RollingSumLogic, S>
where
    S: StatelessSinkImpl<i32, Triple, EventTime> + Clone,
{
    let mut position: EventTime = 0;
    let tuples = PrimaryStream::new(
        "tuples",
        source,
        first_field,
        move |_: &Triple| {
            let t = position;
            position += 1;
            t
        },
        config.watermarks(),
    );

    MultiThreadRuntime::builder()
        .config(config.clone())
        .logic(Arc::new(|_: PartitionIndex| {
            StatefulOp::new(RollingFold::new(
                sum_second_field as fn(&Triple, Triple) -> Triple,
            ))
        }))
        .sink(sink)
        .build()
        .primary(tuples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_latest_fields() {
        assert_eq!(sum_second_field(&(1, 2, 2), (1, 5, 3)), (1, 7, 3));
        assert_eq!(first_field(&(4, 0, 0)), 4);
    }

    #[test]
    fn sum_wraps_on_overflow() {
        assert_eq!(
            sum_second_field(&(1, i32::MAX, 0), (1, 1, 0)),
            (1, i32::MIN, 0)
        );
    }
}
