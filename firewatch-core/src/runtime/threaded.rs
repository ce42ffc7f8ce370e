use std::{any::Any, sync::Arc, thread::JoinHandle};

use bon::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use super::{
    ingest::{run_control, run_primary},
    ControlStream, Ingest, PartitionError, PartitionLoop, RuntimeHandle, ShutdownMode,
    SourceMetrics,
};
use crate::{
    channels::partition_io::bounded,
    config::{ConfigError, PipelineConfig},
    keyed::{
        partitioners::{hash_select, Partitioner},
        KeyPartitioner,
    },
    operators::{PartitionLogic, PartitionMetrics},
    sinks::StatelessSinkImpl,
    types::{Data, EventTime, Key, PartitionIndex, SourceId},
};

/// Builds the logic instance of one partition. Called once on each partition's thread.
pub type LogicFactory<L> = Arc<dyn Fn(PartitionIndex) -> L + Send + Sync>;

/// Runs a job on multiple threads within one process.
///
/// Every partition runs on its own thread, owning its logic instance and all of its
/// state. Every primary stream and every control stream is ingested on a dedicated
/// thread, writing into the bounded input queues of the partitions.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use firewatch::config::PipelineConfig;
/// use firewatch::operators::{RollingFold, StatefulOp};
/// use firewatch::runtime::{MultiThreadRuntime, PrimaryStream};
/// use firewatch::sinks::VecSink;
/// use firewatch::sources::SingleIteratorSource;
/// use firewatch::types::{DataMessage, NoControl, PartitionIndex};
///
/// fn add(acc: &i64, next: i64) -> i64 {
///     acc + next
/// }
/// fn key(x: &i64) -> i64 {
///     x % 2
/// }
///
/// let config = PipelineConfig::builder().partition_count(2).build();
/// let sink: VecSink<DataMessage<i64, i64, i64>> = VecSink::new();
/// let numbers = PrimaryStream::new(
///     "numbers",
///     SingleIteratorSource::new(1..=4),
///     key,
///     |x: &i64| *x,
///     config.watermarks(),
/// );
///
/// let report = MultiThreadRuntime::<i64, i64, NoControl, _, _>::builder()
///     .config(config)
///     .logic(Arc::new(|_: PartitionIndex| {
///         StatefulOp::<_, i64, Option<i64>>::new(RollingFold::new(add))
///     }))
///     .sink(sink.clone())
///     .build()
///     .primary(numbers)
///     .execute()
///     .unwrap();
///
/// assert_eq!(report.total().processed, 4);
/// let mut sums: Vec<_> = sink.into_iter().map(|m| m.value).collect();
/// sums.sort();
/// assert_eq!(sums, vec![1, 2, 4, 6]);
/// ```
#[derive(Builder)]
pub struct MultiThreadRuntime<K, V, C, L, S> {
    config: PipelineConfig,
    logic: LogicFactory<L>,
    sink: S,
    /// Selects the partition of a key, [hash_select] if not set
    partitioner: Option<Partitioner<K>>,
    #[builder(default)]
    handle: RuntimeHandle,
    #[builder(skip)]
    primaries: Vec<Box<dyn Ingest<K, V>>>,
    #[builder(skip)]
    controls: Vec<ControlStream<C>>,
}

impl<K, V, C, L, S> MultiThreadRuntime<K, V, C, L, S> {
    /// Add a keyed primary stream
    pub fn primary(mut self, stream: impl Ingest<K, V> + 'static) -> Self {
        self.primaries.push(Box::new(stream));
        self
    }

    /// Add a control stream broadcast to all partitions
    pub fn control(mut self, stream: ControlStream<C>) -> Self {
        self.controls.push(stream);
        self
    }

    /// Handle to shut the job down while it runs
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }
}

impl<K, V, C, L, S> MultiThreadRuntime<K, V, C, L, S>
where
    K: Key,
    V: Data,
    C: Data,
    L: PartitionLogic<K, V, EventTime, C>,
    S: StatelessSinkImpl<K, L::Output, EventTime> + Clone + 'static,
{
    /// Run the job until all sources are exhausted, a source fails or a shutdown is
    /// requested through [MultiThreadRuntime::handle].
    pub fn execute(self) -> Result<RunReport, ExecutionError> {
        self.config.validate()?;
        let partition_count = self.config.partition_count;
        let primary_ids: Vec<SourceId> = (0..self.primaries.len()).collect();
        let all_ids: Vec<SourceId> = (0..self.primaries.len() + self.controls.len()).collect();
        let shutdown = self.handle.signal();
        info!(
            partitions = partition_count,
            primaries = self.primaries.len(),
            controls = self.controls.len(),
            "starting job"
        );

        let mut senders = Vec::with_capacity(partition_count as usize);
        let mut partition_threads = Vec::with_capacity(partition_count as usize);
        for partition in 0..partition_count {
            let (tx, input) = bounded(
                self.config.queue_capacity,
                primary_ids.iter().copied(),
                all_ids.iter().copied(),
            );
            senders.push(tx);
            let factory = Arc::clone(&self.logic);
            let sink = self.sink.clone();
            let shutdown = shutdown.clone();
            let tick = self.config.tick_interval();
            let thread = std::thread::Builder::new()
                .name(format!("partition-{partition}"))
                .spawn(move || {
                    let logic = factory(partition);
                    PartitionLoop::new(partition, logic, input, Box::new(sink), shutdown, tick)
                        .run()
                })?;
            partition_threads.push((partition, thread));
        }

        let partitioner = KeyPartitioner::new(
            partition_count,
            self.partitioner.unwrap_or(hash_select),
        );
        let mut source_threads: Vec<(String, JoinHandle<SourceMetrics>)> = Vec::new();
        for (source_id, stream) in self.primaries.into_iter().enumerate() {
            let name = stream.name().to_owned();
            let senders = senders.clone();
            let partitioner = partitioner.clone();
            let shutdown = shutdown.clone();
            let thread = std::thread::Builder::new()
                .name(format!("ingest-{name}"))
                .spawn(move || run_primary(source_id, stream, partitioner, senders, shutdown))?;
            source_threads.push((name, thread));
        }
        for (offset, stream) in self.controls.into_iter().enumerate() {
            let source_id = primary_ids.len() + offset;
            let name = stream.name().to_owned();
            let senders = senders.clone();
            let shutdown = shutdown.clone();
            let thread = std::thread::Builder::new()
                .name(format!("ingest-{name}"))
                .spawn(move || run_control(source_id, stream, senders, shutdown))?;
            source_threads.push((name, thread));
        }
        // partitions see their input close once all ingestion threads are done
        drop(senders);

        let mut report = RunReport::default();
        let mut first_error = None;
        for (name, thread) in source_threads {
            match thread.join() {
                Ok(metrics) => {
                    report.sources.insert(name, metrics);
                }
                Err(panic) => {
                    let msg = panic_message(panic);
                    error!(source = %name, panic = %msg, "ingestion thread panicked");
                    // the source never reports finished, so nothing else ends the partitions
                    self.handle.shutdown(ShutdownMode::Abort);
                    first_error.get_or_insert(ExecutionError::Panicked(msg));
                }
            }
        }
        for (partition, thread) in partition_threads {
            match thread.join() {
                Ok(Ok(metrics)) => {
                    report.partitions.insert(partition, metrics);
                }
                Ok(Err(e)) => {
                    first_error.get_or_insert(ExecutionError::Partition(partition, e));
                }
                Err(panic) => {
                    let msg = panic_message(panic);
                    error!(partition, panic = %msg, "partition thread panicked");
                    first_error.get_or_insert(ExecutionError::Panicked(msg));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(total = ?report.total(), "job finished");
                Ok(report)
            }
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Metrics of a finished job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Metrics of every partition
    pub partitions: IndexMap<PartitionIndex, PartitionMetrics>,
    /// Metrics of every source by name
    pub sources: IndexMap<String, SourceMetrics>,
}

impl RunReport {
    /// Metrics summed over all partitions
    pub fn total(&self) -> PartitionMetrics {
        self.partitions
            .values()
            .fold(PartitionMetrics::default(), |mut acc, m| {
                acc.processed += m.processed;
                acc.control_events += m.control_events;
                acc.late_dropped += m.late_dropped;
                acc.emitted += m.emitted;
                acc
            })
    }

    /// Records rejected at the ingestion boundary over all sources
    pub fn rejected(&self) -> u64 {
        self.sources.values().map(|s| s.rejected).sum()
    }
}

/// Running a job failed
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The configuration is invalid
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    /// A thread could not be spawned
    #[error("cannot spawn thread")]
    Spawn(#[from] std::io::Error),
    /// A partition stopped with an error
    #[error("partition {0} failed")]
    Partition(PartitionIndex, #[source] PartitionError),
    /// A thread panicked
    #[error("thread panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channels::partition_io::Output,
        operators::{PartitionContext, StatefulLogic, StatefulOp},
        runtime::PrimaryStream,
        sinks::VecSink,
        sources::{SingleIteratorSource, SourceError},
        types::{DataMessage, NoControl},
    };

    /// Passes records through unchanged
    struct Identity;

    impl StatefulLogic<u64, u64, EventTime, ()> for Identity {
        type Output = u64;

        fn on_data(
            &mut self,
            msg: DataMessage<u64, u64, EventTime>,
            _key_state: (),
            output: &mut Output<u64, u64, EventTime>,
            _ctx: &mut PartitionContext,
        ) -> Option<()> {
            output.send(msg.into());
            None
        }
    }

    type TestSink = VecSink<DataMessage<u64, u64, EventTime>>;
    type TestRuntime =
        MultiThreadRuntime<u64, u64, NoControl, StatefulOp<Identity, u64, ()>, TestSink>;

    fn identity(x: &u64) -> u64 {
        *x
    }

    fn runtime(config: PipelineConfig, sink: TestSink) -> TestRuntime {
        TestRuntime::builder()
            .config(config)
            .logic(Arc::new(|_: PartitionIndex| StatefulOp::new(Identity)))
            .sink(sink)
            .build()
    }

    #[test]
    fn processes_all_records() {
        let config = PipelineConfig::builder().partition_count(3).build();
        let sink = VecSink::new();
        let numbers = PrimaryStream::new(
            "numbers",
            SingleIteratorSource::new(0..100u64),
            identity,
            |x: &u64| *x as EventTime,
            config.watermarks(),
        );
        let report = runtime(config, sink.clone())
            .primary(numbers)
            .execute()
            .unwrap();

        let mut out: Vec<_> = sink.into_iter().map(|m| m.value).collect();
        out.sort();
        assert_eq!(out, (0..100).collect::<Vec<_>>());
        assert_eq!(report.partitions.len(), 3);
        assert_eq!(report.total().processed, 100);
        assert_eq!(report.total().emitted, 100);
        assert_eq!(report.sources["numbers"].ingested, 100);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PipelineConfig::builder().queue_capacity(0).build();
        let result = runtime(config, VecSink::new()).execute();
        assert!(matches!(
            result,
            Err(ExecutionError::Config(ConfigError::NotPositive("queue_capacity")))
        ));
    }

    #[test]
    fn source_failure_fails_job() {
        let config = PipelineConfig::builder().partition_count(2).build();
        let numbers = PrimaryStream::new(
            "numbers",
            SingleIteratorSource::from_results([Ok(1u64), Err(SourceError::new("gone"))]),
            identity,
            |x: &u64| *x as EventTime,
            config.watermarks(),
        );
        let result = runtime(config, VecSink::new()).primary(numbers).execute();
        assert!(matches!(
            result,
            Err(ExecutionError::Partition(
                _,
                PartitionError::SourceFailed { source_id: 0, .. }
            ))
        ));
    }

    #[test]
    fn abort_stops_endless_job() {
        let config = PipelineConfig::builder().partition_count(2).build();
        let numbers = PrimaryStream::new(
            "endless",
            SingleIteratorSource::new(0u64..),
            identity,
            |x: &u64| *x as EventTime,
            config.watermarks(),
        );
        let rt = runtime(config, VecSink::new()).primary(numbers);
        let handle = rt.handle();
        let job = std::thread::spawn(move || rt.execute());
        std::thread::sleep(std::time::Duration::from_millis(50));
        handle.shutdown(ShutdownMode::Abort);
        let report = job.join().unwrap().unwrap();
        assert_eq!(report.partitions.len(), 2);
    }
}
