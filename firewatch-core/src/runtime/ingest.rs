//! The ingestion boundary: turning raw source output into keyed, timestamped records.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, span, warn, Level};

use crate::{
    channels::partition_io::{broadcast, PartitionInput, PartitionSender},
    keyed::KeyPartitioner,
    operators::time::{PeriodicWatermarks, TimestampAssigner},
    runtime::ShutdownSignal,
    sources::{SourceError, SourceImpl},
    types::{Data, DataMessage, EventTime, Key, SourceId},
};

/// A raw record was rejected at the ingestion boundary
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IngestError {
    /// The record has no key and can not be routed to a partition
    #[error("record has no key")]
    MissingKey,
    /// The record's value is NaN
    #[error("value of `{key}` is not a number")]
    NotANumber {
        /// Key of the rejected record
        key: String,
    },
    /// Any other reason to reject a record
    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Counters of one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetrics {
    /// Records forwarded to partitions
    pub ingested: u64,
    /// Records rejected at the ingestion boundary
    pub rejected: u64,
    /// Watermarks emitted
    pub watermarks: u64,
    /// True if the source failed
    pub failed: bool,
}

/// Result of polling a primary stream once
#[derive(Debug)]
pub enum Polled<K, V> {
    /// A record ready to be routed
    Record(DataMessage<K, V, EventTime>),
    /// The source produced an invalid record
    Rejected(IngestError),
    /// The source failed
    Failed(SourceError),
    /// The source is exhausted
    Exhausted,
}

/// A primary stream with its raw record type erased, as consumed by the runtime
pub trait Ingest<K, V>: Send {
    /// Name of the stream
    fn name(&self) -> &str;

    /// Pull the next record out of the source
    fn poll(&mut self) -> Polled<K, V>;

    /// A new watermark, if one is due
    fn on_periodic(&mut self) -> Option<EventTime>;
}

/// A keyed, timestamped stream of records read from a source.
///
/// For every raw record `R` the stream runs the validator, extracts key and event time,
/// advances its watermark generator and finally transforms the record into the value `V`
/// handed to partitions.
///
/// # Example
/// ```rust
/// use firewatch::config::PipelineConfig;
/// use firewatch::runtime::PrimaryStream;
/// use firewatch::sources::SingleIteratorSource;
/// use firewatch::types::sensor::SensorReading;
///
/// let mut stream = PrimaryStream::new(
///     "readings",
///     SingleIteratorSource::new([]),
///     SensorReading::key,
///     SensorReading::event_time,
///     PipelineConfig::default().watermarks(),
/// )
/// .validate(SensorReading::validate)
/// .map(|r: SensorReading| r.temperature);
///
/// let msg = stream.ingest(SensorReading::new("sensor_1", 1000, 70.0)).unwrap();
/// assert_eq!((msg.key.as_str(), msg.value, msg.timestamp), ("sensor_1", 70.0, 1000));
/// assert!(stream.ingest(SensorReading::new("", 1000, 70.0)).is_err());
/// ```
pub struct PrimaryStream<R, K, V> {
    name: String,
    source: Box<dyn SourceImpl<R>>,
    key_by: fn(&R) -> K,
    assigner: Box<dyn TimestampAssigner<R, EventTime>>,
    validator: Option<fn(&R) -> Result<(), IngestError>>,
    transform: Box<dyn FnMut(R) -> V + Send>,
    watermarks: PeriodicWatermarks,
}

impl<R: 'static, K> PrimaryStream<R, K, R> {
    /// Create a stream reading from `source`
    pub fn new(
        name: impl Into<String>,
        source: impl SourceImpl<R>,
        key_by: fn(&R) -> K,
        assigner: impl TimestampAssigner<R, EventTime>,
        watermarks: PeriodicWatermarks,
    ) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
            key_by,
            assigner: Box::new(assigner),
            validator: None,
            transform: Box::new(|r| r),
            watermarks,
        }
    }
}

impl<R: 'static, K, V: 'static> PrimaryStream<R, K, V> {
    /// Reject raw records failing `validator` before they enter the job
    pub fn validate(mut self, validator: fn(&R) -> Result<(), IngestError>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Transform the values handed to partitions
    pub fn map<VO: 'static>(
        self,
        mut mapper: impl FnMut(V) -> VO + Send + 'static,
    ) -> PrimaryStream<R, K, VO> {
        let mut transform = self.transform;
        PrimaryStream {
            name: self.name,
            source: self.source,
            key_by: self.key_by,
            assigner: self.assigner,
            validator: self.validator,
            transform: Box::new(move |r| mapper(transform(r))),
            watermarks: self.watermarks,
        }
    }

    /// Name of this stream
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a raw record through the ingestion boundary
    pub fn ingest(&mut self, raw: R) -> Result<DataMessage<K, V, EventTime>, IngestError> {
        if let Some(validator) = self.validator {
            validator(&raw)?;
        }
        let key = (self.key_by)(&raw);
        let timestamp = self.assigner.assign(&raw);
        self.watermarks.observe(timestamp);
        let value = (self.transform)(raw);
        Ok(DataMessage::new(key, value, timestamp))
    }
}

impl<R, K, V> Ingest<K, V> for PrimaryStream<R, K, V>
where
    R: 'static,
    K: Key,
    V: Data,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn poll(&mut self) -> Polled<K, V> {
        match self.source.next() {
            Some(Ok(raw)) => match self.ingest(raw) {
                Ok(msg) => Polled::Record(msg),
                Err(e) => Polled::Rejected(e),
            },
            Some(Err(e)) => Polled::Failed(e),
            None => Polled::Exhausted,
        }
    }

    fn on_periodic(&mut self) -> Option<EventTime> {
        self.watermarks.on_periodic()
    }
}

/// A stream of control events, broadcast to every partition
pub struct ControlStream<C> {
    name: String,
    source: Box<dyn SourceImpl<C>>,
}

impl<C> ControlStream<C> {
    /// Create a control stream reading from `source`
    pub fn new(name: impl Into<String>, source: impl SourceImpl<C>) -> Self {
        Self {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Name of this stream
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ingestion thread of a primary stream: routes every record to the partition owning
/// its key and broadcasts watermarks, the end of the stream and failures.
pub(crate) fn run_primary<K, V, C>(
    source_id: SourceId,
    mut stream: Box<dyn Ingest<K, V>>,
    partitioner: KeyPartitioner<K>,
    senders: Vec<PartitionSender<K, V, EventTime, C>>,
    shutdown: ShutdownSignal,
) -> SourceMetrics
where
    K: Key,
    V: Data,
    C: Data,
{
    let span = span!(Level::INFO, "ingest", source = stream.name(), source_id);
    let _guard = span.enter();
    let mut metrics = SourceMetrics::default();

    loop {
        if shutdown.requested().is_some() {
            info!(ingested = metrics.ingested, "shutdown requested, stopping ingestion");
            break;
        }
        match stream.poll() {
            Polled::Record(msg) => {
                let partition = partitioner.partition_of(&msg.key);
                let Some(sender) = senders.get(partition as usize) else {
                    error!(partition, "partitioner selected an unknown partition");
                    break;
                };
                if sender.send(PartitionInput::Data(msg), &shutdown).is_err() {
                    break;
                }
                metrics.ingested += 1;
                if let Some(epoch) = stream.on_periodic() {
                    metrics.watermarks += 1;
                    let msg = PartitionInput::Epoch { source_id, epoch };
                    if broadcast(&senders, msg, &shutdown).is_err() {
                        break;
                    }
                }
            }
            Polled::Rejected(e) => {
                metrics.rejected += 1;
                warn!(error = %e, "rejected record");
            }
            Polled::Failed(e) => {
                error!(error = %e, "source failed");
                metrics.failed = true;
                let error = Arc::new(e);
                let msg = PartitionInput::Fault { source_id, error };
                if let Err(e) = broadcast(&senders, msg, &shutdown) {
                    warn!(error = %e, "could not deliver source failure to partitions");
                }
                break;
            }
            Polled::Exhausted => {
                info!(ingested = metrics.ingested, rejected = metrics.rejected, "source exhausted");
                let msg = PartitionInput::Finished { source_id };
                if let Err(e) = broadcast(&senders, msg, &shutdown) {
                    warn!(error = %e, "could not deliver end of stream to partitions");
                }
                break;
            }
        }
    }
    metrics
}

/// Ingestion thread of a control stream: broadcasts every event to all partitions
pub(crate) fn run_control<K, V, C>(
    source_id: SourceId,
    mut stream: ControlStream<C>,
    senders: Vec<PartitionSender<K, V, EventTime, C>>,
    shutdown: ShutdownSignal,
) -> SourceMetrics
where
    K: Data,
    V: Data,
    C: Data,
{
    let span = span!(Level::INFO, "ingest", source = stream.name(), source_id);
    let _guard = span.enter();
    let mut metrics = SourceMetrics::default();

    loop {
        if shutdown.requested().is_some() {
            info!(ingested = metrics.ingested, "shutdown requested, stopping ingestion");
            break;
        }
        match stream.source.next() {
            Some(Ok(event)) => {
                if broadcast(&senders, PartitionInput::Control(event), &shutdown).is_err() {
                    break;
                }
                metrics.ingested += 1;
            }
            Some(Err(e)) => {
                error!(error = %e, "control source failed");
                metrics.failed = true;
                let error = Arc::new(e);
                let msg = PartitionInput::Fault { source_id, error };
                if let Err(e) = broadcast(&senders, msg, &shutdown) {
                    warn!(error = %e, "could not deliver source failure to partitions");
                }
                break;
            }
            None => {
                info!(ingested = metrics.ingested, "control source exhausted");
                let msg = PartitionInput::Finished { source_id };
                if let Err(e) = broadcast(&senders, msg, &shutdown) {
                    warn!(error = %e, "could not deliver end of stream to partitions");
                }
                break;
            }
        }
    }
    metrics
}
