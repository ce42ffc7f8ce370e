//! The per partition input queue and output.
//!
//! Every partition owns exactly one bounded queue. All upstream threads, primary and
//! control alike, write into it, which serializes both channels into one arrival
//! order per partition.
use std::{sync::Arc, time::Duration};

use flume::{RecvTimeoutError, SendTimeoutError, TryRecvError};
use indexmap::IndexSet;
use thiserror::Error;

use crate::{
    operators::time::MergedFrontier,
    runtime::ShutdownSignal,
    sinks::StatelessSinkImpl,
    sources::SourceError,
    types::{DataMessage, Message, PartitionIndex, SourceId, Timestamp},
};

/// How long a producer blocks on a full queue before it re-checks for shutdown
const SEND_POLL: Duration = Duration::from_millis(50);

/// Everything that can arrive at a partition
#[derive(Debug, Clone)]
pub enum PartitionInput<K, V, T, C> {
    /// A keyed record from a primary source
    Data(DataMessage<K, V, T>),
    /// A broadcast control event
    Control(C),
    /// Watermark of one primary source
    Epoch {
        /// Source which emitted the watermark
        source_id: SourceId,
        /// The watermark
        epoch: T,
    },
    /// A source is exhausted and will not send anything anymore
    Finished {
        /// The exhausted source
        source_id: SourceId,
    },
    /// A source failed
    Fault {
        /// The failed source
        source_id: SourceId,
        /// What went wrong
        error: Arc<SourceError>,
    },
}

/// Sending into a partition queue failed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The partition stopped and dropped its queue
    #[error("partition is not receiving anymore")]
    Disconnected,
    /// A shutdown was requested while sending
    #[error("runtime is shutting down")]
    ShuttingDown,
}

/// Producer side of a partition queue
pub struct PartitionSender<K, V, T, C> {
    tx: flume::Sender<PartitionInput<K, V, T, C>>,
}

impl<K, V, T, C> Clone for PartitionSender<K, V, T, C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<K, V, T, C> PartitionSender<K, V, T, C> {
    /// Send a message, blocking while the queue is full.
    /// Gives up if a shutdown is requested while waiting.
    pub fn send(
        &self,
        msg: PartitionInput<K, V, T, C>,
        shutdown: &ShutdownSignal,
    ) -> Result<(), SendError> {
        let mut pending = msg;
        loop {
            if shutdown.requested().is_some() {
                return Err(SendError::ShuttingDown);
            }
            match self.tx.send_timeout(pending, SEND_POLL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(msg)) => pending = msg,
                Err(SendTimeoutError::Disconnected(_)) => return Err(SendError::Disconnected),
            }
        }
    }
}

/// Send a copy of `msg` to every partition.
///
/// Partitions which already stopped are skipped, the broadcast only fails if none is left
/// or the runtime is shutting down.
pub fn broadcast<K, V, T, C>(
    senders: &[PartitionSender<K, V, T, C>],
    msg: PartitionInput<K, V, T, C>,
    shutdown: &ShutdownSignal,
) -> Result<(), SendError>
where
    PartitionInput<K, V, T, C>: Clone,
{
    let mut delivered = 0;
    for (sender, msg) in senders
        .iter()
        .zip(itertools::repeat_n(msg, senders.len()))
    {
        match sender.send(msg, shutdown) {
            Ok(()) => delivered += 1,
            Err(SendError::Disconnected) => (),
            Err(e) => return Err(e),
        }
    }
    if delivered == 0 {
        Err(SendError::Disconnected)
    } else {
        Ok(())
    }
}

/// Create the queue of one partition.
///
/// `timed_sources` are the sources whose watermarks make up the partition's frontier,
/// `all_sources` every source which will eventually report `Finished`.
pub fn bounded<K, V, T: Timestamp, C>(
    capacity: usize,
    timed_sources: impl IntoIterator<Item = SourceId>,
    all_sources: impl IntoIterator<Item = SourceId>,
) -> (PartitionSender<K, V, T, C>, Input<K, V, T, C>) {
    let (tx, rx) = flume::bounded(capacity);
    let input = Input {
        rx,
        frontier: MergedFrontier::new(timed_sources),
        pending: all_sources.into_iter().collect(),
    };
    (PartitionSender { tx }, input)
}

/// What the partition loop gets out of its [Input]
#[derive(Debug)]
pub enum Received<K, V, T, C> {
    /// A record
    Data(DataMessage<K, V, T>),
    /// A control event
    Control(C),
    /// The merged frontier of all primary sources advanced
    Epoch(T),
    /// Nothing to process right now
    Idle,
    /// All sources finished, nothing will arrive anymore
    Closed,
    /// A source failed
    Fault {
        /// The failed source
        source_id: SourceId,
        /// What went wrong
        error: Arc<SourceError>,
    },
}

/// Consumer side of a partition queue.
///
/// Watermarks of the individual sources are merged here, the partition only ever sees
/// the merged frontier and only when it advances.
pub struct Input<K, V, T, C> {
    rx: flume::Receiver<PartitionInput<K, V, T, C>>,
    frontier: MergedFrontier<T>,
    pending: IndexSet<SourceId>,
}

impl<K, V, T: Timestamp, C> Input<K, V, T, C> {
    /// Receive the next message, waiting at most `timeout`
    pub fn recv(&mut self, timeout: Duration) -> Received<K, V, T, C> {
        if self.pending.is_empty() {
            return Received::Closed;
        }
        let next = if timeout.is_zero() {
            self.rx.try_recv().map_err(|e| match e {
                TryRecvError::Empty => RecvTimeoutError::Timeout,
                TryRecvError::Disconnected => RecvTimeoutError::Disconnected,
            })
        } else {
            self.rx.recv_timeout(timeout)
        };
        match next {
            Ok(msg) => self.handle(msg),
            Err(RecvTimeoutError::Timeout) => Received::Idle,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }

    fn handle(&mut self, msg: PartitionInput<K, V, T, C>) -> Received<K, V, T, C> {
        match msg {
            PartitionInput::Data(d) => Received::Data(d),
            PartitionInput::Control(c) => Received::Control(c),
            PartitionInput::Epoch { source_id, epoch } => self
                .frontier
                .advance(source_id, epoch)
                .map_or(Received::Idle, Received::Epoch),
            PartitionInput::Finished { source_id } => {
                self.pending.swap_remove(&source_id);
                self.frontier
                    .advance(source_id, T::MAX)
                    .map_or(Received::Idle, Received::Epoch)
            }
            PartitionInput::Fault { source_id, error } => Received::Fault { source_id, error },
        }
    }

    /// True if no message is queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// The merged frontier of all primary sources
    pub fn frontier(&self) -> Option<&T> {
        self.frontier.get()
    }
}

/// Output of a partition, writing into that partition's sink
pub struct Output<K, V, T> {
    sink: Box<dyn StatelessSinkImpl<K, V, T>>,
    frontier: Option<T>,
    emitted: u64,
}

impl<K, V, T: Timestamp> Output<K, V, T> {
    /// Create an output for `partition` and open the sink
    pub fn new(mut sink: Box<dyn StatelessSinkImpl<K, V, T>>, partition: PartitionIndex) -> Self {
        sink.open(partition);
        Self {
            sink,
            frontier: None,
            emitted: 0,
        }
    }

    /// Send a message to the sink.
    /// Epochs are only passed on if they advance the output frontier.
    pub fn send(&mut self, msg: Message<K, V, T>) {
        match msg {
            Message::Data(d) => {
                self.emitted += 1;
                self.sink.sink(d);
            }
            Message::Epoch(e) => {
                if self.frontier.as_ref().is_none_or(|f| *f < e) {
                    self.sink.on_epoch(&e);
                    self.frontier = Some(e);
                }
            }
        }
    }

    /// Number of records sent so far
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// The last epoch passed to the sink
    pub fn frontier(&self) -> Option<&T> {
        self.frontier.as_ref()
    }
}
