use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    channels::partition_io::Output,
    types::{Data, DataMessage, PartitionIndex},
};

/// Counters kept by every partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    /// Records handed to the partition's logic
    pub processed: u64,
    /// Control events handed to the partition's logic
    pub control_events: u64,
    /// Records dropped because their window already fired
    pub late_dropped: u64,
    /// Records written to the sink
    pub emitted: u64,
}

/// Context handed to partition logic on every invocation
#[derive(Debug, Clone)]
pub struct PartitionContext {
    /// Index of the partition executing the logic
    pub partition: PartitionIndex,
    /// Counters of this partition
    pub metrics: PartitionMetrics,
}

impl PartitionContext {
    /// Create a context for the given partition
    pub fn new(partition: PartitionIndex) -> Self {
        Self {
            partition,
            metrics: PartitionMetrics::default(),
        }
    }
}

/// The logic executed by one partition loop.
///
/// Every partition owns its own instance and invokes it strictly sequentially, in the
/// arrival order of its input queue. Implementations therefore never need
/// synchronization for their state.
pub trait PartitionLogic<K, V, T, C>: 'static {
    /// Value type emitted by this logic
    type Output: Data;

    /// Handle a record from a primary source
    fn on_data(
        &mut self,
        msg: DataMessage<K, V, T>,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    );

    /// Handle a broadcast control event
    #[allow(unused)]
    fn on_control(
        &mut self,
        event: C,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
    }

    /// The partition's frontier advanced to `epoch`.
    /// The epoch itself is forwarded to the output by the partition loop afterwards.
    #[allow(unused)]
    fn on_epoch(
        &mut self,
        epoch: &T,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
    }

    /// Called periodically, even if no input arrives
    #[allow(unused)]
    fn on_schedule(
        &mut self,
        now: Instant,
        output: &mut Output<K, Self::Output, T>,
        ctx: &mut PartitionContext,
    ) {
    }

    /// The job is aborted. Any buffered state must be discarded without emitting.
    #[allow(unused)]
    fn on_abort(&mut self, ctx: &mut PartitionContext) {}
}
