//! Utilities for testing partition logic deterministically
use std::time::Duration;

use crate::{
    channels::partition_io::{bounded, PartitionInput},
    operators::{PartitionLogic, PartitionMetrics},
    runtime::{PartitionLoop, ShutdownSignal},
    sinks::VecSink,
    types::{Data, DataMessage, EventTime, SourceId},
};

/// Runs one partition loop on the current thread against a scripted arrival order.
///
/// Source `0..primaries` are primary sources, the following `controls` sources are
/// control sources. All of them report finished after the script, so the loop runs
/// until all pending windows fired.
pub(crate) struct PartitionTester<K, V, C> {
    script: Vec<PartitionInput<K, V, EventTime, C>>,
    primaries: usize,
    controls: usize,
}

impl<K, V, C> PartitionTester<K, V, C>
where
    K: Data,
    V: Data,
    C: Data,
{
    pub(crate) fn new(primaries: usize, controls: usize) -> Self {
        Self {
            script: Vec::new(),
            primaries,
            controls,
        }
    }

    pub(crate) fn data(mut self, key: K, value: V, timestamp: EventTime) -> Self {
        self.script
            .push(PartitionInput::Data(DataMessage::new(key, value, timestamp)));
        self
    }

    pub(crate) fn control(mut self, event: C) -> Self {
        self.script.push(PartitionInput::Control(event));
        self
    }

    pub(crate) fn epoch(mut self, source_id: SourceId, epoch: EventTime) -> Self {
        self.script.push(PartitionInput::Epoch { source_id, epoch });
        self
    }

    /// Run the script through `logic`, returning everything emitted and the metrics
    pub(crate) fn run<L>(
        self,
        logic: L,
    ) -> (Vec<DataMessage<K, L::Output, EventTime>>, PartitionMetrics)
    where
        L: PartitionLogic<K, V, EventTime, C>,
    {
        let sources: Vec<SourceId> = (0..self.primaries + self.controls).collect();
        let (tx, input) = bounded(
            self.script.len() + sources.len(),
            0..self.primaries,
            sources.iter().copied(),
        );
        let shutdown = ShutdownSignal::never();
        for msg in self.script {
            tx.send(msg, &shutdown).expect("queue has room for the script");
        }
        for source_id in sources {
            tx.send(PartitionInput::Finished { source_id }, &shutdown)
                .expect("queue has room for the script");
        }

        let sink: VecSink<DataMessage<K, L::Output, EventTime>> = VecSink::new();
        let metrics = PartitionLoop::new(
            0,
            logic,
            input,
            Box::new(sink.clone()),
            shutdown,
            Duration::from_secs(3600),
        )
        .run()
        .expect("scripted partition does not fail");
        (sink.into_iter().collect(), metrics)
    }
}
