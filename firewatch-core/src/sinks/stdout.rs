use std::fmt::Debug;

use super::StatelessSinkImpl;
use crate::types::{DataMessage, PartitionIndex};

/// Prints every record to stdout, prefixed with the index of the partition which
/// produced it.
#[derive(Debug, Clone, Default)]
pub struct StdOutSink {
    partition: PartitionIndex,
}

impl<K, V, T> StatelessSinkImpl<K, V, T> for StdOutSink
where
    K: Debug,
    V: Debug,
    T: Debug,
{
    fn open(&mut self, partition: PartitionIndex) {
        self.partition = partition;
    }

    fn sink(&mut self, msg: DataMessage<K, V, T>) {
        println!(
            "{}> {{ key: {:?}, value: {:?}, timestamp: {:?} }}",
            self.partition, msg.key, msg.value, msg.timestamp
        )
    }
}
