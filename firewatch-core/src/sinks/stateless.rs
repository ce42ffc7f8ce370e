use crate::types::{DataMessage, PartitionIndex};

/// A sink consuming the output of one partition.
///
/// The runtime clones the configured sink once per partition, so every clone sees the
/// output of exactly one partition in the order that partition produced it.
pub trait StatelessSinkImpl<K, V, T>: Send {
    /// Consume a single record
    fn sink(&mut self, msg: DataMessage<K, V, T>);

    /// The output watermark of the partition advanced to `epoch`
    fn on_epoch(&mut self, _epoch: &T) {}

    /// Called once on the partition's thread before any record is sunk
    fn open(&mut self, _partition: PartitionIndex) {}
}
