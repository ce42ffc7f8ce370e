//! Message types operators exchange with their outputs.

use serde::{Deserialize, Serialize};

/// A keyed, timestamped record.
/// The key decides the owning partition, the timestamp is the record's event time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataMessage<K, V, T> {
    /// Key the record is partitioned by
    pub key: K,
    /// Payload of the record
    pub value: V,
    /// Event time of the record
    pub timestamp: T,
}

impl<K, V, T> DataMessage<K, V, T> {
    /// Create a new record
    pub fn new(key: K, value: V, timestamp: T) -> Self {
        Self {
            key,
            value,
            timestamp,
        }
    }
}

/// Content emitted by an operator.
/// Most messages will be data, an `Epoch` carries the operator's watermark downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<K, V, T> {
    /// A record
    Data(DataMessage<K, V, T>),
    /// Watermark: no records with a timestamp lower or equal to this will follow
    Epoch(T),
}

impl<K, V, T> From<DataMessage<K, V, T>> for Message<K, V, T> {
    fn from(value: DataMessage<K, V, T>) -> Self {
        Message::Data(value)
    }
}
