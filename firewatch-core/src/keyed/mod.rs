//! Key based routing of records to partitions
pub mod partitioners;

use indexmap::IndexSet;

use self::partitioners::Partitioner;
use crate::types::PartitionIndex;

/// Routes keys to the partition owning them.
///
/// The assignment is a pure function of the key and the partition count, so it is
/// stable for the lifetime of a run.
pub struct KeyPartitioner<K> {
    partitions: IndexSet<PartitionIndex>,
    select: Partitioner<K>,
}

impl<K> KeyPartitioner<K> {
    /// Create a partitioner over `count` partitions
    pub fn new(count: u64, select: Partitioner<K>) -> Self {
        Self {
            partitions: (0..count).collect(),
            select,
        }
    }

    /// Index of the partition owning this key
    ///
    /// **PANIC:** if the partitioner was created with zero partitions
    pub fn partition_of(&self, key: &K) -> PartitionIndex {
        (self.select)(key, &self.partitions)
    }

    /// All partitions of this partitioner
    pub fn partitions(&self) -> &IndexSet<PartitionIndex> {
        &self.partitions
    }
}

impl<K> Clone for KeyPartitioner<K> {
    fn clone(&self) -> Self {
        Self {
            partitions: self.partitions.clone(),
            select: self.select,
        }
    }
}
