//! Partitioning functions for distributing a keyed stream across processing loops.
//!
//! All functions here hash with [seahash], which is stable across processes and
//! releases, so a key is owned by the same partition for the whole run and across runs.
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use seahash::SeaHasher;

use crate::types::PartitionIndex;

/// Function selecting the partition responsible for a key out of the set of partitions.
pub type Partitioner<K> = fn(&K, &IndexSet<PartitionIndex>) -> PartitionIndex;

fn stable_hash<V: Hash + ?Sized>(value: &V) -> u64 {
    let mut hasher = SeaHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Select a value from a set of choices by applying [rendezvous hashing](https://en.wikipedia.org/wiki/Rendezvous_hashing).
/// Rendezvous hashing ensures minimal shuffling when the set of options changes
/// at the cost of being O(n) with n == options.len()
///
/// **PANIC:** if the set is empty
pub fn rendezvous_select<V: Hash, T: Hash + Copy>(value: &V, options: &IndexSet<T>) -> T {
    let mut hasher = SeaHasher::new();
    value.hash(&mut hasher);

    options
        .iter()
        .map(|x| {
            let mut h = hasher.clone();
            x.hash(&mut h);
            (h.finish(), x)
        })
        .max_by_key(|x| x.0)
        .map(|x| x.1)
        .expect("Collection not empty")
        .to_owned()
}

/// A partitioner using the key's hash as a wrapping index into the set of partitions.
/// Cheaper than [rendezvous_select] but moves most keys if the partition count changes.
///
/// **PANIC:** if the set is empty
pub fn hash_select<V: Hash, T: Copy>(value: &V, options: &IndexSet<T>) -> T {
    let idx = stable_hash(value) % (options.len() as u64);
    *options
        .get_index(idx as usize)
        .expect("Collection not empty")
}

/// A partitioner which just uses the key as a wrapping index on the set of partitions.
///
/// **PANIC:** if the set is empty
pub fn index_select<T: Copy>(i: &u64, options: &IndexSet<T>) -> T {
    let idx = *i % (options.len() as u64);
    *options
        .get_index(idx as usize)
        .expect("Collection not empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn partitions(n: u64) -> IndexSet<PartitionIndex> {
        (0..n).collect()
    }

    #[test]
    fn index_select_wraps() {
        let opts = partitions(3);
        assert_eq!(index_select(&0, &opts), 0);
        assert_eq!(index_select(&4, &opts), 1);
    }

    #[test]
    fn single_partition_owns_everything() {
        let opts = partitions(1);
        for key in ["a", "b", "sensor_17"] {
            assert_eq!(hash_select(&key, &opts), 0);
            assert_eq!(rendezvous_select(&key, &opts), 0);
        }
    }

    proptest! {
        #[test]
        fn selection_is_deterministic(key in ".*", n in 1u64..64) {
            let opts = partitions(n);
            let first = hash_select(&key, &opts);
            prop_assert_eq!(first, hash_select(&key, &opts));
            prop_assert!(first < n);

            let rendezvous = rendezvous_select(&key, &opts);
            prop_assert_eq!(rendezvous, rendezvous_select(&key, &opts.clone()));
            prop_assert!(rendezvous < n);
        }
    }
}
