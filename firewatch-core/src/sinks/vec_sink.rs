use crate::{
    sinks::StatelessSinkImpl,
    types::{Data, DataMessage},
};
use std::{
    ops::RangeBounds,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A Helper to write values into a shared vector and take them out again.
/// This is mainly useful to extract values from a job in tests.
/// This struct uses an `Arc<Mutex<Vec<T>>>` internally, so it can be freely
/// cloned and every clone writes into the same vector.
#[derive(Clone)]
pub struct VecSink<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for VecSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VecSink<T> {
    /// Create a new sink which collects all messages into a `Vec`
    pub fn new() -> Self {
        VecSink {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // a panicking partition must not hide what the others collected
    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a value into this sink
    pub fn give(&self, value: T) {
        self.lock().push(value)
    }

    /// Take the given range out of this sink
    pub fn drain_vec<R: RangeBounds<usize>>(&self, range: R) -> Vec<T> {
        self.lock().drain(range).collect()
    }

    /// Number of values currently held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if no values are held
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T> IntoIterator for VecSink<T> {
    type Item = T;

    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.drain_vec(..).into_iter()
    }
}

impl<K, V, T> StatelessSinkImpl<K, V, T> for VecSink<DataMessage<K, V, T>>
where
    K: Data,
    V: Data,
    T: Data,
{
    fn sink(&mut self, msg: DataMessage<K, V, T>) {
        self.give(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let sink: VecSink<DataMessage<String, f64, i64>> = VecSink::new();
        let mut a = sink.clone();
        let mut b = sink.clone();
        a.sink(DataMessage::new("a".to_owned(), 1.0, 0));
        b.sink(DataMessage::new("b".to_owned(), 2.0, 1));
        assert_eq!(sink.len(), 2);
        let keys: Vec<_> = sink.clone().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert!(sink.is_empty());
    }
}
