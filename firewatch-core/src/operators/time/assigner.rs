use crate::types::Timestamp;

/// Extracts the event time of a raw record.
///
/// Implemented for every `FnMut(&V) -> T`, so plain functions and closures can be used
/// as assigners.
pub trait TimestampAssigner<V, T: Timestamp>: Send + 'static {
    /// Event time of this record
    fn assign(&mut self, value: &V) -> T;
}

impl<V, T, F> TimestampAssigner<V, T> for F
where
    T: Timestamp,
    F: FnMut(&V) -> T + Send + 'static,
{
    fn assign(&mut self, value: &V) -> T {
        self(value)
    }
}
