//! Sources feeding records into a Firewatch job
mod sensor;
mod single_iterator;

pub use sensor::{SensorSource, SmokeLevelSource};
pub use single_iterator::SingleIteratorSource;

use thiserror::Error;

/// A pull based source of values.
///
/// A source is polled from its own ingestion thread until it returns `None`, which
/// marks it as exhausted. A source must not duplicate values by itself.
pub trait SourceImpl<V>: Send + 'static {
    /// Next value of this source.
    /// `None` means the source is exhausted, an error is fatal for the job.
    fn next(&mut self) -> Option<Result<V, SourceError>>;
}

/// A source failed and can not produce any more values
#[derive(Debug, Error)]
#[error("source failed: {0}")]
pub struct SourceError(Box<dyn std::error::Error + Send + Sync>);

impl SourceError {
    /// Wrap an arbitrary error
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}
