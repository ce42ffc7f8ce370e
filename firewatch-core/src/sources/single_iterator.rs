use super::{SourceError, SourceImpl};

/// A source which yields the values of an iterator.
///
/// # Example
/// ```rust
/// use firewatch::sources::{SingleIteratorSource, SourceImpl};
///
/// let mut source = SingleIteratorSource::new(0..2);
/// assert_eq!(source.next().map(Result::ok), Some(Some(0)));
/// assert_eq!(source.next().map(Result::ok), Some(Some(1)));
/// assert!(source.next().is_none());
/// ```
pub struct SingleIteratorSource<V>(Box<dyn Iterator<Item = Result<V, SourceError>> + Send>);

impl<V: 'static> SingleIteratorSource<V> {
    /// Create a new source from an iterable value
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = V>,
        <I as IntoIterator>::IntoIter: Send + 'static,
    {
        Self(Box::new(iter.into_iter().map(Ok)))
    }

    /// Create a source from an iterator which may fail
    pub fn from_results<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<V, SourceError>>,
        <I as IntoIterator>::IntoIter: Send + 'static,
    {
        Self(Box::new(iter.into_iter()))
    }
}

impl<V: 'static> SourceImpl<V> for SingleIteratorSource<V> {
    fn next(&mut self) -> Option<Result<V, SourceError>> {
        self.0.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yields_errors_in_order() {
        let mut source = SingleIteratorSource::from_results([
            Ok(1),
            Err(SourceError::new("connection reset")),
        ]);
        assert!(matches!(source.next(), Some(Ok(1))));
        match source.next() {
            Some(Err(e)) => assert_eq!(e.to_string(), "source failed: connection reset"),
            _ => panic!("expected an error"),
        }
        assert!(source.next().is_none());
    }
}
