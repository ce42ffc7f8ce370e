//! Global error handling mechanisms.

/// Let Firewatch handle fatal errors in the process.
pub trait FirewatchFatal<T, E>: Sized + sealed::Sealed {
    /// Abort the computation due to a fatal non-recoverable error, printing a full
    /// report of the error and its causes.
    fn firewatch_fatal(self) -> T;
}

impl<T, E> FirewatchFatal<T, E> for Result<T, E>
where
    E: std::fmt::Debug + std::error::Error + Send + Sync + 'static,
{
    fn firewatch_fatal(self) -> T {
        match self {
            Ok(x) => x,
            Err(e) => {
                let report = eyre::Report::new(e);
                panic!("{report:?}")
            }
        }
    }
}

mod sealed {
    pub trait Sealed {}

    impl<T, E> Sealed for Result<T, E> {}
}
