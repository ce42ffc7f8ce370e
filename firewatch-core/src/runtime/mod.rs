//! Runtimes executing Firewatch jobs
mod ingest;
mod partition;
mod shutdown;
mod threaded;

pub use ingest::{ControlStream, Ingest, IngestError, Polled, PrimaryStream, SourceMetrics};
pub use partition::{PartitionError, PartitionLoop};
pub use shutdown::{RuntimeHandle, ShutdownMode, ShutdownSignal};
pub use threaded::{ExecutionError, MultiThreadRuntime, RunReport};
