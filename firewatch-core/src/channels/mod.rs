//! Channels connecting ingestion threads, partition loops and sinks
pub mod partition_io;
