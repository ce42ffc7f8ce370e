//! Firewatch is a small engine for processing unbounded sensor streams.
//!
//! Readings are keyed, partitioned across N single threaded processing loops and run
//! through tumbling event time windows, rolling folds or a correlator which merges the
//! keyed stream with a broadcast control stream.
pub mod channels;
pub mod config;
pub mod errorhandling;
pub mod jobs;
pub mod keyed;
pub mod operators;
pub mod runtime;
pub mod sinks;
pub mod sources;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
