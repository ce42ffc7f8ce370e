//! Types and traits used across Firewatch
mod data;
mod message;
pub mod sensor;
mod time;

pub use data::{Data, Key, NoControl};
pub use message::{DataMessage, Message};
pub use time::{EventTime, Timestamp};

/// Index of a logical partition. Every partition is owned by exactly one processing loop.
pub type PartitionIndex = u64;

/// Identifies an upstream source feeding the partitions of a job
pub type SourceId = usize;
