//! Tumbling event time windows and their aggregation
mod aggregate;
mod assigner;

pub use aggregate::{Average, KeyWindows, WindowAccumulator, WindowAggregator, WindowBuffer};
pub use assigner::{TumblingWindows, Window};
