//! Event time: timestamp assignment, periodic watermarks and watermark merging
mod assigner;
mod frontier;
mod watermark;

pub use assigner::TimestampAssigner;
pub use frontier::MergedFrontier;
pub use watermark::{PeriodicWatermarks, WatermarkInterval};
