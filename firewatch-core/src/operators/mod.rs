//! Operators running inside a partition loop
mod correlate;
mod logic;
mod rolling_fold;
mod stateful_op;
pub mod time;
pub mod window;

pub use correlate::{CoLogic, Correlator};
pub use logic::{PartitionContext, PartitionLogic, PartitionMetrics};
pub use rolling_fold::RollingFold;
pub use stateful_op::{StatefulLogic, StatefulOp};
