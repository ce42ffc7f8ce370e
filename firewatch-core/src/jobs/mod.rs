//! Ready made jobs for sensor streams
mod average;
mod fire_alert;
mod rolling_sum;

pub use average::{average_temperatures, AverageLogic};
pub use fire_alert::{fire_alerts, FireAlert, FireAlertLogic, PartitionState};
pub use rolling_sum::{first_field, rolling_sum, sum_second_field, RollingSumLogic, Triple};
