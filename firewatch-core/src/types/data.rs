//! Marker traits for data and keys flowing through Firewatch
use std::fmt::Debug;
use std::hash::Hash;

/// Data which may move through a stream.
/// Data is handed from ingestion threads to partition threads, so it must be `Send`.
#[diagnostic::on_unimplemented(message = "Type must be `Clone + Send + 'static` to be used as data")]
pub trait Data: Clone + Send + 'static {}
impl<T: Clone + Send + 'static> Data for T {}

/// Keys decide which partition processes a record and which state the record may touch.
#[diagnostic::on_unimplemented(
    message = "Type must be `Clone + Send + Hash + Eq + Debug + 'static` to be used as a key"
)]
pub trait Key: Data + Hash + Eq + Debug {}
impl<T: Data + Hash + Eq + Debug> Key for T {}

/// Zero sized indicator for a job without a control channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoControl;
