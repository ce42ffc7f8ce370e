//! Sinks for writing data out of a Firewatch job
mod stateless;
mod stdout;
mod vec_sink;
pub use stateless::StatelessSinkImpl;
pub use stdout::StdOutSink;
pub use vec_sink::VecSink;
