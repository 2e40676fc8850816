//! Logging setup for ideaflow.
//!
//! The library itself only emits `tracing` events and spans; binaries and
//! tests call [`init_logging`] once to install a subscriber.

mod logging;

pub use logging::{init_logging, tracker_span, LogFormat};
