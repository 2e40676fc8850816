//! Tracker lifecycle events and sinks.

mod event;
mod sink;

pub use event::TrackerEvent;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
