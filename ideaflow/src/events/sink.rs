//! Event sink trait and implementations.

use async_trait::async_trait;
use tracing::{debug, info, warn, Level};

use super::event::TrackerEvent;

/// Trait for event sinks that can receive tracker events.
///
/// Sinks are how callers observe tracker lifecycle beyond the snapshot
/// query surface: logging, analytics, UI activity feeds.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event asynchronously.
    async fn emit(&self, event: TrackerEvent);

    /// Emits an event without blocking.
    ///
    /// This method must never panic. Errors are logged and suppressed.
    fn try_emit(&self, event: TrackerEvent);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: TrackerEvent) {}

    fn try_emit(&self, _event: TrackerEvent) {}
}

/// Logs tracker events through `tracing`.
///
/// Connection loss and pipeline failure log at warn, stage transitions at
/// debug (or not at all unless verbose), everything else at info.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink {
    stage_events: bool,
}

impl LoggingEventSink {
    /// Logs lifecycle events only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also logs every stage transition.
    #[must_use]
    pub fn verbose() -> Self {
        Self { stage_events: true }
    }

    /// Level an event type is logged at.
    #[must_use]
    pub fn level_for(event_type: &str) -> Level {
        match event_type {
            "tracker.connection_lost" | "pipeline.failed" => Level::WARN,
            t if t.starts_with("stage.") => Level::DEBUG,
            _ => Level::INFO,
        }
    }

    fn log_event(&self, event: &TrackerEvent) {
        let level = Self::level_for(&event.event_type);
        if level == Level::DEBUG && !self.stage_events {
            return;
        }
        let job_id = event.get("job_id").and_then(|v| v.as_str()).unwrap_or_default();
        if level == Level::WARN {
            warn!(event_type = %event.event_type, job_id, data = ?event.data, "Tracker event");
        } else if level == Level::INFO {
            info!(event_type = %event.event_type, job_id, data = ?event.data, "Tracker event");
        } else {
            debug!(event_type = %event.event_type, data = ?event.data, "Stage event");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: TrackerEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: TrackerEvent) {
        self.log_event(&event);
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<TrackerEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<TrackerEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: TrackerEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: TrackerEvent) {
        self.events.write().push(event);
    }
}
