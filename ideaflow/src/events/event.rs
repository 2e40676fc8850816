//! Lifecycle events emitted by a running tracker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::core::StageStatus;
use crate::pipeline::StageChange;

/// An event describing what a tracker is doing.
///
/// Events are consumed by event sinks for logging, monitoring or UI feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// The event type (e.g., "tracker.connected", "stage.done").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl TrackerEvent {
    /// Creates a new tracker event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a data field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Creates a "tracker.connecting" event.
    #[must_use]
    pub fn connecting(job_id: &str, attempt: u32) -> Self {
        Self::new("tracker.connecting")
            .add_data("job_id", serde_json::json!(job_id))
            .add_data("attempt", serde_json::json!(attempt))
    }

    /// Creates a "tracker.connected" event.
    #[must_use]
    pub fn connected(job_id: &str) -> Self {
        Self::new("tracker.connected").add_data("job_id", serde_json::json!(job_id))
    }

    /// Creates a "tracker.reconnecting" event.
    #[must_use]
    pub fn reconnecting(job_id: &str, attempt: u32, delay: Duration) -> Self {
        Self::new("tracker.reconnecting")
            .add_data("job_id", serde_json::json!(job_id))
            .add_data("attempt", serde_json::json!(attempt))
            .add_data("delay_ms", serde_json::json!(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)))
    }

    /// Creates a "tracker.connection_lost" event.
    #[must_use]
    pub fn connection_lost(job_id: &str) -> Self {
        Self::new("tracker.connection_lost").add_data("job_id", serde_json::json!(job_id))
    }

    /// Creates a "stage.running" or "stage.done" event for a status change.
    #[must_use]
    pub fn stage_changed(job_id: &str, change: &StageChange) -> Self {
        let event_type = match change.to {
            StageStatus::Done => "stage.done",
            StageStatus::Running => "stage.running",
            StageStatus::Waiting => "stage.waiting",
        };
        Self::new(event_type)
            .add_data("job_id", serde_json::json!(job_id))
            .add_data("stage", serde_json::json!(change.stage.ordinal()))
            .add_data("key", serde_json::json!(change.stage.key()))
            .add_data("from", serde_json::json!(change.from))
    }

    /// Creates a "pipeline.completed" event.
    #[must_use]
    pub fn completed(job_id: &str) -> Self {
        Self::new("pipeline.completed").add_data("job_id", serde_json::json!(job_id))
    }

    /// Creates a "pipeline.failed" event.
    #[must_use]
    pub fn failed(job_id: &str, message: &str) -> Self {
        Self::new("pipeline.failed")
            .add_data("job_id", serde_json::json!(job_id))
            .add_data("error", serde_json::json!(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageId;

    #[test]
    fn test_event_creation() {
        let event = TrackerEvent::new("test.event");
        assert_eq!(event.event_type, "test.event");
        assert!(event.data.is_empty());
    }

    #[test]
    fn test_reconnecting_event() {
        let event = TrackerEvent::reconnecting("run-1", 2, Duration::from_millis(2000));
        assert_eq!(event.event_type, "tracker.reconnecting");
        assert_eq!(event.get("attempt"), Some(&serde_json::json!(2)));
        assert_eq!(event.get("delay_ms"), Some(&serde_json::json!(2000)));
    }

    #[test]
    fn test_stage_changed_event() {
        let change = StageChange {
            stage: StageId::new(5).unwrap(),
            from: StageStatus::Waiting,
            to: StageStatus::Running,
        };
        let event = TrackerEvent::stage_changed("job-1", &change);
        assert_eq!(event.event_type, "stage.running");
        assert_eq!(event.get("job_id"), Some(&serde_json::json!("job-1")));
        assert_eq!(event.get("stage"), Some(&serde_json::json!(5)));
        assert_eq!(event.get("from"), Some(&serde_json::json!("waiting")));
    }

    #[test]
    fn test_event_serialization() {
        let event = TrackerEvent::failed("run-1", "Agent failed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "pipeline.failed");
        assert_eq!(json["data"]["error"], "Agent failed");
    }
}
