//! Frame builders and an outcome recorder.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use crate::core::{PipelineEvent, StageId};
use crate::http::ValidationRecord;
use crate::stream::SseFrame;

/// An `agent_completed` frame for the stage with `ordinal`.
#[must_use]
pub fn agent_frame(ordinal: u8) -> SseFrame {
    let name = StageId::new(ordinal).map_or("unknown", StageId::key);
    let data = json!({ "agent": ordinal, "name": name, "output": { "summary": format!("{name} done") } });
    SseFrame::new(PipelineEvent::AGENT_COMPLETED, data.to_string())
}

/// A `pipeline_completed` frame.
#[must_use]
pub fn completed_frame(job_id: &str) -> SseFrame {
    let data = json!({ "id": job_id, "verdict": "BUILD", "confidence": 0.78 });
    SseFrame::new(PipelineEvent::PIPELINE_COMPLETED, data.to_string())
}

/// A `pipeline_error` frame.
#[must_use]
pub fn error_frame(message: &str) -> SseFrame {
    SseFrame::new(PipelineEvent::PIPELINE_ERROR, json!({ "error": message }).to_string())
}

/// A frame with an event name the tracker does not know.
#[must_use]
pub fn unknown_frame() -> SseFrame {
    SseFrame::new("heartbeat", "{}")
}

/// An outcome delivered to a tracker's callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `on_complete` fired.
    Completed(ValidationRecord),
    /// `on_error` fired.
    Failed(String),
}

/// Records every callback invocation.
#[derive(Debug, Clone, Default)]
pub struct OutcomeRecorder {
    outcomes: Arc<Mutex<Vec<Outcome>>>,
}

impl OutcomeRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A completion callback that records into this recorder.
    #[must_use]
    pub fn on_complete(&self) -> impl FnOnce(ValidationRecord) + Send + 'static {
        let outcomes = Arc::clone(&self.outcomes);
        move |record| outcomes.lock().push(Outcome::Completed(record))
    }

    /// An error callback that records into this recorder.
    #[must_use]
    pub fn on_error(&self) -> impl FnOnce(String) + Send + 'static {
        let outcomes = Arc::clone(&self.outcomes);
        move |message| outcomes.lock().push(Outcome::Failed(message))
    }

    /// Returns the recorded outcomes.
    #[must_use]
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.lock().clone()
    }

    /// Returns the error messages recorded.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.outcomes()
            .into_iter()
            .filter_map(|o| match o {
                Outcome::Failed(message) => Some(message),
                Outcome::Completed(_) => None,
            })
            .collect()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_classify() {
        let frame = agent_frame(3);
        match PipelineEvent::from_wire(&frame.event, &frame.data) {
            Some(PipelineEvent::AgentCompleted(payload)) => {
                assert_eq!(payload.agent.ordinal(), 3);
                assert_eq!(payload.name, "customer_insight");
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let frame = error_frame("Agent failed");
        assert_eq!(
            PipelineEvent::from_wire(&frame.event, &frame.data),
            Some(PipelineEvent::PipelineFailed(Some("Agent failed".to_string())))
        );
        let frame = unknown_frame();
        assert!(PipelineEvent::from_wire(&frame.event, &frame.data).is_none());
    }

    #[test]
    fn test_recorder() {
        let recorder = OutcomeRecorder::new();
        (recorder.on_error())("boom".to_string());
        (recorder.on_complete())(ValidationRecord::new("run-1"));

        assert_eq!(recorder.errors(), vec!["boom".to_string()]);
        assert_eq!(recorder.outcomes().len(), 2);
    }
}
