//! Pipeline events decoded from named stream messages.

use serde::{Deserialize, Serialize};

use super::stage::StageId;

/// Payload of an `agent_completed` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCompleted {
    /// The stage that finished.
    pub agent: StageId,
    /// Display name the backend gave the agent.
    #[serde(default)]
    pub name: String,
    /// Agent output. Opaque to the tracker.
    #[serde(default)]
    pub output: serde_json::Value,
}

/// Payload of a `pipeline_completed` message.
///
/// Only its arrival matters to the tracker; the authoritative record is
/// fetched separately once the pipeline is done. Fields are read leniently:
/// a missing or oddly typed field is simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionNotice {
    /// The job id, if included.
    #[serde(default)]
    pub id: Option<String>,
    /// Verdict summary, if included.
    #[serde(default)]
    pub verdict: Option<String>,
    /// Verdict confidence, if included.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl CompletionNotice {
    /// Reads whatever known fields a completion payload carries.
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        let text = |key: &str| value.get(key).and_then(serde_json::Value::as_str).map(str::to_string);
        Self {
            id: text("id"),
            verdict: text("verdict"),
            confidence: value.get("confidence").and_then(serde_json::Value::as_f64),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
}

/// A classified message from the pipeline stream.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// An agent finished its work.
    AgentCompleted(AgentCompleted),
    /// The whole pipeline finished. `None` when the payload was not JSON.
    PipelineCompleted(Option<CompletionNotice>),
    /// The backend reported a failure. `None` when the payload was unreadable.
    PipelineFailed(Option<String>),
}

impl PipelineEvent {
    /// Wire name of the agent completion message.
    pub const AGENT_COMPLETED: &'static str = "agent_completed";
    /// Wire name of the pipeline completion message.
    pub const PIPELINE_COMPLETED: &'static str = "pipeline_completed";
    /// Wire name of the pipeline failure message.
    pub const PIPELINE_ERROR: &'static str = "pipeline_error";

    /// Classifies a named message and its JSON data.
    ///
    /// Returns `None` for unknown event names and for `agent_completed`
    /// messages whose payload cannot be parsed. Terminal messages are always
    /// classified, carrying `None` when their payload is unreadable.
    #[must_use]
    pub fn from_wire(event_name: &str, data: &str) -> Option<Self> {
        match event_name {
            Self::AGENT_COMPLETED => match serde_json::from_str::<AgentCompleted>(data) {
                Ok(payload) => Some(Self::AgentCompleted(payload)),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unreadable agent_completed payload");
                    None
                }
            },
            Self::PIPELINE_COMPLETED => {
                let notice = serde_json::from_str::<serde_json::Value>(data)
                    .map(|value| CompletionNotice::from_value(&value))
                    .map_err(|e| {
                        tracing::warn!(error = %e, "Unreadable pipeline_completed payload");
                    })
                    .ok();
                Some(Self::PipelineCompleted(notice))
            }
            Self::PIPELINE_ERROR => {
                let message = serde_json::from_str::<ErrorPayload>(data)
                    .map(|p| p.error)
                    .map_err(|e| {
                        tracing::warn!(error = %e, "Unreadable pipeline_error payload");
                    })
                    .ok();
                Some(Self::PipelineFailed(message))
            }
            _ => None,
        }
    }

    /// Returns true if this event ends the pipeline.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::AgentCompleted(_))
    }

    /// The wire name of this event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgentCompleted(_) => Self::AGENT_COMPLETED,
            Self::PipelineCompleted(_) => Self::PIPELINE_COMPLETED,
            Self::PipelineFailed(_) => Self::PIPELINE_ERROR,
        }
    }
}
