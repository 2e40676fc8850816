//! Read-only view of a tracker, published after every change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{StageId, StageStatus};
use crate::pipeline::{AgentOutput, ConnectionPhase};

/// Point-in-time state of a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// The tracked job.
    pub job_id: String,
    /// Stage statuses in ordinal order.
    pub stages: [StageStatus; StageId::COUNT],
    /// Agent outputs received so far.
    #[serde(default)]
    pub outputs: BTreeMap<StageId, AgentOutput>,
    /// Connection phase.
    pub phase: ConnectionPhase,
    /// Reconnections made since the last received event.
    pub attempts: u32,
    /// Set once the pipeline completed.
    pub completed: bool,
    /// The message reported through the error callback, if any.
    pub error: Option<String>,
}

impl TrackerSnapshot {
    /// Snapshot of a tracker that has not connected yet.
    #[must_use]
    pub fn initial(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            stages: [StageStatus::Waiting; StageId::COUNT],
            outputs: BTreeMap::new(),
            phase: ConnectionPhase::Connecting,
            attempts: 0,
            completed: false,
            error: None,
        }
    }

    /// Status of a stage.
    #[must_use]
    pub fn status_of(&self, stage: StageId) -> StageStatus {
        self.stages[stage.index()]
    }

    /// Output recorded for a stage, if it has completed.
    #[must_use]
    pub fn output_of(&self, stage: StageId) -> Option<&AgentOutput> {
        self.outputs.get(&stage)
    }

    /// Returns true while a reconnect is pending.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.phase == ConnectionPhase::Reconnecting
    }

    /// Returns true if the tracker reached a failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Returns true once the tracker will do no further work.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let snapshot = TrackerSnapshot::initial("run-1");
        assert_eq!(snapshot.job_id, "run-1");
        assert!(StageId::ALL.iter().all(|s| snapshot.status_of(*s) == StageStatus::Waiting));
        assert!(!snapshot.is_reconnecting());
        assert!(!snapshot.is_failed());
        assert!(!snapshot.is_finished());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut snapshot = TrackerSnapshot::initial("run-1");
        snapshot.phase = ConnectionPhase::Reconnecting;
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["phase"], "reconnecting");
        assert_eq!(json["stages"][0], "waiting");
        assert!(snapshot.is_reconnecting());
    }
}
