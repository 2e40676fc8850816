//! Authoritative per-stage view of a running validation pipeline.
//!
//! All mutation goes through [`PipelineState::apply`],
//! [`PipelineState::mark_connected`] and [`PipelineState::fail`]. Every
//! transition is idempotent and terminal outcomes are absorbing, so events
//! may be replayed or reordered across reconnects without corrupting state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{AgentCompleted, PipelineEvent, StageId, StageStatus, PARALLEL_GROUP, SEQUENTIAL_STAGE};
use crate::errors::GENERIC_FAILURE_MESSAGE;

/// How a pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminalOutcome {
    /// The backend finished every stage.
    Completed,
    /// The pipeline cannot finish.
    Failed {
        /// Caller-facing message.
        message: String,
    },
}

/// Output recorded from an `agent_completed` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Display name the backend gave the agent.
    pub name: String,
    /// The agent's output.
    pub output: serde_json::Value,
}

/// A single stage status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChange {
    /// The stage that moved.
    pub stage: StageId,
    /// Status before the change.
    pub from: StageStatus,
    /// Status after the change.
    pub to: StageStatus,
}

/// Effect of applying one input to the state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Stage changes, in the order they were made.
    pub changes: Vec<StageChange>,
    /// Set when this input moved the pipeline into a terminal outcome.
    pub terminal: Option<TerminalOutcome>,
}

impl Transition {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.terminal.is_none()
    }
}

/// Per-stage statuses plus the terminal outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    stages: [StageStatus; StageId::COUNT],
    outputs: BTreeMap<StageId, AgentOutput>,
    terminal: Option<TerminalOutcome>,
}

impl PipelineState {
    /// Creates a state with every stage waiting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a stage.
    #[must_use]
    pub fn status_of(&self, stage: StageId) -> StageStatus {
        self.stages[stage.index()]
    }

    /// Statuses of all stages in ordinal order.
    #[must_use]
    pub fn statuses(&self) -> [StageStatus; StageId::COUNT] {
        self.stages
    }

    /// Stages currently shown as running.
    #[must_use]
    pub fn running_stages(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| self.status_of(*s) == StageStatus::Running)
            .collect()
    }

    /// Output recorded for a stage, if it has completed.
    #[must_use]
    pub fn output_of(&self, stage: StageId) -> Option<&AgentOutput> {
        self.outputs.get(&stage)
    }

    /// Outputs recorded so far, by stage.
    #[must_use]
    pub fn outputs(&self) -> &BTreeMap<StageId, AgentOutput> {
        &self.outputs
    }

    /// The terminal outcome, if reached.
    #[must_use]
    pub fn terminal(&self) -> Option<&TerminalOutcome> {
        self.terminal.as_ref()
    }

    /// Returns true once the pipeline completed or failed.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Returns true if the pipeline completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.terminal, Some(TerminalOutcome::Completed))
    }

    /// Returns true if the pipeline failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self.terminal, Some(TerminalOutcome::Failed { .. }))
    }

    /// Returns true if every parallel-group stage is done.
    #[must_use]
    pub fn parallel_group_done(&self) -> bool {
        PARALLEL_GROUP.iter().all(|s| self.status_of(*s) == StageStatus::Done)
    }

    /// Checks the sequential-stage dependency invariant.
    ///
    /// The sequential stage is running exactly when the parallel group is
    /// done and the sequential stage itself has not finished.
    #[must_use]
    pub fn sequential_invariant_holds(&self) -> bool {
        let sequential = self.status_of(SEQUENTIAL_STAGE);
        let expect_running = self.parallel_group_done() && sequential != StageStatus::Done;
        (sequential == StageStatus::Running) == expect_running
    }

    /// Marks the parallel group running after a connection opens.
    ///
    /// The backend starts the whole group eagerly and sends no per-stage
    /// start message, so this is the only place they become running.
    pub fn mark_connected(&mut self) -> Transition {
        let mut transition = Transition::default();
        if self.is_terminal() {
            return transition;
        }
        for stage in PARALLEL_GROUP {
            self.advance(stage, StageStatus::Running, &mut transition);
        }
        self.promote_sequential(&mut transition);
        transition
    }

    /// Applies a classified pipeline event.
    pub fn apply(&mut self, event: &PipelineEvent) -> Transition {
        let mut transition = Transition::default();
        if self.is_terminal() {
            tracing::debug!(event = event.name(), "Ignoring event after terminal outcome");
            return transition;
        }

        match event {
            PipelineEvent::AgentCompleted(payload) => self.complete_agent(payload, &mut transition),
            PipelineEvent::PipelineCompleted(Some(_)) => {
                for stage in StageId::ALL {
                    self.advance(stage, StageStatus::Done, &mut transition);
                }
                self.finish(TerminalOutcome::Completed, &mut transition);
            }
            PipelineEvent::PipelineCompleted(None) => {
                self.finish(
                    TerminalOutcome::Failed {
                        message: GENERIC_FAILURE_MESSAGE.to_string(),
                    },
                    &mut transition,
                );
            }
            PipelineEvent::PipelineFailed(message) => {
                let message = message
                    .clone()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                self.finish(TerminalOutcome::Failed { message }, &mut transition);
            }
        }

        debug_assert!(self.sequential_invariant_holds());
        transition
    }

    /// Fails the pipeline from the client side, e.g. when the connection is lost.
    pub fn fail(&mut self, message: impl Into<String>) -> Transition {
        let mut transition = Transition::default();
        if !self.is_terminal() {
            self.finish(
                TerminalOutcome::Failed {
                    message: message.into(),
                },
                &mut transition,
            );
        }
        transition
    }

    fn complete_agent(&mut self, payload: &AgentCompleted, transition: &mut Transition) {
        let stage = payload.agent;
        if stage == SEQUENTIAL_STAGE && !self.parallel_group_done() {
            tracing::warn!(
                stage = stage.key(),
                "Dropping sequential stage completion received before the parallel group finished"
            );
            return;
        }

        self.outputs.entry(stage).or_insert_with(|| AgentOutput {
            name: payload.name.clone(),
            output: payload.output.clone(),
        });
        self.advance(stage, StageStatus::Done, transition);
        self.promote_sequential(transition);
    }

    fn promote_sequential(&mut self, transition: &mut Transition) {
        if self.parallel_group_done() {
            self.advance(SEQUENTIAL_STAGE, StageStatus::Running, transition);
        }
    }

    fn advance(&mut self, stage: StageId, to: StageStatus, transition: &mut Transition) {
        let slot = &mut self.stages[stage.index()];
        let from = *slot;
        let next = from.advance(to);
        if next != from {
            *slot = next;
            transition.changes.push(StageChange { stage, from, to: next });
        }
    }

    fn finish(&mut self, outcome: TerminalOutcome, transition: &mut Transition) {
        self.terminal = Some(outcome.clone());
        transition.terminal = Some(outcome);
    }
}
