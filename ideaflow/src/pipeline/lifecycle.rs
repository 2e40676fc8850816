//! Connection lifecycle as an explicit finite state machine.
//!
//! [`transition`] is pure: given the current lifecycle, an input and the
//! reconnection policy, it returns the next lifecycle and the single effect
//! the driver must perform. Terminal phases absorb every input except
//! [`LifecycleInput::Stop`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::retry::{ReconnectPolicy, RetryDecision};

/// Phase of the stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    /// Resolving the endpoint and opening the stream.
    #[default]
    Connecting,
    /// Stream open and delivering events.
    Connected,
    /// Waiting out a backoff delay before reconnecting.
    Reconnecting,
    /// Terminal: the pipeline failed or the connection was lost for good.
    Failed,
    /// Terminal: the pipeline completed.
    Completed,
    /// Terminal: the caller tore the tracker down.
    Stopped,
}

impl ConnectionPhase {
    /// Returns true if no further connection attempts will be made.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Completed | Self::Stopped)
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Something that happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleInput {
    /// The stream opened.
    Opened,
    /// A recognised event arrived on the open stream.
    EventReceived,
    /// The connect attempt failed or the open stream dropped.
    Dropped,
    /// The backoff delay elapsed.
    RetryElapsed,
    /// `pipeline_completed` arrived.
    PipelineCompleted,
    /// The pipeline failed.
    PipelineFailed,
    /// The caller requested teardown.
    Stop,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Nothing.
    None,
    /// Mark the parallel group running.
    MarkConnected,
    /// Wait, then feed [`LifecycleInput::RetryElapsed`].
    ScheduleReconnect(Duration),
    /// Open a new connection.
    Reconnect,
    /// Attempts exhausted; report the connection as lost.
    ConnectionLost,
    /// Release the connection and fetch the final result.
    FetchResult,
    /// Release the connection.
    Close,
}

/// Phase plus the consecutive reconnection counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionLifecycle {
    /// Current phase.
    pub phase: ConnectionPhase,
    /// Reconnections made since the last received event.
    pub attempts: u32,
}

impl ConnectionLifecycle {
    /// Creates a lifecycle in the connecting phase.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an input in place and returns the effect.
    pub fn step(&mut self, input: LifecycleInput, policy: &ReconnectPolicy) -> Effect {
        let (next, effect) = transition(*self, input, policy);
        if next.phase != self.phase {
            tracing::debug!(from = %self.phase, to = %next.phase, ?input, "Connection phase changed");
        }
        *self = next;
        effect
    }

    /// Returns true while a reconnect is pending.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.phase == ConnectionPhase::Reconnecting
    }
}

/// The lifecycle transition function.
#[must_use]
pub fn transition(
    current: ConnectionLifecycle,
    input: LifecycleInput,
    policy: &ReconnectPolicy,
) -> (ConnectionLifecycle, Effect) {
    use ConnectionPhase as P;
    use LifecycleInput as I;

    let with_phase = |phase| ConnectionLifecycle { phase, ..current };

    match (current.phase, input) {
        (P::Stopped, _) => (current, Effect::None),
        (_, I::Stop) => (with_phase(P::Stopped), Effect::Close),
        (phase, _) if phase.is_terminal() => (current, Effect::None),

        (P::Connecting, I::Opened) => (with_phase(P::Connected), Effect::MarkConnected),
        (P::Connected, I::EventReceived) => (
            ConnectionLifecycle {
                phase: P::Connected,
                attempts: 0,
            },
            Effect::None,
        ),
        (P::Connecting | P::Connected, I::Dropped) => match policy.should_retry(current.attempts) {
            RetryDecision::Retry(delay) => (
                ConnectionLifecycle {
                    phase: P::Reconnecting,
                    attempts: current.attempts.saturating_add(1),
                },
                Effect::ScheduleReconnect(delay),
            ),
            RetryDecision::GiveUp => (with_phase(P::Failed), Effect::ConnectionLost),
        },
        (P::Reconnecting, I::RetryElapsed) => (with_phase(P::Connecting), Effect::Reconnect),
        (_, I::PipelineCompleted) => (with_phase(P::Completed), Effect::FetchResult),
        (_, I::PipelineFailed) => (with_phase(P::Failed), Effect::Close),

        _ => (current, Effect::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ReconnectConfig;

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::default()
    }

    #[test]
    fn test_open_then_events() {
        let mut lc = ConnectionLifecycle::new();
        assert_eq!(lc.step(LifecycleInput::Opened, &policy()), Effect::MarkConnected);
        assert_eq!(lc.phase, ConnectionPhase::Connected);
        assert_eq!(lc.step(LifecycleInput::EventReceived, &policy()), Effect::None);
        assert_eq!(lc.phase, ConnectionPhase::Connected);
    }

    #[test]
    fn test_drop_schedules_backoff() {
        let mut lc = ConnectionLifecycle::new();
        lc.step(LifecycleInput::Opened, &policy());

        let effect = lc.step(LifecycleInput::Dropped, &policy());
        assert_eq!(effect, Effect::ScheduleReconnect(Duration::from_millis(1000)));
        assert!(lc.is_reconnecting());
        assert_eq!(lc.attempts, 1);

        assert_eq!(lc.step(LifecycleInput::RetryElapsed, &policy()), Effect::Reconnect);
        assert_eq!(lc.phase, ConnectionPhase::Connecting);

        // A failed connect counts as another drop.
        let effect = lc.step(LifecycleInput::Dropped, &policy());
        assert_eq!(effect, Effect::ScheduleReconnect(Duration::from_millis(2000)));
        assert_eq!(lc.attempts, 2);
    }

    #[test]
    fn test_attempts_exhausted() {
        let policy = policy();
        let mut lc = ConnectionLifecycle::new();
        let mut scheduled = Vec::new();

        loop {
            match lc.step(LifecycleInput::Dropped, &policy) {
                Effect::ScheduleReconnect(delay) => {
                    scheduled.push(delay.as_millis());
                    assert_eq!(lc.step(LifecycleInput::RetryElapsed, &policy), Effect::Reconnect);
                }
                Effect::ConnectionLost => break,
                other => panic!("unexpected effect: {other:?}"),
            }
        }

        assert_eq!(scheduled, vec![1000, 2000, 4000, 8000, 10_000]);
        assert_eq!(lc.phase, ConnectionPhase::Failed);
        assert_eq!(lc.step(LifecycleInput::RetryElapsed, &policy), Effect::None);
        assert_eq!(lc.step(LifecycleInput::Dropped, &policy), Effect::None);
    }

    #[test]
    fn test_event_resets_attempts() {
        let mut lc = ConnectionLifecycle::new();
        for _ in 0..3 {
            lc.step(LifecycleInput::Dropped, &policy());
            lc.step(LifecycleInput::RetryElapsed, &policy());
        }
        assert_eq!(lc.attempts, 3);

        lc.step(LifecycleInput::Opened, &policy());
        lc.step(LifecycleInput::EventReceived, &policy());
        assert_eq!(lc.attempts, 0);

        let effect = lc.step(LifecycleInput::Dropped, &policy());
        assert_eq!(effect, Effect::ScheduleReconnect(Duration::from_millis(1000)));
    }

    #[test]
    fn test_opened_without_event_does_not_reset() {
        let mut lc = ConnectionLifecycle::new();
        lc.step(LifecycleInput::Dropped, &policy());
        lc.step(LifecycleInput::RetryElapsed, &policy());
        lc.step(LifecycleInput::Opened, &policy());
        assert_eq!(lc.attempts, 1);
    }

    #[test]
    fn test_pipeline_outcomes_are_absorbing() {
        let mut lc = ConnectionLifecycle::new();
        lc.step(LifecycleInput::Opened, &policy());
        assert_eq!(lc.step(LifecycleInput::PipelineFailed, &policy()), Effect::Close);
        assert_eq!(lc.phase, ConnectionPhase::Failed);

        for input in [
            LifecycleInput::Opened,
            LifecycleInput::EventReceived,
            LifecycleInput::Dropped,
            LifecycleInput::RetryElapsed,
            LifecycleInput::PipelineCompleted,
        ] {
            assert_eq!(lc.step(input, &policy()), Effect::None);
            assert_eq!(lc.phase, ConnectionPhase::Failed);
        }

        let mut lc = ConnectionLifecycle::new();
        lc.step(LifecycleInput::Opened, &policy());
        assert_eq!(lc.step(LifecycleInput::PipelineCompleted, &policy()), Effect::FetchResult);
        assert_eq!(lc.step(LifecycleInput::PipelineFailed, &policy()), Effect::None);
        assert_eq!(lc.step(LifecycleInput::Dropped, &policy()), Effect::None);
        assert_eq!(lc.phase, ConnectionPhase::Completed);
    }

    #[test]
    fn test_stop_from_any_phase() {
        for phase in [
            ConnectionPhase::Connecting,
            ConnectionPhase::Connected,
            ConnectionPhase::Reconnecting,
            ConnectionPhase::Completed,
            ConnectionPhase::Failed,
        ] {
            let current = ConnectionLifecycle { phase, attempts: 2 };
            let (next, effect) = transition(current, LifecycleInput::Stop, &policy());
            assert_eq!(next.phase, ConnectionPhase::Stopped);
            assert_eq!(effect, Effect::Close);
        }

        let stopped = ConnectionLifecycle {
            phase: ConnectionPhase::Stopped,
            attempts: 0,
        };
        assert_eq!(transition(stopped, LifecycleInput::Stop, &policy()), (stopped, Effect::None));
        assert_eq!(
            transition(stopped, LifecycleInput::PipelineCompleted, &policy()),
            (stopped, Effect::None)
        );
    }

    #[test]
    fn test_zero_attempt_policy_fails_immediately() {
        let policy = ReconnectPolicy::new(ReconnectConfig::new().with_max_attempts(0));
        let mut lc = ConnectionLifecycle::new();
        assert_eq!(lc.step(LifecycleInput::Dropped, &policy), Effect::ConnectionLost);
    }

    #[test]
    fn test_out_of_order_inputs_ignored() {
        let mut lc = ConnectionLifecycle::new();
        assert_eq!(lc.step(LifecycleInput::RetryElapsed, &policy()), Effect::None);
        assert_eq!(lc.step(LifecycleInput::EventReceived, &policy()), Effect::None);
        assert_eq!(lc.phase, ConnectionPhase::Connecting);
    }
}
