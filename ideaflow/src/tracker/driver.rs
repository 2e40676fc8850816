//! The task that owns one tracker's connection and state.
//!
//! The driver feeds connection happenings into the lifecycle machine and
//! performs whatever effect comes back. Stream events go to the pipeline
//! state. Every change is published to the snapshot channel and mirrored to
//! the event sink.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use super::callbacks::OutcomeCallbacks;
use super::completion::{CompletionResolver, Resolution};
use super::snapshot::TrackerSnapshot;
use crate::cancellation::{CancellationToken, Epoch, Generation};
use crate::errors::{CONNECTION_LOST_MESSAGE, FETCH_FAILED_MESSAGE, GENERIC_FAILURE_MESSAGE};
use crate::events::{EventSink, TrackerEvent};
use crate::http::ValidationApi;
use crate::pipeline::{
    ConnectionLifecycle, ConnectionPhase, Effect, LifecycleInput, PipelineState, ReconnectPolicy, TerminalOutcome,
    Transition,
};
use crate::stream::{EventStreamConnection, EventTransport, StreamEndpointResolver, StreamMessage};

/// Shared pieces the driver needs from its tracker.
pub(crate) struct DriverParts {
    pub job_id: String,
    pub run_id: Uuid,
    pub api: Arc<dyn ValidationApi>,
    pub resolver: StreamEndpointResolver,
    pub transport: Arc<dyn EventTransport>,
    pub policy: ReconnectPolicy,
    pub sink: Arc<dyn EventSink>,
    pub cancel: Arc<CancellationToken>,
    pub generation: Arc<Generation>,
    pub snapshot_tx: watch::Sender<TrackerSnapshot>,
    pub callbacks: OutcomeCallbacks,
}

pub(crate) struct TrackerDriver {
    job_id: String,
    run_id: Uuid,
    api: Arc<dyn ValidationApi>,
    resolver: StreamEndpointResolver,
    transport: Arc<dyn EventTransport>,
    policy: ReconnectPolicy,
    sink: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    generation: Arc<Generation>,
    epoch: Epoch,
    snapshot_tx: watch::Sender<TrackerSnapshot>,
    callbacks: OutcomeCallbacks,
    state: PipelineState,
    lifecycle: ConnectionLifecycle,
    error: Option<String>,
}

impl TrackerDriver {
    pub(crate) fn new(parts: DriverParts) -> Self {
        let epoch = parts.generation.epoch();
        Self {
            job_id: parts.job_id,
            run_id: parts.run_id,
            api: parts.api,
            resolver: parts.resolver,
            transport: parts.transport,
            policy: parts.policy,
            sink: parts.sink,
            cancel: parts.cancel,
            generation: parts.generation,
            epoch,
            snapshot_tx: parts.snapshot_tx,
            callbacks: parts.callbacks,
            state: PipelineState::new(),
            lifecycle: ConnectionLifecycle::new(),
            error: None,
        }
    }

    /// Runs until the lifecycle reaches a terminal phase.
    pub(crate) async fn run(mut self) {
        tracing::info!(job_id = %self.job_id, run_id = %self.run_id, "Tracker started");

        let mut effect = self.connect_and_pump().await;
        loop {
            effect = match effect {
                Effect::Reconnect => self.connect_and_pump().await,
                Effect::ScheduleReconnect(delay) => self.wait_and_retry(delay).await,
                Effect::ConnectionLost => {
                    self.lose_connection();
                    break;
                }
                Effect::FetchResult => {
                    self.fetch_result().await;
                    break;
                }
                Effect::Close => {
                    self.close();
                    break;
                }
                Effect::None | Effect::MarkConnected => break,
            };
        }

        tracing::info!(
            job_id = %self.job_id,
            phase = %self.lifecycle.phase,
            "Tracker finished"
        );
    }

    /// Opens a connection and pumps it until it drops or the pipeline ends.
    async fn connect_and_pump(&mut self) -> Effect {
        let cancel = Arc::clone(&self.cancel);
        self.sink
            .try_emit(TrackerEvent::connecting(&self.job_id, self.lifecycle.attempts));

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = EventStreamConnection::open(&self.resolver, self.transport.as_ref(), &self.job_id) => Some(result),
        };
        let Some(opened) = opened else {
            return self.stop();
        };

        let mut connection = match opened {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(
                    job_id = %self.job_id,
                    attempt = self.lifecycle.attempts,
                    error = %e,
                    "Failed to open pipeline stream"
                );
                return self.step(LifecycleInput::Dropped);
            }
        };

        if self.step(LifecycleInput::Opened) == Effect::MarkConnected {
            let transition = self.state.mark_connected();
            self.record(&transition);
            self.sink.try_emit(TrackerEvent::connected(&self.job_id));
            self.publish();
        }

        loop {
            let message = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                message = connection.next_message() => Some(message),
            };
            let Some(message) = message else {
                connection.close();
                return self.stop();
            };

            match message {
                StreamMessage::Event(event) => {
                    self.step(LifecycleInput::EventReceived);
                    let transition = self.state.apply(&event);
                    self.record(&transition);
                    self.publish();

                    if let Some(outcome) = transition.terminal {
                        connection.close();
                        return match outcome {
                            TerminalOutcome::Completed => self.step(LifecycleInput::PipelineCompleted),
                            TerminalOutcome::Failed { .. } => self.step(LifecycleInput::PipelineFailed),
                        };
                    }
                }
                StreamMessage::Ignored(frame) => {
                    tracing::debug!(
                        job_id = %self.job_id,
                        event = %frame.event,
                        "Ignoring unrecognised frame"
                    );
                }
                StreamMessage::Disconnected(error) => {
                    match error {
                        Some(e) => tracing::warn!(job_id = %self.job_id, error = %e, "Pipeline stream dropped"),
                        None => tracing::warn!(job_id = %self.job_id, "Pipeline stream closed by server"),
                    }
                    return self.step(LifecycleInput::Dropped);
                }
            }
        }
    }

    async fn wait_and_retry(&mut self, delay: Duration) -> Effect {
        let cancel = Arc::clone(&self.cancel);
        tracing::info!(
            job_id = %self.job_id,
            attempt = self.lifecycle.attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Reconnecting to pipeline stream"
        );
        self.sink.try_emit(TrackerEvent::reconnecting(
            &self.job_id,
            self.lifecycle.attempts,
            delay,
        ));

        let elapsed = tokio::select! {
            biased;
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        };
        if !elapsed {
            return self.stop();
        }
        self.step(LifecycleInput::RetryElapsed)
    }

    fn lose_connection(&mut self) {
        tracing::error!(
            job_id = %self.job_id,
            attempts = self.lifecycle.attempts,
            "Reconnection attempts exhausted"
        );
        let transition = self.state.fail(CONNECTION_LOST_MESSAGE);
        self.record(&transition);
        self.sink.try_emit(TrackerEvent::connection_lost(&self.job_id));
        self.deliver_error(CONNECTION_LOST_MESSAGE.to_string());
    }

    async fn fetch_result(&mut self) {
        let cancel = Arc::clone(&self.cancel);
        self.sink.try_emit(TrackerEvent::completed(&self.job_id));

        let resolver = CompletionResolver::new(Arc::clone(&self.api), self.job_id.clone(), Arc::clone(&self.generation));
        let resolution = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            resolution = resolver.resolve() => Some(resolution),
        };

        match resolution {
            None | Some(Resolution::Stale) => {
                self.stop();
            }
            Some(Resolution::Fetched(record)) => {
                if self.is_current() {
                    self.callbacks.complete(record);
                }
            }
            Some(Resolution::Failed(_)) => {
                self.deliver_error(FETCH_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// Handles [`Effect::Close`]: reports a pipeline failure, or nothing after a stop.
    fn close(&mut self) {
        if self.lifecycle.phase != ConnectionPhase::Failed {
            return;
        }
        let message = match self.state.terminal() {
            Some(TerminalOutcome::Failed { message }) => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        tracing::error!(job_id = %self.job_id, message = %message, "Pipeline failed");
        self.sink.try_emit(TrackerEvent::failed(&self.job_id, &message));
        self.deliver_error(message);
    }

    fn stop(&mut self) -> Effect {
        tracing::info!(
            job_id = %self.job_id,
            reason = ?self.cancel.reason(),
            "Tracker stopped"
        );
        self.step(LifecycleInput::Stop)
    }

    fn deliver_error(&mut self, message: String) {
        if !self.is_current() {
            return;
        }
        self.error = Some(message.clone());
        self.publish();
        self.callbacks.fail(message);
    }

    fn is_current(&self) -> bool {
        !self.cancel.is_cancelled() && self.generation.is_current(self.epoch)
    }

    fn step(&mut self, input: LifecycleInput) -> Effect {
        let before = self.lifecycle.phase;
        let effect = self.lifecycle.step(input, &self.policy);
        if before != self.lifecycle.phase {
            tracing::debug!(
                job_id = %self.job_id,
                from = %before,
                to = %self.lifecycle.phase,
                attempts = self.lifecycle.attempts,
                ?effect,
                "Connection phase changed"
            );
        }
        self.publish();
        effect
    }

    fn record(&self, transition: &Transition) {
        for change in &transition.changes {
            self.sink.try_emit(TrackerEvent::stage_changed(&self.job_id, change));
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(TrackerSnapshot {
            job_id: self.job_id.clone(),
            stages: self.state.statuses(),
            outputs: self.state.outputs().clone(),
            phase: self.lifecycle.phase,
            attempts: self.lifecycle.attempts,
            completed: self.state.is_completed(),
            error: self.error.clone(),
        });
    }
}
