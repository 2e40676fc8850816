//! Live tracking of a validation pipeline.
//!
//! This module provides:
//! - `PipelineTracker`, which starts trackers for job ids
//! - `TrackerHandle`, the caller's query and teardown surface
//! - `TrackerSnapshot`, a published view of per-stage status
//! - `CompletionResolver`, the single fetch of the final result

mod callbacks;
mod completion;
mod driver;
mod snapshot;


pub use callbacks::{CompleteCallback, ErrorCallback};
pub use completion::{CompletionResolver, Resolution};
pub use snapshot::TrackerSnapshot;

use parking_lot::Mutex;
use reqwest::Url;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::cancellation::{CancellationToken, Generation};
use crate::config::TrackerConfig;
use crate::core::{StageId, StageStatus};
use crate::errors::TrackerError;
use crate::events::{EventSink, NoOpEventSink};
use crate::http::{HttpClient, SessionProvider, ValidationApi, ValidationRecord};
use crate::observability::tracker_span;
use crate::pipeline::{AgentOutput, ConnectionPhase, ReconnectPolicy};
use crate::stream::{EventTransport, ReqwestTransport, StreamEndpointResolver};
use crate::utils::generate_run_id;

use callbacks::OutcomeCallbacks;
use driver::{DriverParts, TrackerDriver};

/// Starts trackers against one backend.
///
/// # Example
///
/// ```rust,ignore
/// let tracker = PipelineTracker::connect_http(TrackerConfig::default(), session)?;
/// let handle = tracker.start(
///     "job-42",
///     |record| println!("verdict: {:?}", record.verdict),
///     |message| eprintln!("validation failed: {message}"),
/// );
/// ```
pub struct PipelineTracker {
    config: TrackerConfig,
    base_url: Url,
    api: Arc<dyn ValidationApi>,
    transport: Arc<dyn EventTransport>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for PipelineTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineTracker")
            .field("base_url", &self.base_url.as_str())
            .field("reconnect", &self.config.reconnect)
            .finish_non_exhaustive()
    }
}

impl PipelineTracker {
    /// Creates a tracker over the given API and transport.
    pub fn new(
        config: TrackerConfig,
        api: Arc<dyn ValidationApi>,
        transport: Arc<dyn EventTransport>,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let base_url = config.base_url()?;
        Ok(Self {
            config,
            base_url,
            api,
            transport,
            sink: Arc::new(NoOpEventSink),
        })
    }

    /// Creates a tracker that talks HTTP to `config.api_base_url`.
    pub fn connect_http(config: TrackerConfig, session: Arc<dyn SessionProvider>) -> Result<Self, TrackerError> {
        let client = HttpClient::new(&config, session)?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::new(config, Arc::new(client), Arc::new(transport))
    }

    /// Sets the sink that receives tracker lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Starts tracking `job_id` on the current tokio runtime.
    ///
    /// Exactly one of `on_complete` and `on_error` is called, unless the
    /// handle is stopped first, in which case neither is.
    pub fn start<C, E>(&self, job_id: impl Into<String>, on_complete: C, on_error: E) -> TrackerHandle
    where
        C: FnOnce(ValidationRecord) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        let job_id = job_id.into();
        let run_id = generate_run_id();
        let cancel = Arc::new(CancellationToken::new());
        let generation = Arc::new(Generation::new());
        let (snapshot_tx, snapshot_rx) = watch::channel(TrackerSnapshot::initial(job_id.clone()));

        let driver = TrackerDriver::new(DriverParts {
            job_id: job_id.clone(),
            run_id,
            api: Arc::clone(&self.api),
            resolver: StreamEndpointResolver::new(Arc::clone(&self.api), self.base_url.clone()),
            transport: Arc::clone(&self.transport),
            policy: ReconnectPolicy::new(self.config.reconnect.clone()),
            sink: Arc::clone(&self.sink),
            cancel: Arc::clone(&cancel),
            generation: Arc::clone(&generation),
            snapshot_tx,
            callbacks: OutcomeCallbacks::new(Box::new(on_complete), Box::new(on_error)),
        });

        let task = tokio::spawn(driver.run().instrument(tracker_span(&job_id, run_id)));

        TrackerHandle {
            job_id,
            run_id,
            cancel,
            generation,
            snapshot_rx,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Handle to one running tracker.
///
/// Dropping the handle stops the tracker.
#[derive(Debug)]
pub struct TrackerHandle {
    job_id: String,
    run_id: Uuid,
    cancel: Arc<CancellationToken>,
    generation: Arc<Generation>,
    snapshot_rx: watch::Receiver<TrackerSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TrackerHandle {
    /// The tracked job id.
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Id of this tracker run, used in logs.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Current status of a stage.
    #[must_use]
    pub fn status_of(&self, stage: StageId) -> StageStatus {
        self.snapshot_rx.borrow().status_of(stage)
    }

    /// Output recorded for a stage, if it has completed.
    #[must_use]
    pub fn output_of(&self, stage: StageId) -> Option<AgentOutput> {
        self.snapshot_rx.borrow().output_of(stage).cloned()
    }

    /// Returns true while a reconnect is pending.
    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.snapshot_rx.borrow().is_reconnecting()
    }

    /// Current connection phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.snapshot_rx.borrow().phase
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// A receiver notified on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Tears the tracker down.
    ///
    /// The connection is released, pending reconnects and fetches are
    /// abandoned, and no callback fires afterwards. Safe to call repeatedly.
    pub fn stop(&self) {
        if self.cancel.cancel("stopped by caller") {
            let epoch = self.generation.advance();
            tracing::info!(job_id = %self.job_id, run_id = %self.run_id, epoch = epoch.value(), "Stopping tracker");
        }
    }

    /// Waits for the tracker task to finish.
    pub async fn join(&self) {
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(job_id = %self.job_id, error = %e, "Tracker task panicked");
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
