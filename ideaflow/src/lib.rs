//! # Ideaflow
//!
//! Live status tracking for the ideaflow validation pipeline.
//!
//! A validation job runs five agents on the backend: four research agents in
//! parallel, then a synthesis agent. Ideaflow follows a job over a
//! server-sent event stream and keeps an authoritative per-stage view:
//!
//! - **Stream plumbing**: token-authorised endpoint resolution and SSE decoding
//! - **Pipeline state**: idempotent, order-independent event application
//! - **Reconnection**: bounded exponential backoff with a visible reconnecting state
//! - **Completion**: a single fetch of the final record once the pipeline ends
//! - **Teardown**: cooperative cancellation that silences late results
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ideaflow::prelude::*;
//!
//! let tracker = PipelineTracker::connect_http(
//!     TrackerConfig::new("https://api.example.com/api/"),
//!     Arc::new(StaticSession::new(access_token)),
//! )?;
//!
//! let handle = tracker.start(
//!     "job-42",
//!     |record| println!("verdict: {:?}", record.verdict),
//!     |message| eprintln!("validation failed: {message}"),
//! );
//!
//! if handle.is_reconnecting() {
//!     println!("reconnecting...");
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod stream;
pub mod testing;
pub mod tracker;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, Generation};
    pub use crate::config::TrackerConfig;
    pub use crate::core::{PipelineEvent, StageId, StageStatus};
    pub use crate::errors::{HttpError, StreamError, TrackerError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink, TrackerEvent};
    pub use crate::http::{HttpClient, SessionProvider, StaticSession, ValidationApi, ValidationRecord};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::pipeline::{ConnectionPhase, PipelineState, ReconnectConfig, ReconnectPolicy};
    pub use crate::stream::{EventTransport, ReqwestTransport};
    pub use crate::tracker::{PipelineTracker, TrackerHandle, TrackerSnapshot};
    pub use crate::utils::{iso_timestamp, Timestamp};
}
