//! Subscriber setup and span helpers.

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::errors::TrackerError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs a global subscriber.
///
/// The filter is read from `RUST_LOG`, falling back to `default_filter`.
/// Fails if a global subscriber is already installed.
pub fn init_logging(format: LogFormat, default_filter: &str) -> Result<(), TrackerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| TrackerError::Config(format!("invalid log filter '{default_filter}': {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    result.map_err(|e| TrackerError::Config(format!("failed to install subscriber: {e}")))
}

/// Span covering one tracker run.
#[must_use]
pub fn tracker_span(job_id: &str, run_id: Uuid) -> tracing::Span {
    tracing::info_span!("pipeline_tracker", job_id = %job_id, run_id = %run_id)
}
