//! One-shot fetch of the authoritative result after completion.

use std::sync::Arc;

use crate::cancellation::{Epoch, Generation};
use crate::errors::HttpError;
use crate::http::{ValidationApi, ValidationRecord};

/// Result of resolving a completed pipeline.
#[derive(Debug)]
pub enum Resolution {
    /// The record was fetched.
    Fetched(ValidationRecord),
    /// The fetch failed. Not retried.
    Failed(HttpError),
    /// The tracker was torn down while the fetch was in flight.
    Stale,
}

/// Fetches the final job record exactly once.
///
/// [`resolve`](Self::resolve) consumes the resolver, so a second fetch for
/// the same completion cannot be issued.
pub struct CompletionResolver {
    api: Arc<dyn ValidationApi>,
    job_id: String,
    generation: Arc<Generation>,
    epoch: Epoch,
}

impl std::fmt::Debug for CompletionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionResolver")
            .field("job_id", &self.job_id)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl CompletionResolver {
    /// Creates a resolver bound to the current generation.
    #[must_use]
    pub fn new(api: Arc<dyn ValidationApi>, job_id: impl Into<String>, generation: Arc<Generation>) -> Self {
        let epoch = generation.epoch();
        Self {
            api,
            job_id: job_id.into(),
            generation,
            epoch,
        }
    }

    /// Fetches the record, unless the generation moved on.
    pub async fn resolve(self) -> Resolution {
        if !self.generation.is_current(self.epoch) {
            return Resolution::Stale;
        }

        let result = self.api.fetch_validation(&self.job_id).await;

        if !self.generation.is_current(self.epoch) {
            tracing::debug!(job_id = %self.job_id, "Discarding result fetched after teardown");
            return Resolution::Stale;
        }

        match result {
            Ok(record) => {
                tracing::info!(job_id = %self.job_id, verdict = ?record.verdict, "Fetched final result");
                Resolution::Fetched(record)
            }
            Err(e) => {
                tracing::error!(job_id = %self.job_id, error = %e, "Failed to fetch final result");
                Resolution::Failed(e)
            }
        }
    }
}
