//! Stream endpoint resolution.

use reqwest::Url;
use std::sync::Arc;

use crate::errors::StreamError;
use crate::http::{join_segments, ValidationApi};

/// Builds the time-limited stream URL for a job.
#[derive(Clone)]
pub struct StreamEndpointResolver {
    api: Arc<dyn ValidationApi>,
    base_url: Url,
}

impl std::fmt::Debug for StreamEndpointResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamEndpointResolver")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl StreamEndpointResolver {
    /// Creates a resolver that issues token requests through `api`.
    #[must_use]
    pub fn new(api: Arc<dyn ValidationApi>, base_url: Url) -> Self {
        Self { api, base_url }
    }

    /// Fetches a fresh single-use token and composes the stream URL.
    ///
    /// Tokens are single use, so every connection attempt resolves anew.
    pub async fn resolve(&self, job_id: &str) -> Result<Url, StreamError> {
        let token = self.api.create_stream_token(job_id).await?;
        let url = stream_url(&self.base_url, job_id, &token)?;
        tracing::debug!(job_id, "Resolved stream endpoint");
        Ok(url)
    }
}

/// Composes `{base}/validations/{id}/stream?token=...`.
pub fn stream_url(base_url: &Url, job_id: &str, token: &str) -> Result<Url, StreamError> {
    let mut url = join_segments(base_url, &["validations", job_id, "stream"])?;
    url.query_pairs_mut().clear().append_pair("token", token);
    Ok(url)
}
