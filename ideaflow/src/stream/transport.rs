//! Server-push transports.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{header, StatusCode, Url};
use std::time::Duration;

use super::sse::{SseDecoder, SseFrame};
use crate::errors::StreamError;

/// A stream of decoded frames. Ends on orderly close; yields an error on
/// transport failure.
pub type FrameStream = BoxStream<'static, Result<SseFrame, StreamError>>;

/// Opens server-push connections.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Opens a connection to `url`. Dropping the returned stream closes it.
    async fn open(&self, url: &Url) -> Result<FrameStream, StreamError>;
}

/// Transport that reads `text/event-stream` responses with reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose connect phase is bounded by `connect_timeout`.
    ///
    /// The body has no timeout: streams stay open for the pipeline's lifetime.
    pub fn new(connect_timeout: Duration) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder().connect_timeout(connect_timeout).build()?;
        Ok(Self { client })
    }

    /// Creates a transport over an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventTransport for ReqwestTransport {
    async fn open(&self, url: &Url) -> Result<FrameStream, StreamError> {
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StreamError::Status(status.as_u16()));
        }

        let frames = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, chunk| {
                let batch: Vec<Result<SseFrame, StreamError>> = match chunk {
                    Ok(bytes) => {
                        let mut batch: Vec<_> = decoder.push(&bytes).into_iter().map(Ok).collect();
                        batch.extend(decoder.take_error().map(Err));
                        batch
                    }
                    Err(e) => vec![Err(StreamError::from(e))],
                };
                futures::future::ready(Some(batch))
            })
            .flat_map(stream::iter);

        Ok(frames.boxed())
    }
}
