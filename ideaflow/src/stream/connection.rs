//! A single live pipeline stream connection.

use futures::StreamExt;

use super::endpoint::StreamEndpointResolver;
use super::sse::SseFrame;
use super::transport::{EventTransport, FrameStream};
use crate::core::PipelineEvent;
use crate::errors::StreamError;

/// What the connection produced next.
#[derive(Debug)]
pub enum StreamMessage {
    /// A classified pipeline event.
    Event(PipelineEvent),
    /// A frame that carried no usable event.
    Ignored(SseFrame),
    /// The connection ended. `None` for an orderly end of stream.
    Disconnected(Option<StreamError>),
}

/// Owns one open stream. Dropping or closing it releases the connection.
pub struct EventStreamConnection {
    frames: Option<FrameStream>,
}

impl std::fmt::Debug for EventStreamConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamConnection")
            .field("open", &self.is_open())
            .finish()
    }
}

impl EventStreamConnection {
    /// Resolves the endpoint for `job_id` and opens the stream.
    pub async fn open(
        resolver: &StreamEndpointResolver,
        transport: &dyn EventTransport,
        job_id: &str,
    ) -> Result<Self, StreamError> {
        let url = resolver.resolve(job_id).await?;
        let frames = transport.open(&url).await?;
        tracing::info!(job_id, "Pipeline stream opened");
        Ok(Self::from_frames(frames))
    }

    /// Wraps an already-open frame stream.
    #[must_use]
    pub fn from_frames(frames: FrameStream) -> Self {
        Self { frames: Some(frames) }
    }

    /// Returns true until the stream ends or is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.frames.is_some()
    }

    /// Waits for the next message.
    ///
    /// Once disconnected, every further call reports `Disconnected(None)`.
    pub async fn next_message(&mut self) -> StreamMessage {
        let Some(frames) = self.frames.as_mut() else {
            return StreamMessage::Disconnected(None);
        };

        match frames.next().await {
            Some(Ok(frame)) => match PipelineEvent::from_wire(&frame.event, &frame.data) {
                Some(event) => {
                    tracing::debug!(event = event.name(), "Received pipeline event");
                    StreamMessage::Event(event)
                }
                None => StreamMessage::Ignored(frame),
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Pipeline stream failed");
                self.close();
                StreamMessage::Disconnected(Some(e))
            }
            None => {
                tracing::info!("Pipeline stream ended");
                self.close();
                StreamMessage::Disconnected(None)
            }
        }
    }

    /// Releases the underlying connection.
    pub fn close(&mut self) {
        self.frames = None;
    }
}
