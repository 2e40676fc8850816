//! Server-push connection to the pipeline event stream.
//!
//! This module provides:
//! - An incremental SSE decoder
//! - The transport seam and its reqwest implementation
//! - Stream endpoint resolution (token + URL)
//! - The connection that classifies frames into pipeline events

mod connection;
mod endpoint;
mod sse;
mod transport;

pub use connection::{EventStreamConnection, StreamMessage};
pub use endpoint::{stream_url, StreamEndpointResolver};
pub use sse::{SseDecoder, SseFrame};
pub use transport::{EventTransport, FrameStream, ReqwestTransport};
