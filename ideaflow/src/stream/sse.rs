//! Incremental Server-Sent Events decoder.
//!
//! Bytes are fed in arbitrary chunks; complete frames come out. Handles
//! `event:`, multi-line `data:`, `id:`, comment lines and CRLF line endings.
//! A frame is dispatched on the blank line that ends it; frames without any
//! `data:` line are discarded. A line or frame longer than the decoder's
//! limit fails the stream.

use std::fmt::Write;

use crate::errors::StreamError;

/// One dispatched server-push message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// The event name; `"message"` when the frame had no `event:` line.
    pub event: String,
    /// The data lines joined with `\n`.
    pub data: String,
    /// The last event id, if the frame carried one.
    pub id: Option<String>,
}

impl SseFrame {
    /// Creates a frame with the given event name and data.
    #[must_use]
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
        }
    }

    /// Encodes the frame in wire format.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        if let Some(ref id) = self.id {
            let _ = writeln!(out, "id: {id}");
        }
        let _ = writeln!(out, "event: {}", self.event);
        for line in self.data.split('\n') {
            let _ = writeln!(out, "data: {line}");
        }
        out.push('\n');
        out
    }
}

const DEFAULT_EVENT: &str = "message";

/// Default cap on one buffered line or frame, in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1 << 20;

/// Stateful decoder for a byte stream of SSE frames.
#[derive(Debug)]
pub struct SseDecoder {
    pending: Vec<u8>,
    scanned: usize,
    event: Option<String>,
    data: Vec<String>,
    data_bytes: usize,
    id: Option<String>,
    max_frame_bytes: usize,
    error: Option<StreamError>,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that fails once a line or frame exceeds `limit` bytes.
    #[must_use]
    pub fn with_max_frame_bytes(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            event: None,
            data: Vec::new(),
            data_bytes: 0,
            id: None,
            max_frame_bytes: limit,
            error: None,
        }
    }

    /// Feeds a chunk and returns every frame it completed.
    ///
    /// Once the size limit is exceeded the decoder drops its buffer, stops
    /// producing frames and reports the failure through [`take_error`](Self::take_error).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        if self.error.is_some() {
            return Vec::new();
        }
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut search = self.scanned;
        while let Some(offset) = self.pending[search..].iter().position(|b| *b == b'\n') {
            let newline = search + offset;
            let end = if newline > start && self.pending[newline - 1] == b'\r' {
                newline - 1
            } else {
                newline
            };
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            start = newline + 1;
            search = start;

            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
            if self.data_bytes > self.max_frame_bytes {
                self.overflow();
                return frames;
            }
        }

        self.pending.drain(..start);
        self.scanned = self.pending.len();
        if self.pending.len() > self.max_frame_bytes {
            self.overflow();
        }
        frames
    }

    /// Takes the failure recorded by [`push`](Self::push), if any.
    pub fn take_error(&mut self) -> Option<StreamError> {
        self.error.take()
    }

    fn overflow(&mut self) {
        tracing::warn!(limit = self.max_frame_bytes, "Server-sent event exceeds size limit");
        self.pending = Vec::new();
        self.scanned = 0;
        self.event = None;
        self.data.clear();
        self.data_bytes = 0;
        self.error = Some(StreamError::Oversized {
            limit: self.max_frame_bytes,
        });
    }

    /// Returns true if a partial frame is buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.pending.is_empty() || !self.data.is_empty() || self.event.is_some()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data_bytes += value.len() + 1;
                self.data.push(value.to_string());
            }
            "id" => {
                if !value.contains('\0') {
                    self.id = Some(value.to_string());
                }
            }
            // `retry:` is owned by the reconnection policy, not the server.
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        self.data_bytes = 0;
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event.filter(|e| !e.is_empty()).unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.id.clone(),
        })
    }
}
