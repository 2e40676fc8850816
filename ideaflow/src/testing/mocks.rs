//! Scriptable stand-ins for the session and stream transport.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::{Mutex, RwLock};
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::{HttpError, StreamError};
use crate::http::SessionProvider;
use crate::stream::{EventTransport, FrameStream, SseFrame};

/// A session that hands out `refreshed` after a refresh.
#[derive(Debug)]
pub struct RefreshingSession {
    token: RwLock<Option<String>>,
    refreshed: Option<String>,
    refreshes: AtomicUsize,
}

impl RefreshingSession {
    /// Creates a session holding `token`. `refreshed` of `None` makes refresh fail.
    #[must_use]
    pub fn new(token: impl Into<String>, refreshed: Option<&str>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            refreshed: refreshed.map(str::to_string),
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Returns how many times refresh was called.
    #[must_use]
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for RefreshingSession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn refresh(&self) -> Result<Option<String>, HttpError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        match &self.refreshed {
            Some(token) => {
                *self.token.write() = Some(token.clone());
                Ok(Some(token.clone()))
            }
            None => Err(HttpError::Unauthorized),
        }
    }
}

/// How a scripted stream ends after its frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closes the stream.
    Close,
    /// The transport fails.
    Error,
    /// The stream stays open with nothing more to say.
    Hang,
}

/// One scripted connection attempt.
#[derive(Debug, Clone)]
pub enum Script {
    /// The connection is refused.
    Refuse,
    /// The connection opens, delivers frames, then ends.
    Frames(Vec<SseFrame>, StreamEnd),
}

/// Transport that plays back one [`Script`] per connection attempt.
///
/// Attempts beyond the queued scripts are refused.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<Url>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    /// Creates a transport with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a script for the next unscripted attempt.
    #[must_use]
    pub fn then(self, script: Script) -> Self {
        self.scripts.lock().push_back(script);
        self
    }

    /// Queues a connection that delivers `frames` and ends with `end`.
    #[must_use]
    pub fn then_frames(self, frames: Vec<SseFrame>, end: StreamEnd) -> Self {
        self.then(Script::Frames(frames, end))
    }

    /// Queues `count` refused attempts.
    #[must_use]
    pub fn then_refuse(self, count: usize) -> Self {
        for _ in 0..count {
            self.scripts.lock().push_back(Script::Refuse);
        }
        self
    }

    /// Returns how many connections were attempted.
    #[must_use]
    pub fn opens(&self) -> usize {
        self.urls.lock().len()
    }

    /// Returns the URL of every attempt.
    #[must_use]
    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }

    /// Returns how many opened streams are still held by someone.
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self, url: &Url) -> Result<FrameStream, StreamError> {
        self.urls.lock().push(url.clone());
        let script = self.scripts.lock().pop_front().unwrap_or(Script::Refuse);

        let (frames, end) = match script {
            Script::Refuse => return Err(StreamError::Status(503)),
            Script::Frames(frames, end) => (frames, end),
        };

        let tail: FrameStream = match end {
            StreamEnd::Close => stream::empty().boxed(),
            StreamEnd::Error => stream::once(async { Err(StreamError::Transport("connection reset".to_string())) }).boxed(),
            StreamEnd::Hang => stream::pending().boxed(),
        };

        self.live.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(Arc::clone(&self.live));
        let frames = stream::iter(frames.into_iter().map(Ok)).chain(tail).map(move |item| {
            let _held = &guard;
            item
        });

        Ok(frames.boxed())
    }
}
