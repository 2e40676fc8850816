//! Session credentials seam.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::HttpError;

/// Supplies bearer tokens for the current user session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The current access token, if the user is signed in.
    async fn access_token(&self) -> Option<String>;

    /// Refreshes the session and returns the new access token.
    ///
    /// `Ok(None)` means the session cannot be refreshed.
    async fn refresh(&self) -> Result<Option<String>, HttpError>;
}

/// A session holding a fixed token that cannot be refreshed.
#[derive(Debug, Default)]
pub struct StaticSession {
    token: RwLock<Option<String>>,
}

impl StaticSession {
    /// Creates a session with the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Creates a signed-out session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replaces the token.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn access_token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn refresh(&self) -> Result<Option<String>, HttpError> {
        Ok(None)
    }
}
