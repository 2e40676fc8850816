//! Request/response collaborators used by the tracker.
//!
//! This module provides:
//! - The [`ValidationApi`] seam for the two calls the tracker makes
//! - A reqwest-backed client with bearer auth, timeout and 401 refresh
//! - The [`SessionProvider`] seam for the caller's credentials

mod client;
mod models;
mod session;

pub use client::{with_session_retry, HttpClient, ValidationApi};
pub use models::{StreamToken, ValidationRecord};
pub use session::{SessionProvider, StaticSession};

#[cfg(test)]
pub use client::MockValidationApi;

use reqwest::Url;

use crate::errors::HttpError;

/// Appends percent-encoded path segments to a base URL.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, HttpError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| HttpError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments_encodes() {
        let base = Url::parse("https://api.example.com/api/").unwrap();
        let url = join_segments(&base, &["validations", "a b/c", "stream"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/validations/a%20b%2Fc/stream");
    }

    #[test]
    fn test_join_segments_without_trailing_slash() {
        let base = Url::parse("https://api.example.com").unwrap();
        let url = join_segments(&base, &["validations", "42"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/validations/42");
    }
}
