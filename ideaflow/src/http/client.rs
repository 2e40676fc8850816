//! Reqwest-backed client for the validation API.

use async_trait::async_trait;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::models::{StreamToken, ValidationRecord};
use super::session::SessionProvider;
use crate::config::TrackerConfig;
use crate::errors::{HttpError, TrackerError};

/// The two request/response calls the tracker depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidationApi: Send + Sync {
    /// `POST /validations/{id}/stream-token`: obtains a single-use stream token.
    async fn create_stream_token(&self, job_id: &str) -> Result<String, HttpError>;

    /// `GET /validations/{id}`: fetches the authoritative job record.
    async fn fetch_validation(&self, job_id: &str) -> Result<ValidationRecord, HttpError>;
}

/// Runs a request with the current session token, retrying exactly once
/// after a session refresh if the first attempt is rejected as unauthorized.
///
/// `send` receives the bearer token to attach and must report a 401 answer
/// as [`HttpError::Unauthorized`].
pub async fn with_session_retry<T, F, Fut>(session: &dyn SessionProvider, mut send: F) -> Result<T, HttpError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<T, HttpError>>,
{
    let token = session.access_token().await;
    match send(token).await {
        Err(HttpError::Unauthorized) => {}
        other => return other,
    }

    tracing::debug!("Request unauthorized, refreshing session");
    match session.refresh().await {
        Ok(Some(token)) => send(Some(token)).await,
        Ok(None) => Err(HttpError::Unauthorized),
        Err(e) => {
            tracing::warn!(error = %e, "Session refresh failed");
            Err(HttpError::Unauthorized)
        }
    }
}

/// HTTP client for the validation API.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    session: Arc<dyn SessionProvider>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client from the tracker configuration.
    pub fn new(config: &TrackerConfig, session: Arc<dyn SessionProvider>) -> Result<Self, TrackerError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TrackerError::Http(HttpError::Transport(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url()?,
            timeout: config.request_timeout(),
            session,
        })
    }

    /// The API base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn request_json<T: DeserializeOwned>(&self, method: Method, segments: &[&str]) -> Result<T, HttpError> {
        let url = super::join_segments(&self.base_url, segments)?;
        tracing::debug!(%method, url = %url, "Sending request");

        let response = with_session_retry(self.session.as_ref(), |token| {
            self.send_once(method.clone(), url.clone(), token)
        })
        .await?;

        response.json::<T>().await.map_err(|e| self.map_error(e))
    }

    async fn send_once(&self, method: Method, url: Url, token: Option<String>) -> Result<reqwest::Response, HttpError> {
        let mut request = self.client.request(method, url).timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(HttpError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::status(status.as_u16(), error_detail(&body)));
        }
        Ok(response)
    }

    fn map_error(&self, err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout { timeout: self.timeout }
        } else {
            HttpError::from(err)
        }
    }
}

/// Extracts a readable message from an error body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "error", "message"]
                .iter()
                .find_map(|key| v.get(key).and_then(|d| d.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl ValidationApi for HttpClient {
    async fn create_stream_token(&self, job_id: &str) -> Result<String, HttpError> {
        let token: StreamToken = self
            .request_json(Method::POST, &["validations", job_id, "stream-token"])
            .await?;
        Ok(token.token)
    }

    async fn fetch_validation(&self, job_id: &str) -> Result<ValidationRecord, HttpError> {
        self.request_json(Method::GET, &["validations", job_id]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StaticSession;
    use crate::testing::RefreshingSession;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_success_without_refresh() {
        let session = RefreshingSession::new("old", Some("new"));
        let seen = Mutex::new(Vec::new());

        let result = with_session_retry(&session, |token| {
            seen.lock().push(token);
            async { Ok::<_, HttpError>(7) }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(*seen.lock(), vec![Some("old".to_string())]);
        assert_eq!(session.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_single_retry_after_refresh() {
        let session = RefreshingSession::new("old", Some("new"));
        let seen = Mutex::new(Vec::new());

        let result = with_session_retry(&session, |token| {
            let ok = token.as_deref() == Some("new");
            seen.lock().push(token);
            async move {
                if ok {
                    Ok("record")
                } else {
                    Err(HttpError::Unauthorized)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "record");
        assert_eq!(
            *seen.lock(),
            vec![Some("old".to_string()), Some("new".to_string())]
        );
        assert_eq!(session.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_never_more_than_one_retry() {
        let session = RefreshingSession::new("old", Some("new"));
        let calls = Mutex::new(0);

        let result: Result<(), HttpError> = with_session_retry(&session, |_| {
            *calls.lock() += 1;
            async { Err(HttpError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(HttpError::Unauthorized)));
        assert_eq!(*calls.lock(), 2);
        assert_eq!(session.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_unrefreshable_session_fails_after_first_attempt() {
        let session = StaticSession::new("old");
        let calls = Mutex::new(0);

        let result: Result<(), HttpError> = with_session_retry(&session, |_| {
            *calls.lock() += 1;
            async { Err(HttpError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(HttpError::Unauthorized)));
        assert_eq!(*calls.lock(), 1);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let session = RefreshingSession::new("old", Some("new"));
        let calls = Mutex::new(0);

        let result: Result<(), HttpError> = with_session_retry(&session, |_| {
            *calls.lock() += 1;
            async {
                Err(HttpError::Timeout {
                    timeout: Duration::from_secs(15),
                })
            }
        })
        .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(*calls.lock(), 1);
        assert_eq!(session.refresh_count(), 0);
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(error_detail(r#"{"detail":"Not found"}"#), "Not found");
        assert_eq!(error_detail(r#"{"error":"boom"}"#), "boom");
        assert_eq!(error_detail("  plain text "), "plain text");
    }

    #[test]
    fn test_client_uses_configured_timeout() {
        let config = TrackerConfig::new("https://api.example.com").with_request_timeout(3.0);
        let client = HttpClient::new(&config, Arc::new(StaticSession::anonymous())).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
        assert_eq!(client.base_url().as_str(), "https://api.example.com/");
    }

    /// Serves canned answers: 401 unless the request carries `Bearer new`.
    async fn serve_bearer(listener: tokio::net::TcpListener, requests: Arc<Mutex<Vec<String>>>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = vec![0u8; 4096];
            let mut head = String::new();
            while !head.contains("\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                head.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
            let request_line = head.lines().next().unwrap_or_default().to_string();
            requests.lock().push(request_line.clone());

            let authorized = head.lines().any(|l| l.eq_ignore_ascii_case("authorization: Bearer new"));
            let (status, body) = if !authorized {
                ("401 Unauthorized", r#"{"detail":"expired"}"#.to_string())
            } else if request_line.starts_with("POST") {
                ("200 OK", r#"{"token":"stream-tok"}"#.to_string())
            } else {
                ("200 OK", r#"{"id":"run-1","status":"completed","verdict":"BUILD","confidence":0.78,"scores":{"market":8}}"#.to_string())
            };
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    }

    async fn local_client(session: Arc<dyn SessionProvider>) -> (HttpClient, Arc<Mutex<Vec<String>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        tokio::spawn(serve_bearer(listener, Arc::clone(&requests)));

        let config = TrackerConfig::new(format!("http://{addr}/api"));
        (HttpClient::new(&config, session).unwrap(), requests)
    }

    #[tokio::test]
    async fn test_client_refreshes_once_on_401() {
        let session = Arc::new(RefreshingSession::new("old", Some("new")));
        let (client, requests) = local_client(Arc::clone(&session) as Arc<dyn SessionProvider>).await;

        let record = client.fetch_validation("run-1").await.unwrap();

        assert_eq!(record.verdict.as_deref(), Some("BUILD"));
        assert_eq!(record.details["scores"]["market"], 8);
        assert_eq!(session.refresh_count(), 1);
        assert_eq!(
            *requests.lock(),
            vec![
                "GET /api/validations/run-1 HTTP/1.1".to_string(),
                "GET /api/validations/run-1 HTTP/1.1".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_client_stream_token_after_refresh() {
        let session = Arc::new(RefreshingSession::new("old", Some("new")));
        let (client, requests) = local_client(Arc::clone(&session) as Arc<dyn SessionProvider>).await;

        let token = client.create_stream_token("run-1").await.unwrap();

        assert_eq!(token, "stream-tok");
        assert_eq!(requests.lock()[0], "POST /api/validations/run-1/stream-token HTTP/1.1");
    }

    #[tokio::test]
    async fn test_client_gives_up_when_refresh_fails() {
        let session = Arc::new(RefreshingSession::new("old", None));
        let (client, requests) = local_client(Arc::clone(&session) as Arc<dyn SessionProvider>).await;

        let err = client.fetch_validation("run-1").await.unwrap_err();

        assert!(matches!(err, HttpError::Unauthorized));
        assert_eq!(requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let config = TrackerConfig::new("http://127.0.0.1:9/").with_request_timeout(2.0);
        let client = HttpClient::new(&config, Arc::new(StaticSession::new("t"))).unwrap();

        let err = client.fetch_validation("run-1").await.unwrap_err();
        assert!(matches!(err, HttpError::Transport(_) | HttpError::Timeout { .. }));
    }
}
