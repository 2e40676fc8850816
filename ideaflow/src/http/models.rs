//! Wire models for the validation API.

use serde::{Deserialize, Serialize};

/// Response of `POST /validations/{id}/stream-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    /// Single-use stream access token.
    pub token: String,
}

/// The authoritative job record returned by `GET /validations/{id}`.
///
/// Fields the tracker does not interpret are kept in `details` and handed
/// to the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    /// The job id.
    pub id: String,
    /// Backend job status, e.g. "completed".
    #[serde(default)]
    pub status: Option<String>,
    /// Final verdict.
    #[serde(default)]
    pub verdict: Option<String>,
    /// Verdict confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Remaining fields of the record.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl ValidationRecord {
    /// Creates a record with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: None,
            verdict: None,
            confidence: None,
            details: serde_json::Map::new(),
        }
    }

    /// Sets the verdict and confidence.
    #[must_use]
    pub fn with_verdict(mut self, verdict: impl Into<String>, confidence: f64) -> Self {
        self.verdict = Some(verdict.into());
        self.confidence = Some(confidence);
        self
    }
}
