//! Captured HTTP exchange model
//!
//! Represents a single request observed by the recording interceptor and the
//! response (or failure) it eventually produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Correlation key assigned when a request is claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a captured request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for the transport to finish
    Pending,
    /// Response fully received
    Completed,
    /// Transport reported an error or the exchange was cancelled
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

/// Response half of an exchange, frozen once the body ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// HTTP status code
    pub status_code: u16,
    /// Response headers
    pub headers: HashMap<String, String>,
    /// Response body (if any)
    pub body: Option<Vec<u8>>,
    /// Time from claim to the end of the body
    pub response_time: Duration,
    /// Whether the recorded body was cut at the capture limit
    pub body_truncated: bool,
}

impl ResponseRecord {
    pub fn content_type(&self) -> Option<&str> {
        header_value(&self.headers, "content-type")
    }

    pub fn response_time_ms(&self) -> u64 {
        self.response_time.as_millis() as u64
    }
}

/// Terminal result delivered for a pending request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestOutcome {
    Completed(ResponseRecord),
    Failed { error: String },
}

impl RequestOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        RequestOutcome::Failed {
            error: error.into(),
        }
    }

    pub fn status(&self) -> RequestStatus {
        match self {
            RequestOutcome::Completed(_) => RequestStatus::Completed,
            RequestOutcome::Failed { .. } => RequestStatus::Failed,
        }
    }

    pub fn response(&self) -> Option<&ResponseRecord> {
        match self {
            RequestOutcome::Completed(response) => Some(response),
            RequestOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("request {id} already reached {status:?}")]
pub struct AlreadyTerminal {
    pub id: RequestId,
    pub status: RequestStatus,
}

/// One observed HTTP exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unique identifier for this request
    pub id: RequestId,
    /// Absolute URL as issued by the app
    pub url: String,
    /// HTTP method
    pub method: String,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (if any)
    pub body: Option<Vec<u8>>,
    /// Whether the recorded request body was cut at the capture limit
    #[serde(default)]
    pub body_truncated: bool,
    /// When the request was claimed
    pub timestamp: DateTime<Utc>,
    /// Response, set once the exchange completes
    pub response: Option<ResponseRecord>,
    /// Current lifecycle state
    pub status: RequestStatus,
    /// Transport error text for failed exchanges
    pub error: Option<String>,
}

impl RequestRecord {
    /// Create a pending record for a freshly claimed request
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            url: url.into(),
            method: method.into(),
            headers,
            body,
            body_truncated: false,
            timestamp: Utc::now(),
            response: None,
            status: RequestStatus::Pending,
            error: None,
        }
    }

    /// Move the record into its terminal state.
    pub fn apply_outcome(&mut self, outcome: RequestOutcome) -> Result<(), AlreadyTerminal> {
        if self.status.is_terminal() {
            return Err(AlreadyTerminal {
                id: self.id,
                status: self.status,
            });
        }
        self.status = outcome.status();
        match outcome {
            RequestOutcome::Completed(response) => {
                self.response = Some(response);
                self.error = None;
            }
            RequestOutcome::Failed { error } => {
                self.response = None;
                self.error = Some(error);
            }
        }
        Ok(())
    }

    pub fn content_type(&self) -> Option<&str> {
        header_value(&self.headers, "content-type")
    }

    /// Short status text for list rows
    pub fn status_label(&self) -> String {
        match self.status {
            RequestStatus::Pending => "Pending".to_string(),
            RequestStatus::Completed => match &self.response {
                Some(response) => response.status_code.to_string(),
                None => "Completed".to_string(),
            },
            RequestStatus::Failed => "Failed".to_string(),
        }
    }

    /// Get duration as formatted string
    pub fn duration_str(&self) -> String {
        match self.response.as_ref().map(ResponseRecord::response_time_ms) {
            Some(ms) if ms < 1000 => format!("{}ms", ms),
            Some(ms) => format!("{:.1}s", ms as f64 / 1000.0),
            None => "-".to_string(),
        }
    }

    /// Get response size as formatted string
    pub fn size_str(&self) -> String {
        match self
            .response
            .as_ref()
            .and_then(|r| r.body.as_ref())
            .map(Vec::len)
        {
            Some(size) => format_size(size),
            None => "-".to_string(),
        }
    }
}

/// Case-insensitive header lookup
pub fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Flatten an `http` header map, joining repeated values.
pub fn headers_to_map(headers: &http::HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::with_capacity(headers.keys_len());
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

pub fn format_size(size: usize) -> String {
    if size < 1024 {
        format!("{}B", size)
    } else if size < 1024 * 1024 {
        format!("{:.1}KB", size as f64 / 1024.0)
    } else {
        format!("{:.1}MB", size as f64 / (1024.0 * 1024.0))
    }
}
