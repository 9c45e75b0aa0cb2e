//! Error types for agent operations.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during a backend call.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// Transport error other than connect/timeout (TLS, body read, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// Connection could not be established (refused, DNS, reset).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request exceeded deadline.
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// Backend returned an error response (4xx, 5xx).
    #[error("Backend error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Backend response doesn't match expected format.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Agent configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Coarse failure class reported to health tracking and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Connection,
    UpstreamStatus,
    Malformed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Connection => "connection",
            FailureKind::UpstreamStatus => "upstream_status",
            FailureKind::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AgentError {
    /// Map a reqwest send error, keeping timeouts and connect failures apart.
    ///
    /// The request URL is dropped from the message; it may carry credentials.
    pub fn from_reqwest(e: reqwest::Error, timeout_ms: u64) -> Self {
        if e.is_timeout() {
            AgentError::Timeout(timeout_ms)
        } else if e.is_connect() {
            AgentError::Connection(e.without_url().to_string())
        } else {
            AgentError::Network(e.without_url().to_string())
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AgentError::Timeout(_) => FailureKind::Timeout,
            AgentError::Network(_) | AgentError::Connection(_) | AgentError::Configuration(_) => {
                FailureKind::Connection
            }
            AgentError::Upstream { .. } => FailureKind::UpstreamStatus,
            AgentError::InvalidResponse(_) => FailureKind::Malformed,
        }
    }
}
