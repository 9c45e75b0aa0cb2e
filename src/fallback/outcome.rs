//! Per-request outcome records

use crate::agent::FailureKind;
use crate::routing::Layer;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One failed backend attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub backend: String,
    pub kind: FailureKind,
    pub error: String,
}

/// Final record of one request, emitted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub final_backend: Option<String>,
    pub layer: Layer,
    pub rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cache_hit_tokens: u64,
    pub cost_usd: f64,
    pub success: bool,
    pub latency_ms: u64,
    /// Backend ids in the order they were tried
    pub attempted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RequestOutcome {
    /// More than one backend was tried.
    pub fn used_fallback(&self) -> bool {
        self.attempted.len() > 1
    }
}

/// Receiver of request outcomes (metrics, history, audit).
pub trait OutcomeSink: Send + Sync + 'static {
    fn record(&self, outcome: &RequestOutcome);
}

/// Sink that drops every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn record(&self, _outcome: &RequestOutcome) {}
}

/// Human-readable summary of failed attempts, `a (timeout: ...); b (...)`.
pub fn summarize_attempts(attempts: &[AttemptRecord]) -> String {
    if attempts.is_empty() {
        return "no backends attempted".to_string();
    }
    attempts
        .iter()
        .map(|a| format!("{} ({}: {})", a.backend, a.kind, a.error))
        .collect::<Vec<_>>()
        .join("; ")
}
