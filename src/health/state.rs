//! Per-backend health state.

use super::config::LatencyAveraging;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Running latency average in milliseconds.
#[derive(Debug, Clone)]
pub enum LatencyAverage {
    Window {
        size: usize,
        samples: VecDeque<f64>,
    },
    Ewma {
        alpha: f64,
        value: Option<f64>,
    },
}

impl LatencyAverage {
    pub fn new(method: &LatencyAveraging) -> Self {
        match *method {
            LatencyAveraging::Window { size } => LatencyAverage::Window {
                size: size.max(1),
                samples: VecDeque::with_capacity(size.max(1)),
            },
            LatencyAveraging::Ewma { alpha } => LatencyAverage::Ewma { alpha, value: None },
        }
    }

    pub fn observe(&mut self, latency_ms: f64) {
        match self {
            LatencyAverage::Window { size, samples } => {
                if samples.len() == *size {
                    samples.pop_front();
                }
                samples.push_back(latency_ms);
            }
            LatencyAverage::Ewma { alpha, value } => {
                *value = Some(match *value {
                    Some(prev) => *alpha * latency_ms + (1.0 - *alpha) * prev,
                    None => latency_ms,
                });
            }
        }
    }

    /// Current average, 0.0 before the first sample.
    pub fn value(&self) -> f64 {
        match self {
            LatencyAverage::Window { samples, .. } if samples.is_empty() => 0.0,
            LatencyAverage::Window { samples, .. } => {
                samples.iter().sum::<f64>() / samples.len() as f64
            }
            LatencyAverage::Ewma { value, .. } => value.unwrap_or(0.0),
        }
    }
}

/// Mutable health state of one backend, owned by the tracker.
///
/// Health is never stored; snapshots derive it from `consecutive_failures`.
#[derive(Debug, Clone)]
pub struct BackendHealthState {
    pub consecutive_failures: u32,
    pub latency: LatencyAverage,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub total_successes: u64,
    pub total_failures: u64,
}

impl BackendHealthState {
    pub fn new(method: &LatencyAveraging) -> Self {
        Self {
            consecutive_failures: 0,
            latency: LatencyAverage::new(method),
            last_error: None,
            last_success: None,
            last_failure: None,
            total_successes: 0,
            total_failures: 0,
        }
    }

    /// Returns the failure count before the reset.
    pub fn apply_success(&mut self, latency_ms: f64) -> u32 {
        let previous = self.consecutive_failures;
        self.consecutive_failures = 0;
        self.latency.observe(latency_ms);
        self.last_success = Some(Utc::now());
        self.total_successes += 1;
        previous
    }

    /// Returns the failure count after the increment.
    pub fn apply_failure(&mut self, description: &str) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(description.to_string());
        self.last_failure = Some(Utc::now());
        self.total_failures += 1;
        self.consecutive_failures
    }

    pub fn snapshot(&self, backend_id: &str, failure_threshold: u32) -> HealthSnapshot {
        HealthSnapshot {
            backend_id: backend_id.to_string(),
            healthy: self.consecutive_failures < failure_threshold,
            consecutive_failures: self.consecutive_failures,
            avg_latency_ms: self.latency.value(),
            last_error: self.last_error.clone(),
            last_success: self.last_success,
            last_failure: self.last_failure,
            total_successes: self.total_successes,
            total_failures: self.total_failures,
        }
    }
}

/// Point-in-time copy of a backend's health.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub backend_id: String,
    pub healthy: bool,
    pub consecutive_failures: u32,
    pub avg_latency_ms: f64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub total_successes: u64,
    pub total_failures: u64,
}
