//! Configuration for passive health tracking.

use serde::{Deserialize, Serialize};

/// How successful-call latencies are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LatencyAveraging {
    /// Arithmetic mean of the last `size` samples
    Window {
        #[serde(default = "default_window")]
        size: usize,
    },
    /// Exponentially weighted moving average; higher `alpha` reacts faster
    Ewma {
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
}

fn default_window() -> usize {
    20
}

fn default_alpha() -> f64 {
    0.3
}

impl Default for LatencyAveraging {
    fn default() -> Self {
        LatencyAveraging::Window {
            size: default_window(),
        }
    }
}

/// Configuration for backend health tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures at which a backend is reported unhealthy
    pub failure_threshold: u32,
    pub latency: LatencyAveraging,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            latency: LatencyAveraging::default(),
        }
    }
}
