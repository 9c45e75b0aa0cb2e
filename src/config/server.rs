//! Server configuration

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Applies to every endpoint except chat completions, which are bounded
    /// by the per-backend timeouts of their fallback chain.
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
    /// Request headers whose values become transport markers for the classifier.
    pub marker_headers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            request_timeout_seconds: 300,
            max_body_bytes: 10 * 1024 * 1024,
            marker_headers: vec![
                "x-openclaw-source".to_string(),
                "x-clawgate-source".to_string(),
            ],
        }
    }
}
