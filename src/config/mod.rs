//! Configuration module for ClawGate
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CLAWGATE_*`)
//! 3. Configuration file (TOML, with `${VAR}` / `${VAR:-default}` expansion)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use clawgate::config::GatewayConfig;
//!
//! let config = GatewayConfig::default();
//! assert_eq!(config.server.port, 8090);
//!
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config = GatewayConfig::from_toml_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod backend;
pub mod classifier;
pub mod env;
pub mod error;
pub mod logging;
pub mod routing;
pub mod server;

pub use backend::{AdapterKind, BackendConfig, FallbackChainConfig, PricingConfig, TimeoutConfig};
pub use classifier::ClassifierConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use routing::{CategoryConfig, RoutingConfig, RoutingRule, RuleMatch, RuleTarget};
pub use server::ServerConfig;

// Re-export HealthConfig from health module
pub use crate::health::{HealthConfig, LatencyAveraging};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
    pub backends: Vec<BackendConfig>,
    pub fallback_chains: Vec<FallbackChainConfig>,
    pub routing: RoutingConfig,
    pub classifier: ClassifierConfig,
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                Self::from_toml_str(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse TOML text, expanding environment references in every string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut raw: toml::Value =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        env::expand_value(&mut raw);
        raw.try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides
    ///
    /// Supports CLAWGATE_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("CLAWGATE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("CLAWGATE_HOST") {
            self.server.host = host;
        }

        if let Ok(level) = std::env::var("CLAWGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CLAWGATE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        if let Ok(threshold) = std::env::var("CLAWGATE_FAILURE_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                self.health.failure_threshold = t;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.health.failure_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "health.failure_threshold".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        match self.health.latency {
            LatencyAveraging::Window { size } if size == 0 => {
                return Err(ConfigError::Validation {
                    field: "health.latency.size".to_string(),
                    message: "window must hold at least one sample".to_string(),
                });
            }
            LatencyAveraging::Ewma { alpha } if !(alpha > 0.0 && alpha <= 1.0) => {
                return Err(ConfigError::Validation {
                    field: "health.latency.alpha".to_string(),
                    message: "alpha must be in (0, 1]".to_string(),
                });
            }
            _ => {}
        }

        let mut ids = HashSet::new();
        for (i, backend) in self.backends.iter().enumerate() {
            if backend.id.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].id", i),
                    message: "id cannot be empty".to_string(),
                });
            }
            if backend.url.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].url", i),
                    message: "URL cannot be empty".to_string(),
                });
            }
            if !ids.insert(backend.id.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].id", i),
                    message: format!("duplicate backend id '{}'", backend.id),
                });
            }
            let p = &backend.pricing;
            let prices = [Some(p.input), p.cache_hit, Some(p.output)];
            if prices.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(ConfigError::Validation {
                    field: format!("backends[{}].pricing", i),
                    message: "prices must be non-negative".to_string(),
                });
            }
        }

        for (i, chain) in self.fallback_chains.iter().enumerate() {
            if chain.name.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("fallback_chains[{}].name", i),
                    message: "name cannot be empty".to_string(),
                });
            }
            if let Some(unknown) = chain.members.iter().find(|m| !ids.contains(m.as_str())) {
                return Err(ConfigError::UnknownReference {
                    field: format!("fallback_chains[{}].members", i),
                    name: unknown.clone(),
                });
            }
        }

        routing::validate_rules(&self.routing)?;
        for (i, category) in self.routing.categories.iter().enumerate() {
            if !ids.contains(category.backend.as_str()) {
                return Err(ConfigError::UnknownReference {
                    field: format!("routing.categories[{}].backend", i),
                    name: category.backend.clone(),
                });
            }
        }
        for (i, rule) in self.routing.rules.iter().enumerate() {
            if let RuleTarget::Backend(id) = &rule.target {
                if !ids.contains(id.as_str()) {
                    return Err(ConfigError::UnknownReference {
                        field: format!("routing.rules[{}].target", i),
                        name: id.clone(),
                    });
                }
            }
        }

        if self.classifier.enabled {
            match &self.classifier.backend {
                Some(id) if ids.contains(id.as_str()) => {}
                Some(id) => {
                    return Err(ConfigError::UnknownReference {
                        field: "classifier.backend".to_string(),
                        name: id.clone(),
                    });
                }
                None => {
                    return Err(ConfigError::Validation {
                        field: "classifier.backend".to_string(),
                        message: "required when the classifier is enabled".to_string(),
                    });
                }
            }
            if self.classifier.timeout_ms == 0 {
                return Err(ConfigError::Validation {
                    field: "classifier.timeout_ms".to_string(),
                    message: "timeout must be non-zero".to_string(),
                });
            }
            for (label, category) in &self.classifier.labels {
                if self.routing.category(category).is_none() {
                    return Err(ConfigError::UnknownReference {
                        field: format!("classifier.labels.{}", label),
                        name: category.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
