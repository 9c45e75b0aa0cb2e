//! Agent factory for creating InferenceAgent trait objects from the registry.

use super::{google::GoogleGenAiAgent, openai::OpenAICompatAgent, AgentError, InferenceAgent};
use crate::config::AdapterKind;
use crate::registry::{Backend, Registry};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;

/// Create an agent for one registered backend.
///
/// Each backend gets its own HTTP client so connect and read timeouts stay
/// per-backend; the client's total timeout is `connect + read`.
///
/// # Examples
///
/// ```
/// use clawgate::agent::create_agent;
/// use clawgate::config::{BackendConfig, GatewayConfig};
/// use clawgate::registry::Registry;
///
/// let mut config = GatewayConfig::default();
/// let mut backend = BackendConfig::new("ollama", "http://127.0.0.1:11434/v1");
/// backend.auth_optional = true;
/// config.backends.push(backend);
///
/// let registry = Registry::from_config(&config).unwrap();
/// let agent = create_agent(registry.get("ollama").unwrap()).unwrap();
/// assert_eq!(agent.id(), "ollama");
/// ```
pub fn create_agent(backend: &Backend) -> Result<Arc<dyn InferenceAgent>, AgentError> {
    let total = backend.timeouts.total();
    let client = Client::builder()
        .connect_timeout(backend.timeouts.connect)
        .timeout(total)
        .build()
        .map_err(|e| {
            AgentError::Configuration(format!(
                "Failed to build HTTP client for '{}': {}",
                backend.id, e
            ))
        })?;
    let client = Arc::new(client);
    let timeout_ms = total.as_millis() as u64;

    let agent: Arc<dyn InferenceAgent> = match backend.adapter {
        AdapterKind::OpenaiCompat => Arc::new(OpenAICompatAgent::new(
            backend.id.clone(),
            backend.url.clone(),
            backend.model.clone(),
            backend.api_key.clone(),
            backend.max_tokens,
            timeout_ms,
            client,
        )),
        AdapterKind::GoogleGenai => Arc::new(GoogleGenAiAgent::new(
            backend.id.clone(),
            backend.url.clone(),
            backend.model.clone(),
            backend.api_key.clone(),
            backend.max_tokens,
            timeout_ms,
            client,
        )),
    };
    Ok(agent)
}

/// Build one agent per registered backend, keyed by backend id.
pub fn build_agents(
    registry: &Registry,
) -> Result<HashMap<String, Arc<dyn InferenceAgent>>, AgentError> {
    registry
        .backends()
        .map(|backend| Ok((backend.id.clone(), create_agent(backend)?)))
        .collect()
}
