//! Backend and fallback-chain configuration

use serde::{Deserialize, Serialize};

/// Wire protocol spoken by an upstream backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterKind {
    /// Any OpenAI-compatible `/chat/completions` endpoint (DeepSeek, OpenRouter, Groq, Ollama...)
    #[default]
    #[serde(alias = "openai")]
    OpenaiCompat,
    /// Google Gemini `generateContent` API
    #[serde(alias = "google")]
    GoogleGenai,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::OpenaiCompat => "openai-compat",
            AdapterKind::GoogleGenai => "google-genai",
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prices in USD per million tokens.
///
/// `cache_hit` is the discounted input price for prompt tokens served from a
/// cached prefix. When omitted it falls back to `input`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PricingConfig {
    pub input: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<f64>,
    pub output: f64,
}

/// Per-backend request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_seconds: u64,
    pub read_seconds: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: 10,
            read_seconds: 120,
        }
    }
}

/// One configured upstream backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    #[serde(default)]
    pub adapter: AdapterKind,
    pub url: String,
    /// Upstream model name; defaults to `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Literal key, usually written as `${SOME_ENV_VAR}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Keep the backend even without a key (local runtimes).
    #[serde(default)]
    pub auth_optional: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_max_tokens() -> u32 {
    8000
}

impl BackendConfig {
    /// Minimal OpenAI-compatible backend, mostly useful in tests.
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            adapter: AdapterKind::OpenaiCompat,
            url: url.into(),
            model: None,
            api_key: None,
            api_key_env: None,
            auth_optional: false,
            max_tokens: default_max_tokens(),
            pricing: PricingConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }

    /// Resolve the credential for this backend.
    ///
    /// A literal `api_key` wins when it is non-empty and fully expanded; a
    /// value still containing `${` means the referenced variable was unset.
    pub fn resolve_api_key(&self) -> Option<String> {
        let literal = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains("${"));
        if let Some(key) = literal {
            return Some(key.to_string());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn upstream_model(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.id)
    }
}

/// Ordered list of backend ids tried in sequence for one routing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackChainConfig {
    pub name: String,
    pub members: Vec<String>,
}
