//! OpenAI-compatible agent implementation.

use super::{AgentError, InferenceAgent};
use crate::api::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::config::AdapterKind;
use crate::logging::truncate_detail;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Upper bound on upstream error bodies carried in [`AgentError::Upstream`].
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 500;

/// Agent for any `/chat/completions` endpoint speaking the OpenAI schema.
///
/// Covers DeepSeek, OpenRouter, Ollama's `/v1` surface and similar. The base
/// URL already includes the version segment (e.g. `https://api.deepseek.com/v1`).
pub struct OpenAICompatAgent {
    id: String,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    /// Whole-request deadline in milliseconds, reported in timeout errors
    timeout_ms: u64,
    /// Shared HTTP client for connection pooling
    client: Arc<Client>,
}

impl OpenAICompatAgent {
    pub fn new(
        id: String,
        base_url: String,
        model: String,
        api_key: Option<String>,
        max_tokens: u32,
        timeout_ms: u64,
        client: Arc<Client>,
    ) -> Self {
        Self {
            id,
            base_url,
            model,
            api_key,
            max_tokens,
            timeout_ms,
            client,
        }
    }

    fn is_openrouter(&self) -> bool {
        self.base_url.contains("openrouter.ai")
    }

    /// Rewrite the caller's request for this backend.
    fn prepare(&self, mut request: ChatCompletionRequest) -> ChatCompletionRequest {
        request.model = self.model.clone();
        request.stream = false;
        if request.max_tokens.is_none() {
            request.max_tokens = Some(self.max_tokens);
        }
        request
    }
}

#[async_trait]
impl InferenceAgent for OpenAICompatAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::OpenaiCompat
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.prepare(request);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if self.is_openrouter() {
            builder = builder
                .header("HTTP-Referer", "https://clawgate.local")
                .header("X-Title", "ClawGate");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::from_reqwest(e, self.timeout_ms))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::from_reqwest(e, self.timeout_ms))?;

        if !status.is_success() {
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                message: truncate_detail(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse completion response: {}", e))
        })?;

        if completion.choices.is_empty() {
            return Err(AgentError::InvalidResponse(
                "Completion response has no choices".to_string(),
            ));
        }

        Ok(completion)
    }
}
