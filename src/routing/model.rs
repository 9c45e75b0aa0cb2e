//! Model-assisted classification (layer 3)

use crate::agent::{AgentError, InferenceAgent};
use crate::api::types::{ChatCompletionRequest, ChatMessage};
use async_trait::async_trait;
use std::sync::Arc;

/// Placeholder in the prompt template replaced by the latest user turn.
pub const PROMPT_PLACEHOLDER: &str = "{last_user_message}";

/// Characters of the user turn forwarded to the classifier model.
pub const MAX_PROMPT_EXCERPT_CHARS: usize = 500;

/// A cheap model that labels a task.
#[async_trait]
pub trait TaskClassifier: Send + Sync + 'static {
    /// Return the raw label text produced for `prompt`.
    async fn classify(&self, prompt: &str) -> Result<String, AgentError>;
}

/// [`TaskClassifier`] backed by a regular backend agent.
pub struct AgentClassifier {
    agent: Arc<dyn InferenceAgent>,
    max_tokens: u32,
}

impl AgentClassifier {
    pub fn new(agent: Arc<dyn InferenceAgent>, max_tokens: u32) -> Self {
        Self { agent, max_tokens }
    }
}

#[async_trait]
impl TaskClassifier for AgentClassifier {
    async fn classify(&self, prompt: &str) -> Result<String, AgentError> {
        let mut request = ChatCompletionRequest::new(
            crate::api::types::AUTO_MODEL,
            vec![ChatMessage::user(prompt)],
        );
        request.max_tokens = Some(self.max_tokens);
        request.temperature = Some(0.0);

        let response = self.agent.chat_completion(request).await?;
        response
            .choices
            .first()
            .map(|c| c.message.text())
            .ok_or_else(|| AgentError::InvalidResponse("classifier returned no choices".into()))
    }
}

/// Fill the template with the first 500 characters of the user turn.
pub fn build_prompt(template: &str, last_user_message: &str) -> String {
    let excerpt: String = last_user_message
        .chars()
        .take(MAX_PROMPT_EXCERPT_CHARS)
        .collect();
    template.replace(PROMPT_PLACEHOLDER, &excerpt)
}

/// Normalize a raw model answer to a label key.
pub fn normalize_label(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_uppercase()
}
