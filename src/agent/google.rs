//! Google Generative AI agent implementation.

use super::openai::MAX_ERROR_BODY_CHARS;
use super::{AgentError, InferenceAgent};
use crate::api::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Choice, Usage,
};
use crate::config::AdapterKind;
use crate::logging::truncate_detail;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Credential header; keeps the key out of URLs and therefore out of error text.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Generative AI agent.
///
/// Translates to and from the OpenAI schema:
/// - Chat completion via POST `{url}/models/{model}:generateContent`, key in `x-goog-api-key`
/// - System messages to the `systemInstruction` field
/// - Role mapping: assistant <-> model
/// - `cachedContentTokenCount` reported as prompt cache hits
pub struct GoogleGenAiAgent {
    id: String,
    /// Base URL including the version segment (e.g. ".../v1beta")
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout_ms: u64,
    client: Arc<Client>,
}

impl GoogleGenAiAgent {
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

    /// Translate OpenAI request to Google format.
    fn translate_request(&self, request: &ChatCompletionRequest) -> GoogleRequest {
        let system_messages: Vec<String> = request
            .messages
            .iter()
            .filter(|msg| msg.role == "system")
            .map(ChatMessage::text)
            .filter(|text| !text.is_empty())
            .collect();

        let system_instruction = if system_messages.is_empty() {
            None
        } else {
            Some(GoogleSystemInstruction {
                parts: vec![GooglePart {
                    text: system_messages.join("\n"),
                }],
            })
        };

        let contents = request
            .messages
            .iter()
            .filter(|msg| msg.role != "system")
            .map(|msg| GoogleContent {
                role: if msg.role == "assistant" {
                    "model".to_string()
                } else {
                    "user".to_string()
                },
                parts: vec![GooglePart { text: msg.text() }],
            })
            .collect();

        GoogleRequest {
            contents,
            system_instruction,
            generation_config: Some(GoogleGenerationConfig {
                temperature: request.temperature,
                top_p: request.top_p,
                max_output_tokens: Some(request.max_tokens.unwrap_or(self.max_tokens)),
            }),
        }
    }

    /// Translate Google response to OpenAI format.
    fn translate_response(&self, response: GoogleResponse) -> Result<ChatCompletionResponse, AgentError> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            AgentError::InvalidResponse("Google response has no candidates".to_string())
        })?;

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("MAX_TOKENS") => "length",
            Some("SAFETY") | Some("RECITATION") => "content_filter",
            _ => "stop",
        };

        let usage = response.usage_metadata.map(|u| {
            let cached = u.cached_content_token_count.unwrap_or(0);
            Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
                prompt_cache_hit_tokens: Some(cached),
                prompt_cache_miss_tokens: Some(
                    u.prompt_token_count.unwrap_or(0).saturating_sub(cached),
                ),
                prompt_tokens_details: None,
            }
        });

        Ok(ChatCompletionResponse {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
            object: "chat.completion".to_string(),
            created: chrono::Utc::now().timestamp(),
            model: self.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new("assistant", text),
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage,
            extra: std::collections::HashMap::new(),
        })
    }
}

/// Google Generative AI request format
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleRequest {
    contents: Vec<GoogleContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GoogleSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GoogleGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GooglePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GoogleSystemInstruction {
    parts: Vec<GooglePart>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GoogleGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Google Generative AI response format
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
    usage_metadata: Option<GoogleUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleCandidate {
    content: Option<GoogleContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
    cached_content_token_count: Option<u64>,
}

#[async_trait]
impl InferenceAgent for GoogleGenAiAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter(&self) -> AdapterKind {
        AdapterKind::GoogleGenai
    }

    async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, AgentError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let google_request = self.translate_request(&request);

        let mut builder = self.client.post(&url).json(&google_request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key.as_str());
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

        let google_response: GoogleResponse = serde_json::from_str(&text).map_err(|e| {
            AgentError::InvalidResponse(format!("Failed to parse Google response: {}", e))
        })?;

        self.translate_response(google_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn test_agent(base_url: String) -> GoogleGenAiAgent {
        GoogleGenAiAgent::new(
            "gemini-flash".to_string(),
            base_url,
            "gemini-2.0-flash".to_string(),
            Some("gk-test".to_string()),
            8000,
            130_000,
            Arc::new(Client::new()),
        )
    }

    fn request(messages: Vec<ChatMessage>) -> ChatCompletionRequest {
        let mut req = ChatCompletionRequest::new("auto", messages);
        req.temperature = Some(0.5);
        req.max_tokens = Some(200);
        req
    }

    #[tokio::test]
    async fn test_chat_completion_with_system_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(r"^/models/gemini-2\.0-flash:generateContent".to_string()),
            )
            .match_header("x-goog-api-key", "gk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "systemInstruction": {"parts": [{"text": "You are helpful"}]},
                "contents": [{"role": "user", "parts": [{"text": "Hi"}]}]
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"there!"}],"role":"model"},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":15,"candidatesTokenCount":8,"totalTokenCount":23,"cachedContentTokenCount":10}}"#)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let response = agent
            .chat_completion(request(vec![
                ChatMessage::system("You are helpful"),
                ChatMessage::user("Hi"),
            ]))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.choices[0].message.text(), "Hello there!");
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.model, "gemini-2.0-flash");
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 15);
        assert_eq!(usage.completion_tokens, 8);
        assert_eq!(usage.cache_hit_tokens(), 10);
        assert_eq!(usage.prompt_cache_miss_tokens, Some(5));
    }

    #[tokio::test]
    async fn test_upstream_error_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(r"generateContent".to_string()))
            .with_status(429)
            .with_body(r#"{"error":{"message":"quota"}}"#)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let err = agent
            .chat_completion(request(vec![ChatMessage::user("Hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Upstream { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_error_hides_key() {
        let agent = GoogleGenAiAgent::new(
            "gemini-flash".to_string(),
            "http://127.0.0.1:1/v1beta".to_string(),
            "gemini-2.5-flash".to_string(),
            Some("SECRET-KEY-123".to_string()),
            8000,
            5_000,
            Arc::new(Client::new()),
        );
        let err = agent
            .chat_completion(request(vec![ChatMessage::user("Hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::agent::FailureKind::Connection);
        assert!(!err.to_string().contains("SECRET-KEY-123"));
    }

    #[tokio::test]
    async fn test_no_candidates_is_malformed() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", Matcher::Regex(r"generateContent".to_string()))
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async()
            .await;

        let agent = test_agent(server.url());
        let err = agent
            .chat_completion(request(vec![ChatMessage::user("Hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidResponse(_)));
    }

    #[test]
    fn test_translate_request_role_mapping_assistant_to_model() {
        let agent = test_agent("http://localhost".to_string());
        let translated = agent.translate_request(&request(vec![
            ChatMessage::user("Hello"),
            ChatMessage::new("assistant", "Hi there"),
        ]));

        assert_eq!(translated.contents.len(), 2);
        assert_eq!(translated.contents[0].role, "user");
        assert_eq!(translated.contents[1].role, "model");
        assert!(translated.system_instruction.is_none());
    }

    #[test]
    fn test_translate_request_joins_system_messages() {
        let agent = test_agent("http://localhost".to_string());
        let translated = agent.translate_request(&request(vec![
            ChatMessage::system("Be helpful"),
            ChatMessage::system("Be brief"),
            ChatMessage::user("Hello"),
        ]));

        let si = translated.system_instruction.unwrap();
        assert_eq!(si.parts[0].text, "Be helpful\nBe brief");
        assert_eq!(translated.contents.len(), 1);
    }

    #[test]
    fn test_translate_request_generation_config() {
        let agent = test_agent("http://localhost".to_string());
        let translated = agent.translate_request(&request(vec![ChatMessage::user("Hello")]));
        let config = translated.generation_config.unwrap();
        assert_eq!(config.temperature, Some(0.5));
        assert_eq!(config.max_output_tokens, Some(200));

        let default_max = agent.translate_request(&ChatCompletionRequest::new(
            "auto",
            vec![ChatMessage::user("Hello")],
        ));
        assert_eq!(
            default_max.generation_config.unwrap().max_output_tokens,
            Some(8000)
        );
    }

    #[test]
    fn test_translate_response_finish_reasons() {
        let agent = test_agent("http://localhost".to_string());
        for (google, openai) in [
            ("MAX_TOKENS", "length"),
            ("SAFETY", "content_filter"),
            ("RECITATION", "content_filter"),
            ("STOP", "stop"),
        ] {
            let body = format!(
                r#"{{"candidates":[{{"content":{{"parts":[{{"text":"x"}}]}},"finishReason":"{google}"}}]}}"#
            );
            let parsed: GoogleResponse = serde_json::from_str(&body).unwrap();
            let translated = agent.translate_response(parsed).unwrap();
            assert_eq!(translated.choices[0].finish_reason.as_deref(), Some(openai));
            assert!(translated.usage.is_none());
        }
    }

    #[test]
    fn test_translate_response_candidate_without_content() {
        let agent = test_agent("http://localhost".to_string());
        let parsed: GoogleResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        let translated = agent.translate_response(parsed).unwrap();
        assert_eq!(translated.choices[0].message.text(), "");
    }
}
