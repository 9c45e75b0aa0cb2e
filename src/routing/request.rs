//! Routing view of an incoming request

use crate::api::types::ChatCompletionRequest;

/// One message reduced to what the classifier reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewMessage {
    pub role: String,
    pub text: String,
}

impl ViewMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            text: text.into(),
        }
    }
}

/// Features extracted from a chat request for classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestView {
    /// Requested model name as sent by the client
    pub model: String,
    pub messages: Vec<ViewMessage>,
    pub tools_present: bool,
    /// Values of the configured marker headers
    pub transport_markers: Vec<String>,
}

impl RequestView {
    /// Extract a view from a parsed request and the values of its marker headers.
    pub fn from_request(request: &ChatCompletionRequest, transport_markers: Vec<String>) -> Self {
        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| ViewMessage::new(m.role.clone(), m.text()))
                .collect(),
            tools_present: request.has_tools(),
            transport_markers,
        }
    }

    /// Requested model, trimmed and lowercased.
    pub fn normalized_model(&self) -> String {
        self.model.trim().to_lowercase()
    }

    fn user_turns(&self) -> impl Iterator<Item = &ViewMessage> {
        self.messages.iter().filter(|m| m.role == "user")
    }

    pub fn has_user_turn(&self) -> bool {
        self.user_turns().next().is_some()
    }

    /// Text of the most recent user turn, empty when there is none.
    pub fn last_user_text(&self) -> &str {
        self.user_turns()
            .last()
            .map(|m| m.text.as_str())
            .unwrap_or("")
    }

    /// All system messages joined with newlines.
    pub fn system_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rough token estimate over user turns: four characters per token.
    ///
    /// Zero when no user text exists, otherwise at least one.
    pub fn estimated_user_tokens(&self) -> u32 {
        let chars: usize = self.user_turns().map(|m| m.text.chars().count()).sum();
        if chars == 0 {
            0
        } else {
            (chars / 4).max(1) as u32
        }
    }
}
