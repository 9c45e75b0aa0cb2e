//! Model-assisted classification (layer 3) configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CLASSIFIER_PROMPT: &str = "Classify the following task into exactly one \
category: REASONING (math, proofs, complex logic), CODE (programming, debugging, tool use), \
SIMPLE (greetings, short facts, translations), CHAT (everything else). \
Answer with the category name only.\n\nTask: {last_user_message}";

/// Configuration for the optional cheap-model classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub enabled: bool,
    /// Backend id that answers classification prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    /// Template; `{last_user_message}` is replaced by the latest user turn.
    pub prompt: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    /// Layer-2 wins by less than this margin count as low confidence.
    pub min_margin: f64,
    /// Uppercase label returned by the model → category name.
    pub labels: BTreeMap<String, String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: None,
            prompt: DEFAULT_CLASSIFIER_PROMPT.to_string(),
            timeout_ms: 3000,
            max_tokens: 10,
            min_margin: 0.5,
            labels: BTreeMap::new(),
        }
    }
}
