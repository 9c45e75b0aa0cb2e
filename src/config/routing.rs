//! Routing rule configuration
//!
//! Rules are tagged variants over their match kind so the classifier can
//! match them exhaustively. Evaluation order inside a layer is the explicit
//! `priority` field (ascending), never declaration order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::error::ConfigError;
use crate::routing::Layer;

/// Where a matching rule sends the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    /// A concrete backend id
    Backend(String),
    /// A category, resolved through `[[routing.categories]]`
    Category(String),
}

/// Match kinds understood by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleMatch {
    /// Requested model equals one of the short aliases (e.g. `r1`, `flash`).
    ModelAlias { aliases: Vec<String> },
    /// Liveness probes: empty user turn, an exact probe phrase, or a short
    /// turn under a system prompt carrying a heartbeat marker.
    Heartbeat {
        #[serde(default)]
        patterns: Vec<String>,
        #[serde(default)]
        system_markers: Vec<String>,
        #[serde(default = "default_heartbeat_chars")]
        max_chars: usize,
    },
    /// A transport marker (e.g. `x-openclaw-source: subagent-42`) contains one of `markers`.
    SubagentMarker { markers: Vec<String> },
    /// Distinct keywords found in the latest user turn, `weight` per hit.
    Keywords {
        keywords: Vec<String>,
        #[serde(default = "default_weight")]
        weight: f64,
        #[serde(default = "default_min_matches")]
        min_matches: usize,
    },
    /// Request carries tool definitions.
    ToolPresence {
        #[serde(default = "default_weight")]
        weight: f64,
    },
    /// Estimated user tokens below and/or above a bound.
    TokenThreshold {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        below: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        above: Option<u32>,
        #[serde(default = "default_weight")]
        weight: f64,
    },
    /// Default category when nothing clears the score threshold.
    Fallthrough,
}

fn default_heartbeat_chars() -> usize {
    16
}

fn default_weight() -> f64 {
    1.0
}

fn default_min_matches() -> usize {
    1
}

impl RuleMatch {
    /// Layer a rule belongs to, derived from its match kind.
    pub fn layer(&self) -> Layer {
        match self {
            RuleMatch::ModelAlias { .. }
            | RuleMatch::Heartbeat { .. }
            | RuleMatch::SubagentMarker { .. } => Layer::Static,
            RuleMatch::Keywords { .. }
            | RuleMatch::ToolPresence { .. }
            | RuleMatch::TokenThreshold { .. }
            | RuleMatch::Fallthrough => Layer::Heuristic,
        }
    }

    /// The `kind` tag as written in configuration.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RuleMatch::ModelAlias { .. } => "model_alias",
            RuleMatch::Heartbeat { .. } => "heartbeat",
            RuleMatch::SubagentMarker { .. } => "subagent_marker",
            RuleMatch::Keywords { .. } => "keywords",
            RuleMatch::ToolPresence { .. } => "tool_presence",
            RuleMatch::TokenThreshold { .. } => "token_threshold",
            RuleMatch::Fallthrough => "fallthrough",
        }
    }
}

/// A single routing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub name: String,
    #[serde(default)]
    pub priority: u32,
    pub target: RuleTarget,
    #[serde(flatten)]
    pub matcher: RuleMatch,
}

impl RoutingRule {
    pub fn layer(&self) -> Layer {
        self.matcher.layer()
    }
}

/// A named task category and the backend serving it.
///
/// Declaration order is the last tie-break of heuristic scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub backend: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum accumulated score a category needs to win layer 2.
    pub min_score: f64,
    pub categories: Vec<CategoryConfig>,
    pub rules: Vec<RoutingRule>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_score: 1.0,
            categories: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl RoutingConfig {
    pub fn category(&self, name: &str) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.name == name)
    }
}

/// Check categories and rules for internal consistency.
pub fn validate_rules(routing: &RoutingConfig) -> Result<(), ConfigError> {
    if !(routing.min_score.is_finite() && routing.min_score >= 0.0) {
        return Err(ConfigError::Validation {
            field: "routing.min_score".to_string(),
            message: "must be a non-negative number".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (i, category) in routing.categories.iter().enumerate() {
        if category.name.is_empty() || category.backend.is_empty() {
            return Err(ConfigError::Validation {
                field: format!("routing.categories[{}]", i),
                message: "name and backend must be set".to_string(),
            });
        }
        if !seen.insert(category.name.as_str()) {
            return Err(ConfigError::Validation {
                field: format!("routing.categories[{}].name", i),
                message: format!("duplicate category '{}'", category.name),
            });
        }
    }

    for (i, rule) in routing.rules.iter().enumerate() {
        let field = format!("routing.rules[{}]", i);
        if rule.name.is_empty() {
            return Err(ConfigError::Validation {
                field: format!("{}.name", field),
                message: "name cannot be empty".to_string(),
            });
        }

        match &rule.target {
            RuleTarget::Category(name) if routing.category(name).is_none() => {
                return Err(ConfigError::UnknownReference {
                    field,
                    name: name.clone(),
                });
            }
            RuleTarget::Backend(_) if rule.layer() == Layer::Heuristic => {
                return Err(ConfigError::Validation {
                    field: format!("{}.target", field),
                    message: format!(
                        "{} is a heuristic rule and must target a category",
                        rule.matcher.kind_name()
                    ),
                });
            }
            _ => {}
        }

        match &rule.matcher {
            RuleMatch::ModelAlias { aliases } if aliases.is_empty() => {
                return Err(empty_list(&field, &rule.matcher, "aliases"));
            }
            RuleMatch::SubagentMarker { markers } if markers.is_empty() => {
                return Err(empty_list(&field, &rule.matcher, "markers"));
            }
            RuleMatch::Keywords {
                keywords, weight, ..
            } => {
                if keywords.is_empty() {
                    return Err(empty_list(&field, &rule.matcher, "keywords"));
                }
                check_weight(&field, *weight)?;
            }
            RuleMatch::ToolPresence { weight } => check_weight(&field, *weight)?,
            RuleMatch::TokenThreshold {
                below,
                above,
                weight,
            } => {
                if below.is_none() && above.is_none() {
                    return Err(ConfigError::Validation {
                        field,
                        message: "token_threshold needs 'below' or 'above'".to_string(),
                    });
                }
                check_weight(&field, *weight)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn empty_list(field: &str, matcher: &RuleMatch, list: &str) -> ConfigError {
    ConfigError::Validation {
        field: format!("{}.{}", field, list),
        message: format!("{} rules need at least one entry", matcher.kind_name()),
    }
}

fn check_weight(field: &str, weight: f64) -> Result<(), ConfigError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: format!("{}.weight", field),
            message: "weight must be a non-negative number".to_string(),
        })
    }
}
