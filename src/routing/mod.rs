//! Classifier pipeline selecting a backend for each request
//!
//! Three ordered layers: static rules, heuristic scoring and an optional
//! model-assisted classifier. The first layer that decides wins and the
//! result records which layer and rule made the call. Classification never
//! fails and never touches health or cost state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub mod model;
pub mod request;
pub mod rules;

pub use model::{AgentClassifier, TaskClassifier};
pub use request::{RequestView, ViewMessage};
pub use rules::HeuristicDecision;

use crate::config::{CategoryConfig, ClassifierConfig, RoutingConfig, RoutingRule, RuleTarget};
use crate::registry::Registry;

/// Built-in layer-1 rule: the requested model names a registered backend.
pub const EXPLICIT_BACKEND_RULE: &str = "explicit-backend";

/// Classification layer that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    Static,
    Heuristic,
    ModelAssisted,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Static => "static",
            Layer::Heuristic => "heuristic",
            Layer::ModelAssisted => "model-assisted",
        }
    }

    /// Position in the pipeline, 1 to 3.
    pub fn number(&self) -> u8 {
        match self {
            Layer::Static => 1,
            Layer::Heuristic => 2,
            Layer::ModelAssisted => 3,
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing decision for one request. Never mutated after classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub backend_id: String,
    pub layer: Layer,
    pub rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

struct ModelAssist {
    classifier: Arc<dyn TaskClassifier>,
    prompt: String,
    timeout: Duration,
    labels: BTreeMap<String, String>,
}

/// The classifier pipeline.
///
/// # Examples
///
/// ```
/// use clawgate::config::GatewayConfig;
/// use clawgate::registry::Registry;
/// use clawgate::routing::{Classifier, Layer, RequestView, ViewMessage};
/// use std::sync::Arc;
///
/// let config = GatewayConfig::default();
/// let registry = Arc::new(Registry::from_config(&config).unwrap());
/// let classifier = Classifier::new(registry, &config.routing, &config.classifier);
///
/// let view = RequestView {
///     model: "auto".to_string(),
///     messages: vec![ViewMessage::new("user", "hello")],
///     ..Default::default()
/// };
/// let decision = classifier.classify_heuristic(&view);
/// assert_eq!(decision.rule_name, "no-match");
/// ```
pub struct Classifier {
    registry: Arc<Registry>,
    categories: Vec<CategoryConfig>,
    static_rules: Vec<RoutingRule>,
    heuristic_rules: Vec<RoutingRule>,
    min_score: f64,
    min_margin: f64,
    classifier_config: ClassifierConfig,
    model_assist: Option<ModelAssist>,
}

impl Classifier {
    pub fn new(
        registry: Arc<Registry>,
        routing: &RoutingConfig,
        classifier: &ClassifierConfig,
    ) -> Self {
        let mut static_rules: Vec<RoutingRule> = routing
            .rules
            .iter()
            .filter(|r| r.layer() == Layer::Static)
            .cloned()
            .collect();
        let mut heuristic_rules: Vec<RoutingRule> = routing
            .rules
            .iter()
            .filter(|r| r.layer() == Layer::Heuristic)
            .cloned()
            .collect();
        // Stable: equal priorities keep declaration order
        static_rules.sort_by_key(|r| r.priority);
        heuristic_rules.sort_by_key(|r| r.priority);

        Self {
            registry,
            categories: routing.categories.clone(),
            static_rules,
            heuristic_rules,
            min_score: routing.min_score,
            min_margin: classifier.min_margin,
            classifier_config: classifier.clone(),
            model_assist: None,
        }
    }

    /// Attach the layer-3 collaborator. Ignored unless the classifier is enabled.
    pub fn with_task_classifier(mut self, classifier: Arc<dyn TaskClassifier>) -> Self {
        if self.classifier_config.enabled {
            self.model_assist = Some(ModelAssist {
                classifier,
                prompt: self.classifier_config.prompt.clone(),
                timeout: Duration::from_millis(self.classifier_config.timeout_ms),
                labels: self.classifier_config.labels.clone(),
            });
        }
        self
    }

    pub fn model_assist_enabled(&self) -> bool {
        self.model_assist.is_some()
    }

    /// Run the pipeline.
    pub async fn classify(&self, view: &RequestView) -> ClassificationResult {
        if let Some(result) = self.classify_static(view) {
            tracing::debug!(
                backend_id = %result.backend_id,
                layer = %result.layer,
                rule = %result.rule_name,
                "Static rule matched"
            );
            return result;
        }

        let decision = self.classify_heuristic(view);
        let low_confidence = decision
            .margin
            .is_some_and(|margin| margin < self.min_margin);

        if let Some(assist) = &self.model_assist {
            if decision.is_fallthrough() || low_confidence {
                if let Some(result) = self.classify_with_model(assist, view).await {
                    tracing::debug!(
                        backend_id = %result.backend_id,
                        layer = %result.layer,
                        rule = %result.rule_name,
                        "Model-assisted classification"
                    );
                    return result;
                }
            }
        }

        let result = self.heuristic_result(decision);
        tracing::debug!(
            backend_id = %result.backend_id,
            layer = %result.layer,
            rule = %result.rule_name,
            category = ?result.category,
            "Heuristic classification"
        );
        result
    }

    /// Layer 1: explicit backend id, then static rules by ascending priority.
    pub fn classify_static(&self, view: &RequestView) -> Option<ClassificationResult> {
        let model = view.model.trim();
        if let Some(id) = self.registry.ids().find(|id| id.eq_ignore_ascii_case(model)) {
            return Some(ClassificationResult {
                backend_id: id.to_string(),
                layer: Layer::Static,
                rule_name: EXPLICIT_BACKEND_RULE.to_string(),
                category: None,
            });
        }

        self.static_rules
            .iter()
            .find(|rule| rules::matches_static(&rule.matcher, view))
            .map(|rule| {
                let (backend_id, category) = self.resolve_target(&rule.target);
                ClassificationResult {
                    backend_id,
                    layer: Layer::Static,
                    rule_name: rule.name.clone(),
                    category,
                }
            })
    }

    /// Layer 2 scoring over user turns, tools and token estimate.
    pub fn classify_heuristic(&self, view: &RequestView) -> HeuristicDecision {
        rules::score(
            &self.heuristic_rules,
            &self.categories,
            self.min_score,
            view,
        )
    }

    fn heuristic_result(&self, decision: HeuristicDecision) -> ClassificationResult {
        let backend_id = match &decision.category {
            Some(category) => self.resolve_category(category),
            None => self.default_backend().unwrap_or_default(),
        };
        ClassificationResult {
            backend_id,
            layer: Layer::Heuristic,
            rule_name: decision.rule_name,
            category: decision.category,
        }
    }

    async fn classify_with_model(
        &self,
        assist: &ModelAssist,
        view: &RequestView,
    ) -> Option<ClassificationResult> {
        let prompt = model::build_prompt(&assist.prompt, view.last_user_text());
        let raw = match tokio::time::timeout(assist.timeout, assist.classifier.classify(&prompt))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Classifier call failed, keeping heuristic result");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = assist.timeout.as_millis() as u64,
                    "Classifier timed out, keeping heuristic result"
                );
                return None;
            }
        };

        let label = model::normalize_label(&raw);
        let Some(category) = assist.labels.get(&label) else {
            tracing::warn!(label = %label, "Classifier returned unknown label");
            return None;
        };

        Some(ClassificationResult {
            backend_id: self.resolve_category(category),
            layer: Layer::ModelAssisted,
            rule_name: format!("classified-as-{}", label),
            category: Some(category.clone()),
        })
    }

    fn resolve_target(&self, target: &RuleTarget) -> (String, Option<String>) {
        match target {
            RuleTarget::Backend(id) => (self.resolve_backend(id), None),
            RuleTarget::Category(name) => (self.resolve_category(name), Some(name.clone())),
        }
    }

    /// Backend serving `category`, falling back when it is not registered.
    pub fn resolve_category(&self, category: &str) -> String {
        match self.categories.iter().find(|c| c.name == category) {
            Some(c) => self.resolve_backend(&c.backend),
            None => self
                .default_backend()
                .unwrap_or_else(|| category.to_string()),
        }
    }

    fn resolve_backend(&self, id: &str) -> String {
        if self.registry.contains(id) {
            return id.to_string();
        }
        let fallback = self.default_backend();
        if let Some(replacement) = &fallback {
            tracing::debug!(
                configured = %id,
                backend_id = %replacement,
                "Configured backend not registered, using default"
            );
        }
        fallback.unwrap_or_else(|| id.to_string())
    }

    /// First registered member of the `default` chain, else the first registered backend.
    fn default_backend(&self) -> Option<String> {
        self.registry
            .chain(crate::registry::DEFAULT_CHAIN)
            .and_then(|chain| chain.members.first().cloned())
            .or_else(|| self.registry.ids().next().map(str::to_string))
    }
}
