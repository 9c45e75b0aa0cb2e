//! Rule evaluation for the static and heuristic layers

use super::RequestView;
use crate::config::{CategoryConfig, RoutingRule, RuleMatch, RuleTarget};

/// Evaluate a layer-1 matcher. Heuristic kinds never match here.
pub fn matches_static(matcher: &RuleMatch, view: &RequestView) -> bool {
    match matcher {
        RuleMatch::ModelAlias { aliases } => {
            let model = view.normalized_model();
            model != crate::api::types::AUTO_MODEL
                && aliases.iter().any(|a| a.trim().to_lowercase() == model)
        }
        RuleMatch::Heartbeat {
            patterns,
            system_markers,
            max_chars,
        } => is_heartbeat(view, patterns, system_markers, *max_chars),
        RuleMatch::SubagentMarker { markers } => view.transport_markers.iter().any(|value| {
            let value = value.to_lowercase();
            markers.iter().any(|m| value.contains(&m.to_lowercase()))
        }),
        _ => false,
    }
}

fn strip_probe_punctuation(text: &str) -> String {
    text.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase()
}

fn is_heartbeat(
    view: &RequestView,
    patterns: &[String],
    system_markers: &[String],
    max_chars: usize,
) -> bool {
    // A request without any user turn is not a probe
    if !view.has_user_turn() {
        return false;
    }
    let user = view.last_user_text().trim();
    if user.is_empty() {
        return true;
    }

    let probe = strip_probe_punctuation(user);
    if patterns.iter().any(|p| strip_probe_punctuation(p) == probe) {
        return true;
    }

    if user.chars().count() <= max_chars && !system_markers.is_empty() {
        let system = view.system_text().to_lowercase();
        return system_markers
            .iter()
            .any(|m| system.contains(&m.to_lowercase()));
    }
    false
}

/// Score contribution of a heuristic matcher, `None` when it does not match.
///
/// Reads only user turns, tool presence and the user token estimate.
pub fn contribution(matcher: &RuleMatch, view: &RequestView) -> Option<f64> {
    match matcher {
        RuleMatch::Keywords {
            keywords,
            weight,
            min_matches,
        } => {
            let hits = keyword_hits(keywords, view.last_user_text());
            (hits > 0 && hits >= *min_matches).then(|| weight * hits as f64)
        }
        RuleMatch::ToolPresence { weight } => view.tools_present.then_some(*weight),
        RuleMatch::TokenThreshold {
            below,
            above,
            weight,
        } => {
            let tokens = view.estimated_user_tokens();
            let under = below.is_some_and(|b| tokens < b);
            let over = above.is_some_and(|a| tokens > a);
            (under || over).then_some(*weight)
        }
        _ => None,
    }
}

/// Number of distinct keywords contained in `text`, case-insensitive.
pub fn keyword_hits(keywords: &[String], text: &str) -> usize {
    let haystack = text.to_lowercase();
    let mut seen: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() || seen.contains(&needle) {
            continue;
        }
        if haystack.contains(&needle) {
            seen.push(needle);
        }
    }
    seen.len()
}

/// Accumulated score of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: String,
    pub score: f64,
    /// Priority of the highest-priority contributing rule
    pub best_priority: u32,
    /// Name of that rule
    pub best_rule: String,
}

/// Outcome of heuristic scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicDecision {
    /// Winning category; `None` only when no categories are configured
    pub category: Option<String>,
    pub rule_name: String,
    pub score: f64,
    /// Lead over the runner-up, `None` when the fallthrough supplied the category
    pub margin: Option<f64>,
}

impl HeuristicDecision {
    pub fn is_fallthrough(&self) -> bool {
        self.margin.is_none()
    }
}

/// Rule name reported when neither a score nor a fallthrough rule decides.
pub const NO_MATCH_RULE: &str = "no-match";

/// Score categories with the heuristic rules.
///
/// `rules` must be sorted by ascending priority. Ties on score go to the
/// category whose best contributing rule has the lower priority, then to
/// the category declared first.
pub fn score(
    rules: &[RoutingRule],
    categories: &[CategoryConfig],
    min_score: f64,
    view: &RequestView,
) -> HeuristicDecision {
    let mut scores: Vec<CategoryScore> = Vec::new();

    for rule in rules {
        let RuleTarget::Category(category) = &rule.target else {
            continue;
        };
        let Some(points) = contribution(&rule.matcher, view) else {
            continue;
        };
        match scores.iter_mut().find(|s| &s.category == category) {
            Some(entry) => entry.score += points,
            None => scores.push(CategoryScore {
                category: category.clone(),
                score: points,
                best_priority: rule.priority,
                best_rule: rule.name.clone(),
            }),
        }
    }

    let declared = |name: &str| {
        categories
            .iter()
            .position(|c| c.name == name)
            .unwrap_or(usize::MAX)
    };
    scores.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.best_priority.cmp(&b.best_priority))
            .then(declared(&a.category).cmp(&declared(&b.category)))
    });

    if let Some(winner) = scores.first().filter(|w| w.score >= min_score) {
        let runner_up = scores.get(1).map(|s| s.score).unwrap_or(0.0);
        return HeuristicDecision {
            category: Some(winner.category.clone()),
            rule_name: winner.best_rule.clone(),
            score: winner.score,
            margin: Some(winner.score - runner_up),
        };
    }

    let fallthrough = rules
        .iter()
        .find(|r| matches!(r.matcher, RuleMatch::Fallthrough))
        .and_then(|r| match &r.target {
            RuleTarget::Category(c) => Some((c.clone(), r.name.clone())),
            RuleTarget::Backend(_) => None,
        });

    let (category, rule_name) = match fallthrough {
        Some((category, name)) => (Some(category), name),
        None => (
            categories.first().map(|c| c.name.clone()),
            NO_MATCH_RULE.to_string(),
        ),
    };

    HeuristicDecision {
        category,
        rule_name,
        score: 0.0,
        margin: None,
    }
}
