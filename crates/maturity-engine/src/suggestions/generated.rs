use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::{RuleId, RuleScope};
use crate::assessment::AssessmentId;

/// A rule matched against one assessment, as persisted for report rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSuggestion {
    pub assessment_id: AssessmentId,
    pub source_rule_id: RuleId,
    pub scope: RuleScope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed: Option<f64>,
    pub suggestion_text: String,
    pub priority: i32,
    pub weight: f64,
    /// Position in evaluation order; the final tie-breaker when ranking.
    pub sequence: u32,
    pub generated_at: DateTime<Utc>,
}

/// Priority descending, then weight descending, then creation order.
pub fn compare(left: &GeneratedSuggestion, right: &GeneratedSuggestion) -> Ordering {
    right
        .priority
        .cmp(&left.priority)
        .then_with(|| right.weight.total_cmp(&left.weight))
        .then_with(|| left.sequence.cmp(&right.sequence))
}

pub fn sort(suggestions: &mut [GeneratedSuggestion]) {
    suggestions.sort_by(compare);
}

/// Ranks matches and drops duplicates: one suggestion per rule, and a repeated
/// text only keeps its highest-ranked occurrence.
pub(crate) fn rank(matches: Vec<GeneratedSuggestion>) -> Vec<GeneratedSuggestion> {
    let mut seen_rules = HashSet::new();
    let mut ranked: Vec<GeneratedSuggestion> = matches
        .into_iter()
        .filter(|suggestion| seen_rules.insert(suggestion.source_rule_id.clone()))
        .collect();
    sort(&mut ranked);

    let mut seen_texts = HashSet::new();
    ranked.retain(|suggestion| seen_texts.insert(text_key(&suggestion.suggestion_text)));
    ranked
}

fn text_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
