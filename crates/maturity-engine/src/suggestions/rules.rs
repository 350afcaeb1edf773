use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::Condition;
use crate::assessment::{QuestionId, SectionId};

/// Identifier wrapper for suggestion rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleScope {
    Question,
    Section,
    Assessment,
}

impl RuleScope {
    pub const ALL: [RuleScope; 3] = [RuleScope::Question, RuleScope::Section, RuleScope::Assessment];

    pub const fn label(self) -> &'static str {
        match self {
            RuleScope::Question => "QUESTION",
            RuleScope::Section => "SECTION",
            RuleScope::Assessment => "ASSESSMENT",
        }
    }
}

fn default_active() -> bool {
    true
}

/// Rule as stored by the administrative rule store; the condition is untyped JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub scope: RuleScope,
    #[serde(default)]
    pub scope_id: Option<String>,
    #[serde(default)]
    pub condition: Option<Value>,
    pub suggestion_text: String,
    pub priority: i32,
    pub weight: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Question(QuestionId),
    Section(SectionId),
    Assessment,
}

impl RuleTarget {
    pub fn scope(&self) -> RuleScope {
        match self {
            RuleTarget::Question(_) => RuleScope::Question,
            RuleTarget::Section(_) => RuleScope::Section,
            RuleTarget::Assessment => RuleScope::Assessment,
        }
    }

    pub fn scope_id(&self) -> Option<&str> {
        match self {
            RuleTarget::Question(id) => Some(&id.0),
            RuleTarget::Section(id) => Some(&id.0),
            RuleTarget::Assessment => None,
        }
    }
}

/// Validated rule ready for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRule {
    pub id: RuleId,
    pub target: RuleTarget,
    pub condition: Option<Condition>,
    pub suggestion_text: String,
    pub priority: i32,
    pub weight: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RuleValidationError {
    #[error("{0:?} rule requires a scope id")]
    MissingScopeId(RuleScope),
    #[error("condition must be an object naming one metric and one comparison")]
    ConditionShape,
    #[error("condition metric missing or empty")]
    MissingMetric,
    #[error("unsupported comparison operator '{0}'")]
    UnknownOperator(String),
    #[error("condition threshold missing")]
    MissingThreshold,
    #[error("condition threshold {0} is not a finite number")]
    InvalidThreshold(String),
    #[error("weight {0} is not a finite number")]
    InvalidWeight(f64),
    #[error("suggestion text is empty")]
    EmptyText,
}

impl TryFrom<RuleRecord> for SuggestionRule {
    type Error = RuleValidationError;

    fn try_from(record: RuleRecord) -> Result<Self, Self::Error> {
        let scope_id = record
            .scope_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let target = match (record.scope, scope_id) {
            (RuleScope::Question, Some(id)) => RuleTarget::Question(QuestionId(id)),
            (RuleScope::Section, Some(id)) => RuleTarget::Section(SectionId(id)),
            (RuleScope::Assessment, _) => RuleTarget::Assessment,
            (scope, None) => return Err(RuleValidationError::MissingScopeId(scope)),
        };

        let condition = match record.condition {
            None | Some(Value::Null) => None,
            Some(raw) => Some(Condition::from_json(&raw)?),
        };

        if !record.weight.is_finite() {
            return Err(RuleValidationError::InvalidWeight(record.weight));
        }
        if record.suggestion_text.trim().is_empty() {
            return Err(RuleValidationError::EmptyText);
        }

        Ok(Self {
            id: record.id,
            target,
            condition,
            suggestion_text: record.suggestion_text,
            priority: record.priority,
            weight: record.weight,
        })
    }
}
