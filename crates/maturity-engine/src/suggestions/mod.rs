//! Rule evaluation against computed scores and suggestion set materialization.

pub mod condition;
pub mod engine;
pub mod generated;
pub mod rules;

pub use condition::{matches, ComparisonOperator, Condition, ConditionMatch, MetricContext};
pub use engine::{metrics, AssessmentReport, SuggestionEngine, SuggestionEngineError};
pub use generated::GeneratedSuggestion;
pub use rules::{RuleId, RuleRecord, RuleScope, RuleTarget, RuleValidationError, SuggestionRule};
