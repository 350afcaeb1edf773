use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::assessment::{
    AnswerValue, Assessment, AssessmentId, OrganizationId, Question, QuestionId, QuestionType,
    ResponseRecord, SectionId,
};
use crate::repository::{
    AssessmentRepository, InMemoryAssessmentStore, InMemoryRuleStore, InMemorySuggestionStore,
    RepositoryError, SuggestionRepository,
};
use crate::scoring::{
    DimensionConfig, ScoreCalculator, ScoringConfig, ScoringDimension, TierThresholds,
};
use crate::service::AssessmentService;
use crate::suggestions::{GeneratedSuggestion, RuleId, RuleRecord, RuleScope, SuggestionEngine};

pub(super) const GOVERNANCE: &str = "governance-section";
pub(super) const FINANCIAL: &str = "financial-section";
pub(super) const PROGRAMME: &str = "programme-section";
pub(super) const HUMAN_RESOURCES: &str = "human-resources-section";

pub(super) fn assessment_id() -> AssessmentId {
    AssessmentId("assessment-001".to_string())
}

pub(super) fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn question(
    id: &str,
    section: &str,
    question_type: QuestionType,
    mandatory: bool,
) -> Question {
    Question {
        id: QuestionId(id.to_string()),
        section_id: SectionId(section.to_string()),
        text: format!("Question {id}"),
        question_type,
        options: Vec::new(),
        mandatory,
        order: 1,
        is_hidden: false,
    }
}

pub(super) fn response(
    question: &str,
    section: &str,
    question_type: QuestionType,
    value: AnswerValue,
) -> ResponseRecord {
    ResponseRecord {
        question_id: QuestionId(question.to_string()),
        section_id: SectionId(section.to_string()),
        question_type,
        value,
        updated_at: at(0),
    }
}

pub(super) fn yes(question: &str, section: &str) -> ResponseRecord {
    response(question, section, QuestionType::Boolean, AnswerValue::Bool(true))
}

pub(super) fn likert(question: &str, section: &str, value: f64) -> ResponseRecord {
    response(
        question,
        section,
        QuestionType::LikertScale,
        AnswerValue::Number(value),
    )
}

/// `count` affirmative boolean answers in one section, ids prefixed by the section.
pub(super) fn affirmatives(section: &str, count: usize) -> Vec<ResponseRecord> {
    (0..count)
        .map(|index| yes(&format!("{section}-q{index}"), section))
        .collect()
}

/// Four sections of five questions each, so the total maximum is exactly 100 points.
pub(super) fn hundred_point_config() -> ScoringConfig {
    let dimension = |dimension, section: &str| DimensionConfig {
        dimension,
        section_id: SectionId(section.to_string()),
        max_questions: 5,
    };

    ScoringConfig {
        dimensions: vec![
            dimension(ScoringDimension::Governance, GOVERNANCE),
            dimension(ScoringDimension::Financial, FINANCIAL),
            dimension(ScoringDimension::Programme, PROGRAMME),
            dimension(ScoringDimension::HumanResources, HUMAN_RESOURCES),
        ],
        tiers: TierThresholds::default(),
    }
}

pub(super) fn rule(
    id: &str,
    scope: RuleScope,
    scope_id: Option<&str>,
    condition: Option<Value>,
    text: &str,
    priority: i32,
    weight: f64,
) -> RuleRecord {
    RuleRecord {
        id: RuleId(id.to_string()),
        scope,
        scope_id: scope_id.map(str::to_string),
        condition,
        suggestion_text: text.to_string(),
        priority,
        weight,
        is_active: true,
    }
}

/// Suggestion store whose writes can be switched to fail.
#[derive(Default, Clone)]
pub(super) struct FlakySuggestionStore {
    inner: InMemorySuggestionStore,
    failing: Arc<AtomicBool>,
}

impl FlakySuggestionStore {
    pub(super) fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl SuggestionRepository for FlakySuggestionStore {
    fn replace(
        &self,
        id: &AssessmentId,
        suggestions: Vec<GeneratedSuggestion>,
    ) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("suggestion store offline".to_string()));
        }
        self.inner.replace(id, suggestions)
    }

    fn list(&self, id: &AssessmentId) -> Result<Vec<GeneratedSuggestion>, RepositoryError> {
        self.inner.list(id)
    }
}

pub(super) type MemoryEngine =
    SuggestionEngine<InMemoryAssessmentStore, InMemoryRuleStore, FlakySuggestionStore>;

pub(super) struct Harness {
    pub(super) assessments: Arc<InMemoryAssessmentStore>,
    pub(super) rules: Arc<InMemoryRuleStore>,
    pub(super) suggestions: Arc<FlakySuggestionStore>,
    pub(super) engine: Arc<MemoryEngine>,
}

impl Harness {
    pub(super) fn new(rules: Vec<RuleRecord>) -> Self {
        Self::with_calculator(rules, ScoreCalculator::reference())
    }

    pub(super) fn with_calculator(rules: Vec<RuleRecord>, calculator: ScoreCalculator) -> Self {
        let assessments = Arc::new(InMemoryAssessmentStore::default());
        assessments
            .insert(Assessment::start(
                assessment_id(),
                OrganizationId("org-riverbend".to_string()),
                at(0),
            ))
            .expect("fresh store accepts assessment");

        let rules = Arc::new(InMemoryRuleStore::from_records(rules));
        let suggestions = Arc::new(FlakySuggestionStore::default());
        let engine = Arc::new(SuggestionEngine::new(
            assessments.clone(),
            rules.clone(),
            suggestions.clone(),
            calculator,
        ));

        Self {
            assessments,
            rules,
            suggestions,
            engine,
        }
    }

    pub(super) fn answer(&self, responses: Vec<ResponseRecord>) {
        for response in responses {
            self.assessments
                .upsert_response(&assessment_id(), response)
                .expect("assessment exists");
        }
    }

    pub(super) fn service(
        &self,
    ) -> AssessmentService<InMemoryAssessmentStore, InMemoryRuleStore, FlakySuggestionStore> {
        AssessmentService::new(self.assessments.clone(), self.engine.clone())
    }
}

pub(super) fn rule_ids(suggestions: &[GeneratedSuggestion]) -> Vec<&str> {
    suggestions
        .iter()
        .map(|suggestion| suggestion.source_rule_id.0.as_str())
        .collect()
}
