use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use maturity_engine::assessment::{Question, QuestionId, QuestionType, Section, SectionId};
use maturity_engine::config::EngineConfig;
use maturity_engine::error::AppError;
use maturity_engine::repository::{
    InMemoryAssessmentStore, InMemoryRuleStore, InMemorySuggestionStore,
};
use maturity_engine::scoring::ScoreCalculator;
use maturity_engine::suggestions::RuleRecord;
use maturity_engine::{AssessmentService, SuggestionEngine};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type MemoryEngine =
    SuggestionEngine<InMemoryAssessmentStore, InMemoryRuleStore, InMemorySuggestionStore>;
pub(crate) type MemoryService =
    AssessmentService<InMemoryAssessmentStore, InMemoryRuleStore, InMemorySuggestionStore>;

/// In-memory stores wired to an engine and lifecycle service.
pub(crate) struct Stack {
    pub(crate) assessments: Arc<InMemoryAssessmentStore>,
    pub(crate) service: Arc<MemoryService>,
}

impl Stack {
    pub(crate) fn new(calculator: ScoreCalculator, rules: Vec<RuleRecord>) -> Self {
        let assessments = Arc::new(InMemoryAssessmentStore::default());
        let engine = Arc::new(SuggestionEngine::new(
            assessments.clone(),
            Arc::new(InMemoryRuleStore::from_records(rules)),
            Arc::new(InMemorySuggestionStore::default()),
            calculator,
        ));
        let service = Arc::new(AssessmentService::new(assessments.clone(), engine));

        Self {
            assessments,
            service,
        }
    }

    /// Builds the stack from configured scoring and rule files, seeding the sample questionnaire.
    pub(crate) fn from_config(config: &EngineConfig) -> Result<Self, AppError> {
        let calculator = ScoreCalculator::new(config.scoring()?).map_err(|source| {
            maturity_engine::config::ConfigError::Scoring {
                path: config.scoring_config_path.clone().unwrap_or_default(),
                source,
            }
        })?;
        let rules = match &config.rules_path {
            Some(path) => load_rules(path)?,
            None => sample_rules(),
        };
        info!(rules = rules.len(), "loaded suggestion rules");

        let stack = Self::new(calculator, rules);
        seed_questionnaire(&stack.assessments);
        Ok(stack)
    }

    pub(crate) fn engine(&self) -> &MemoryEngine {
        self.service.engine()
    }
}

/// Reads a JSON array of rule records as exported by the rule administration screen.
pub(crate) fn load_rules(path: &Path) -> Result<Vec<RuleRecord>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn sample_rules() -> Vec<RuleRecord> {
    let raw = serde_json::json!([
        {
            "id": "gov-board-missing",
            "scope": "QUESTION",
            "scope_id": "gov-board",
            "condition": {"metric": "value", "operator": "eq", "threshold": 0},
            "suggestion_text": "Constitute a board with at least three independent members.",
            "priority": 5,
            "weight": 1.0
        },
        {
            "id": "fin-below-sixty",
            "scope": "SECTION",
            "scope_id": "financial-section",
            "condition": {"metric": "percentage", "operator": "lt", "threshold": 60},
            "suggestion_text": "Introduce quarterly financial reporting to the board.",
            "priority": 4,
            "weight": 1.5
        },
        {
            "id": "hr-below-half",
            "scope": "SECTION",
            "scope_id": "human-resources-section",
            "condition": {"percentage": {"lt": 50}},
            "suggestion_text": "Publish a staff handbook covering leave, grievances and appraisals.",
            "priority": 3,
            "weight": 1.0
        },
        {
            "id": "overall-emerging",
            "scope": "ASSESSMENT",
            "condition": {"percentage": {"lte": 40}},
            "suggestion_text": "Start with governance and financial controls before expanding programmes.",
            "priority": 2,
            "weight": 2.0
        },
        {
            "id": "repeat-assessment",
            "scope": "ASSESSMENT",
            "condition": null,
            "suggestion_text": "Repeat this self-assessment in twelve months to track progress.",
            "priority": 0,
            "weight": 0.0
        }
    ]);

    serde_json::from_value(raw).unwrap_or_default()
}

/// A short questionnaire covering each scoring dimension.
pub(crate) fn seed_questionnaire(store: &InMemoryAssessmentStore) {
    let sections = [
        ("governance-section", "Governance"),
        ("financial-section", "Financial Management"),
        ("programme-section", "Programme Management"),
        ("human-resources-section", "Human Resources"),
    ];
    for (order, (id, title)) in sections.iter().enumerate() {
        store.insert_section(Section {
            id: SectionId(id.to_string()),
            title: title.to_string(),
            order: order as u32 + 1,
        });
    }

    let questions = [
        ("gov-board", "governance-section", "Does the organization have a functioning board?", QuestionType::Boolean, true),
        ("gov-charter", "governance-section", "Is there a written constitution or charter?", QuestionType::Boolean, true),
        ("gov-meetings", "governance-section", "How regularly does the board meet?", QuestionType::LikertScale, false),
        ("fin-audit", "financial-section", "How confident are you in your annual audit?", QuestionType::LikertScale, true),
        ("fin-tools", "financial-section", "Which tools track income and expenditure?", QuestionType::MultipleChoice, false),
        ("prog-plan", "programme-section", "Do programmes follow a written plan?", QuestionType::Boolean, true),
        ("prog-eval", "programme-section", "Describe how programmes are evaluated.", QuestionType::Text, false),
        ("hr-handbook", "human-resources-section", "How complete is the staff handbook?", QuestionType::LikertScale, true),
    ];
    for (order, (id, section, text, question_type, mandatory)) in questions.into_iter().enumerate() {
        store.insert_question(Question {
            id: QuestionId(id.to_string()),
            section_id: SectionId(section.to_string()),
            text: text.to_string(),
            question_type,
            options: if question_type == QuestionType::MultipleChoice {
                vec![
                    "Spreadsheets".to_string(),
                    "Accounting package".to_string(),
                    "Paper ledger".to_string(),
                ]
            } else {
                Vec::new()
            },
            mandatory,
            order: order as u32 + 1,
            is_hidden: false,
        });
    }
}
