use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for assessments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssessmentId(pub String);

/// Identifier wrapper for organizations owning assessments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

/// Identifier wrapper for questionnaire sections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SectionId(pub String);

/// Identifier wrapper for questions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuestionId(pub String);

macro_rules! id_display {
    ($($name:ident),+) => {
        $(
            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )+
    };
}

id_display!(AssessmentId, OrganizationId, SectionId, QuestionId);

/// Answer shapes a question can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Boolean,
    LikertScale,
    SingleChoice,
    MultipleChoice,
    Text,
    /// Type tags this build does not understand. Scored as zero.
    #[serde(other)]
    Unsupported,
}

impl QuestionType {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionType::Boolean => "BOOLEAN",
            QuestionType::LikertScale => "LIKERT_SCALE",
            QuestionType::SingleChoice => "SINGLE_CHOICE",
            QuestionType::MultipleChoice => "MULTIPLE_CHOICE",
            QuestionType::Text => "TEXT",
            QuestionType::Unsupported => "UNSUPPORTED",
        }
    }

    /// Parses a stored type tag, mapping anything unrecognised to `Unsupported`.
    pub fn from_tag(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "BOOLEAN" => QuestionType::Boolean,
            "LIKERT_SCALE" | "LIKERT" => QuestionType::LikertScale,
            "SINGLE_CHOICE" => QuestionType::SingleChoice,
            "MULTIPLE_CHOICE" => QuestionType::MultipleChoice,
            "TEXT" => QuestionType::Text,
            _ => QuestionType::Unsupported,
        }
    }
}

/// Raw answer payload whose interpretation depends on the question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Choices(Vec<String>),
    Null,
}

impl AnswerValue {
    /// Whether the respondent supplied something meaningful.
    pub fn is_answered(&self) -> bool {
        match self {
            AnswerValue::Bool(_) | AnswerValue::Number(_) => true,
            AnswerValue::Text(text) => !text.trim().is_empty(),
            AnswerValue::Choices(choices) => !choices.is_empty(),
            AnswerValue::Null => false,
        }
    }
}

/// A question definition as administered in the questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub section_id: SectionId,
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub mandatory: bool,
    pub order: u32,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Named grouping of questions, ordered relative to its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub order: u32,
}

/// One stored answer joined with the question metadata scoring needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: QuestionId,
    pub section_id: SectionId,
    pub question_type: QuestionType,
    pub value: AnswerValue,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle state of an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    InProgress,
    Completed,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStatus::InProgress => "in_progress",
            AssessmentStatus::Completed => "completed",
        }
    }
}

/// Assessment header owned by an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub id: AssessmentId,
    pub organization_id: OrganizationId,
    pub status: AssessmentStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assessment {
    pub fn start(
        id: AssessmentId,
        organization_id: OrganizationId,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            organization_id,
            status: AssessmentStatus::InProgress,
            started_at,
            completed_at: None,
        }
    }
}
