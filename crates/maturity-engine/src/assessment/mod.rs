//! Questionnaire structure, responses, and assessment lifecycle.

pub mod domain;
pub mod import;
pub mod lifecycle;
pub mod sections;

pub use domain::{
    AnswerValue, Assessment, AssessmentId, AssessmentStatus, OrganizationId, Question, QuestionId,
    QuestionType, ResponseRecord, Section, SectionId,
};
pub use import::{ResponseCsvImporter, ResponseImportError};
pub use lifecycle::{apply_completion, missing_mandatory, CompletionTransition};
pub use sections::{remove_section, reorder_section, SectionOrderError};
