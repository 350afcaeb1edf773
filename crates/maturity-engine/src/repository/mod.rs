//! Data-access seams consumed by the engine and lifecycle service.

mod memory;

pub use memory::{InMemoryAssessmentStore, InMemoryRuleStore, InMemorySuggestionStore};

use crate::assessment::{Assessment, AssessmentId, Question, QuestionId, ResponseRecord};
use crate::suggestions::{GeneratedSuggestion, RuleRecord, RuleScope};

/// Storage abstraction for assessments, the questionnaire, and responses.
pub trait AssessmentRepository: Send + Sync {
    /// Fails with `Conflict` when the id is already taken.
    fn insert(&self, assessment: Assessment) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssessmentId) -> Result<Option<Assessment>, RepositoryError>;
    fn update(&self, assessment: Assessment) -> Result<(), RepositoryError>;
    fn assessment_ids(&self) -> Result<Vec<AssessmentId>, RepositoryError>;
    fn questions(&self) -> Result<Vec<Question>, RepositoryError>;
    /// Removes the question together with every stored response to it.
    fn delete_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<Option<Question>, RepositoryError>;
    /// Responses joined with their question's type and section.
    fn responses(&self, id: &AssessmentId) -> Result<Vec<ResponseRecord>, RepositoryError>;
    fn upsert_response(
        &self,
        id: &AssessmentId,
        response: ResponseRecord,
    ) -> Result<(), RepositoryError>;
    fn remove_response(
        &self,
        id: &AssessmentId,
        question_id: &QuestionId,
    ) -> Result<bool, RepositoryError>;
}

/// Read-only view of the administrative rule store.
pub trait RuleRepository: Send + Sync {
    fn active_rules(&self, scope: RuleScope) -> Result<Vec<RuleRecord>, RepositoryError>;
}

/// Persistence for generated suggestion sets.
pub trait SuggestionRepository: Send + Sync {
    /// Replaces the whole set for an assessment; all-or-nothing.
    fn replace(
        &self,
        id: &AssessmentId,
        suggestions: Vec<GeneratedSuggestion>,
    ) -> Result<(), RepositoryError>;
    fn list(&self, id: &AssessmentId) -> Result<Vec<GeneratedSuggestion>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
