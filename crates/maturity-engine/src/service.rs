use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::assessment::{
    apply_completion, AnswerValue, Assessment, AssessmentId, CompletionTransition,
    OrganizationId, Question, QuestionId, ResponseRecord,
};
use crate::repository::{
    AssessmentRepository, RepositoryError, RuleRepository, SuggestionRepository,
};
use crate::suggestions::{GeneratedSuggestion, SuggestionEngine, SuggestionEngineError};

/// Records answers and keeps the assessment status in step with mandatory completeness.
pub struct AssessmentService<A, R, S> {
    assessments: Arc<A>,
    engine: Arc<SuggestionEngine<A, R, S>>,
}

/// Assessment header after a completeness check, plus any suggestions generated by it.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub assessment: Assessment,
    pub transition: CompletionTransition,
    pub suggestions: Vec<GeneratedSuggestion>,
}

/// Result of deleting a question from the questionnaire.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRemoval {
    pub question: Question,
    pub pruned_suggestions: usize,
    /// Assessments whose status changed because the question went away.
    pub transitions: Vec<CompletionOutcome>,
}

impl<A, R, S> AssessmentService<A, R, S>
where
    A: AssessmentRepository + 'static,
    R: RuleRepository + 'static,
    S: SuggestionRepository + 'static,
{
    pub fn new(assessments: Arc<A>, engine: Arc<SuggestionEngine<A, R, S>>) -> Self {
        Self {
            assessments,
            engine,
        }
    }

    pub fn engine(&self) -> &SuggestionEngine<A, R, S> {
        &self.engine
    }

    /// Opens a new in-progress assessment for an organization.
    pub fn start_assessment(
        &self,
        assessment_id: AssessmentId,
        organization_id: OrganizationId,
    ) -> Result<Assessment, AssessmentServiceError> {
        let assessment = Assessment::start(assessment_id, organization_id, Utc::now());
        self.assessments.insert(assessment.clone())?;
        info!(assessment_id = %assessment.id, organization_id = %assessment.organization_id, "assessment started");
        Ok(assessment)
    }

    /// Stores (or overwrites) the answer to one question, then re-checks completeness.
    pub fn record_response(
        &self,
        assessment_id: &AssessmentId,
        question_id: &QuestionId,
        value: AnswerValue,
        updated_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome, AssessmentServiceError> {
        self.require_assessment(assessment_id)?;

        let question = self
            .assessments
            .questions()?
            .into_iter()
            .find(|question| &question.id == question_id)
            .ok_or_else(|| AssessmentServiceError::UnknownQuestion(question_id.clone()))?;

        self.assessments.upsert_response(
            assessment_id,
            ResponseRecord {
                question_id: question.id,
                section_id: question.section_id,
                question_type: question.question_type,
                value,
                updated_at,
            },
        )?;

        self.refresh_completion(assessment_id)
    }

    pub fn clear_response(
        &self,
        assessment_id: &AssessmentId,
        question_id: &QuestionId,
    ) -> Result<CompletionOutcome, AssessmentServiceError> {
        self.require_assessment(assessment_id)?;
        self.assessments.remove_response(assessment_id, question_id)?;
        self.refresh_completion(assessment_id)
    }

    /// Deletes a question, cascading to its responses and to suggestions generated
    /// from it, then re-checks every assessment since a removed mandatory question can
    /// complete one.
    pub fn delete_question(
        &self,
        question_id: &QuestionId,
    ) -> Result<QuestionRemoval, AssessmentServiceError> {
        let question = self
            .assessments
            .delete_question(question_id)?
            .ok_or_else(|| AssessmentServiceError::UnknownQuestion(question_id.clone()))?;

        let mut pruned = 0;
        let mut outcomes = Vec::new();
        for assessment_id in self.assessments.assessment_ids()? {
            let outcome = self.engine.with_assessment_lock(
                &assessment_id,
                || -> Result<CompletionOutcome, AssessmentServiceError> {
                    pruned += self
                        .engine
                        .prune_question_locked(&assessment_id, question_id)?;
                    self.refresh_locked(&assessment_id)
                },
            )?;
            if outcome.transition != CompletionTransition::Unchanged {
                outcomes.push(outcome);
            }
        }

        info!(question_id = %question_id, pruned, "question deleted");
        Ok(QuestionRemoval {
            question,
            pruned_suggestions: pruned,
            transitions: outcomes,
        })
    }

    /// Completing forces a fresh suggestion set; reopening clears the persisted one.
    /// Serialized per assessment with suggestion generation, so the last refresh to
    /// run always sees the latest responses.
    pub fn refresh_completion(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<CompletionOutcome, AssessmentServiceError> {
        self.engine
            .with_assessment_lock(assessment_id, || self.refresh_locked(assessment_id))
    }

    /// The header is only written once the suggestion side has succeeded.
    fn refresh_locked(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<CompletionOutcome, AssessmentServiceError> {
        let mut assessment = self.require_assessment(assessment_id)?;
        let questions = self.assessments.questions()?;
        let responses = self.assessments.responses(assessment_id)?;

        let transition = apply_completion(&mut assessment, &questions, &responses, Utc::now());
        let suggestions = match transition {
            CompletionTransition::Completed => {
                let generated = self.engine.generate_locked(assessment_id)?;
                self.assessments.update(assessment.clone())?;
                info!(assessment_id = %assessment_id, suggestions = generated.len(), "assessment completed");
                generated
            }
            CompletionTransition::Reopened => {
                self.engine.clear_locked(assessment_id)?;
                self.assessments.update(assessment.clone())?;
                info!(assessment_id = %assessment_id, "assessment reopened");
                Vec::new()
            }
            CompletionTransition::Unchanged => Vec::new(),
        };

        Ok(CompletionOutcome {
            assessment,
            transition,
            suggestions,
        })
    }

    fn require_assessment(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Assessment, AssessmentServiceError> {
        self.assessments
            .fetch(assessment_id)?
            .ok_or_else(|| AssessmentServiceError::AssessmentNotFound(assessment_id.clone()))
    }
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error("question {0} is not part of the questionnaire")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Engine(#[from] SuggestionEngineError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
