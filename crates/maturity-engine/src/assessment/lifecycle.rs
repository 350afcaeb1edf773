use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Assessment, AssessmentStatus, Question, QuestionId, ResponseRecord};

/// Status change produced by re-checking mandatory completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionTransition {
    Completed,
    Reopened,
    Unchanged,
}

/// Mandatory visible questions that still lack a meaningful answer.
pub fn missing_mandatory<'a>(
    questions: &'a [Question],
    responses: &[ResponseRecord],
) -> Vec<&'a QuestionId> {
    let answered: HashSet<&QuestionId> = responses
        .iter()
        .filter(|response| response.value.is_answered())
        .map(|response| &response.question_id)
        .collect();

    questions
        .iter()
        .filter(|question| question.mandatory && !question.is_hidden)
        .filter(|question| !answered.contains(&question.id))
        .map(|question| &question.id)
        .collect()
}

/// Applies the completeness rule to an assessment header in place.
pub fn apply_completion(
    assessment: &mut Assessment,
    questions: &[Question],
    responses: &[ResponseRecord],
    now: DateTime<Utc>,
) -> CompletionTransition {
    // An assessment with nothing answered never counts as complete.
    let complete = responses.iter().any(|response| response.value.is_answered())
        && missing_mandatory(questions, responses).is_empty();

    match (assessment.status, complete) {
        (AssessmentStatus::InProgress, true) => {
            assessment.status = AssessmentStatus::Completed;
            assessment.completed_at = Some(now);
            CompletionTransition::Completed
        }
        (AssessmentStatus::Completed, false) => {
            assessment.status = AssessmentStatus::InProgress;
            assessment.completed_at = None;
            CompletionTransition::Reopened
        }
        _ => CompletionTransition::Unchanged,
    }
}
