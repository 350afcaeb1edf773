use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::condition::{ConditionMatch, MetricContext};
use super::generated::{self, GeneratedSuggestion};
use super::rules::{RuleScope, RuleTarget, SuggestionRule};
use crate::assessment::{AnswerValue, AssessmentId, AssessmentStatus, QuestionId, QuestionType};
use crate::repository::{
    AssessmentRepository, RepositoryError, RuleRepository, SuggestionRepository,
};
use crate::scoring::normalizer::likert_value;
use crate::scoring::{ScoreBreakdown, ScoreCalculator, ScoredAnswer, Scores};

/// Metric names exposed to rule conditions.
pub mod metrics {
    pub const SCORE: &str = "score";
    pub const PERCENTAGE: &str = "percentage";
    pub const MAX_POINTS: &str = "max_points";
    pub const VALUE: &str = "value";
    pub const NORMALIZED: &str = "normalized";
}

/// Serializes suggestion writes per assessment. An entry lives only while some
/// caller holds or waits on it.
#[derive(Default)]
struct AssessmentLocks {
    locks: Mutex<HashMap<AssessmentId, Arc<Mutex<()>>>>,
}

impl AssessmentLocks {
    fn run<T>(&self, id: &AssessmentId, work: impl FnOnce() -> T) -> T {
        let lock = self.acquire(id);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };
        self.release(id, &lock);
        result
    }

    fn acquire(&self, id: &AssessmentId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.clone()).or_default().clone()
    }

    fn release(&self, id: &AssessmentId, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this caller hold the only references.
        if Arc::strong_count(lock) == 2 {
            locks.remove(id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Scores an assessment and materializes the rule matches for it.
pub struct SuggestionEngine<A, R, S> {
    assessments: Arc<A>,
    rules: Arc<R>,
    suggestions: Arc<S>,
    calculator: Arc<ScoreCalculator>,
    locks: AssessmentLocks,
}

impl<A, R, S> SuggestionEngine<A, R, S>
where
    A: AssessmentRepository + 'static,
    R: RuleRepository + 'static,
    S: SuggestionRepository + 'static,
{
    pub fn new(
        assessments: Arc<A>,
        rules: Arc<R>,
        suggestions: Arc<S>,
        calculator: ScoreCalculator,
    ) -> Self {
        Self {
            assessments,
            rules,
            suggestions,
            calculator: Arc::new(calculator),
            locks: AssessmentLocks::default(),
        }
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    /// Current scores, or `None` when the assessment has no responses yet.
    pub fn get_scores(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Option<Scores>, SuggestionEngineError> {
        Ok(self
            .breakdown(assessment_id)?
            .map(|breakdown| breakdown.scores))
    }

    /// Recomputes and atomically replaces the assessment's suggestion set.
    pub fn generate_suggestions(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<GeneratedSuggestion>, SuggestionEngineError> {
        self.with_assessment_lock(assessment_id, || self.generate_locked(assessment_id))
    }

    /// Returns the persisted set when one exists, generating it otherwise.
    pub fn ensure_suggestions(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<GeneratedSuggestion>, SuggestionEngineError> {
        self.with_assessment_lock(assessment_id, || {
            let existing = self.get_assessment_suggestions(assessment_id)?;
            if !existing.is_empty() {
                debug!(assessment_id = %assessment_id, count = existing.len(), "suggestions already generated");
                return Ok(existing);
            }
            self.generate_locked(assessment_id)
        })
    }

    /// Persisted suggestions in ranking order, without recomputation.
    pub fn get_assessment_suggestions(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<GeneratedSuggestion>, SuggestionEngineError> {
        self.require_assessment(assessment_id)?;
        let mut persisted = self.suggestions.list(assessment_id)?;
        generated::sort(&mut persisted);
        Ok(persisted)
    }

    /// Drops the persisted set, e.g. when a completed assessment is reopened.
    pub fn clear_suggestions(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<(), SuggestionEngineError> {
        self.with_assessment_lock(assessment_id, || self.clear_locked(assessment_id))
    }

    /// Runs `work` while holding the assessment's suggestion lock. The lock is not
    /// reentrant: `work` must use the `*_locked` variants, never the public operations.
    pub(crate) fn with_assessment_lock<T>(
        &self,
        assessment_id: &AssessmentId,
        work: impl FnOnce() -> T,
    ) -> T {
        self.locks.run(assessment_id, work)
    }

    pub(crate) fn clear_locked(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<(), SuggestionEngineError> {
        self.suggestions.replace(assessment_id, Vec::new())?;
        info!(assessment_id = %assessment_id, "cleared generated suggestions");
        Ok(())
    }

    /// Drops suggestions sourced from a deleted question; returns how many were removed.
    pub(crate) fn prune_question_locked(
        &self,
        assessment_id: &AssessmentId,
        question_id: &QuestionId,
    ) -> Result<usize, SuggestionEngineError> {
        let persisted = self.suggestions.list(assessment_id)?;
        let before = persisted.len();
        let kept: Vec<GeneratedSuggestion> = persisted
            .into_iter()
            .filter(|suggestion| {
                !(suggestion.scope == RuleScope::Question
                    && suggestion.scope_id.as_deref() == Some(question_id.0.as_str()))
            })
            .collect();

        let removed = before - kept.len();
        if removed > 0 {
            self.suggestions.replace(assessment_id, kept)?;
            info!(assessment_id = %assessment_id, question_id = %question_id, removed, "pruned suggestions for deleted question");
        }
        Ok(removed)
    }

    /// Scores plus persisted suggestions, as handed to report rendering.
    pub fn report(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<AssessmentReport, SuggestionEngineError> {
        let assessment = self
            .assessments
            .fetch(assessment_id)?
            .ok_or_else(|| SuggestionEngineError::AssessmentNotFound(assessment_id.clone()))?;
        let scores = self.get_scores(assessment_id)?;
        let suggestions = self.get_assessment_suggestions(assessment_id)?;

        Ok(AssessmentReport {
            assessment_id: assessment.id,
            status: assessment.status,
            completed_at: assessment.completed_at,
            scores,
            suggestions,
        })
    }

    fn require_assessment(&self, assessment_id: &AssessmentId) -> Result<(), SuggestionEngineError> {
        match self.assessments.fetch(assessment_id)? {
            Some(_) => Ok(()),
            None => Err(SuggestionEngineError::AssessmentNotFound(
                assessment_id.clone(),
            )),
        }
    }

    fn breakdown(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Option<ScoreBreakdown>, SuggestionEngineError> {
        self.require_assessment(assessment_id)?;

        let responses = self.assessments.responses(assessment_id)?;
        if responses.is_empty() {
            return Ok(None);
        }

        Ok(Some(self.calculator.evaluate(&responses)))
    }

    pub(crate) fn generate_locked(
        &self,
        assessment_id: &AssessmentId,
    ) -> Result<Vec<GeneratedSuggestion>, SuggestionEngineError> {
        let breakdown = self
            .breakdown(assessment_id)?
            .ok_or_else(|| SuggestionEngineError::NoResponses(assessment_id.clone()))?;
        let rules = self.load_rules()?;
        let generated_at = Utc::now();

        let mut matches = Vec::new();
        for rule in &rules {
            let context = self.context_for(&rule.target, &breakdown);
            let hit = match &rule.condition {
                None => Some(None),
                Some(condition) => condition.evaluate(&context).map(Some),
            };

            if let Some(hit) = hit {
                matches.push(materialize(
                    assessment_id,
                    rule,
                    hit,
                    matches.len() as u32,
                    generated_at,
                ));
            }
        }

        let ranked = generated::rank(matches);
        self.suggestions.replace(assessment_id, ranked.clone())?;

        info!(
            assessment_id = %assessment_id,
            rules = rules.len(),
            suggestions = ranked.len(),
            total_percentage = breakdown.scores.total.percentage,
            tier = %breakdown.scores.maturity_tier,
            "generated suggestions"
        );

        Ok(ranked)
    }

    /// Active rules in evaluation order: question, section, assessment; by id within
    /// a scope. Malformed records are skipped.
    fn load_rules(&self) -> Result<Vec<SuggestionRule>, RepositoryError> {
        let mut rules = Vec::new();

        for scope in RuleScope::ALL {
            let mut records = self.rules.active_rules(scope)?;
            records.sort_by(|left, right| left.id.cmp(&right.id));

            for record in records {
                if !record.is_active {
                    continue;
                }
                if record.scope != scope {
                    debug!(rule_id = %record.id, ?scope, "rule store returned a rule for another scope");
                    continue;
                }

                let rule_id = record.id.clone();
                match SuggestionRule::try_from(record) {
                    Ok(rule) => rules.push(rule),
                    Err(error) => {
                        warn!(rule_id = %rule_id, %error, "skipping malformed suggestion rule");
                    }
                }
            }
        }

        Ok(rules)
    }

    fn context_for(&self, target: &RuleTarget, breakdown: &ScoreBreakdown) -> MetricContext {
        match target {
            RuleTarget::Question(question_id) => breakdown
                .answers
                .get(question_id)
                .map(question_context)
                .unwrap_or_default(),
            RuleTarget::Section(section_id) => self
                .calculator
                .config()
                .dimension_for_section(section_id)
                .map(|entry| {
                    let section = breakdown.scores.section(entry.dimension);
                    MetricContext::new()
                        .with(metrics::SCORE, f64::from(section.raw_score))
                        .with(metrics::PERCENTAGE, section.percentage)
                        .with(metrics::MAX_POINTS, f64::from(section.max_points))
                })
                .unwrap_or_default(),
            RuleTarget::Assessment => {
                let total = &breakdown.scores.total;
                MetricContext::new()
                    .with(metrics::SCORE, f64::from(total.raw_score))
                    .with(metrics::PERCENTAGE, total.percentage)
                    .with(metrics::MAX_POINTS, f64::from(total.max_points))
            }
        }
    }
}

fn question_context(answer: &ScoredAnswer) -> MetricContext {
    let mut context = MetricContext::new()
        .with(metrics::NORMALIZED, answer.normalized)
        .with(metrics::SCORE, answer.normalized * 5.0);
    if let Some(value) = numeric_answer(answer) {
        context.insert(metrics::VALUE, value);
    }
    context
}

/// Numeric reading of the raw answer: booleans as 1/0, Likert values clamped to
/// the scale, multiple choice as the number of selected options.
fn numeric_answer(answer: &ScoredAnswer) -> Option<f64> {
    match (answer.question_type, &answer.value) {
        (QuestionType::LikertScale, value) => likert_value(value),
        (_, AnswerValue::Bool(flag)) => Some(if *flag { 1.0 } else { 0.0 }),
        (_, AnswerValue::Number(number)) if number.is_finite() => Some(*number),
        (_, AnswerValue::Choices(choices)) => Some(choices.len() as f64),
        _ => None,
    }
}

fn materialize(
    assessment_id: &AssessmentId,
    rule: &SuggestionRule,
    hit: Option<ConditionMatch>,
    sequence: u32,
    generated_at: DateTime<Utc>,
) -> GeneratedSuggestion {
    let (metric, observed) = match hit {
        Some(ConditionMatch { metric, observed }) => (Some(metric), Some(observed)),
        None => (None, None),
    };

    GeneratedSuggestion {
        assessment_id: assessment_id.clone(),
        source_rule_id: rule.id.clone(),
        scope: rule.target.scope(),
        scope_id: rule.target.scope_id().map(str::to_string),
        metric,
        observed,
        suggestion_text: rule.suggestion_text.clone(),
        priority: rule.priority,
        weight: rule.weight,
        sequence,
        generated_at,
    }
}

/// Output bundle consumed by report rendering.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentReport {
    pub assessment_id: AssessmentId,
    pub status: AssessmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub scores: Option<Scores>,
    pub suggestions: Vec<GeneratedSuggestion>,
}

/// Error raised by the suggestion engine.
#[derive(Debug, thiserror::Error)]
pub enum SuggestionEngineError {
    #[error("assessment {0} not found")]
    AssessmentNotFound(AssessmentId),
    #[error("assessment {0} has no responses")]
    NoResponses(AssessmentId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(raw: &str) -> AssessmentId {
        AssessmentId(raw.to_string())
    }

    #[test]
    fn released_locks_are_dropped_from_the_map() {
        let locks = AssessmentLocks::default();

        let value = locks.run(&id("a-1"), || {
            assert_eq!(locks.len(), 1);
            locks.run(&id("a-2"), || assert_eq!(locks.len(), 2));
            assert_eq!(locks.len(), 1);
            7
        });

        assert_eq!(value, 7);
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn waiting_callers_share_one_entry_until_the_last_leaves() {
        let locks = AssessmentLocks::default();
        let inside = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    locks.run(&id("a-1"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        std::thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0);
    }
}
