use serde_json::json;

use super::common::*;
use crate::assessment::{AnswerValue, AssessmentId, QuestionType};
use crate::repository::{RepositoryError, SuggestionRepository};
use crate::suggestions::{RuleScope, SuggestionEngineError};

fn financial_threshold_rule() -> crate::suggestions::RuleRecord {
    rule(
        "sec-fin-low",
        RuleScope::Section,
        Some(FINANCIAL),
        Some(json!({"metric": "percentage", "operator": "lt", "threshold": 60})),
        "Introduce quarterly financial reporting to the board",
        5,
        1.0,
    )
}

#[test]
fn get_scores_is_none_without_responses() {
    let harness = Harness::new(Vec::new());
    let scores = harness
        .engine
        .get_scores(&assessment_id())
        .expect("assessment exists");
    assert!(scores.is_none());
}

#[test]
fn unknown_assessment_is_reported() {
    let harness = Harness::new(Vec::new());
    let missing = AssessmentId("assessment-404".to_string());

    assert!(matches!(
        harness.engine.get_scores(&missing),
        Err(SuggestionEngineError::AssessmentNotFound(_))
    ));
    assert!(matches!(
        harness.engine.generate_suggestions(&missing),
        Err(SuggestionEngineError::AssessmentNotFound(_))
    ));
}

#[test]
fn generation_requires_responses() {
    let harness = Harness::new(vec![financial_threshold_rule()]);
    assert!(matches!(
        harness.engine.generate_suggestions(&assessment_id()),
        Err(SuggestionEngineError::NoResponses(_))
    ));
}

#[test]
fn section_threshold_is_strict() {
    // Ten financial questions: 6 affirmatives is exactly 60%.
    let harness = Harness::new(vec![financial_threshold_rule()]);
    harness.answer(affirmatives(FINANCIAL, 6));

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert!(suggestions.is_empty());

    // 25 + 3.75 rounds to 29 of 50 points: 58%.
    harness.answer(vec![
        response(
            "financial-section-q5",
            FINANCIAL,
            QuestionType::Boolean,
            AnswerValue::Bool(false),
        ),
        likert("financial-section-q6", FINANCIAL, 4.0),
    ]);
    let scores = harness
        .engine
        .get_scores(&assessment_id())
        .expect("scores")
        .expect("responses present");
    assert_eq!(scores.financial.raw_score, 29);

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert_eq!(rule_ids(&suggestions), vec!["sec-fin-low"]);
    let suggestion = &suggestions[0];
    assert_eq!(suggestion.metric.as_deref(), Some("percentage"));
    assert_eq!(suggestion.observed, Some(58.0));
    assert_eq!(suggestion.scope_id.as_deref(), Some(FINANCIAL));
}

#[test]
fn regeneration_replaces_the_previous_set() {
    let harness = Harness::new(vec![
        financial_threshold_rule(),
        rule(
            "assess-always",
            RuleScope::Assessment,
            None,
            None,
            "Schedule a follow-up self-assessment in twelve months",
            1,
            0.5,
        ),
    ]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);

    let first = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("first run");
    assert_eq!(rule_ids(&first), vec!["sec-fin-low", "assess-always"]);

    let second = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("second run");
    assert_eq!(rule_ids(&second), rule_ids(&first));
    assert_eq!(
        harness
            .engine
            .get_assessment_suggestions(&assessment_id())
            .expect("persisted")
            .len(),
        2
    );

    harness.answer(affirmatives(FINANCIAL, 10));
    let third = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("third run");
    assert_eq!(rule_ids(&third), vec!["assess-always"]);
    assert_eq!(
        rule_ids(
            &harness
                .engine
                .get_assessment_suggestions(&assessment_id())
                .expect("persisted")
        ),
        vec!["assess-always"]
    );
}

#[test]
fn null_condition_rules_always_fire_in_their_scope() {
    let harness = Harness::new(vec![
        rule(
            "q-unconditional",
            RuleScope::Question,
            Some("g9"),
            None,
            "Document who approves annual budgets",
            2,
            1.0,
        ),
        rule(
            "q-needs-answer",
            RuleScope::Question,
            Some("g9"),
            Some(json!({"value": {"eq": 1}})),
            "Keep minutes of budget approval",
            2,
            1.0,
        ),
    ]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert_eq!(rule_ids(&suggestions), vec!["q-unconditional"]);
    assert_eq!(suggestions[0].metric, None);
    assert_eq!(suggestions[0].observed, None);
}

#[test]
fn question_rules_see_raw_and_normalized_metrics() {
    let harness = Harness::new(vec![
        rule(
            "q-no-board",
            RuleScope::Question,
            Some("g1"),
            Some(json!({"metric": "value", "operator": "eq", "threshold": 0})),
            "Establish an independent board",
            4,
            1.0,
        ),
        rule(
            "q-low-confidence",
            RuleScope::Question,
            Some("f1"),
            Some(json!({"metric": "normalized", "operator": "lte", "value": 0.25})),
            "Train staff on budgeting basics",
            3,
            1.0,
        ),
        rule(
            "q-likert-high",
            RuleScope::Question,
            Some("f1"),
            Some(json!({"value": {"gte": 4}})),
            "Share your budgeting practice with peers",
            3,
            1.0,
        ),
    ]);
    harness.answer(vec![
        response(
            "g1",
            GOVERNANCE,
            QuestionType::Boolean,
            AnswerValue::Bool(false),
        ),
        likert("f1", FINANCIAL, 2.0),
    ]);

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert_eq!(rule_ids(&suggestions), vec!["q-no-board", "q-low-confidence"]);
}

#[test]
fn ranking_uses_priority_then_weight_then_evaluation_order() {
    let harness = Harness::new(vec![
        rule("a-low", RuleScope::Assessment, None, None, "Low priority", 1, 9.0),
        rule("a-heavy", RuleScope::Assessment, None, None, "Heavy", 5, 2.0),
        rule("a-light", RuleScope::Assessment, None, None, "Light", 5, 0.5),
        rule("s-heavy", RuleScope::Section, Some(GOVERNANCE), None, "Section heavy", 5, 2.0),
    ]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");

    // Section rules are evaluated before assessment rules, so they win the tie.
    assert_eq!(
        rule_ids(&suggestions),
        vec!["s-heavy", "a-heavy", "a-light", "a-low"]
    );
}

#[test]
fn malformed_and_inactive_rules_are_skipped() {
    let mut inactive = rule("a-off", RuleScope::Assessment, None, None, "Disabled", 9, 1.0);
    inactive.is_active = false;

    let harness = Harness::new(vec![
        inactive,
        rule(
            "a-bad-operator",
            RuleScope::Assessment,
            None,
            Some(json!({"metric": "percentage", "operator": "between", "threshold": 5})),
            "Broken",
            9,
            1.0,
        ),
        rule("s-no-target", RuleScope::Section, None, None, "Orphan", 9, 1.0),
        rule(
            "a-low-total",
            RuleScope::Assessment,
            None,
            Some(json!({"percentage": {"lt": 40}})),
            "Prioritise governance basics",
            2,
            1.0,
        ),
    ]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);

    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert_eq!(rule_ids(&suggestions), vec!["a-low-total"]);

    harness.rules.set_active("a-off", true);
    let suggestions = harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generation succeeds");
    assert_eq!(rule_ids(&suggestions), vec!["a-off", "a-low-total"]);
}

#[test]
fn failed_write_keeps_previous_set() {
    let harness = Harness::new(vec![financial_threshold_rule()]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);
    harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("initial generation");

    harness.answer(affirmatives(FINANCIAL, 10));
    harness.suggestions.fail_writes(true);
    assert!(matches!(
        harness.engine.generate_suggestions(&assessment_id()),
        Err(SuggestionEngineError::Repository(RepositoryError::Unavailable(_)))
    ));

    let persisted = harness
        .suggestions
        .list(&assessment_id())
        .expect("list succeeds");
    assert_eq!(rule_ids(&persisted), vec!["sec-fin-low"]);
}

#[test]
fn ensure_suggestions_reuses_persisted_set() {
    let harness = Harness::new(vec![financial_threshold_rule()]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);

    let first = harness
        .engine
        .ensure_suggestions(&assessment_id())
        .expect("generated");
    assert_eq!(rule_ids(&first), vec!["sec-fin-low"]);

    harness.answer(affirmatives(FINANCIAL, 10));
    let second = harness
        .engine
        .ensure_suggestions(&assessment_id())
        .expect("reused");
    assert_eq!(second, first);

    harness
        .engine
        .clear_suggestions(&assessment_id())
        .expect("cleared");
    let third = harness
        .engine
        .ensure_suggestions(&assessment_id())
        .expect("regenerated");
    assert!(third.is_empty());
}

#[test]
fn report_bundles_scores_and_suggestions() {
    let harness = Harness::new(vec![financial_threshold_rule()]);
    harness.answer(vec![yes("g1", GOVERNANCE)]);
    harness
        .engine
        .generate_suggestions(&assessment_id())
        .expect("generated");

    let report = harness.engine.report(&assessment_id()).expect("report");
    assert_eq!(report.assessment_id, assessment_id());
    assert_eq!(report.scores.map(|scores| scores.total.raw_score), Some(5));
    assert_eq!(rule_ids(&report.suggestions), vec!["sec-fin-low"]);
}

#[test]
fn concurrent_generation_leaves_one_consistent_set() {
    let harness = Harness::new(vec![
        financial_threshold_rule(),
        rule(
            "a-always",
            RuleScope::Assessment,
            None,
            None,
            "Review results with the board",
            1,
            1.0,
        ),
    ]);
    harness.answer(vec![likert("f1", FINANCIAL, 2.0), yes("g1", GOVERNANCE)]);

    let runs: Vec<Vec<_>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    harness
                        .engine
                        .generate_suggestions(&assessment_id())
                        .expect("generated")
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("generation thread"))
            .collect()
    });

    let persisted = harness
        .engine
        .get_assessment_suggestions(&assessment_id())
        .expect("persisted");
    assert!(runs.contains(&persisted));
    assert_eq!(rule_ids(&persisted), vec!["sec-fin-low", "a-always"]);
    for run in &runs {
        assert_eq!(rule_ids(run), rule_ids(&persisted));
    }
}

#[test]
fn listing_suggestions_requires_a_known_assessment() {
    let harness = Harness::new(Vec::new());

    assert!(harness
        .engine
        .get_assessment_suggestions(&assessment_id())
        .expect("listed")
        .is_empty());
    assert!(matches!(
        harness
            .engine
            .get_assessment_suggestions(&AssessmentId("assessment-404".to_string())),
        Err(SuggestionEngineError::AssessmentNotFound(_))
    ));
}
