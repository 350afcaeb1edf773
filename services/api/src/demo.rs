use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use maturity_engine::assessment::{
    AnswerValue, AssessmentId, CompletionTransition, OrganizationId, QuestionId,
    ResponseCsvImporter,
};
use maturity_engine::error::AppError;
use maturity_engine::repository::AssessmentRepository;
use maturity_engine::scoring::{ScoreCalculator, ScoringConfig, ScoringDimension};
use maturity_engine::AssessmentReport;

use crate::infra::{load_rules, sample_rules, seed_questionnaire, Stack};

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV export with Question ID, Section ID, Question Type, Value and Updated At columns
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// JSON array of suggestion rules; without it only scores are reported
    #[arg(long)]
    pub(crate) rules: Option<PathBuf>,
    /// Scoring configuration JSON (defaults to the reference questionnaire)
    #[arg(long)]
    pub(crate) scoring: Option<PathBuf>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Print the final report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        responses,
        rules,
        scoring,
        json,
    } = args;

    let calculator = match &scoring {
        Some(path) => ScoringConfig::from_path(path),
        None => Ok(ScoringConfig::reference()),
    }
    .and_then(ScoreCalculator::new)
    .map_err(|source| maturity_engine::config::ConfigError::Scoring {
        path: scoring.clone().unwrap_or_default(),
        source,
    })?;
    let rules = match &rules {
        Some(path) => load_rules(path)?,
        None => Vec::new(),
    };

    let records = ResponseCsvImporter::from_path(&responses)?;
    let stack = Stack::new(calculator, rules);
    let assessment = stack.service.start_assessment(
        AssessmentId("cli-import".to_string()),
        OrganizationId("cli".to_string()),
    )?;

    if records.is_empty() {
        println!("{} contains no responses; nothing to score", responses.display());
        return Ok(());
    }

    let warnings = stack.engine().calculator().evaluate(&records).warnings;
    for record in records {
        stack
            .assessments
            .upsert_response(&assessment.id, record)
            .map_err(maturity_engine::SuggestionEngineError::from)?;
    }

    stack.engine().generate_suggestions(&assessment.id)?;
    let report = stack.engine().report(&assessment.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    render_report(&report);
    if !warnings.is_empty() {
        println!("\nData quality warnings");
        for warning in &warnings {
            println!("- {warning:?}");
        }
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let stack = Stack::new(ScoreCalculator::reference(), sample_rules());
    seed_questionnaire(&stack.assessments);

    let assessment = stack.service.start_assessment(
        AssessmentId("demo-assessment".to_string()),
        OrganizationId("org-riverside-trust".to_string()),
    )?;
    println!("Maturity assessment demo");
    println!("- Started {} for {}", assessment.id, assessment.organization_id);

    let answers = [
        ("gov-board", AnswerValue::Bool(true)),
        ("gov-charter", AnswerValue::Bool(false)),
        ("gov-meetings", AnswerValue::Number(4.0)),
        ("fin-audit", AnswerValue::Number(2.0)),
        (
            "fin-tools",
            AnswerValue::Choices(vec!["Spreadsheets".to_string()]),
        ),
        ("prog-plan", AnswerValue::Bool(true)),
        (
            "prog-eval",
            AnswerValue::Text("Annual beneficiary survey".to_string()),
        ),
        ("hr-handbook", AnswerValue::Number(2.0)),
    ];

    for (question, value) in answers {
        let outcome = stack.service.record_response(
            &assessment.id,
            &QuestionId(question.to_string()),
            value,
            Utc::now(),
        )?;
        print_transition(question, outcome.transition);
        if outcome.transition == CompletionTransition::Completed {
            println!("  {} suggestions generated", outcome.suggestions.len());
        }
    }

    println!("\nClearing a mandatory answer reopens the assessment");
    let outcome = stack
        .service
        .clear_response(&assessment.id, &QuestionId("hr-handbook".to_string()))?;
    print_transition("hr-handbook", outcome.transition);
    let outcome = stack.service.record_response(
        &assessment.id,
        &QuestionId("hr-handbook".to_string()),
        AnswerValue::Number(3.0),
        Utc::now(),
    )?;
    print_transition("hr-handbook", outcome.transition);

    let report = stack.engine().report(&assessment.id)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        render_report(&report);
    }
    Ok(())
}

fn print_transition(question: &str, transition: CompletionTransition) {
    match transition {
        CompletionTransition::Completed => println!("- {question}: assessment completed"),
        CompletionTransition::Reopened => println!("- {question}: assessment reopened"),
        CompletionTransition::Unchanged => println!("- {question}: recorded"),
    }
}

fn render_report(report: &AssessmentReport) {
    println!(
        "Assessment {} ({})",
        report.assessment_id,
        report.status.label()
    );

    let Some(scores) = &report.scores else {
        println!("No responses recorded yet.");
        return;
    };

    for dimension in ScoringDimension::ALL {
        let section = scores.section(dimension);
        println!(
            "- {}: {}/{} ({:.1}%)",
            dimension.label(),
            section.raw_score,
            section.max_points,
            section.percentage
        );
    }
    println!(
        "Total: {}/{} ({:.1}%) -> {}",
        scores.total.raw_score, scores.total.max_points, scores.total.percentage, scores.maturity_tier
    );

    if report.suggestions.is_empty() {
        println!("No suggestions.");
        return;
    }
    println!("Suggestions:");
    for (index, suggestion) in report.suggestions.iter().enumerate() {
        println!(
            "  {}. {} [priority {}]",
            index + 1,
            suggestion.suggestion_text,
            suggestion.priority
        );
    }
}
