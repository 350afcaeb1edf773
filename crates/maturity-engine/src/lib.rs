//! Scoring and improvement-suggestion engine for organizational maturity self-assessments.
//!
//! Responses are normalized per question type, aggregated into four fixed scoring dimensions,
//! classified into a maturity tier, and matched against administrator-defined rules to produce
//! a ranked suggestion set that report rendering consumes.

pub mod assessment;
pub mod config;
pub mod error;
pub mod repository;
pub mod scoring;
pub mod service;
pub mod suggestions;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use scoring::{MaturityTier, ScoreCalculator, Scores};
pub use service::{AssessmentService, AssessmentServiceError, CompletionOutcome, QuestionRemoval};
pub use suggestions::{AssessmentReport, GeneratedSuggestion, SuggestionEngine, SuggestionEngineError};
