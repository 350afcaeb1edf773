use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::config::{ScoringConfig, ScoringDimension, POINTS_PER_QUESTION};
use super::normalizer::{normalize, DataQualityWarning};
use super::ScoredAnswer;
use crate::assessment::{QuestionId, ResponseRecord};

pub(crate) struct Aggregation {
    pub answers: BTreeMap<QuestionId, ScoredAnswer>,
    pub section_raw: BTreeMap<ScoringDimension, u32>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Keeps the most recent response per question; later input wins equal timestamps.
pub(crate) fn latest_per_question(
    responses: &[ResponseRecord],
) -> BTreeMap<&QuestionId, &ResponseRecord> {
    let mut latest: BTreeMap<&QuestionId, &ResponseRecord> = BTreeMap::new();

    for response in responses {
        match latest.get(&response.question_id) {
            Some(existing) if existing.updated_at > response.updated_at => {}
            _ => {
                latest.insert(&response.question_id, response);
            }
        }
    }

    latest
}

pub(crate) fn aggregate(responses: &[ResponseRecord], config: &ScoringConfig) -> Aggregation {
    let mut answers = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut sums: BTreeMap<ScoringDimension, f64> = BTreeMap::new();

    for (question_id, response) in latest_per_question(responses) {
        let normalized = normalize(question_id, response.question_type, &response.value);
        if let Some(warning) = normalized.warning {
            warn!(question_id = %question_id, ?warning, "data quality issue while scoring");
            warnings.push(warning);
        }

        match config.dimension_for_section(&response.section_id) {
            Some(entry) => {
                *sums.entry(entry.dimension).or_insert(0.0) +=
                    normalized.score * f64::from(POINTS_PER_QUESTION);
            }
            None => {
                debug!(
                    question_id = %question_id,
                    section_id = %response.section_id,
                    "response belongs to an unscored section"
                );
                warnings.push(DataQualityWarning::UnmappedSection {
                    question_id: question_id.clone(),
                    section_id: response.section_id.0.clone(),
                });
            }
        }

        answers.insert(
            question_id.clone(),
            ScoredAnswer {
                section_id: response.section_id.clone(),
                question_type: response.question_type,
                value: response.value.clone(),
                normalized: normalized.score,
            },
        );
    }

    let mut section_raw = BTreeMap::new();
    for entry in &config.dimensions {
        let sum = sums.get(&entry.dimension).copied().unwrap_or(0.0);
        let rounded = sum.round().max(0.0) as u32;
        let max_points = entry.max_points();

        let raw = if rounded > max_points {
            warn!(
                section_id = %entry.section_id,
                raw_score = rounded,
                max_points,
                "section scored above its configured maximum; clamping"
            );
            warnings.push(DataQualityWarning::SectionOverflow {
                section_id: entry.section_id.0.clone(),
                raw_score: rounded,
                max_points,
            });
            max_points
        } else {
            rounded
        };

        section_raw.insert(entry.dimension, raw);
    }

    Aggregation {
        answers,
        section_raw,
        warnings,
    }
}
