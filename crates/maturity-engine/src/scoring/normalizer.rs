use serde::Serialize;

use crate::assessment::{AnswerValue, QuestionId, QuestionType};

pub(crate) const LIKERT_MIN: f64 = 1.0;
pub(crate) const LIKERT_MAX: f64 = 5.0;
/// Placeholder until per-option weights exist.
pub(crate) const SINGLE_CHOICE_SCORE: f64 = 0.5;
/// Partial credit for responding at all, regardless of how many options were picked.
pub(crate) const MULTIPLE_CHOICE_SCORE: f64 = 0.7;
pub(crate) const TEXT_SCORE: f64 = 0.5;

/// Anomaly observed while scoring; never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    LikertOutOfRange {
        question_id: QuestionId,
        value: f64,
        clamped_to: f64,
    },
    LikertNotNumeric {
        question_id: QuestionId,
    },
    UnsupportedQuestionType {
        question_id: QuestionId,
    },
    UnmappedSection {
        question_id: QuestionId,
        section_id: String,
    },
    SectionOverflow {
        section_id: String,
        raw_score: u32,
        max_points: u32,
    },
}

/// Normalized answer in `[0, 1]` plus any warning raised while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAnswer {
    pub score: f64,
    pub warning: Option<DataQualityWarning>,
}

impl NormalizedAnswer {
    fn clean(score: f64) -> Self {
        Self {
            score,
            warning: None,
        }
    }
}

/// Converts one raw answer into a dimensionless score in `[0, 1]`.
pub fn normalize(
    question_id: &QuestionId,
    question_type: QuestionType,
    value: &AnswerValue,
) -> NormalizedAnswer {
    match question_type {
        QuestionType::Boolean => {
            NormalizedAnswer::clean(if matches!(value, AnswerValue::Bool(true)) {
                1.0
            } else {
                0.0
            })
        }
        QuestionType::LikertScale => normalize_likert(question_id, value),
        QuestionType::SingleChoice => NormalizedAnswer::clean(SINGLE_CHOICE_SCORE),
        QuestionType::MultipleChoice => NormalizedAnswer::clean(match value {
            AnswerValue::Choices(choices) if !choices.is_empty() => MULTIPLE_CHOICE_SCORE,
            _ => 0.0,
        }),
        QuestionType::Text => NormalizedAnswer::clean(TEXT_SCORE),
        QuestionType::Unsupported => NormalizedAnswer {
            score: 0.0,
            warning: Some(DataQualityWarning::UnsupportedQuestionType {
                question_id: question_id.clone(),
            }),
        },
    }
}

/// Numeric reading of a Likert answer, clamped to the scale. `None` when the
/// answer is absent or not a number.
pub(crate) fn likert_value(value: &AnswerValue) -> Option<f64> {
    likert_reading(value).map(clamp_likert)
}

fn likert_reading(value: &AnswerValue) -> Option<f64> {
    let raw = match value {
        AnswerValue::Number(number) => *number,
        AnswerValue::Text(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then_some(raw)
}

fn clamp_likert(raw: f64) -> f64 {
    raw.round().clamp(LIKERT_MIN, LIKERT_MAX)
}

fn normalize_likert(question_id: &QuestionId, value: &AnswerValue) -> NormalizedAnswer {
    let Some(raw) = likert_reading(value) else {
        let warning = value.is_answered().then(|| DataQualityWarning::LikertNotNumeric {
            question_id: question_id.clone(),
        });
        return NormalizedAnswer {
            score: 0.0,
            warning,
        };
    };

    let clamped = clamp_likert(raw);
    let warning = (!(LIKERT_MIN..=LIKERT_MAX).contains(&raw)).then(|| {
        DataQualityWarning::LikertOutOfRange {
            question_id: question_id.clone(),
            value: raw,
            clamped_to: clamped,
        }
    });

    NormalizedAnswer {
        score: (clamped - LIKERT_MIN) / (LIKERT_MAX - LIKERT_MIN),
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qid() -> QuestionId {
        QuestionId("q-1".to_string())
    }

    fn score(question_type: QuestionType, value: AnswerValue) -> f64 {
        normalize(&qid(), question_type, &value).score
    }

    #[test]
    fn boolean_only_true_scores() {
        assert_eq!(score(QuestionType::Boolean, AnswerValue::Bool(true)), 1.0);
        assert_eq!(score(QuestionType::Boolean, AnswerValue::Bool(false)), 0.0);
        assert_eq!(score(QuestionType::Boolean, AnswerValue::Null), 0.0);
        assert_eq!(
            score(QuestionType::Boolean, AnswerValue::Text("true".to_string())),
            0.0
        );
    }

    #[test]
    fn likert_maps_scale_onto_unit_interval() {
        assert_eq!(score(QuestionType::LikertScale, AnswerValue::Number(1.0)), 0.0);
        assert_eq!(score(QuestionType::LikertScale, AnswerValue::Number(3.0)), 0.5);
        assert_eq!(score(QuestionType::LikertScale, AnswerValue::Number(5.0)), 1.0);
    }

    #[test]
    fn likert_out_of_range_is_clamped_with_warning() {
        let high = normalize(&qid(), QuestionType::LikertScale, &AnswerValue::Number(7.0));
        assert_eq!(high.score, 1.0);
        assert_eq!(
            high.warning,
            Some(DataQualityWarning::LikertOutOfRange {
                question_id: qid(),
                value: 7.0,
                clamped_to: 5.0,
            })
        );

        let low = normalize(&qid(), QuestionType::LikertScale, &AnswerValue::Number(-2.0));
        assert_eq!(low.score, 0.0);
        assert!(low.warning.is_some());
    }

    #[test]
    fn likert_accepts_numeric_strings_and_flags_garbage() {
        assert_eq!(
            score(QuestionType::LikertScale, AnswerValue::Text("4".to_string())),
            0.75
        );

        let garbage = normalize(
            &qid(),
            QuestionType::LikertScale,
            &AnswerValue::Text("often".to_string()),
        );
        assert_eq!(garbage.score, 0.0);
        assert_eq!(
            garbage.warning,
            Some(DataQualityWarning::LikertNotNumeric { question_id: qid() })
        );

        let missing = normalize(&qid(), QuestionType::LikertScale, &AnswerValue::Null);
        assert_eq!(missing.score, 0.0);
        assert!(missing.warning.is_none());
    }

    #[test]
    fn choice_and_text_use_placeholder_constants() {
        assert_eq!(
            score(QuestionType::SingleChoice, AnswerValue::Text("Quarterly".to_string())),
            0.5
        );
        assert_eq!(
            score(
                QuestionType::MultipleChoice,
                AnswerValue::Choices(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            ),
            0.7
        );
        assert_eq!(
            score(QuestionType::MultipleChoice, AnswerValue::Choices(Vec::new())),
            0.0
        );
        assert_eq!(score(QuestionType::MultipleChoice, AnswerValue::Null), 0.0);
        assert_eq!(score(QuestionType::Text, AnswerValue::Null), 0.5);
    }

    #[test]
    fn unsupported_types_score_zero() {
        let outcome = normalize(&qid(), QuestionType::Unsupported, &AnswerValue::Bool(true));
        assert_eq!(outcome.score, 0.0);
        assert!(matches!(
            outcome.warning,
            Some(DataQualityWarning::UnsupportedQuestionType { .. })
        ));
    }
}
