use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{AnswerValue, QuestionId, QuestionType, ResponseRecord, SectionId};

#[derive(Debug, thiserror::Error)]
pub enum ResponseImportError {
    #[error("failed to read response export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid response CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparseable timestamp '{value}'")]
    Timestamp { row: usize, value: String },
}

/// Loads response exports (one row per answered question) into scoring records.
pub struct ResponseCsvImporter;

impl ResponseCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<ResponseRecord>, ResponseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Rows without an `Updated At` value are stamped with the Unix epoch so any
    /// timestamped duplicate supersedes them.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<ResponseRecord>, ResponseImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for (index, row) in csv_reader.deserialize::<ResponseRow>().enumerate() {
            let row = row?;
            let question_type = QuestionType::from_tag(&row.question_type);
            let updated_at = match row.updated_at.as_deref() {
                Some(raw) => parse_timestamp(raw).ok_or_else(|| ResponseImportError::Timestamp {
                    row: index + 1,
                    value: raw.to_string(),
                })?,
                None => DateTime::<Utc>::default(),
            };

            records.push(ResponseRecord {
                question_id: QuestionId(row.question_id),
                section_id: SectionId(row.section_id),
                question_type,
                value: parse_value(question_type, row.value.as_deref()),
                updated_at,
            });
        }

        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct ResponseRow {
    #[serde(rename = "Question ID")]
    question_id: String,
    #[serde(rename = "Section ID")]
    section_id: String,
    #[serde(rename = "Question Type")]
    question_type: String,
    #[serde(rename = "Value", default, deserialize_with = "empty_string_as_none")]
    value: Option<String>,
    #[serde(
        rename = "Updated At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    updated_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_value(question_type: QuestionType, raw: Option<&str>) -> AnswerValue {
    let Some(raw) = raw else {
        return AnswerValue::Null;
    };

    match question_type {
        QuestionType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => AnswerValue::Bool(true),
            "false" | "no" | "n" | "0" => AnswerValue::Bool(false),
            _ => AnswerValue::Text(raw.to_string()),
        },
        QuestionType::LikertScale => raw
            .parse::<f64>()
            .map(AnswerValue::Number)
            .unwrap_or_else(|_| AnswerValue::Text(raw.to_string())),
        QuestionType::MultipleChoice => AnswerValue::Choices(
            raw.split(';')
                .map(str::trim)
                .filter(|choice| !choice.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        QuestionType::SingleChoice | QuestionType::Text | QuestionType::Unsupported => {
            AnswerValue::Text(raw.to_string())
        }
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
