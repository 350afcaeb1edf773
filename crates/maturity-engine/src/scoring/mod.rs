//! Response normalization and section/total score aggregation.

mod aggregate;
pub mod config;
pub mod normalizer;
pub mod tier;

pub use config::{
    DimensionConfig, ScoringConfig, ScoringConfigError, ScoringDimension, TierThresholds,
};
pub use normalizer::{normalize, DataQualityWarning, NormalizedAnswer};
pub use tier::MaturityTier;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assessment::{AnswerValue, QuestionId, QuestionType, ResponseRecord, SectionId};

/// Stateless calculator applying a scoring configuration to a response set.
#[derive(Debug, Clone)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl ScoreCalculator {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn reference() -> Self {
        Self {
            config: ScoringConfig::reference(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn compute(&self, responses: &[ResponseRecord]) -> Scores {
        self.evaluate(responses).scores
    }

    /// Scores plus the per-question detail and warnings collected on the way.
    pub fn evaluate(&self, responses: &[ResponseRecord]) -> ScoreBreakdown {
        let aggregation = aggregate::aggregate(responses, &self.config);

        let section = |dimension: ScoringDimension| {
            // `new` validated that every dimension is mapped.
            let (section_id, max_points) = self
                .config
                .dimension(dimension)
                .map(|entry| (entry.section_id.clone(), entry.max_points()))
                .unwrap_or_else(|| (SectionId(String::new()), 0));
            let raw_score = aggregation.section_raw.get(&dimension).copied().unwrap_or(0);
            SectionScore {
                section_id,
                raw_score,
                max_points,
                percentage: percentage(raw_score, max_points),
            }
        };

        let governance = section(ScoringDimension::Governance);
        let financial = section(ScoringDimension::Financial);
        let programme = section(ScoringDimension::Programme);
        let human_resources = section(ScoringDimension::HumanResources);

        let raw_score: u32 = aggregation.section_raw.values().sum();
        let max_points = self.config.total_max_points();
        let total = TotalScore {
            raw_score,
            max_points,
            percentage: percentage(raw_score, max_points),
        };
        let maturity_tier = MaturityTier::classify(total.percentage, &self.config.tiers);

        ScoreBreakdown {
            scores: Scores {
                governance,
                financial,
                programme,
                human_resources,
                total,
                maturity_tier,
            },
            answers: aggregation.answers,
            warnings: aggregation.warnings,
        }
    }
}

fn percentage(raw_score: u32, max_points: u32) -> f64 {
    if max_points == 0 {
        return 0.0;
    }
    (f64::from(raw_score) * 100.0 / f64::from(max_points)).clamp(0.0, 100.0)
}

/// Raw and relative score of one scoring dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionScore {
    pub section_id: SectionId,
    pub raw_score: u32,
    pub max_points: u32,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalScore {
    pub raw_score: u32,
    pub max_points: u32,
    pub percentage: f64,
}

/// Derived scores for one assessment's current responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub governance: SectionScore,
    pub financial: SectionScore,
    pub programme: SectionScore,
    pub human_resources: SectionScore,
    pub total: TotalScore,
    pub maturity_tier: MaturityTier,
}

impl Scores {
    pub fn section(&self, dimension: ScoringDimension) -> &SectionScore {
        match dimension {
            ScoringDimension::Governance => &self.governance,
            ScoringDimension::Financial => &self.financial,
            ScoringDimension::Programme => &self.programme,
            ScoringDimension::HumanResources => &self.human_resources,
        }
    }
}

/// Deduplicated answer with its normalized value, kept for question-scoped rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAnswer {
    pub section_id: SectionId,
    pub question_type: QuestionType,
    pub value: AnswerValue,
    pub normalized: f64,
}

#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub scores: Scores,
    pub answers: BTreeMap<QuestionId, ScoredAnswer>,
    pub warnings: Vec<DataQualityWarning>,
}
