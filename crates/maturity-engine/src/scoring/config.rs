use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::assessment::SectionId;

pub(crate) const POINTS_PER_QUESTION: u32 = 5;

/// Fixed scoring dimensions reported for every assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringDimension {
    Governance,
    Financial,
    Programme,
    HumanResources,
}

impl ScoringDimension {
    pub const ALL: [ScoringDimension; 4] = [
        ScoringDimension::Governance,
        ScoringDimension::Financial,
        ScoringDimension::Programme,
        ScoringDimension::HumanResources,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ScoringDimension::Governance => "Governance",
            ScoringDimension::Financial => "Financial",
            ScoringDimension::Programme => "Programme",
            ScoringDimension::HumanResources => "Human Resources",
        }
    }
}

/// Binds a live section identifier to a scoring dimension and its fixed maximum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionConfig {
    pub dimension: ScoringDimension,
    pub section_id: SectionId,
    pub max_questions: u32,
}

impl DimensionConfig {
    pub fn max_points(&self) -> u32 {
        self.max_questions * POINTS_PER_QUESTION
    }
}

/// Upper bounds (inclusive, in total percentage) of the lower two maturity tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub emerging_max: f64,
    pub strong_max: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            emerging_max: 40.0,
            strong_max: 79.0,
        }
    }
}

/// Scoring configuration injected into the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub dimensions: Vec<DimensionConfig>,
    #[serde(default)]
    pub tiers: TierThresholds,
}

impl ScoringConfig {
    /// Reference questionnaire: 23 governance, 10 financial, 6 programme and 4 HR questions.
    pub fn reference() -> Self {
        let dimension = |dimension, section: &str, max_questions| DimensionConfig {
            dimension,
            section_id: SectionId(section.to_string()),
            max_questions,
        };

        Self {
            dimensions: vec![
                dimension(ScoringDimension::Governance, "governance-section", 23),
                dimension(ScoringDimension::Financial, "financial-section", 10),
                dimension(ScoringDimension::Programme, "programme-section", 6),
                dimension(ScoringDimension::HumanResources, "human-resources-section", 4),
            ],
            tiers: TierThresholds::default(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScoringConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ScoringConfigError> {
        let config: ScoringConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringConfigError> {
        for dimension in ScoringDimension::ALL {
            let count = self
                .dimensions
                .iter()
                .filter(|entry| entry.dimension == dimension)
                .count();
            if count != 1 {
                return Err(ScoringConfigError::DimensionMapping { dimension, count });
            }
        }

        let mut seen = HashSet::new();
        for entry in &self.dimensions {
            if !seen.insert(&entry.section_id) {
                return Err(ScoringConfigError::DuplicateSection(entry.section_id.clone()));
            }
        }

        let TierThresholds {
            emerging_max,
            strong_max,
        } = self.tiers;
        if !(0.0..=100.0).contains(&emerging_max)
            || !(0.0..=100.0).contains(&strong_max)
            || emerging_max >= strong_max
        {
            return Err(ScoringConfigError::Thresholds {
                emerging_max,
                strong_max,
            });
        }

        Ok(())
    }

    pub fn dimension(&self, dimension: ScoringDimension) -> Option<&DimensionConfig> {
        self.dimensions
            .iter()
            .find(|entry| entry.dimension == dimension)
    }

    pub fn dimension_for_section(&self, section_id: &SectionId) -> Option<&DimensionConfig> {
        self.dimensions
            .iter()
            .find(|entry| &entry.section_id == section_id)
    }

    pub fn total_max_points(&self) -> u32 {
        self.dimensions.iter().map(DimensionConfig::max_points).sum()
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringConfigError {
    #[error("failed to read scoring configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scoring configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dimension {dimension:?} must be mapped exactly once (found {count})")]
    DimensionMapping {
        dimension: ScoringDimension,
        count: usize,
    },
    #[error("section {0} mapped to more than one dimension")]
    DuplicateSection(SectionId),
    #[error("tier thresholds must satisfy 0 <= emerging ({emerging_max}) < strong ({strong_max}) <= 100")]
    Thresholds { emerging_max: f64, strong_max: f64 },
}
