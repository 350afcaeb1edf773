use serde::{Deserialize, Serialize};

use super::config::TierThresholds;

/// Ordered classification of an assessment's total percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaturityTier {
    #[serde(rename = "Emerging Organization")]
    Emerging,
    #[serde(rename = "Strong Foundation")]
    StrongFoundation,
    #[serde(rename = "Leading Organization")]
    Leading,
}

impl MaturityTier {
    pub fn classify(total_percentage: f64, thresholds: &TierThresholds) -> Self {
        if total_percentage <= thresholds.emerging_max {
            MaturityTier::Emerging
        } else if total_percentage <= thresholds.strong_max {
            MaturityTier::StrongFoundation
        } else {
            MaturityTier::Leading
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            MaturityTier::Emerging => "Emerging Organization",
            MaturityTier::StrongFoundation => "Strong Foundation",
            MaturityTier::Leading => "Leading Organization",
        }
    }
}

impl std::fmt::Display for MaturityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
