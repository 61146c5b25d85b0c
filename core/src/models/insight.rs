use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdoptionId, InsightId, SpeciesId, UserId};
use crate::error::GroveError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    GrowthUpdate,
    CarbonSummary,
    CareTip,
    SpeciesSuggestion,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::GrowthUpdate => "growth_update",
            InsightType::CarbonSummary => "carbon_summary",
            InsightType::CareTip => "care_tip",
            InsightType::SpeciesSuggestion => "species_suggestion",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InsightType {
    type Err = GroveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "growth_update" => Ok(InsightType::GrowthUpdate),
            "carbon_summary" => Ok(InsightType::CarbonSummary),
            "care_tip" => Ok(InsightType::CareTip),
            "species_suggestion" => Ok(InsightType::SpeciesSuggestion),
            other => Err(GroveError::Validation(format!("unknown insight type: {other}"))),
        }
    }
}

/// Generated text about a user's trees. Only `is_read` ever changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsight {
    pub id: InsightId,
    pub user_id: UserId,
    pub species_id: Option<SpeciesId>,
    pub adoption_id: Option<AdoptionId>,
    pub insight_type: InsightType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInsight {
    pub user_id: UserId,
    pub species_id: Option<SpeciesId>,
    pub adoption_id: Option<AdoptionId>,
    pub insight_type: InsightType,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NewInsight {
    pub fn into_insight(self, id: InsightId) -> AiInsight {
        AiInsight {
            id,
            user_id: self.user_id,
            species_id: self.species_id,
            adoption_id: self.adoption_id,
            insight_type: self.insight_type,
            message: self.message,
            is_read: false,
            created_at: self.created_at,
        }
    }
}

/// Request for a new insight about one adoption.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InsightRequest {
    pub adoption_id: AdoptionId,
    #[serde(default = "default_insight_type")]
    pub insight_type: InsightType,
}

fn default_insight_type() -> InsightType {
    InsightType::GrowthUpdate
}
