//! Prompts handed to the text generator.

use chrono::{DateTime, Utc};

use crate::growth;
use crate::models::{Adoption, GrowthStage, InsightType, TreeSpecies};

/// What an insight prompt says about one adoption.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightPrompt {
    pub species_name: String,
    pub scientific_name: Option<String>,
    pub growth_stage: GrowthStage,
    /// kg, rounded to 2 decimals.
    pub co2_offset: f64,
    pub age_days: i64,
    pub insight_type: InsightType,
}

impl InsightPrompt {
    pub fn for_adoption(
        adoption: &Adoption,
        species: Option<&TreeSpecies>,
        insight_type: InsightType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            species_name: species
                .map(|s| s.species_name.clone())
                .or_else(|| adoption.nickname.clone())
                .unwrap_or_else(|| "tree".to_string()),
            scientific_name: species.and_then(|s| s.scientific_name.clone()),
            growth_stage: adoption.stage_at(now),
            co2_offset: growth::round2(growth::carbon_offset(adoption, species, now)),
            age_days: adoption.age_days(now),
            insight_type,
        }
    }

    pub fn render(&self) -> String {
        let ask = match self.insight_type {
            InsightType::GrowthUpdate => "Write a short, encouraging update on how this tree is growing.",
            InsightType::CarbonSummary => "Explain in two sentences what this CO2 offset means in everyday terms.",
            InsightType::CareTip => "Give one practical care tip for a tree at this stage.",
            InsightType::SpeciesSuggestion => "Suggest one companion species that would grow well next to it.",
        };
        format!(
            "[{tag}] Tree: {name} ({scientific}). Growth stage: {stage}. Age: {age} days. \
             CO2 offset so far: {co2:.2} kg. {ask} Keep it under 80 words.",
            tag = self.insight_type,
            name = self.species_name,
            scientific = self.scientific_name.as_deref().unwrap_or("unknown species"),
            stage = self.growth_stage,
            age = self.age_days,
            co2 = self.co2_offset,
        )
    }

    /// Composed locally when the generator is unavailable.
    pub fn fallback_message(&self) -> String {
        format!(
            "Your {} is at the {} stage and has offset about {:.2} kg of CO2 so far.",
            self.species_name,
            self.growth_stage.label().to_lowercase(),
            self.co2_offset
        )
    }
}

pub fn suggestion_prompt(region: &str) -> String {
    format!(
        "List 3 drought-resistant trees suitable for {region} in JSON format. \
         Return a JSON array of objects with the keys species_name, scientific_name, \
         avg_co2_absorption (kg per year) and description."
    )
}
