use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Adoption, AdoptionId, AdoptionStatus, GrowthStage, SpeciesId, TreeSpecies};
use crate::growth;

/// An adoption as callers see it, with every metric computed for one instant.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AdoptionView {
    pub id: AdoptionId,
    pub name: String,
    pub nickname: Option<String>,
    pub species_id: Option<SpeciesId>,
    pub scientific_name: Option<String>,
    pub status: AdoptionStatus,
    pub growth_stage: GrowthStage,
    pub stage_label: &'static str,
    pub icon: &'static str,
    pub progress: f64,
    pub age: i64,
    pub adopted_at: DateTime<Utc>,
    pub planted_at: Option<DateTime<Utc>>,
    pub days_since_planted: Option<i64>,
    pub location: Option<String>,
    pub carbon_offset_per_year: f64,
    pub total_carbon_offset: f64,
}

impl AdoptionView {
    pub fn build(adoption: &Adoption, species: Option<&TreeSpecies>, now: DateTime<Utc>) -> Self {
        let age = adoption.age_days(now);
        let stage = adoption.stage_at(now);
        let name = species
            .map(|s| s.species_name.clone())
            .or_else(|| adoption.nickname.clone())
            .unwrap_or_else(|| "Custom tree".to_string());

        Self {
            id: adoption.id,
            name,
            nickname: adoption.nickname.clone(),
            species_id: adoption.species_id,
            scientific_name: species.and_then(|s| s.scientific_name.clone()),
            status: adoption.status,
            growth_stage: stage,
            stage_label: stage.label(),
            icon: stage.icon(),
            progress: growth::progress_percentage(age),
            age,
            adopted_at: adoption.adopted_at,
            planted_at: adoption.planted_at,
            days_since_planted: adoption.planted_at.map(|p| growth::age_days(p, now)),
            location: adoption.location.clone(),
            carbon_offset_per_year: species.map(|s| s.avg_co2_absorption).unwrap_or(0.0),
            total_carbon_offset: growth::round2(growth::carbon_offset(adoption, species, now)),
        }
    }
}
