//! Time-derived metrics: age, growth stage, progress and carbon offset.

use chrono::{DateTime, Utc};

use crate::models::{Adoption, GrowthStage, TreeSpecies};

/// Trees younger than this are seedlings.
pub const YOUNG_AFTER_DAYS: i64 = 30;
/// Trees this old or older are mature.
pub const MATURE_AFTER_DAYS: i64 = 365;
/// Progress reaches 100% after three years.
pub const MATURITY_HORIZON_DAYS: i64 = 1095;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Whole days from `reference` to `now`, never negative.
pub fn age_days(reference: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - reference).num_days().max(0)
}

pub fn stage_for_age(age_days: i64) -> GrowthStage {
    if age_days < YOUNG_AFTER_DAYS {
        GrowthStage::Seedling
    } else if age_days < MATURE_AFTER_DAYS {
        GrowthStage::Young
    } else {
        GrowthStage::Mature
    }
}

/// Unplanted trees stay `Pending`; planted ones are staged by age.
pub fn growth_stage(planted_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> GrowthStage {
    match planted_at {
        Some(planted) => stage_for_age(age_days(planted, now)),
        None => GrowthStage::Pending,
    }
}

/// Percentage of the maturity horizon, one decimal, capped at 100.
pub fn progress_percentage(age_days: i64) -> f64 {
    let pct = age_days.max(0) as f64 / MATURITY_HORIZON_DAYS as f64 * 100.0;
    ((pct * 10.0).round() / 10.0).min(100.0)
}

/// kg of CO2 absorbed since planting. Zero before planting or without a species.
pub fn carbon_offset(adoption: &Adoption, species: Option<&TreeSpecies>, now: DateTime<Utc>) -> f64 {
    match (adoption.planted_at, species) {
        (Some(planted), Some(species)) => {
            species.avg_co2_absorption * (age_days(planted, now) as f64 / DAYS_PER_YEAR)
        }
        _ => 0.0,
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
