use serde::{Deserialize, Serialize};

use super::{clean, SpeciesId};
use crate::error::{GroveError, GroveResult};

/// Catalog entry for a kind of tree. Shared by every adoption that
/// references it; identity is the species name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeSpecies {
    pub id: SpeciesId,
    pub species_name: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    /// kg of CO2 per year.
    pub avg_co2_absorption: f64,
    pub suitable_regions: Vec<String>,
    pub sunlight_requirement: Option<String>,
    pub water_needs: Option<String>,
    pub drought_resistant: bool,
    pub growth_rate: Option<String>,
    pub mature_height_meters: Option<f64>,
}

impl TreeSpecies {
    /// Exact, case-sensitive membership in `suitable_regions`.
    pub fn suits_region(&self, region: &str) -> bool {
        self.suitable_regions.iter().any(|r| r == region)
    }
}

/// Species data that passed validation. The store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSpecies {
    pub species_name: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    pub avg_co2_absorption: f64,
    pub suitable_regions: Vec<String>,
    pub sunlight_requirement: Option<String>,
    pub water_needs: Option<String>,
    pub drought_resistant: bool,
    pub growth_rate: Option<String>,
    pub mature_height_meters: Option<f64>,
}

impl NewSpecies {
    pub fn into_species(self, id: SpeciesId) -> TreeSpecies {
        TreeSpecies {
            id,
            species_name: self.species_name,
            scientific_name: self.scientific_name,
            description: self.description,
            avg_co2_absorption: self.avg_co2_absorption,
            suitable_regions: self.suitable_regions,
            sunlight_requirement: self.sunlight_requirement,
            water_needs: self.water_needs,
            drought_resistant: self.drought_resistant,
            growth_rate: self.growth_rate,
            mature_height_meters: self.mature_height_meters,
        }
    }
}

/// A numeric field as callers send it: a number, or text like "22.5 kg/year".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

impl Measure {
    pub fn value(&self) -> Option<f64> {
        match self {
            Measure::Number(n) if n.is_finite() => Some(*n),
            Measure::Number(_) => None,
            Measure::Text(raw) => sanitize_numeric(raw).parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl From<f64> for Measure {
    fn from(n: f64) -> Self {
        Measure::Number(n)
    }
}

/// Keep digits, the decimal point and the sign; drop units and prose.
pub fn sanitize_numeric(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

/// Species data as submitted with an adoption.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SpeciesInput {
    #[serde(default)]
    pub species_name: Option<String>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avg_co2_absorption: Option<Measure>,
    #[serde(default)]
    pub suitable_regions: Vec<String>,
    #[serde(default)]
    pub sunlight_requirement: Option<String>,
    #[serde(default)]
    pub water_needs: Option<String>,
    #[serde(default)]
    pub drought_resistant: bool,
    #[serde(default)]
    pub growth_rate: Option<String>,
    #[serde(default)]
    pub mature_height_meters: Option<Measure>,
}

impl SpeciesInput {
    pub fn named(name: impl Into<String>, co2_per_year: f64) -> Self {
        Self {
            species_name: Some(name.into()),
            avg_co2_absorption: Some(Measure::Number(co2_per_year)),
            ..Default::default()
        }
    }

    /// Name and CO2 rate are required; height degrades to `None` when unparsable.
    pub fn validate(self) -> GroveResult<NewSpecies> {
        let species_name =
            clean(self.species_name).ok_or_else(|| GroveError::validation("species name is required"))?;

        let avg_co2_absorption = match self.avg_co2_absorption {
            None => {
                return Err(GroveError::Validation(format!(
                    "CO2 absorption is required for {species_name}"
                )))
            }
            Some(measure) => measure.value().ok_or_else(|| {
                GroveError::Validation(format!("CO2 absorption for {species_name} is not a number"))
            })?,
        };
        if avg_co2_absorption < 0.0 {
            return Err(GroveError::Validation(format!(
                "CO2 absorption for {species_name} cannot be negative"
            )));
        }

        let mature_height_meters = self
            .mature_height_meters
            .and_then(|m| m.value())
            .filter(|h| *h >= 0.0);

        let suitable_regions = self
            .suitable_regions
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        Ok(NewSpecies {
            species_name,
            scientific_name: clean(self.scientific_name),
            description: clean(self.description),
            avg_co2_absorption,
            suitable_regions,
            sunlight_requirement: clean(self.sunlight_requirement),
            water_needs: clean(self.water_needs),
            drought_resistant: self.drought_resistant,
            growth_rate: clean(self.growth_rate),
            mature_height_meters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_is_sanitized() {
        assert_eq!(Measure::Text("22.5 kg/year".into()).value(), Some(22.5));
        assert_eq!(Measure::Text("15 m".into()).value(), Some(15.0));
        assert_eq!(Measure::Text("tall".into()).value(), None);
    }

    #[test]
    fn missing_name_is_rejected() {
        let input = SpeciesInput {
            species_name: Some("   ".into()),
            avg_co2_absorption: Some(10.0.into()),
            ..Default::default()
        };
        assert!(matches!(input.validate(), Err(GroveError::Validation(_))));
    }

    #[test]
    fn negative_or_garbled_co2_is_rejected() {
        let negative = SpeciesInput::named("Acacia", -1.0);
        assert!(matches!(negative.validate(), Err(GroveError::Validation(_))));

        let garbled = SpeciesInput {
            species_name: Some("Acacia".into()),
            avg_co2_absorption: Some(Measure::Text("lots".into())),
            ..Default::default()
        };
        assert!(matches!(garbled.validate(), Err(GroveError::Validation(_))));
    }

    #[test]
    fn bad_height_falls_back_to_none() {
        let input = SpeciesInput {
            mature_height_meters: Some(Measure::Text("very tall".into())),
            suitable_regions: vec!["Nairobi".into(), " ".into()],
            ..SpeciesInput::named("Acacia", 22.5)
        };
        let species = input.validate().unwrap();
        assert_eq!(species.mature_height_meters, None);
        assert_eq!(species.suitable_regions, vec!["Nairobi".to_string()]);
    }

    #[test]
    fn region_match_is_exact() {
        let species = SpeciesInput {
            suitable_regions: vec!["Nairobi".into(), "Kisumu".into()],
            ..SpeciesInput::named("Acacia", 22.5)
        }
        .validate()
        .unwrap()
        .into_species(1);
        assert!(species.suits_region("Nairobi"));
        assert!(!species.suits_region("Nair"));
        assert!(!species.suits_region("nairobi"));
    }
}
