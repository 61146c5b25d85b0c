use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{clean, AdoptionId, NewSpecies, SpeciesId, SpeciesInput, UserId};
use crate::error::{GroveError, GroveResult};
use crate::growth;

/// Where an adoption is in its lifecycle.
///
/// Older records spelled these `picked`, `planted` and `confirmed`; those
/// are still read but never written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionStatus {
    #[serde(alias = "picked")]
    PendingConfirmation,
    #[serde(alias = "planted", alias = "confirmed")]
    Active,
    Deleted,
}

impl AdoptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdoptionStatus::PendingConfirmation => "pending_confirmation",
            AdoptionStatus::Active => "active",
            AdoptionStatus::Deleted => "deleted",
        }
    }

    /// pending_confirmation -> active, and either of those -> deleted.
    pub fn can_transition_to(self, next: AdoptionStatus) -> bool {
        use AdoptionStatus::*;
        matches!(
            (self, next),
            (PendingConfirmation, Active) | (PendingConfirmation, Deleted) | (Active, Deleted)
        )
    }
}

impl fmt::Display for AdoptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdoptionStatus {
    type Err = GroveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_confirmation" | "picked" => Ok(AdoptionStatus::PendingConfirmation),
            "active" | "planted" | "confirmed" => Ok(AdoptionStatus::Active),
            "deleted" => Ok(AdoptionStatus::Deleted),
            other => Err(GroveError::Validation(format!("unknown adoption status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    Pending,
    Seedling,
    Young,
    Mature,
}

impl GrowthStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrowthStage::Pending => "pending",
            GrowthStage::Seedling => "seedling",
            GrowthStage::Young => "young",
            GrowthStage::Mature => "mature",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GrowthStage::Pending => "Pending",
            GrowthStage::Seedling => "Seedling",
            GrowthStage::Young => "Young",
            GrowthStage::Mature => "Mature",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            GrowthStage::Pending | GrowthStage::Seedling => "🌱",
            GrowthStage::Young => "🌿",
            GrowthStage::Mature => "🌳",
        }
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GrowthStage {
    type Err = GroveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(GrowthStage::Pending),
            "seedling" => Ok(GrowthStage::Seedling),
            "young" | "young tree" => Ok(GrowthStage::Young),
            "mature" => Ok(GrowthStage::Mature),
            other => Err(GroveError::Validation(format!("unknown growth stage: {other}"))),
        }
    }
}

/// One user's claim on one tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adoption {
    pub id: AdoptionId,
    pub user_id: UserId,
    pub species_id: Option<SpeciesId>,
    pub status: AdoptionStatus,
    pub growth_stage: GrowthStage,
    pub adopted_at: DateTime<Utc>,
    pub planted_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub nickname: Option<String>,
    /// Bumped on every write; stores only accept a write whose
    /// predecessor revision is still current.
    pub revision: u64,
}

impl Adoption {
    /// A fresh adoption awaiting planting.
    pub fn new(
        id: AdoptionId,
        user_id: UserId,
        species_id: Option<SpeciesId>,
        details: AdoptionDetails,
        adopted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            species_id,
            status: AdoptionStatus::PendingConfirmation,
            growth_stage: GrowthStage::Pending,
            adopted_at,
            planted_at: None,
            location: details.location,
            nickname: details.nickname,
            revision: 0,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == AdoptionStatus::Deleted
    }

    pub fn is_active(&self) -> bool {
        self.status == AdoptionStatus::Active
    }

    /// `planted_at` when planted, `adopted_at` otherwise.
    pub fn reference_date(&self) -> DateTime<Utc> {
        self.planted_at.unwrap_or(self.adopted_at)
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        growth::age_days(self.reference_date(), now)
    }

    pub fn stage_at(&self, now: DateTime<Utc>) -> GrowthStage {
        growth::growth_stage(self.planted_at, now)
    }

    /// Deleted adoptions are invisible; others belong to exactly one user.
    pub fn check_access(&self, user_id: UserId) -> GroveResult<()> {
        if self.is_deleted() {
            return Err(GroveError::not_found("adoption", self.id));
        }
        if self.user_id != user_id {
            return Err(GroveError::Authorization(format!(
                "adoption {} belongs to another user",
                self.id
            )));
        }
        Ok(())
    }

    fn transition(&self, next: AdoptionStatus) -> GroveResult<Adoption> {
        if !self.status.can_transition_to(next) {
            return Err(GroveError::Conflict(format!(
                "adoption {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        Ok(Adoption {
            status: next,
            revision: self.revision + 1,
            ..self.clone()
        })
    }

    /// Planting confirmation. Rejected once already active.
    pub fn confirm(&self, now: DateTime<Utc>) -> GroveResult<Adoption> {
        let mut next = self.transition(AdoptionStatus::Active)?;
        next.planted_at = Some(now);
        next.growth_stage = next.stage_at(now);
        Ok(next)
    }

    pub fn delete(&self) -> GroveResult<Adoption> {
        self.transition(AdoptionStatus::Deleted)
    }

    pub fn apply_edit(&self, edit: &AdoptionEdit) -> Adoption {
        let mut next = self.clone();
        if let Some(location) = &edit.location {
            next.location = clean(Some(location.clone()));
        }
        if let Some(nickname) = &edit.nickname {
            next.nickname = clean(Some(nickname.clone()));
        }
        next.revision += 1;
        next
    }

    /// The adoption with its stage recomputed for `now`, if that changes it.
    pub fn refresh(&self, now: DateTime<Utc>) -> Option<Adoption> {
        let stage = self.stage_at(now);
        (stage != self.growth_stage).then(|| Adoption {
            growth_stage: stage,
            revision: self.revision + 1,
            ..self.clone()
        })
    }
}

/// Display fields supplied at adoption time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdoptionDetails {
    pub location: Option<String>,
    pub nickname: Option<String>,
}

/// Which species an adoption refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeciesChoice {
    Existing(SpeciesId),
    /// Reused if a species with this name already exists.
    New(NewSpecies),
}

/// Adoption payload. Exactly one of `species_id` and `species` is required.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdoptRequest {
    #[serde(default)]
    pub species_id: Option<SpeciesId>,
    #[serde(default)]
    pub species: Option<SpeciesInput>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl AdoptRequest {
    pub fn validate(self) -> GroveResult<(SpeciesChoice, AdoptionDetails)> {
        let choice = match (self.species_id, self.species) {
            (Some(id), None) => SpeciesChoice::Existing(id),
            (None, Some(input)) => SpeciesChoice::New(input.validate()?),
            (Some(_), Some(_)) => {
                return Err(GroveError::validation("give either species_id or species, not both"))
            }
            (None, None) => return Err(GroveError::validation("species_id or species is required")),
        };
        Ok((
            choice,
            AdoptionDetails {
                location: clean(self.location),
                nickname: clean(self.nickname),
            },
        ))
    }
}

/// Partial update of display fields. An empty string clears the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdoptionEdit {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn pending() -> Adoption {
        Adoption::new(1, 7, Some(3), AdoptionDetails::default(), t0())
    }

    #[test]
    fn new_adoption_awaits_planting() {
        let a = pending();
        assert_eq!(a.status, AdoptionStatus::PendingConfirmation);
        assert_eq!(a.growth_stage, GrowthStage::Pending);
        assert!(a.planted_at.is_none());
    }

    #[test]
    fn confirm_sets_planted_at_once() {
        let planted = pending().confirm(t0() + Duration::days(5)).unwrap();
        assert_eq!(planted.status, AdoptionStatus::Active);
        assert_eq!(planted.planted_at, Some(t0() + Duration::days(5)));
        assert_eq!(planted.growth_stage, GrowthStage::Seedling);
        assert_eq!(planted.revision, 1);

        let again = planted.confirm(t0() + Duration::days(9));
        assert!(matches!(again, Err(GroveError::Conflict(_))));
    }

    #[test]
    fn deleted_is_terminal() {
        let deleted = pending().delete().unwrap();
        assert!(matches!(deleted.delete(), Err(GroveError::Conflict(_))));
        assert!(matches!(deleted.confirm(t0()), Err(GroveError::Conflict(_))));
        assert!(matches!(deleted.check_access(7), Err(GroveError::NotFound(_))));
    }

    #[test]
    fn access_is_owner_only() {
        let a = pending();
        assert!(a.check_access(7).is_ok());
        assert!(matches!(a.check_access(8), Err(GroveError::Authorization(_))));
    }

    #[test]
    fn refresh_only_reports_changes() {
        let planted = pending().confirm(t0()).unwrap();
        assert!(planted.refresh(t0() + Duration::days(10)).is_none());

        let young = planted.refresh(t0() + Duration::days(30)).unwrap();
        assert_eq!(young.growth_stage, GrowthStage::Young);
        assert_eq!(young.revision, planted.revision + 1);
    }

    #[test]
    fn edit_clears_with_empty_string() {
        let a = Adoption {
            nickname: Some("Shade".into()),
            ..pending()
        };
        let edited = a.apply_edit(&AdoptionEdit {
            location: Some("Nairobi, Kenya".into()),
            nickname: Some("".into()),
        });
        assert_eq!(edited.location.as_deref(), Some("Nairobi, Kenya"));
        assert_eq!(edited.nickname, None);
    }

    #[test]
    fn legacy_status_spellings_are_read() {
        let status: AdoptionStatus = serde_json::from_str("\"planted\"").unwrap();
        assert_eq!(status, AdoptionStatus::Active);
        assert_eq!("picked".parse::<AdoptionStatus>().unwrap(), AdoptionStatus::PendingConfirmation);
        assert!("archived".parse::<AdoptionStatus>().is_err());
        assert_eq!(serde_json::to_string(&AdoptionStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn adopt_request_needs_exactly_one_species() {
        let neither = AdoptRequest::default().validate();
        assert!(matches!(neither, Err(GroveError::Validation(_))));

        let both = AdoptRequest {
            species_id: Some(1),
            species: Some(SpeciesInput::named("Acacia", 22.5)),
            ..Default::default()
        }
        .validate();
        assert!(matches!(both, Err(GroveError::Validation(_))));
    }

    #[test]
    fn adopt_request_rejects_unknown_keys() {
        let parsed = serde_json::from_str::<AdoptRequest>(r#"{"species_id": 1, "colour": "green"}"#);
        assert!(parsed.is_err());
    }
}
