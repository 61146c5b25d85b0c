//! Demo data: one user with one Acacia, adopted 20 days ago and planted
//! five days later.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use grove_core::models::{AdoptRequest, AdoptionId, NewUser, SpeciesInput, UserId};
use grove_core::{FixedClock, GroveError};
use grove_daemon::{AdoptionLedger, Store, UserDirectory};
use serde::Serialize;
use tracing::info;

pub const SEED_EMAIL: &str = "test@example.com";

#[derive(Debug, Serialize, PartialEq)]
pub struct SeedReport {
    pub user_id: UserId,
    pub adoption_id: AdoptionId,
}

/// Returns `None` when the demo user already exists.
pub async fn seed(store: Arc<dyn Store>, now: DateTime<Utc>) -> Result<Option<SeedReport>, GroveError> {
    let clock = Arc::new(FixedClock::new(now - Duration::days(20)));
    let users = UserDirectory::new(store.clone(), clock.clone());
    let ledger = AdoptionLedger::new(store, clock.clone());

    let user = match users
        .register(NewUser {
            name: Some("group6".into()),
            email: Some(SEED_EMAIL.into()),
            region: Some("Nairobi".into()),
        })
        .await
    {
        Ok(user) => user,
        Err(GroveError::Conflict(_)) => {
            info!("demo data already present");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    let acacia = SpeciesInput {
        scientific_name: Some("Acacia tortilis".into()),
        description: Some("Umbrella thorn acacia, native to East African savannah.".into()),
        suitable_regions: vec!["Nairobi".into(), "Kajiado".into(), "Machakos".into()],
        sunlight_requirement: Some("full sun".into()),
        water_needs: Some("low".into()),
        drought_resistant: true,
        growth_rate: Some("moderate".into()),
        mature_height_meters: Some(12.0.into()),
        ..SpeciesInput::named("Acacia", 22.5)
    };
    let adoption = ledger
        .adopt(
            user.id,
            AdoptRequest {
                species: Some(acacia),
                location: Some("Nairobi, Kenya".into()),
                ..Default::default()
            },
        )
        .await?;

    clock.set(now - Duration::days(15));
    ledger.confirm_planting(user.id, adoption.id).await?;

    info!(user = user.id, adoption = adoption.id, "demo data seeded");
    Ok(Some(SeedReport {
        user_id: user.id,
        adoption_id: adoption.id,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use grove_core::models::{AdoptionStatus, GrowthStage};
    use grove_daemon::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn seeded_tree_is_a_two_week_old_seedling() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();

        let report = seed(store.clone(), now).await.unwrap().unwrap();

        let ledger = AdoptionLedger::new(store.clone(), Arc::new(FixedClock::new(now)));
        let trees = ledger.list_for_user(report.user_id).await.unwrap();
        assert_eq!(trees.len(), 1);
        let tree = &trees[0];
        assert_eq!(tree.id, report.adoption_id);
        assert_eq!(tree.status, AdoptionStatus::Active);
        assert_eq!(tree.growth_stage, GrowthStage::Seedling);
        assert_eq!(tree.days_since_planted, Some(15));
        assert_eq!(tree.location.as_deref(), Some("Nairobi, Kenya"));
        assert_eq!(tree.total_carbon_offset, 0.92);
    }

    #[tokio::test]
    async fn seeding_twice_changes_nothing() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let now = Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap();

        assert!(seed(store.clone(), now).await.unwrap().is_some());
        assert_eq!(seed(store.clone(), now).await.unwrap(), None);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
        assert_eq!(store.list_species().await.unwrap().len(), 1);
    }
}
