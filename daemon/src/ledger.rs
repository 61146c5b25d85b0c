//! Adoption operations for one user at a time.
//!
//! Every write is read, validate, compare-and-swap. A lost swap means
//! another request changed the adoption in between; we re-read and
//! validate again, so the loser sees the winner's state (e.g. a second
//! confirmation turns into a conflict).

use std::collections::HashMap;
use std::sync::Arc;

use grove_core::models::{
	AdoptRequest, Adoption, AdoptionEdit, AdoptionId, AdoptionView, NewSpecies, SpeciesId, TreeSpecies,
	UserId, UserSummary,
};
use grove_core::{growth, Clock, GroveError, GroveResult};
use tracing::{debug, info, warn};

use crate::store::{AdoptionFilter, Store};

const MAX_SWAP_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct AdoptionLedger {
	store: Arc<dyn Store>,
	clock: Arc<dyn Clock>,
}

impl AdoptionLedger {
	pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
		Self { store, clock }
	}

	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	// =========================================================================
	// Reads
	// =========================================================================

	/// Non-deleted adoptions in id order, each restaged for now. Stage
	/// changes are written back before the views are returned.
	pub async fn list_for_user(&self, user_id: UserId) -> GroveResult<Vec<AdoptionView>> {
		let now = self.clock.now();
		let adoptions = self.store.list_adoptions(AdoptionFilter::for_user(user_id)).await?;
		let mut catalog = SpeciesCache::default();

		let mut views = Vec::with_capacity(adoptions.len());
		for adoption in adoptions {
			let adoption = self.persist_refresh(adoption, now).await?;
			let species = catalog.get(self.store.as_ref(), adoption.species_id).await?;
			views.push(AdoptionView::build(&adoption, species.as_ref(), now));
		}
		Ok(views)
	}

	/// A single adoption, restaged like [`Self::list_for_user`].
	pub async fn get(&self, user_id: UserId, adoption_id: AdoptionId) -> GroveResult<AdoptionView> {
		let now = self.clock.now();
		let adoption = self.load_owned(user_id, adoption_id).await?;
		let adoption = self.persist_refresh(adoption, now).await?;
		let species = self.species_of(&adoption).await?;
		Ok(AdoptionView::build(&adoption, species.as_ref(), now))
	}

	/// The whole catalog, or only species listing `region` among their
	/// suitable regions.
	pub async fn available_species(&self, region: Option<&str>) -> GroveResult<Vec<TreeSpecies>> {
		let all = self.store.list_species().await?;
		Ok(match region.map(str::trim).filter(|r| !r.is_empty()) {
			Some(region) => all.into_iter().filter(|s| s.suits_region(region)).collect(),
			None => all,
		})
	}

	pub async fn find_or_create_species(&self, species: NewSpecies) -> GroveResult<TreeSpecies> {
		Ok(self.store.find_or_create_species(species).await?)
	}

	pub async fn user_summary(&self, user_id: UserId) -> GroveResult<UserSummary> {
		let user = self
			.store
			.get_user(user_id)
			.await?
			.ok_or_else(|| GroveError::not_found("user", user_id))?;
		let now = self.clock.now();
		let adoptions = self.store.list_adoptions(AdoptionFilter::for_user(user_id)).await?;
		let mut catalog = SpeciesCache::default();

		let mut total = 0.0;
		for adoption in &adoptions {
			let species = catalog.get(self.store.as_ref(), adoption.species_id).await?;
			total += growth::carbon_offset(adoption, species.as_ref(), now);
		}

		Ok(UserSummary {
			user_id,
			name: user.name,
			tree_count: adoptions.len(),
			active_trees: adoptions.iter().filter(|a| a.is_active()).count(),
			total_co2_offset: growth::round2(total),
		})
	}

	// =========================================================================
	// Writes
	// =========================================================================

	pub async fn adopt(&self, user_id: UserId, request: AdoptRequest) -> GroveResult<AdoptionView> {
		let (choice, details) = request.validate()?;
		if self.store.get_user(user_id).await?.is_none() {
			return Err(GroveError::not_found("user", user_id));
		}

		let now = self.clock.now();
		let (adoption, species) = self.store.create_adoption(user_id, choice, details, now).await?;
		info!(
			adoption = adoption.id,
			user = user_id,
			species = %species.species_name,
			"tree adopted"
		);
		Ok(AdoptionView::build(&adoption, Some(&species), now))
	}

	pub async fn confirm_planting(&self, user_id: UserId, adoption_id: AdoptionId) -> GroveResult<AdoptionView> {
		let now = self.clock.now();
		let adoption = self.mutate(user_id, adoption_id, |a| a.confirm(now)).await?;
		info!(adoption = adoption_id, user = user_id, "planting confirmed");
		let species = self.species_of(&adoption).await?;
		Ok(AdoptionView::build(&adoption, species.as_ref(), now))
	}

	/// Soft delete. The adoption disappears from every later read.
	pub async fn delete(&self, user_id: UserId, adoption_id: AdoptionId) -> GroveResult<()> {
		self.mutate(user_id, adoption_id, |a| a.delete()).await?;
		info!(adoption = adoption_id, user = user_id, "adoption deleted");
		Ok(())
	}

	pub async fn edit(&self, user_id: UserId, adoption_id: AdoptionId, edit: AdoptionEdit) -> GroveResult<AdoptionView> {
		let now = self.clock.now();
		let adoption = self.mutate(user_id, adoption_id, |a| Ok(a.apply_edit(&edit))).await?;
		let species = self.species_of(&adoption).await?;
		Ok(AdoptionView::build(&adoption, species.as_ref(), now))
	}

	// =========================================================================
	// Helpers
	// =========================================================================

	async fn load_owned(&self, user_id: UserId, adoption_id: AdoptionId) -> GroveResult<Adoption> {
		let adoption = self
			.store
			.get_adoption(adoption_id)
			.await?
			.ok_or_else(|| GroveError::not_found("adoption", adoption_id))?;
		adoption.check_access(user_id)?;
		Ok(adoption)
	}

	async fn mutate<F>(&self, user_id: UserId, adoption_id: AdoptionId, change: F) -> GroveResult<Adoption>
	where
		F: Fn(&Adoption) -> GroveResult<Adoption>,
	{
		for attempt in 1..=MAX_SWAP_ATTEMPTS {
			let current = self.load_owned(user_id, adoption_id).await?;
			let next = change(&current)?;
			if self.store.swap_adoption(&next).await? {
				return Ok(next);
			}
			debug!(adoption = adoption_id, attempt, "concurrent write, retrying");
		}
		Err(GroveError::Conflict(format!(
			"adoption {adoption_id} is being modified concurrently"
		)))
	}

	/// Restage and write back if the stage moved. A lost swap leaves the
	/// stored row to whoever won; the caller still sees the fresh stage.
	async fn persist_refresh(&self, adoption: Adoption, now: chrono::DateTime<chrono::Utc>) -> GroveResult<Adoption> {
		let Some(next) = adoption.refresh(now) else {
			return Ok(adoption);
		};
		if self.store.swap_adoption(&next).await? {
			debug!(adoption = next.id, stage = %next.growth_stage, "growth stage advanced");
		} else {
			warn!(adoption = next.id, "growth stage write-back lost a race");
		}
		Ok(next)
	}

	async fn species_of(&self, adoption: &Adoption) -> GroveResult<Option<TreeSpecies>> {
		match adoption.species_id {
			Some(id) => Ok(self.store.get_species(id).await?),
			None => Ok(None),
		}
	}
}

/// Species lookups for one request.
#[derive(Default)]
pub(crate) struct SpeciesCache {
	seen: HashMap<SpeciesId, Option<TreeSpecies>>,
}

impl SpeciesCache {
	pub(crate) async fn get(&mut self, store: &dyn Store, id: Option<SpeciesId>) -> GroveResult<Option<TreeSpecies>> {
		let Some(id) = id else { return Ok(None) };
		if let Some(hit) = self.seen.get(&id) {
			return Ok(hit.clone());
		}
		let found = store.get_species(id).await?;
		self.seen.insert(id, found.clone());
		Ok(found)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use async_trait::async_trait;
	use chrono::{DateTime, Duration, TimeZone, Utc};
	use grove_core::models::{
		AdoptionDetails, AdoptionStatus, AiInsight, GrowthStage, InsightId, NewInsight, NewUser, SpeciesChoice,
		SpeciesInput, User, ValidUser,
	};
	use grove_core::FixedClock;

	use super::*;
	use crate::store::{MemoryStore, StoreError};

	fn t0() -> DateTime<Utc> {
		Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap()
	}

	struct Fixture {
		ledger: AdoptionLedger,
		store: Arc<MemoryStore>,
		clock: Arc<FixedClock>,
	}

	async fn fixture() -> (Fixture, UserId, UserId) {
		let store = Arc::new(MemoryStore::new());
		let clock = Arc::new(FixedClock::new(t0()));
		let mut ids = Vec::new();
		for (name, email) in [("alice", "alice@example.com"), ("bob", "bob@example.com")] {
			let user = NewUser {
				name: Some(name.into()),
				email: Some(email.into()),
				region: Some("Nairobi".into()),
			}
			.validate()
			.unwrap();
			ids.push(store.insert_user(user, t0()).await.unwrap().id);
		}
		let ledger = AdoptionLedger::new(store.clone(), clock.clone());
		(Fixture { ledger, store, clock }, ids[0], ids[1])
	}

	/// Wraps a `MemoryStore` and yields to the scheduler after reading a
	/// user or an adoption, so futures joined in one task interleave
	/// between read and write. With `refuse_swaps` every swap loses.
	struct Contended {
		inner: MemoryStore,
		refuse_swaps: bool,
		lost_swaps: AtomicUsize,
	}

	#[async_trait]
	impl Store for Contended {
		async fn insert_user(&self, user: ValidUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
			self.inner.insert_user(user, created_at).await
		}

		async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
			let user = self.inner.get_user(id).await;
			tokio::task::yield_now().await;
			user
		}

		async fn list_users(&self) -> Result<Vec<User>, StoreError> {
			self.inner.list_users().await
		}

		async fn remove_user(&self, id: UserId) -> Result<bool, StoreError> {
			self.inner.remove_user(id).await
		}

		async fn get_species(&self, id: SpeciesId) -> Result<Option<TreeSpecies>, StoreError> {
			self.inner.get_species(id).await
		}

		async fn find_species(&self, name: &str) -> Result<Option<TreeSpecies>, StoreError> {
			self.inner.find_species(name).await
		}

		async fn list_species(&self) -> Result<Vec<TreeSpecies>, StoreError> {
			self.inner.list_species().await
		}

		async fn find_or_create_species(&self, species: NewSpecies) -> Result<TreeSpecies, StoreError> {
			self.inner.find_or_create_species(species).await
		}

		async fn create_adoption(
			&self,
			user_id: UserId,
			species: SpeciesChoice,
			details: AdoptionDetails,
			adopted_at: DateTime<Utc>,
		) -> Result<(Adoption, TreeSpecies), StoreError> {
			self.inner.create_adoption(user_id, species, details, adopted_at).await
		}

		async fn get_adoption(&self, id: AdoptionId) -> Result<Option<Adoption>, StoreError> {
			let adoption = self.inner.get_adoption(id).await;
			tokio::task::yield_now().await;
			adoption
		}

		async fn list_adoptions(&self, filter: AdoptionFilter) -> Result<Vec<Adoption>, StoreError> {
			self.inner.list_adoptions(filter).await
		}

		async fn swap_adoption(&self, next: &Adoption) -> Result<bool, StoreError> {
			let won = !self.refuse_swaps && self.inner.swap_adoption(next).await?;
			if !won {
				self.lost_swaps.fetch_add(1, Ordering::SeqCst);
			}
			Ok(won)
		}

		async fn insert_insight(&self, insight: NewInsight) -> Result<AiInsight, StoreError> {
			self.inner.insert_insight(insight).await
		}

		async fn get_insight(&self, id: InsightId) -> Result<Option<AiInsight>, StoreError> {
			self.inner.get_insight(id).await
		}

		async fn list_insights(&self, user_id: UserId, unread_only: bool) -> Result<Vec<AiInsight>, StoreError> {
			self.inner.list_insights(user_id, unread_only).await
		}

		async fn mark_insight_read(&self, id: InsightId) -> Result<bool, StoreError> {
			self.inner.mark_insight_read(id).await
		}
	}

	async fn contended(refuse_swaps: bool) -> (AdoptionLedger, Arc<Contended>, Arc<FixedClock>, UserId) {
		let store = Arc::new(Contended {
			inner: MemoryStore::new(),
			refuse_swaps,
			lost_swaps: AtomicUsize::new(0),
		});
		let clock = Arc::new(FixedClock::new(t0()));
		let user = NewUser {
			name: Some("alice".into()),
			email: Some("alice@example.com".into()),
			region: Some("Nairobi".into()),
		}
		.validate()
		.unwrap();
		let alice = store.insert_user(user, t0()).await.unwrap().id;
		let ledger = AdoptionLedger::new(store.clone(), clock.clone());
		(ledger, store, clock, alice)
	}

	fn acacia() -> AdoptRequest {
		AdoptRequest {
			species: Some(SpeciesInput {
				scientific_name: Some("Acacia tortilis".into()),
				suitable_regions: vec!["Nairobi".into(), "Kajiado".into()],
				..SpeciesInput::named("Acacia", 22.5)
			}),
			location: Some("Nairobi, Kenya".into()),
			..Default::default()
		}
	}

	#[tokio::test]
	async fn acacia_lifecycle() {
		let (f, alice, _) = fixture().await;

		let adopted = f.ledger.adopt(alice, acacia()).await.unwrap();
		assert_eq!(adopted.status, AdoptionStatus::PendingConfirmation);
		assert_eq!(adopted.growth_stage, GrowthStage::Pending);
		assert_eq!(adopted.planted_at, None);

		f.clock.advance(Duration::days(5));
		let confirmed = f.ledger.confirm_planting(alice, adopted.id).await.unwrap();
		assert_eq!(confirmed.status, AdoptionStatus::Active);
		assert_eq!(confirmed.planted_at, Some(t0() + Duration::days(5)));

		f.clock.advance(Duration::days(35));
		let listed = f.ledger.list_for_user(alice).await.unwrap();
		assert_eq!(listed.len(), 1);
		assert_eq!(listed[0].growth_stage, GrowthStage::Young);
		assert_eq!(listed[0].total_carbon_offset, 2.16);

		// The stage change was written back.
		let stored = f.store.get_adoption(adopted.id).await.unwrap().unwrap();
		assert_eq!(stored.growth_stage, GrowthStage::Young);
	}

	#[tokio::test]
	async fn listing_twice_is_stable() {
		let (f, alice, _) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger.confirm_planting(alice, a.id).await.unwrap();
		f.clock.advance(Duration::days(400));

		let first = f.ledger.list_for_user(alice).await.unwrap();
		let second = f.ledger.list_for_user(alice).await.unwrap();
		assert_eq!(first, second);
		let ids: Vec<AdoptionId> = first.iter().map(|v| v.id).collect();
		assert_eq!(ids, vec![1, 2]);
	}

	#[tokio::test]
	async fn confirming_someone_elses_tree_changes_nothing() {
		let (f, alice, bob) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();
		let before = f.store.get_adoption(a.id).await.unwrap();

		let err = f.ledger.confirm_planting(bob, a.id).await.unwrap_err();
		assert!(matches!(err, GroveError::Authorization(_)));
		assert_eq!(f.store.get_adoption(a.id).await.unwrap(), before);
	}

	#[tokio::test]
	async fn double_confirm_is_a_conflict() {
		let (f, alice, _) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger.confirm_planting(alice, a.id).await.unwrap();
		let planted_at = f.store.get_adoption(a.id).await.unwrap().unwrap().planted_at;

		f.clock.advance(Duration::days(3));
		let err = f.ledger.confirm_planting(alice, a.id).await.unwrap_err();
		assert!(matches!(err, GroveError::Conflict(_)));
		assert_eq!(f.store.get_adoption(a.id).await.unwrap().unwrap().planted_at, planted_at);
	}

	#[tokio::test]
	async fn concurrent_confirms_have_one_winner() {
		let (f, alice, _) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();

		let (first, second) = tokio::join!(
			f.ledger.confirm_planting(alice, a.id),
			f.ledger.confirm_planting(alice, a.id)
		);
		let outcomes = [first.is_ok(), second.is_ok()];
		assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
		let loser = if first.is_err() { first } else { second };
		assert!(matches!(loser, Err(GroveError::Conflict(_))));
	}

	#[tokio::test]
	async fn interleaved_confirms_retry_then_conflict() {
		let (ledger, store, clock, alice) = contended(false).await;
		let a = ledger.adopt(alice, acacia()).await.unwrap();
		clock.advance(Duration::days(2));

		// Both read revision 0 before either writes.
		let (first, second) = tokio::join!(ledger.confirm_planting(alice, a.id), ledger.confirm_planting(alice, a.id));
		assert_eq!(store.lost_swaps.load(Ordering::SeqCst), 1);
		let winner = first.unwrap();
		assert_eq!(winner.status, AdoptionStatus::Active);
		assert!(matches!(second, Err(GroveError::Conflict(_))));

		let stored = store.inner.get_adoption(a.id).await.unwrap().unwrap();
		assert_eq!(stored.revision, 1);
		assert_eq!(stored.planted_at, Some(t0() + Duration::days(2)));
	}

	#[tokio::test]
	async fn writes_give_up_after_repeated_lost_swaps() {
		let (ledger, store, _, alice) = contended(true).await;
		let a = ledger.adopt(alice, acacia()).await.unwrap();

		let err = ledger.confirm_planting(alice, a.id).await.unwrap_err();
		assert!(matches!(err, GroveError::Conflict(_)));
		assert_eq!(store.lost_swaps.load(Ordering::SeqCst), MAX_SWAP_ATTEMPTS);
		let stored = store.inner.get_adoption(a.id).await.unwrap().unwrap();
		assert_eq!(stored.status, AdoptionStatus::PendingConfirmation);
	}

	#[tokio::test]
	async fn lost_stage_write_back_still_reports_fresh_stage() {
		let (ledger, store, clock, alice) = contended(true).await;
		let a = ledger.adopt(alice, acacia()).await.unwrap();
		let pending = store.inner.get_adoption(a.id).await.unwrap().unwrap();
		assert!(store.inner.swap_adoption(&pending.confirm(t0()).unwrap()).await.unwrap());

		clock.advance(Duration::days(40));
		let listed = ledger.list_for_user(alice).await.unwrap();
		assert_eq!(listed[0].growth_stage, GrowthStage::Young);
		let viewed = ledger.get(alice, a.id).await.unwrap();
		assert_eq!(viewed.growth_stage, GrowthStage::Young);

		assert_eq!(store.lost_swaps.load(Ordering::SeqCst), 2);
		let stored = store.inner.get_adoption(a.id).await.unwrap().unwrap();
		assert_eq!(stored.growth_stage, GrowthStage::Seedling);
	}

	#[tokio::test]
	async fn user_removed_mid_adopt_leaves_no_orphan() {
		let (ledger, store, _, alice) = contended(false).await;

		// adopt sees the user, then the removal lands before the insert.
		let (adopted, removed) = tokio::join!(ledger.adopt(alice, acacia()), store.remove_user(alice));
		assert!(removed.unwrap());
		assert!(matches!(adopted, Err(GroveError::NotFound(_))));

		let all = AdoptionFilter {
			include_deleted: true,
			..Default::default()
		};
		assert!(store.inner.list_adoptions(all).await.unwrap().is_empty());
		assert!(store.inner.list_species().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn delete_hides_and_second_delete_is_not_found() {
		let (f, alice, _) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();

		f.ledger.delete(alice, a.id).await.unwrap();
		assert!(f.ledger.list_for_user(alice).await.unwrap().is_empty());
		assert!(matches!(f.ledger.get(alice, a.id).await, Err(GroveError::NotFound(_))));
		assert!(matches!(f.ledger.delete(alice, a.id).await, Err(GroveError::NotFound(_))));
		assert!(matches!(f.ledger.delete(alice, 999).await, Err(GroveError::NotFound(_))));

		let stored = f.store.get_adoption(a.id).await.unwrap().unwrap();
		assert_eq!(stored.status, AdoptionStatus::Deleted);
	}

	#[tokio::test]
	async fn edit_updates_display_fields_only() {
		let (f, alice, bob) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();

		let edit = AdoptionEdit {
			nickname: Some("Shade".into()),
			location: None,
		};
		let view = f.ledger.edit(alice, a.id, edit.clone()).await.unwrap();
		assert_eq!(view.nickname.as_deref(), Some("Shade"));
		assert_eq!(view.location.as_deref(), Some("Nairobi, Kenya"));
		assert_eq!(view.status, AdoptionStatus::PendingConfirmation);

		assert!(matches!(f.ledger.edit(bob, a.id, edit).await, Err(GroveError::Authorization(_))));
	}

	#[tokio::test]
	async fn adopt_validates_before_writing() {
		let (f, alice, _) = fixture().await;

		let missing = AdoptRequest {
			species_id: Some(77),
			..Default::default()
		};
		assert!(matches!(f.ledger.adopt(alice, missing).await, Err(GroveError::NotFound(_))));

		let bad = AdoptRequest {
			species: Some(SpeciesInput::named("", 3.0)),
			..Default::default()
		};
		assert!(matches!(f.ledger.adopt(alice, bad).await, Err(GroveError::Validation(_))));

		assert!(matches!(f.ledger.adopt(404, acacia()).await, Err(GroveError::NotFound(_))));

		assert!(f.store.list_species().await.unwrap().is_empty());
		assert!(f.store.list_adoptions(AdoptionFilter::default()).await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn adopting_by_id_reuses_catalog_entry() {
		let (f, alice, bob) = fixture().await;
		let first = f.ledger.adopt(alice, acacia()).await.unwrap();
		let species_id = first.species_id.unwrap();

		let by_id = AdoptRequest {
			species_id: Some(species_id),
			..Default::default()
		};
		let second = f.ledger.adopt(bob, by_id).await.unwrap();
		assert_eq!(second.species_id, Some(species_id));
		// Same name, new adoption, same species row.
		f.ledger.adopt(bob, acacia()).await.unwrap();
		assert_eq!(f.store.list_species().await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn find_or_create_is_idempotent() {
		let (f, _, _) = fixture().await;
		let neem = || SpeciesInput::named("Neem", 12.0).validate().unwrap();
		let first = f.ledger.find_or_create_species(neem()).await.unwrap();
		let second = f.ledger.find_or_create_species(neem()).await.unwrap();
		assert_eq!(first.id, second.id);
		assert_eq!(f.ledger.available_species(None).await.unwrap().len(), 1);
	}

	#[tokio::test]
	async fn region_filter_is_exact() {
		let (f, alice, _) = fixture().await;
		f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger
			.find_or_create_species(
				SpeciesInput {
					suitable_regions: vec!["Mombasa".into()],
					..SpeciesInput::named("Coconut", 8.0)
				}
				.validate()
				.unwrap(),
			)
			.await
			.unwrap();

		let nairobi = f.ledger.available_species(Some("Nairobi")).await.unwrap();
		assert_eq!(nairobi.len(), 1);
		assert_eq!(nairobi[0].species_name, "Acacia");
		assert!(f.ledger.available_species(Some("Nair")).await.unwrap().is_empty());
		assert_eq!(f.ledger.available_species(Some(" ")).await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn summary_counts_non_deleted_trees() {
		let (f, alice, _) = fixture().await;
		let a = f.ledger.adopt(alice, acacia()).await.unwrap();
		let b = f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger.adopt(alice, acacia()).await.unwrap();
		f.ledger.confirm_planting(alice, a.id).await.unwrap();
		f.ledger.delete(alice, b.id).await.unwrap();
		f.clock.advance(Duration::days(365));

		let summary = f.ledger.user_summary(alice).await.unwrap();
		assert_eq!(summary.tree_count, 2);
		assert_eq!(summary.active_trees, 1);
		assert_eq!(summary.total_co2_offset, 22.5);
	}
}
