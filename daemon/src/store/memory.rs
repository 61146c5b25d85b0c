use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grove_core::models::{
	Adoption, AdoptionDetails, AdoptionId, AiInsight, InsightId, NewInsight, NewSpecies, SpeciesChoice,
	SpeciesId, TreeSpecies, User, UserId, ValidUser,
};
use parking_lot::RwLock;

use super::{AdoptionFilter, Store, StoreError};

#[derive(Default)]
struct Tables {
	users: BTreeMap<UserId, User>,
	species: BTreeMap<SpeciesId, TreeSpecies>,
	adoptions: BTreeMap<AdoptionId, Adoption>,
	insights: BTreeMap<InsightId, AiInsight>,
	last_user: u64,
	last_species: u64,
	last_adoption: u64,
	last_insight: u64,
}

impl Tables {
	fn species_by_name(&self, name: &str) -> Option<&TreeSpecies> {
		self.species.values().find(|s| s.species_name == name)
	}

	fn find_or_create_species(&mut self, species: NewSpecies) -> TreeSpecies {
		if let Some(existing) = self.species_by_name(&species.species_name) {
			return existing.clone();
		}
		self.last_species += 1;
		let created = species.into_species(self.last_species);
		self.species.insert(created.id, created.clone());
		created
	}
}

/// Process-local store. Every call holds the lock for its whole
/// read-modify-write, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl Store for MemoryStore {
	async fn insert_user(&self, user: ValidUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
		let mut t = self.tables.write();
		if t.users.values().any(|u| u.email == user.email) {
			return Err(StoreError::Duplicate(format!("user with email {}", user.email)));
		}
		t.last_user += 1;
		let user = user.into_user(t.last_user, created_at);
		t.users.insert(user.id, user.clone());
		Ok(user)
	}

	async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
		Ok(self.tables.read().users.get(&id).cloned())
	}

	async fn list_users(&self) -> Result<Vec<User>, StoreError> {
		Ok(self.tables.read().users.values().cloned().collect())
	}

	async fn remove_user(&self, id: UserId) -> Result<bool, StoreError> {
		let mut t = self.tables.write();
		if t.users.remove(&id).is_none() {
			return Ok(false);
		}
		t.adoptions.retain(|_, a| a.user_id != id);
		t.insights.retain(|_, i| i.user_id != id);
		Ok(true)
	}

	async fn get_species(&self, id: SpeciesId) -> Result<Option<TreeSpecies>, StoreError> {
		Ok(self.tables.read().species.get(&id).cloned())
	}

	async fn find_species(&self, name: &str) -> Result<Option<TreeSpecies>, StoreError> {
		Ok(self.tables.read().species_by_name(name).cloned())
	}

	async fn list_species(&self) -> Result<Vec<TreeSpecies>, StoreError> {
		let mut all: Vec<TreeSpecies> = self.tables.read().species.values().cloned().collect();
		all.sort_by(|a, b| a.species_name.cmp(&b.species_name));
		Ok(all)
	}

	async fn find_or_create_species(&self, species: NewSpecies) -> Result<TreeSpecies, StoreError> {
		Ok(self.tables.write().find_or_create_species(species))
	}

	async fn create_adoption(
		&self,
		user_id: UserId,
		species: SpeciesChoice,
		details: AdoptionDetails,
		adopted_at: DateTime<Utc>,
	) -> Result<(Adoption, TreeSpecies), StoreError> {
		let mut t = self.tables.write();
		if !t.users.contains_key(&user_id) {
			return Err(StoreError::Missing(format!("user {user_id}")));
		}
		let species = match species {
			SpeciesChoice::Existing(id) => t
				.species
				.get(&id)
				.cloned()
				.ok_or_else(|| StoreError::Missing(format!("species {id}")))?,
			SpeciesChoice::New(new) => t.find_or_create_species(new),
		};
		t.last_adoption += 1;
		let adoption = Adoption::new(t.last_adoption, user_id, Some(species.id), details, adopted_at);
		t.adoptions.insert(adoption.id, adoption.clone());
		Ok((adoption, species))
	}

	async fn get_adoption(&self, id: AdoptionId) -> Result<Option<Adoption>, StoreError> {
		Ok(self.tables.read().adoptions.get(&id).cloned())
	}

	async fn list_adoptions(&self, filter: AdoptionFilter) -> Result<Vec<Adoption>, StoreError> {
		Ok(self
			.tables
			.read()
			.adoptions
			.values()
			.filter(|a| filter.matches(a))
			.cloned()
			.collect())
	}

	async fn swap_adoption(&self, next: &Adoption) -> Result<bool, StoreError> {
		let mut t = self.tables.write();
		let Some(current) = t.adoptions.get_mut(&next.id) else {
			return Err(StoreError::Missing(format!("adoption {}", next.id)));
		};
		if current.revision + 1 != next.revision {
			return Ok(false);
		}
		*current = next.clone();
		Ok(true)
	}

	async fn insert_insight(&self, insight: NewInsight) -> Result<AiInsight, StoreError> {
		let mut t = self.tables.write();
		t.last_insight += 1;
		let insight = insight.into_insight(t.last_insight);
		t.insights.insert(insight.id, insight.clone());
		Ok(insight)
	}

	async fn get_insight(&self, id: InsightId) -> Result<Option<AiInsight>, StoreError> {
		Ok(self.tables.read().insights.get(&id).cloned())
	}

	async fn list_insights(&self, user_id: UserId, unread_only: bool) -> Result<Vec<AiInsight>, StoreError> {
		Ok(self
			.tables
			.read()
			.insights
			.values()
			.rev()
			.filter(|i| i.user_id == user_id && (!unread_only || !i.is_read))
			.cloned()
			.collect())
	}

	async fn mark_insight_read(&self, id: InsightId) -> Result<bool, StoreError> {
		let mut t = self.tables.write();
		match t.insights.get_mut(&id) {
			Some(insight) => {
				insight.is_read = true;
				Ok(true)
			}
			None => Ok(false),
		}
	}
}
