//! Persistence boundary.
//!
//! Every backend implements [`Store`]. Adoption writes go through
//! [`Store::swap_adoption`], which only succeeds while the stored revision
//! is the one the caller read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grove_core::models::{
	Adoption, AdoptionDetails, AdoptionId, AdoptionStatus, AiInsight, InsightId, NewInsight,
	NewSpecies, SpeciesChoice, SpeciesId, TreeSpecies, User, UserId, ValidUser,
};
use grove_core::GroveError;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	DbError(String),

	#[error("already exists: {0}")]
	Duplicate(String),

	#[error("not found: {0}")]
	Missing(String),

	#[error("corrupt record: {0}")]
	Corrupt(String),
}

impl From<StoreError> for GroveError {
	fn from(err: StoreError) -> Self {
		match err {
			StoreError::Duplicate(what) => GroveError::Conflict(format!("{what} already exists")),
			StoreError::Missing(what) => GroveError::NotFound(what),
			other => GroveError::Operation(other.to_string()),
		}
	}
}

/// Which adoptions to return. Deleted adoptions are skipped unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdoptionFilter {
	pub user_id: Option<UserId>,
	pub status: Option<AdoptionStatus>,
	pub include_deleted: bool,
}

impl AdoptionFilter {
	pub fn for_user(user_id: UserId) -> Self {
		Self {
			user_id: Some(user_id),
			..Default::default()
		}
	}

	pub fn with_status(status: AdoptionStatus) -> Self {
		Self {
			status: Some(status),
			..Default::default()
		}
	}

	pub fn matches(&self, adoption: &Adoption) -> bool {
		if adoption.is_deleted() && !self.include_deleted && self.status != Some(AdoptionStatus::Deleted) {
			return false;
		}
		self.user_id.is_none_or(|u| adoption.user_id == u) && self.status.is_none_or(|s| adoption.status == s)
	}
}

#[async_trait]
pub trait Store: Send + Sync {
	/// Fails with `Duplicate` when the email is taken.
	async fn insert_user(&self, user: ValidUser, created_at: DateTime<Utc>) -> Result<User, StoreError>;
	async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;
	async fn list_users(&self) -> Result<Vec<User>, StoreError>;
	/// Removes the user with their adoptions and insights.
	async fn remove_user(&self, id: UserId) -> Result<bool, StoreError>;

	async fn get_species(&self, id: SpeciesId) -> Result<Option<TreeSpecies>, StoreError>;
	async fn find_species(&self, name: &str) -> Result<Option<TreeSpecies>, StoreError>;
	/// Ordered by name.
	async fn list_species(&self) -> Result<Vec<TreeSpecies>, StoreError>;
	async fn find_or_create_species(&self, species: NewSpecies) -> Result<TreeSpecies, StoreError>;

	/// Resolves the species (creating it if new) and inserts the adoption
	/// in one transaction. `Missing` when the user or an existing species
	/// id is unknown.
	async fn create_adoption(
		&self,
		user_id: UserId,
		species: SpeciesChoice,
		details: AdoptionDetails,
		adopted_at: DateTime<Utc>,
	) -> Result<(Adoption, TreeSpecies), StoreError>;
	/// Includes deleted adoptions.
	async fn get_adoption(&self, id: AdoptionId) -> Result<Option<Adoption>, StoreError>;
	/// Ordered by id.
	async fn list_adoptions(&self, filter: AdoptionFilter) -> Result<Vec<Adoption>, StoreError>;
	/// Writes `next` if the stored revision is still `next.revision - 1`.
	/// Returns false when another write got there first.
	async fn swap_adoption(&self, next: &Adoption) -> Result<bool, StoreError>;

	async fn insert_insight(&self, insight: NewInsight) -> Result<AiInsight, StoreError>;
	async fn get_insight(&self, id: InsightId) -> Result<Option<AiInsight>, StoreError>;
	/// Newest first.
	async fn list_insights(&self, user_id: UserId, unread_only: bool) -> Result<Vec<AiInsight>, StoreError>;
	async fn mark_insight_read(&self, id: InsightId) -> Result<bool, StoreError>;
}
