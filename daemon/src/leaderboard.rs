use std::collections::HashMap;
use std::sync::Arc;

use grove_core::leaderboard::{self, LeaderboardEntry};
use grove_core::models::AdoptionStatus;
use grove_core::{Clock, GroveResult};
use tracing::debug;

use crate::store::{AdoptionFilter, Store};

#[derive(Clone)]
pub struct Leaderboard {
	store: Arc<dyn Store>,
	clock: Arc<dyn Clock>,
}

impl Leaderboard {
	pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
		Self { store, clock }
	}

	pub async fn compute(&self) -> GroveResult<Vec<LeaderboardEntry>> {
		let now = self.clock.now();
		let adoptions = self
			.store
			.list_adoptions(AdoptionFilter::with_status(AdoptionStatus::Active))
			.await?;
		let users = self.store.list_users().await?;
		let species: HashMap<_, _> = self
			.store
			.list_species()
			.await?
			.into_iter()
			.map(|s| (s.id, s))
			.collect();

		let entries = leaderboard::rank(&users, &adoptions, &species, now);
		debug!(active = adoptions.len(), ranked = entries.len(), "leaderboard computed");
		Ok(entries)
	}
}
