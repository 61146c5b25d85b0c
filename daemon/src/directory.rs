use std::sync::Arc;

use grove_core::models::{NewUser, User, UserId};
use grove_core::{Clock, GroveError, GroveResult};
use tracing::info;

use crate::store::Store;

/// Registered users. Credentials live elsewhere; this only keeps the
/// profile the adoption records hang off.
#[derive(Clone)]
pub struct UserDirectory {
	store: Arc<dyn Store>,
	clock: Arc<dyn Clock>,
}

impl UserDirectory {
	pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
		Self { store, clock }
	}

	pub async fn register(&self, user: NewUser) -> GroveResult<User> {
		let user = user.validate()?;
		let user = self.store.insert_user(user, self.clock.now()).await?;
		info!(user = user.id, region = %user.region, "user registered");
		Ok(user)
	}

	pub async fn get(&self, id: UserId) -> GroveResult<User> {
		self.store
			.get_user(id)
			.await?
			.ok_or_else(|| GroveError::not_found("user", id))
	}

	pub async fn list(&self) -> GroveResult<Vec<User>> {
		Ok(self.store.list_users().await?)
	}

	/// Drops the user together with their adoptions and insights.
	pub async fn remove(&self, id: UserId) -> GroveResult<()> {
		if !self.store.remove_user(id).await? {
			return Err(GroveError::not_found("user", id));
		}
		info!(user = id, "user removed");
		Ok(())
	}
}
