//! Grove service layer: persistence, adoption operations, insights and
//! the HTTP adapter over them.

pub mod db;
pub mod directory;
pub mod http;
pub mod insights;
pub mod leaderboard;
pub mod ledger;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use grove_core::Clock;
use tracing::info;

pub use directory::UserDirectory;
pub use insights::{InsightService, TextGenerator};
pub use leaderboard::Leaderboard;
pub use ledger::AdoptionLedger;
pub use store::{MemoryStore, Store, StoreError};

/// Every service, wired to one store and one clock.
#[derive(Clone)]
pub struct Services {
	pub ledger: AdoptionLedger,
	pub users: UserDirectory,
	pub leaderboard: Leaderboard,
	pub insights: InsightService,
}

impl Services {
	pub fn new(
		store: Arc<dyn Store>,
		clock: Arc<dyn Clock>,
		generator: Arc<dyn TextGenerator>,
		generator_timeout: Duration,
	) -> Self {
		Self {
			ledger: AdoptionLedger::new(store.clone(), clock.clone()),
			users: UserDirectory::new(store.clone(), clock.clone()),
			leaderboard: Leaderboard::new(store.clone(), clock.clone()),
			insights: InsightService::new(store, clock, generator, generator_timeout),
		}
	}
}

/// Serves the API until the process is told to stop.
pub async fn serve(services: Services, host: &str, port: u16) -> std::io::Result<()> {
	info!(host, port, "listening");
	let data = web::Data::new(services);
	HttpServer::new(move || App::new().app_data(data.clone()).configure(http::configure))
		.bind((host, port))?
		.run()
		.await
}
