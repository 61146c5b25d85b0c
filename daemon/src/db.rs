use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use grove_core::models::{
	Adoption, AdoptionDetails, AdoptionId, AiInsight, InsightId, NewInsight, NewSpecies, SpeciesChoice,
	SpeciesId, TreeSpecies, User, UserId, ValidUser,
};
use surrealdb::engine::local::{Db, Mem, SurrealKv};
use surrealdb::types::SurrealValue;
use surrealdb::Surreal;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::store::{AdoptionFilter, Store, StoreError};

/// Wrapper around the SurrealDB handle.
/// Clone is cheap (Arc internally).
#[derive(Clone)]
pub struct DbHandle {
	pub db: Surreal<Db>,
	/// Serializes read-modify-write sequences against the embedded engine.
	writes: Arc<Mutex<()>>,
	seqs: Arc<Sequences>,
}

/// Next ids per table, seeded from the highest stored `seq` at startup.
#[derive(Default)]
struct Sequences {
	account: AtomicU64,
	species: AtomicU64,
	adoption: AtomicU64,
	insight: AtomicU64,
}

fn db_err(e: surrealdb::Error) -> StoreError {
	StoreError::DbError(e.to_string())
}

/// Open (or create) the on-disk database at `path`.
pub async fn open(path: &Path) -> Result<DbHandle, StoreError> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).map_err(|e| StoreError::DbError(format!("{}: {e}", parent.display())))?;
	}
	let db = Surreal::new::<SurrealKv>(path.to_path_buf()).await.map_err(db_err)?;
	info!(path = %path.display(), "opened database");
	init(db).await
}

/// A throwaway database that lives as long as the handle.
pub async fn open_in_memory() -> Result<DbHandle, StoreError> {
	let db = Surreal::new::<Mem>(()).await.map_err(db_err)?;
	init(db).await
}

/// Select ns/db, run migrations, seed id sequences.
async fn init(db: Surreal<Db>) -> Result<DbHandle, StoreError> {
	db.use_ns("grove").use_db("grove").await.map_err(db_err)?;
	run_migrations(&db).await?;

	let seqs = Sequences::default();
	for (table, counter) in [
		("account", &seqs.account),
		("species", &seqs.species),
		("adoption", &seqs.adoption),
		("insight", &seqs.insight),
	] {
		let last = max_seq(&db, table).await?;
		counter.store(last, Ordering::SeqCst);
		debug!(table, last, "seeded sequence");
	}

	Ok(DbHandle {
		db,
		writes: Arc::new(Mutex::new(())),
		seqs: Arc::new(seqs),
	})
}

/// Run schema migrations. DEFINE statements are idempotent.
async fn run_migrations(db: &Surreal<Db>) -> Result<(), StoreError> {
	db.query(SCHEMA_V1).await.map_err(db_err)?.check().map_err(db_err)?;
	Ok(())
}

async fn max_seq(db: &Surreal<Db>, table: &str) -> Result<u64, StoreError> {
	let mut response = db
		.query(format!("SELECT seq FROM {table} ORDER BY seq DESC LIMIT 1"))
		.await
		.map_err(db_err)?;
	let rows: Vec<SeqRow> = response.take(0).map_err(db_err)?;
	Ok(rows.first().map(|r| r.seq as u64).unwrap_or(0))
}

fn next(counter: &AtomicU64) -> u64 {
	counter.fetch_add(1, Ordering::SeqCst) + 1
}

// ─── Rows ─────────────────────────────────────────────────────

#[derive(Debug, Clone, SurrealValue)]
struct SeqRow {
	seq: i64,
}

#[derive(Debug, Clone, SurrealValue)]
struct AccountRow {
	seq: i64,
	name: String,
	email: String,
	region: String,
	created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, SurrealValue)]
struct SpeciesRow {
	seq: i64,
	species_name: String,
	scientific_name: Option<String>,
	description: Option<String>,
	avg_co2_absorption: f64,
	suitable_regions: Vec<String>,
	sunlight_requirement: Option<String>,
	water_needs: Option<String>,
	drought_resistant: bool,
	growth_rate: Option<String>,
	mature_height_meters: Option<f64>,
}

#[derive(Debug, Clone, SurrealValue)]
struct AdoptionRow {
	seq: i64,
	user_seq: i64,
	species_seq: Option<i64>,
	status: String,
	growth_stage: String,
	adopted_at: DateTime<Utc>,
	planted_at: Option<DateTime<Utc>>,
	location: Option<String>,
	nickname: Option<String>,
	revision: i64,
}

#[derive(Debug, Clone, SurrealValue)]
struct InsightRow {
	seq: i64,
	user_seq: i64,
	species_seq: Option<i64>,
	adoption_seq: Option<i64>,
	insight_type: String,
	message: String,
	is_read: bool,
	created_at: DateTime<Utc>,
}

const ACCOUNT_FIELDS: &str = "seq, name, email, region, created_at";
const SPECIES_FIELDS: &str = "seq, species_name, scientific_name, description, avg_co2_absorption, \
	suitable_regions, sunlight_requirement, water_needs, drought_resistant, growth_rate, mature_height_meters";
const ADOPTION_FIELDS: &str =
	"seq, user_seq, species_seq, status, growth_stage, adopted_at, planted_at, location, nickname, revision";
const INSIGHT_FIELDS: &str =
	"seq, user_seq, species_seq, adoption_seq, insight_type, message, is_read, created_at";

impl AccountRow {
	fn into_user(self) -> User {
		User {
			id: self.seq as u64,
			name: self.name,
			email: self.email,
			region: self.region,
			created_at: self.created_at,
		}
	}
}

impl SpeciesRow {
	fn from_species(s: &TreeSpecies) -> Self {
		Self {
			seq: s.id as i64,
			species_name: s.species_name.clone(),
			scientific_name: s.scientific_name.clone(),
			description: s.description.clone(),
			avg_co2_absorption: s.avg_co2_absorption,
			suitable_regions: s.suitable_regions.clone(),
			sunlight_requirement: s.sunlight_requirement.clone(),
			water_needs: s.water_needs.clone(),
			drought_resistant: s.drought_resistant,
			growth_rate: s.growth_rate.clone(),
			mature_height_meters: s.mature_height_meters,
		}
	}

	fn into_species(self) -> TreeSpecies {
		TreeSpecies {
			id: self.seq as u64,
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

impl AdoptionRow {
	fn from_adoption(a: &Adoption) -> Self {
		Self {
			seq: a.id as i64,
			user_seq: a.user_id as i64,
			species_seq: a.species_id.map(|s| s as i64),
			status: a.status.as_str().to_string(),
			growth_stage: a.growth_stage.as_str().to_string(),
			adopted_at: a.adopted_at,
			planted_at: a.planted_at,
			location: a.location.clone(),
			nickname: a.nickname.clone(),
			revision: a.revision as i64,
		}
	}

	fn into_adoption(self) -> Result<Adoption, StoreError> {
		let corrupt = |e: grove_core::GroveError| StoreError::Corrupt(format!("adoption {}: {e}", self.seq));
		Ok(Adoption {
			id: self.seq as u64,
			user_id: self.user_seq as u64,
			species_id: self.species_seq.map(|s| s as u64),
			status: self.status.parse().map_err(corrupt)?,
			growth_stage: self.growth_stage.parse().map_err(corrupt)?,
			adopted_at: self.adopted_at,
			planted_at: self.planted_at,
			location: self.location,
			nickname: self.nickname,
			revision: self.revision as u64,
		})
	}
}

impl InsightRow {
	fn into_insight(self) -> Result<AiInsight, StoreError> {
		Ok(AiInsight {
			id: self.seq as u64,
			user_id: self.user_seq as u64,
			species_id: self.species_seq.map(|s| s as u64),
			adoption_id: self.adoption_seq.map(|s| s as u64),
			insight_type: self
				.insight_type
				.parse()
				.map_err(|e| StoreError::Corrupt(format!("insight {}: {e}", self.seq)))?,
			message: self.message,
			is_read: self.is_read,
			created_at: self.created_at,
		})
	}
}

// ─── Queries ──────────────────────────────────────────────────

impl DbHandle {
	async fn species_by_seq(&self, seq: i64) -> Result<Option<TreeSpecies>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {SPECIES_FIELDS} FROM species WHERE seq = $seq LIMIT 1"))
			.bind(("seq", seq))
			.await
			.map_err(db_err)?;
		let rows: Vec<SpeciesRow> = response.take(0).map_err(db_err)?;
		Ok(rows.into_iter().next().map(SpeciesRow::into_species))
	}

	async fn species_by_name(&self, name: String) -> Result<Option<TreeSpecies>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {SPECIES_FIELDS} FROM species WHERE species_name = $name LIMIT 1"))
			.bind(("name", name))
			.await
			.map_err(db_err)?;
		let rows: Vec<SpeciesRow> = response.take(0).map_err(db_err)?;
		Ok(rows.into_iter().next().map(SpeciesRow::into_species))
	}

	/// Caller holds the write lock.
	async fn resolve_species(&self, choice: SpeciesChoice) -> Result<(TreeSpecies, bool), StoreError> {
		match choice {
			SpeciesChoice::Existing(id) => {
				let found = self.species_by_seq(id as i64).await?;
				found.map(|s| (s, false)).ok_or_else(|| StoreError::Missing(format!("species {id}")))
			}
			SpeciesChoice::New(new) => {
				if let Some(existing) = self.species_by_name(new.species_name.clone()).await? {
					return Ok((existing, false));
				}
				Ok((new.into_species(next(&self.seqs.species)), true))
			}
		}
	}
}

#[async_trait]
impl Store for DbHandle {
	async fn insert_user(&self, user: ValidUser, created_at: DateTime<Utc>) -> Result<User, StoreError> {
		let _guard = self.writes.lock().await;

		let mut response = self
			.db
			.query("SELECT seq FROM account WHERE email = $email LIMIT 1")
			.bind(("email", user.email.clone()))
			.await
			.map_err(db_err)?;
		let taken: Vec<SeqRow> = response.take(0).map_err(db_err)?;
		if !taken.is_empty() {
			return Err(StoreError::Duplicate(format!("user with email {}", user.email)));
		}

		let user = user.into_user(next(&self.seqs.account), created_at);
		let row = AccountRow {
			seq: user.id as i64,
			name: user.name.clone(),
			email: user.email.clone(),
			region: user.region.clone(),
			created_at: user.created_at,
		};
		self.db
			.query("CREATE account CONTENT $row")
			.bind(("row", row))
			.await
			.map_err(db_err)?
			.check()
			.map_err(db_err)?;
		Ok(user)
	}

	async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {ACCOUNT_FIELDS} FROM account WHERE seq = $seq LIMIT 1"))
			.bind(("seq", id as i64))
			.await
			.map_err(db_err)?;
		let rows: Vec<AccountRow> = response.take(0).map_err(db_err)?;
		Ok(rows.into_iter().next().map(AccountRow::into_user))
	}

	async fn list_users(&self) -> Result<Vec<User>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {ACCOUNT_FIELDS} FROM account ORDER BY seq ASC"))
			.await
			.map_err(db_err)?;
		let rows: Vec<AccountRow> = response.take(0).map_err(db_err)?;
		Ok(rows.into_iter().map(AccountRow::into_user).collect())
	}

	async fn remove_user(&self, id: UserId) -> Result<bool, StoreError> {
		let _guard = self.writes.lock().await;
		if self.get_user(id).await?.is_none() {
			return Ok(false);
		}
		self.db
			.query(
				"BEGIN TRANSACTION;
				 DELETE adoption WHERE user_seq = $seq;
				 DELETE insight WHERE user_seq = $seq;
				 DELETE account WHERE seq = $seq;
				 COMMIT TRANSACTION;",
			)
			.bind(("seq", id as i64))
			.await
			.map_err(db_err)?
			.check()
			.map_err(db_err)?;
		Ok(true)
	}

	async fn get_species(&self, id: SpeciesId) -> Result<Option<TreeSpecies>, StoreError> {
		self.species_by_seq(id as i64).await
	}

	async fn find_species(&self, name: &str) -> Result<Option<TreeSpecies>, StoreError> {
		self.species_by_name(name.to_string()).await
	}

	async fn list_species(&self) -> Result<Vec<TreeSpecies>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {SPECIES_FIELDS} FROM species ORDER BY species_name ASC"))
			.await
			.map_err(db_err)?;
		let rows: Vec<SpeciesRow> = response.take(0).map_err(db_err)?;
		Ok(rows.into_iter().map(SpeciesRow::into_species).collect())
	}

	async fn find_or_create_species(&self, species: NewSpecies) -> Result<TreeSpecies, StoreError> {
		let _guard = self.writes.lock().await;
		let (species, is_new) = self.resolve_species(SpeciesChoice::New(species)).await?;
		if is_new {
			self.db
				.query("CREATE species CONTENT $row")
				.bind(("row", SpeciesRow::from_species(&species)))
				.await
				.map_err(db_err)?
				.check()
				.map_err(db_err)?;
			info!(species = %species.species_name, id = species.id, "added species to catalog");
		}
		Ok(species)
	}

	async fn create_adoption(
		&self,
		user_id: UserId,
		species: SpeciesChoice,
		details: AdoptionDetails,
		adopted_at: DateTime<Utc>,
	) -> Result<(Adoption, TreeSpecies), StoreError> {
		let _guard = self.writes.lock().await;
		if self.get_user(user_id).await?.is_none() {
			return Err(StoreError::Missing(format!("user {user_id}")));
		}
		let (species, is_new) = self.resolve_species(species).await?;
		let adoption = Adoption::new(next(&self.seqs.adoption), user_id, Some(species.id), details, adopted_at);

		// Species and adoption land together or not at all.
		let sql = if is_new {
			"BEGIN TRANSACTION;
			 CREATE species CONTENT $species;
			 CREATE adoption CONTENT $adoption;
			 COMMIT TRANSACTION;"
		} else {
			"CREATE adoption CONTENT $adoption;"
		};
		self.db
			.query(sql)
			.bind(("species", SpeciesRow::from_species(&species)))
			.bind(("adoption", AdoptionRow::from_adoption(&adoption)))
			.await
			.map_err(db_err)?
			.check()
			.map_err(db_err)?;

		if is_new {
			info!(species = %species.species_name, id = species.id, "added species to catalog");
		}
		Ok((adoption, species))
	}

	async fn get_adoption(&self, id: AdoptionId) -> Result<Option<Adoption>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {ADOPTION_FIELDS} FROM adoption WHERE seq = $seq LIMIT 1"))
			.bind(("seq", id as i64))
			.await
			.map_err(db_err)?;
		let rows: Vec<AdoptionRow> = response.take(0).map_err(db_err)?;
		rows.into_iter().next().map(AdoptionRow::into_adoption).transpose()
	}

	async fn list_adoptions(&self, filter: AdoptionFilter) -> Result<Vec<Adoption>, StoreError> {
		let mut conditions = Vec::new();
		if filter.user_id.is_some() {
			conditions.push("user_seq = $user_seq");
		}
		if filter.status.is_some() {
			conditions.push("status = $status");
		}
		let where_clause = if conditions.is_empty() {
			String::new()
		} else {
			format!("WHERE {}", conditions.join(" AND "))
		};

		let mut response = self
			.db
			.query(format!("SELECT {ADOPTION_FIELDS} FROM adoption {where_clause} ORDER BY seq ASC"))
			.bind(("user_seq", filter.user_id.unwrap_or_default() as i64))
			.bind(("status", filter.status.map(|s| s.as_str().to_string()).unwrap_or_default()))
			.await
			.map_err(db_err)?;
		let rows: Vec<AdoptionRow> = response.take(0).map_err(db_err)?;

		let mut adoptions = Vec::with_capacity(rows.len());
		for row in rows {
			let adoption = row.into_adoption()?;
			if filter.matches(&adoption) {
				adoptions.push(adoption);
			}
		}
		Ok(adoptions)
	}

	async fn swap_adoption(&self, next: &Adoption) -> Result<bool, StoreError> {
		let _guard = self.writes.lock().await;
		let row = AdoptionRow::from_adoption(next);
		let mut response = self
			.db
			.query(
				"UPDATE adoption SET
					status = $status,
					growth_stage = $growth_stage,
					planted_at = $planted_at,
					location = $location,
					nickname = $nickname,
					revision = $revision
				 WHERE seq = $seq AND revision = $expected
				 RETURN seq",
			)
			.bind(("status", row.status))
			.bind(("growth_stage", row.growth_stage))
			.bind(("planted_at", row.planted_at))
			.bind(("location", row.location))
			.bind(("nickname", row.nickname))
			.bind(("revision", row.revision))
			.bind(("seq", row.seq))
			.bind(("expected", row.revision - 1))
			.await
			.map_err(db_err)?;
		let written: Vec<SeqRow> = response.take(0).map_err(db_err)?;
		if written.is_empty() && self.get_adoption(next.id).await?.is_none() {
			return Err(StoreError::Missing(format!("adoption {}", next.id)));
		}
		Ok(!written.is_empty())
	}

	async fn insert_insight(&self, insight: NewInsight) -> Result<AiInsight, StoreError> {
		let _guard = self.writes.lock().await;
		let insight = insight.into_insight(next(&self.seqs.insight));
		let row = InsightRow {
			seq: insight.id as i64,
			user_seq: insight.user_id as i64,
			species_seq: insight.species_id.map(|s| s as i64),
			adoption_seq: insight.adoption_id.map(|s| s as i64),
			insight_type: insight.insight_type.as_str().to_string(),
			message: insight.message.clone(),
			is_read: insight.is_read,
			created_at: insight.created_at,
		};
		self.db
			.query("CREATE insight CONTENT $row")
			.bind(("row", row))
			.await
			.map_err(db_err)?
			.check()
			.map_err(db_err)?;
		Ok(insight)
	}

	async fn get_insight(&self, id: InsightId) -> Result<Option<AiInsight>, StoreError> {
		let mut response = self
			.db
			.query(format!("SELECT {INSIGHT_FIELDS} FROM insight WHERE seq = $seq LIMIT 1"))
			.bind(("seq", id as i64))
			.await
			.map_err(db_err)?;
		let rows: Vec<InsightRow> = response.take(0).map_err(db_err)?;
		rows.into_iter().next().map(InsightRow::into_insight).transpose()
	}

	async fn list_insights(&self, user_id: UserId, unread_only: bool) -> Result<Vec<AiInsight>, StoreError> {
		let unread = if unread_only { "AND is_read = false" } else { "" };
		let mut response = self
			.db
			.query(format!(
				"SELECT {INSIGHT_FIELDS} FROM insight WHERE user_seq = $user_seq {unread} ORDER BY seq DESC"
			))
			.bind(("user_seq", user_id as i64))
			.await
			.map_err(db_err)?;
		let rows: Vec<InsightRow> = response.take(0).map_err(db_err)?;
		rows.into_iter().map(InsightRow::into_insight).collect()
	}

	async fn mark_insight_read(&self, id: InsightId) -> Result<bool, StoreError> {
		let _guard = self.writes.lock().await;
		let mut response = self
			.db
			.query("UPDATE insight SET is_read = true WHERE seq = $seq RETURN seq")
			.bind(("seq", id as i64))
			.await
			.map_err(db_err)?;
		let written: Vec<SeqRow> = response.take(0).map_err(db_err)?;
		Ok(!written.is_empty())
	}
}

const SCHEMA_V1: &str = "
    DEFINE TABLE OVERWRITE account SCHEMAFULL;
    DEFINE FIELD OVERWRITE seq ON account TYPE int;
    DEFINE FIELD OVERWRITE name ON account TYPE string;
    DEFINE FIELD OVERWRITE email ON account TYPE string;
    DEFINE FIELD OVERWRITE region ON account TYPE string;
    DEFINE FIELD OVERWRITE created_at ON account TYPE datetime;
    DEFINE INDEX OVERWRITE idx_account_seq ON account FIELDS seq UNIQUE;
    DEFINE INDEX OVERWRITE idx_account_email ON account FIELDS email UNIQUE;

    DEFINE TABLE OVERWRITE species SCHEMAFULL;
    DEFINE FIELD OVERWRITE seq ON species TYPE int;
    DEFINE FIELD OVERWRITE species_name ON species TYPE string;
    DEFINE FIELD OVERWRITE scientific_name ON species TYPE option<string>;
    DEFINE FIELD OVERWRITE description ON species TYPE option<string>;
    DEFINE FIELD OVERWRITE avg_co2_absorption ON species TYPE float;
    DEFINE FIELD OVERWRITE suitable_regions ON species TYPE array<string>;
    DEFINE FIELD OVERWRITE sunlight_requirement ON species TYPE option<string>;
    DEFINE FIELD OVERWRITE water_needs ON species TYPE option<string>;
    DEFINE FIELD OVERWRITE drought_resistant ON species TYPE bool DEFAULT false;
    DEFINE FIELD OVERWRITE growth_rate ON species TYPE option<string>;
    DEFINE FIELD OVERWRITE mature_height_meters ON species TYPE option<float>;
    DEFINE INDEX OVERWRITE idx_species_seq ON species FIELDS seq UNIQUE;
    DEFINE INDEX OVERWRITE idx_species_name ON species FIELDS species_name UNIQUE;

    DEFINE TABLE OVERWRITE adoption SCHEMAFULL;
    DEFINE FIELD OVERWRITE seq ON adoption TYPE int;
    DEFINE FIELD OVERWRITE user_seq ON adoption TYPE int;
    DEFINE FIELD OVERWRITE species_seq ON adoption TYPE option<int>;
    DEFINE FIELD OVERWRITE status ON adoption TYPE string;
    DEFINE FIELD OVERWRITE growth_stage ON adoption TYPE string;
    DEFINE FIELD OVERWRITE adopted_at ON adoption TYPE datetime;
    DEFINE FIELD OVERWRITE planted_at ON adoption TYPE option<datetime>;
    DEFINE FIELD OVERWRITE location ON adoption TYPE option<string>;
    DEFINE FIELD OVERWRITE nickname ON adoption TYPE option<string>;
    DEFINE FIELD OVERWRITE revision ON adoption TYPE int DEFAULT 0;
    DEFINE INDEX OVERWRITE idx_adoption_seq ON adoption FIELDS seq UNIQUE;
    DEFINE INDEX OVERWRITE idx_adoption_user ON adoption FIELDS user_seq;
    DEFINE INDEX OVERWRITE idx_adoption_status ON adoption FIELDS status;

    DEFINE TABLE OVERWRITE insight SCHEMAFULL;
    DEFINE FIELD OVERWRITE seq ON insight TYPE int;
    DEFINE FIELD OVERWRITE user_seq ON insight TYPE int;
    DEFINE FIELD OVERWRITE species_seq ON insight TYPE option<int>;
    DEFINE FIELD OVERWRITE adoption_seq ON insight TYPE option<int>;
    DEFINE FIELD OVERWRITE insight_type ON insight TYPE string;
    DEFINE FIELD OVERWRITE message ON insight TYPE string;
    DEFINE FIELD OVERWRITE is_read ON insight TYPE bool DEFAULT false;
    DEFINE FIELD OVERWRITE created_at ON insight TYPE datetime;
    DEFINE INDEX OVERWRITE idx_insight_seq ON insight FIELDS seq UNIQUE;
    DEFINE INDEX OVERWRITE idx_insight_user ON insight FIELDS user_seq;
";
