//! JSON over HTTP. Handlers only translate; every rule lives in the
//! services.

use std::fmt;
use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use grove_core::models::{
	AdoptRequest, AdoptionEdit, AdoptionId, InsightId, InsightRequest, NewUser, UserId,
};
use grove_core::GroveError;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::Services;

pub const USER_HEADER: &str = "X-User-Id";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError(pub GroveError);

impl From<GroveError> for ApiError {
	fn from(err: GroveError) -> Self {
		ApiError(err)
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Serialize)]
struct ErrorBody<'a> {
	error: &'a str,
	message: String,
}

impl ResponseError for ApiError {
	fn status_code(&self) -> StatusCode {
		match self.0 {
			GroveError::Validation(_) => StatusCode::BAD_REQUEST,
			GroveError::NotFound(_) => StatusCode::NOT_FOUND,
			GroveError::Authorization(_) => StatusCode::FORBIDDEN,
			GroveError::Conflict(_) => StatusCode::CONFLICT,
			GroveError::ExternalService(_) => StatusCode::BAD_GATEWAY,
			GroveError::Operation(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn error_response(&self) -> HttpResponse {
		let (kind, message) = match &self.0 {
			GroveError::Validation(m) => ("validation", m.clone()),
			GroveError::NotFound(m) => ("not_found", m.clone()),
			GroveError::Authorization(m) => ("forbidden", m.clone()),
			GroveError::Conflict(m) => ("conflict", m.clone()),
			GroveError::ExternalService(m) => ("external_service", m.clone()),
			GroveError::Operation(m) => {
				error!(error = %m, "request failed");
				("internal", "internal error".to_string())
			}
		};
		HttpResponse::build(self.status_code()).json(ErrorBody { error: kind, message })
	}
}

type ApiResult = Result<HttpResponse, ApiError>;

// ============================================================================
// Caller identity
// ============================================================================

/// The already-authenticated user, taken from the `X-User-Id` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl Caller {
	fn parse(req: &HttpRequest) -> Result<Self, ApiError> {
		let raw = req
			.headers()
			.get(USER_HEADER)
			.ok_or_else(|| ApiError(GroveError::Authorization(format!("missing {USER_HEADER} header"))))?;
		raw.to_str()
			.ok()
			.and_then(|v| v.trim().parse::<UserId>().ok())
			.map(Caller)
			.ok_or_else(|| ApiError(GroveError::validation(format!("{USER_HEADER} must be a numeric id"))))
	}

	fn require(self, user_id: UserId) -> Result<(), ApiError> {
		if self.0 != user_id {
			return Err(ApiError(GroveError::Authorization(format!(
				"cannot read data of user {user_id}"
			))));
		}
		Ok(())
	}
}

impl FromRequest for Caller {
	type Error = ApiError;
	type Future = Ready<Result<Self, Self::Error>>;

	fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
		ready(Caller::parse(req))
	}
}

// ============================================================================
// Routes
// ============================================================================

pub fn configure(cfg: &mut web::ServiceConfig) {
	cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
		ApiError(GroveError::Validation(err.to_string())).into()
	}))
	.app_data(web::QueryConfig::default().error_handler(|err, _req| {
		ApiError(GroveError::Validation(err.to_string())).into()
	}))
	.service(web::resource("/").route(web::get().to(banner)))
	.service(
		web::scope("/api")
			// Fixed segments before `/trees/{id}`.
			.service(web::resource("/trees/available").route(web::get().to(available_species)))
			.service(web::resource("/trees/suggestions").route(web::get().to(suggest_species)))
			.service(web::resource("/trees/adopt").route(web::post().to(adopt)))
			.service(
				web::resource("/trees/{id}/confirm")
					.route(web::patch().to(confirm_planting))
					.route(web::put().to(confirm_planting)),
			)
			.service(
				web::resource("/trees/{id}")
					.route(web::get().to(list_trees))
					.route(web::patch().to(edit_tree))
					.route(web::delete().to(delete_tree)),
			)
			.service(web::resource("/leaderboard").route(web::get().to(leaderboard)))
			.service(web::resource("/users").route(web::post().to(register_user)))
			.service(web::resource("/users/{id}/summary").route(web::get().to(user_summary)))
			.service(
				web::resource("/insights")
					.route(web::get().to(list_insights))
					.route(web::post().to(create_insight)),
			)
			.service(web::resource("/insights/{id}/read").route(web::patch().to(mark_insight_read))),
	);
}

async fn banner() -> HttpResponse {
	HttpResponse::Ok().json(serde_json::json!({
		"service": "grove",
		"version": env!("CARGO_PKG_VERSION"),
		"message": "Tree adoption API is running",
	}))
}

#[derive(Debug, Default, Deserialize)]
struct RegionQuery {
	region: Option<String>,
}

async fn available_species(services: web::Data<Services>, query: web::Query<RegionQuery>) -> ApiResult {
	let species = services.ledger.available_species(query.region.as_deref()).await?;
	Ok(HttpResponse::Ok().json(species))
}

async fn suggest_species(services: web::Data<Services>, query: web::Query<RegionQuery>) -> ApiResult {
	let region = query.region.as_deref().unwrap_or_default();
	let suggestions = services.insights.suggest_species(region).await?;
	Ok(HttpResponse::Ok().json(suggestions))
}

async fn adopt(services: web::Data<Services>, caller: Caller, body: web::Json<AdoptRequest>) -> ApiResult {
	let view = services.ledger.adopt(caller.0, body.into_inner()).await?;
	Ok(HttpResponse::Created().json(view))
}

async fn confirm_planting(services: web::Data<Services>, caller: Caller, path: web::Path<AdoptionId>) -> ApiResult {
	let view = services.ledger.confirm_planting(caller.0, path.into_inner()).await?;
	Ok(HttpResponse::Ok().json(view))
}

async fn list_trees(services: web::Data<Services>, caller: Caller, path: web::Path<UserId>) -> ApiResult {
	let user_id = path.into_inner();
	caller.require(user_id)?;
	let trees = services.ledger.list_for_user(user_id).await?;
	Ok(HttpResponse::Ok().json(trees))
}

async fn edit_tree(
	services: web::Data<Services>,
	caller: Caller,
	path: web::Path<AdoptionId>,
	body: web::Json<AdoptionEdit>,
) -> ApiResult {
	let view = services.ledger.edit(caller.0, path.into_inner(), body.into_inner()).await?;
	Ok(HttpResponse::Ok().json(view))
}

async fn delete_tree(services: web::Data<Services>, caller: Caller, path: web::Path<AdoptionId>) -> ApiResult {
	let id = path.into_inner();
	services.ledger.delete(caller.0, id).await?;
	Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": id })))
}

async fn leaderboard(services: web::Data<Services>) -> ApiResult {
	Ok(HttpResponse::Ok().json(services.leaderboard.compute().await?))
}

async fn register_user(services: web::Data<Services>, body: web::Json<NewUser>) -> ApiResult {
	let user = services.users.register(body.into_inner()).await?;
	Ok(HttpResponse::Created().json(user))
}

async fn user_summary(services: web::Data<Services>, caller: Caller, path: web::Path<UserId>) -> ApiResult {
	let user_id = path.into_inner();
	caller.require(user_id)?;
	Ok(HttpResponse::Ok().json(services.ledger.user_summary(user_id).await?))
}

#[derive(Debug, Default, Deserialize)]
struct InsightQuery {
	#[serde(default)]
	unread: bool,
}

async fn list_insights(services: web::Data<Services>, caller: Caller, query: web::Query<InsightQuery>) -> ApiResult {
	let insights = services.insights.list(caller.0, query.unread).await?;
	Ok(HttpResponse::Ok().json(insights))
}

async fn create_insight(services: web::Data<Services>, caller: Caller, body: web::Json<InsightRequest>) -> ApiResult {
	let outcome = services.insights.generate(caller.0, body.into_inner()).await?;
	let mut response = if outcome.degraded {
		HttpResponse::Ok()
	} else {
		HttpResponse::Created()
	};
	Ok(response.json(outcome))
}

async fn mark_insight_read(services: web::Data<Services>, caller: Caller, path: web::Path<InsightId>) -> ApiResult {
	let insight = services.insights.mark_read(caller.0, path.into_inner()).await?;
	Ok(HttpResponse::Ok().json(insight))
}
