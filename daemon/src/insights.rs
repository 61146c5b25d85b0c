//! Generated insights and species suggestions.
//!
//! The text generator is an opaque collaborator. It is always called
//! under a timeout and never while a store write is in flight; when it
//! fails the caller gets a locally composed message and nothing is
//! stored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grove_core::models::{AiInsight, InsightId, InsightRequest, NewInsight, UserId};
use grove_core::prompt::{self, InsightPrompt};
use grove_core::suggest::{self, Suggestions};
use grove_core::{Clock, GroveError, GroveResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::Store;

pub const DEFAULT_ENDPOINT: &str = "https://router.huggingface.co/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3-0324";

#[derive(Debug, Error)]
pub enum GenerateError {
	#[error("text generator not configured: {0}")]
	Unavailable(String),

	#[error("request failed: {0}")]
	Http(String),

	#[error("unexpected response: {0}")]
	BadResponse(String),

	#[error("timed out after {0:?}")]
	TimedOut(Duration),
}

impl From<GenerateError> for GroveError {
	fn from(err: GenerateError) -> Self {
		GroveError::ExternalService(err.to_string())
	}
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
	async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

// ============================================================================
// Chat-completions client
// ============================================================================

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
	pub endpoint: String,
	pub model: String,
	pub api_key: Option<String>,
	pub timeout: Duration,
	pub max_tokens: u32,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.to_string(),
			model: DEFAULT_MODEL.to_string(),
			api_key: None,
			timeout: Duration::from_secs(20),
			max_tokens: 300,
		}
	}
}

/// OpenAI-compatible `chat/completions` endpoint.
pub struct ChatCompletionsClient {
	http: reqwest::Client,
	config: GeneratorConfig,
	api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
	model: &'a str,
	messages: [ChatMessage<'a>; 1],
	max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
	role: &'a str,
	content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
	#[serde(default)]
	choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
	message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
	#[serde(default)]
	content: Option<String>,
}

impl ChatResponse {
	fn into_text(self) -> Result<String, GenerateError> {
		self.choices
			.into_iter()
			.next()
			.and_then(|c| c.message.content)
			.map(|text| text.trim().to_string())
			.filter(|text| !text.is_empty())
			.ok_or_else(|| GenerateError::BadResponse("no content in first choice".into()))
	}
}

impl ChatCompletionsClient {
	pub fn new(config: GeneratorConfig, api_key: String) -> Self {
		let http = reqwest::Client::builder()
			.timeout(config.timeout)
			.user_agent(concat!("grove/", env!("CARGO_PKG_VERSION")))
			.build()
			.unwrap_or_default();
		Self { http, config, api_key }
	}
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
	async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
		let body = ChatRequest {
			model: &self.config.model,
			messages: [ChatMessage {
				role: "user",
				content: prompt,
			}],
			max_tokens: self.config.max_tokens,
		};

		let response = self
			.http
			.post(&self.config.endpoint)
			.bearer_auth(&self.api_key)
			.json(&body)
			.send()
			.await
			.map_err(|e| GenerateError::Http(e.to_string()))?
			.error_for_status()
			.map_err(|e| GenerateError::Http(e.to_string()))?;

		let parsed: ChatResponse = response
			.json()
			.await
			.map_err(|e| GenerateError::BadResponse(e.to_string()))?;
		parsed.into_text()
	}
}

/// Stands in when no API key is configured. Every call fails, so every
/// insight degrades to the local fallback.
pub struct Unconfigured;

#[async_trait]
impl TextGenerator for Unconfigured {
	async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
		Err(GenerateError::Unavailable("no API key set".into()))
	}
}

pub fn generator_from_config(config: GeneratorConfig) -> Arc<dyn TextGenerator> {
	match config.api_key.clone().filter(|k| !k.trim().is_empty()) {
		Some(key) => Arc::new(ChatCompletionsClient::new(config, key)),
		None => {
			warn!("no text generator API key; insights will use local fallbacks");
			Arc::new(Unconfigured)
		}
	}
}

// ============================================================================
// Service
// ============================================================================

/// Result of an insight request. `insight` is only set when the text came
/// from the generator and was stored.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightOutcome {
	pub insight: Option<AiInsight>,
	pub message: String,
	pub degraded: bool,
}

#[derive(Clone)]
pub struct InsightService {
	store: Arc<dyn Store>,
	clock: Arc<dyn Clock>,
	generator: Arc<dyn TextGenerator>,
	timeout: Duration,
}

impl InsightService {
	pub fn new(
		store: Arc<dyn Store>,
		clock: Arc<dyn Clock>,
		generator: Arc<dyn TextGenerator>,
		timeout: Duration,
	) -> Self {
		Self {
			store,
			clock,
			generator,
			timeout,
		}
	}

	pub async fn generate(&self, user_id: UserId, request: InsightRequest) -> GroveResult<InsightOutcome> {
		let adoption = self
			.store
			.get_adoption(request.adoption_id)
			.await?
			.ok_or_else(|| GroveError::not_found("adoption", request.adoption_id))?;
		adoption.check_access(user_id)?;
		let species = match adoption.species_id {
			Some(id) => self.store.get_species(id).await?,
			None => None,
		};

		let now = self.clock.now();
		let prompt = InsightPrompt::for_adoption(&adoption, species.as_ref(), request.insight_type, now);

		let message = match self.ask(&prompt.render()).await {
			Ok(message) => message,
			Err(err) => {
				warn!(adoption = adoption.id, error = %GroveError::from(err), "insight degraded to fallback");
				return Ok(InsightOutcome {
					insight: None,
					message: prompt.fallback_message(),
					degraded: true,
				});
			}
		};

		let insight = self
			.store
			.insert_insight(NewInsight {
				user_id,
				species_id: adoption.species_id,
				adoption_id: Some(adoption.id),
				insight_type: request.insight_type,
				message: message.clone(),
				created_at: now,
			})
			.await?;
		info!(insight = insight.id, adoption = adoption.id, kind = %insight.insight_type, "insight stored");

		Ok(InsightOutcome {
			insight: Some(insight),
			message,
			degraded: false,
		})
	}

	/// Newest first.
	pub async fn list(&self, user_id: UserId, unread_only: bool) -> GroveResult<Vec<AiInsight>> {
		Ok(self.store.list_insights(user_id, unread_only).await?)
	}

	pub async fn mark_read(&self, user_id: UserId, insight_id: InsightId) -> GroveResult<AiInsight> {
		let mut insight = self
			.store
			.get_insight(insight_id)
			.await?
			.ok_or_else(|| GroveError::not_found("insight", insight_id))?;
		if insight.user_id != user_id {
			return Err(GroveError::Authorization(format!(
				"insight {insight_id} belongs to another user"
			)));
		}
		if !self.store.mark_insight_read(insight_id).await? {
			return Err(GroveError::not_found("insight", insight_id));
		}
		insight.is_read = true;
		Ok(insight)
	}

	/// Drought-resistant species the generator proposes for `region`.
	pub async fn suggest_species(&self, region: &str) -> GroveResult<Suggestions> {
		let region = region.trim();
		if region.is_empty() {
			return Err(GroveError::validation("region is required"));
		}
		match self.ask(&prompt::suggestion_prompt(region)).await {
			Ok(text) => Ok(suggest::parse_suggestions(&text)),
			Err(err) => {
				warn!(region, error = %err, "species suggestions unavailable");
				Ok(Suggestions::Unavailable)
			}
		}
	}

	async fn ask(&self, prompt: &str) -> Result<String, GenerateError> {
		let text = tokio::time::timeout(self.timeout, self.generator.generate(prompt))
			.await
			.map_err(|_| GenerateError::TimedOut(self.timeout))??;
		let text = text.trim();
		if text.is_empty() {
			return Err(GenerateError::BadResponse("empty text".into()));
		}
		Ok(text.to_string())
	}
}
