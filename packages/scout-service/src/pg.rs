//! Production collaborators: Postgres-backed stores and the HTTP reasoning gateway.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use scout_config::{Config, ReasoningProviderConfig};
use scout_domain::{CandidateRecord, ConversationContext, ConversationThread, prompt::PromptContext};
use scout_providers::FragmentStream;
use scout_storage::{
	db::Db,
	models::{CacheRow, CandidateRow, ConversationRow, SearchEventRow},
	queries::{cache, candidates, conversations, events},
};

use crate::{
	BoxFuture, CacheEntry, CacheStore, Collaborators, ConversationStore, Error, EventLog,
	FragmentSource, ReasoningAnswer, ReasoningGateway, ResumeStore, Result,
	events::{DailyStat, EventSummary, EventTotals, EventWindow, PopularQuery, SearchEvent},
	memory::MemoryCacheStore,
};

impl Collaborators {
	/// Postgres stores and the configured HTTP gateway. `cache.backend = "memory"` keeps the cache
	/// in process.
	pub fn from_config(cfg: &Config, db: Db) -> Self {
		let stores = Arc::new(PgStores::new(db));
		let cache: Arc<dyn CacheStore> = match cfg.cache.backend.as_str() {
			"memory" => Arc::new(MemoryCacheStore::default()),
			_ => stores.clone(),
		};

		Self::new(
			stores.clone(),
			stores.clone(),
			stores,
			cache,
			Arc::new(HttpGateway::new(cfg.providers.reasoning.clone())),
		)
	}
}

pub struct PgStores {
	db: Db,
}
impl PgStores {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl ResumeStore for PgStores {
	fn list_visible<'a>(&'a self, principal_id: Uuid) -> BoxFuture<'a, Result<Vec<CandidateRecord>>> {
		Box::pin(async move {
			let rows = candidates::list_visible(&self.db, principal_id).await?;

			rows.into_iter().map(candidate_from_row).collect::<Result<Vec<_>>>()
		})
	}
}

impl ConversationStore for PgStores {
	fn create<'a>(
		&'a self,
		principal_id: Uuid,
		first_query: &'a str,
	) -> BoxFuture<'a, Result<ConversationThread>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let row = ConversationRow {
				conversation_id: Uuid::new_v4(),
				owner_id: principal_id,
				turns: Value::Array(Vec::new()),
				last_query: Some(first_query.to_string()),
				last_results: Value::Array(Vec::new()),
				created_at: now,
				updated_at: now,
			};

			conversations::insert(&self.db, &row).await?;

			thread_from_row(row)
		})
	}

	fn get<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>> {
		Box::pin(async move {
			conversations::get_owned(&self.db, thread_id, principal_id)
				.await?
				.map(thread_from_row)
				.transpose()
		})
	}

	fn update<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
		context: ConversationContext,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>> {
		Box::pin(async move {
			let turns = encode(&context.turns, "conversation turns")?;
			let last_results = encode(&context.last_results, "conversation results")?;

			conversations::update_owned(
				&self.db,
				thread_id,
				principal_id,
				&turns,
				context.last_query.as_deref(),
				&last_results,
				OffsetDateTime::now_utc(),
			)
			.await?
			.map(thread_from_row)
			.transpose()
		})
	}
}

impl EventLog for PgStores {
	fn append<'a>(&'a self, event: SearchEvent) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let row = SearchEventRow {
				event_id: Uuid::new_v4(),
				principal_id: event.principal_id,
				query: event.query,
				normalized_query: event.normalized_query,
				conversation_id: event.conversation_id,
				result_count: i32::try_from(event.result_count).unwrap_or(i32::MAX),
				tokens_used: event.tokens_used,
				latency_ms: event.latency_ms,
				cache_hit: event.cache_hit,
				created_at: event.created_at,
			};

			events::insert_event(&self.db, &row).await?;

			Ok(())
		})
	}

	fn summarize<'a>(&'a self, window: EventWindow) -> BoxFuture<'a, Result<EventSummary>> {
		Box::pin(async move {
			let daily = events::daily_stats(&self.db, window.daily_since).await?;
			let popular = events::popular_queries(
				&self.db,
				window.popular_since,
				i64::from(window.popular_limit),
			)
			.await?;
			let totals = events::totals(&self.db, window.daily_since).await?;

			Ok(EventSummary {
				daily: daily
					.into_iter()
					.map(|row| DailyStat {
						day: row.day,
						searches: count(row.searches),
						unique_principals: count(row.unique_principals),
						avg_results: row.avg_results,
						avg_latency_ms: row.avg_latency_ms,
						cache_hits: count(row.cache_hits),
					})
					.collect(),
				popular: popular
					.into_iter()
					.map(|row| PopularQuery {
						query: row.query,
						searches: count(row.searches),
						avg_results: row.avg_results,
					})
					.collect(),
				totals: EventTotals {
					searches: count(totals.searches),
					unique_principals: count(totals.unique_principals),
					avg_results: totals.avg_results,
					cache_hits: count(totals.cache_hits),
				},
			})
		})
	}
}

impl CacheStore for PgStores {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CacheEntry>>> {
		Box::pin(async move {
			let entry = cache::get(&self.db, key)
				.await?
				.map(|row| CacheEntry::new(row.value, row.created_at, row.ttl_secs));

			Ok(entry)
		})
	}

	fn put<'a>(&'a self, key: &'a str, entry: CacheEntry) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let row = CacheRow {
				cache_key: key.to_string(),
				expires_at: entry.expires_at(),
				value: entry.value,
				created_at: entry.created_at,
				ttl_secs: entry.ttl_secs,
			};

			cache::put(&self.db, &row).await?;

			Ok(())
		})
	}
}

pub struct HttpGateway {
	cfg: ReasoningProviderConfig,
}
impl HttpGateway {
	pub fn new(cfg: ReasoningProviderConfig) -> Self {
		Self { cfg }
	}
}
impl ReasoningGateway for HttpGateway {
	fn complete<'a>(&'a self, prompt: &'a PromptContext) -> BoxFuture<'a, Result<ReasoningAnswer>> {
		Box::pin(async move { Ok(scout_providers::complete(&self.cfg, &prompt.messages()).await?) })
	}

	fn stream<'a>(
		&'a self,
		prompt: &'a PromptContext,
	) -> BoxFuture<'a, Result<Box<dyn FragmentSource>>> {
		Box::pin(async move {
			let source = scout_providers::stream(&self.cfg, &prompt.messages()).await?;

			Ok(Box::new(source) as Box<dyn FragmentSource>)
		})
	}
}

impl FragmentSource for FragmentStream {
	fn next_fragment(&mut self) -> BoxFuture<'_, Option<Result<String>>> {
		Box::pin(async move {
			FragmentStream::next_fragment(self).await.map(|fragment| fragment.map_err(Error::from))
		})
	}
}

/// Deletes expired `kv_cache` rows every `every` until the task is dropped. Failures are logged and
/// retried on the next tick.
pub async fn run_cache_purge(db: Db, every: std::time::Duration) {
	let mut ticker = tokio::time::interval(every);

	ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		match cache::purge_expired(&db, OffsetDateTime::now_utc()).await {
			Ok(purged) => tracing::debug!(purged, "Purged expired cache entries."),
			Err(err) => tracing::error!(error = %err, "Cache cleanup failed."),
		}
	}
}

fn candidate_from_row(row: CandidateRow) -> Result<CandidateRecord> {
	Ok(CandidateRecord {
		id: row.candidate_id,
		name: row.name,
		email: row.email,
		phone: row.phone,
		location: row.location,
		skills: decode(row.skills, "candidate skills")?,
		experience: decode(row.experience, "candidate experience")?,
		education: decode(row.education, "candidate education")?,
		salary_expectation: row.salary_expectation,
		summary: row.summary,
	})
}

fn thread_from_row(row: ConversationRow) -> Result<ConversationThread> {
	Ok(ConversationThread {
		id: row.conversation_id,
		owner_id: row.owner_id,
		context: ConversationContext {
			turns: decode(row.turns, "conversation turns")?,
			last_query: row.last_query,
			last_results: decode(row.last_results, "conversation results")?,
		},
		created_at: row.created_at,
		updated_at: row.updated_at,
	})
}

fn decode<T>(value: Value, label: &str) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_value(value).map_err(|err| Error::PersistenceUnavailable {
		message: format!("Invalid {label} value: {err}"),
	})
}

fn encode<T>(value: &T, label: &str) -> Result<Value>
where
	T: Serialize,
{
	serde_json::to_value(value).map_err(|err| Error::PersistenceUnavailable {
		message: format!("Failed to encode {label}: {err}"),
	})
}

fn count(value: i64) -> u64 {
	u64::try_from(value).unwrap_or_default()
}
