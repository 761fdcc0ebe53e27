//! The search orchestrator.
//!
//! One entry point serves both delivery modes. What each mode does with the cache, the
//! conversation store, and the event log is decided by [`DeliveryPolicy::for_mode`]; the
//! transport is the only other difference.

use std::{collections::HashSet, time::Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use scout_domain::{
	CandidateRecord, ConversationContext, ConversationThread, Principal, Turn,
	prompt::{self, EMPTY_SCOPE_EXPLANATION, PromptContext, PromptLimits, PromptStyle},
	query,
};

use crate::{
	Error, FragmentSource, ReasoningAnswer, Result, ScoutService,
	cache::CacheKind,
	events::SearchEvent,
	stream::{self, FrameStream},
};

pub const NO_EXPLANATION: &str = "No explanation provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
	#[default]
	Complete,
	Stream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
	pub style: PromptStyle,
	pub use_cache: bool,
	pub persist_conversation: bool,
	pub log_event: bool,
	pub accepts_thread: bool,
	/// Deliver fragments incrementally instead of one structured answer.
	pub streams: bool,
}
impl DeliveryPolicy {
	pub const fn for_mode(mode: DeliveryMode) -> Self {
		match mode {
			DeliveryMode::Complete => Self {
				style: PromptStyle::Structured,
				use_cache: true,
				persist_conversation: true,
				log_event: true,
				accepts_thread: true,
				streams: false,
			},
			DeliveryMode::Stream => Self {
				style: PromptStyle::Conversational,
				use_cache: false,
				persist_conversation: false,
				log_event: false,
				accepts_thread: false,
				streams: true,
			},
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
	pub query: String,
	pub conversation_id: Option<Uuid>,
	/// Prior turns supplied by the caller; ignored when a stored thread is resumed.
	pub history: Vec<Turn>,
	pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<CandidateRecord>,
	pub explanation: String,
	pub cached: bool,
	pub conversation_id: Option<Uuid>,
}

pub enum SearchOutcome {
	Complete(SearchResponse),
	Stream(FrameStream),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
	/// In-scope matches in the order the reasoning service ranked them.
	pub kept: Vec<CandidateRecord>,
	/// Count of ids that were out of scope or unparseable.
	pub dropped: usize,
}

/// Keeps only ids that belong to `scope`, preserving the given order and removing duplicates.
pub fn reconcile(scope: &[CandidateRecord], ids: &[String]) -> Reconciled {
	let mut seen = HashSet::with_capacity(ids.len());
	let mut kept = Vec::with_capacity(ids.len().min(scope.len()));
	let mut dropped = 0;

	for raw in ids {
		let Some(record) = Uuid::parse_str(raw.trim())
			.ok()
			.and_then(|id| scope.iter().find(|record| record.id == id))
		else {
			dropped += 1;

			continue;
		};

		if seen.insert(record.id) {
			kept.push(record.clone());
		}
	}

	Reconciled { kept, dropped }
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedSearch {
	ids: Vec<String>,
	explanation: String,
}

struct Served<'a> {
	principal: &'a Principal,
	query: &'a str,
	normalized: &'a str,
	conversation_id: Option<Uuid>,
	result_count: usize,
	response_text: &'a str,
	cache_hit: bool,
	started: Instant,
}

impl ScoutService {
	pub async fn search(&self, principal: &Principal, req: SearchRequest) -> Result<SearchOutcome> {
		let started = Instant::now();
		let policy = DeliveryPolicy::for_mode(req.delivery);
		let query = query::validate_query(&req.query, self.cfg.search.max_query_chars)?;

		if req.conversation_id.is_some() && !policy.accepts_thread {
			return Err(Error::InvalidInput {
				message: "Streaming search does not accept a conversation_id.".to_string(),
			});
		}

		let normalized = query::normalize_query(query);
		let cache_key = query::search_cache_key(principal.id, query);

		if policy.use_cache
			&& let Some(cached) = self
				.cache()
				.get_json::<CachedSearch>(CacheKind::Search, &cache_key, OffsetDateTime::now_utc())
				.await
		{
			// A supplied thread must still belong to the caller, even though a hit never touches it.
			if let Some(thread_id) = req.conversation_id {
				self.owned_thread(thread_id, principal).await?;
			}

			// Cached ids are re-resolved so revoked candidates never resurface.
			let scope = self.resolve_scope(principal).await?;
			let reconciled = reconcile(&scope, &cached.ids);

			if policy.log_event {
				self.record_event(Served {
					principal,
					query,
					normalized: &normalized,
					conversation_id: req.conversation_id,
					result_count: reconciled.kept.len(),
					response_text: &cached.explanation,
					cache_hit: true,
					started,
				})
				.await;
			}

			return Ok(SearchOutcome::Complete(SearchResponse {
				results: reconciled.kept,
				explanation: cached.explanation,
				cached: true,
				conversation_id: req.conversation_id,
			}));
		}

		let scope = self.resolve_scope(principal).await?;
		let thread = match req.conversation_id {
			Some(thread_id) => Some(self.owned_thread(thread_id, principal).await?),
			None => None,
		};
		let history = match &thread {
			Some(thread) => thread.turns(),
			None => req.history.as_slice(),
		};
		let limits = PromptLimits::from(&self.cfg.search);
		let Some(prompt) = prompt::assemble(&scope, history, query, policy.style, limits) else {
			tracing::info!(
				stage = "scope_resolved",
				principal_id = %principal.id,
				"Empty search scope."
			);

			if policy.streams {
				return Ok(SearchOutcome::Stream(stream::single(EMPTY_SCOPE_EXPLANATION)));
			}
			if policy.log_event {
				self.record_event(Served {
					principal,
					query,
					normalized: &normalized,
					conversation_id: req.conversation_id,
					result_count: 0,
					response_text: EMPTY_SCOPE_EXPLANATION,
					cache_hit: false,
					started,
				})
				.await;
			}

			return Ok(SearchOutcome::Complete(SearchResponse {
				results: Vec::new(),
				explanation: EMPTY_SCOPE_EXPLANATION.to_string(),
				cached: false,
				conversation_id: req.conversation_id,
			}));
		};

		if policy.streams {
			let source = self.open_stream(&prompt).await?;

			tracing::info!(
				stage = "gateway_invoked",
				principal_id = %principal.id,
				latency_ms = started.elapsed().as_millis() as u64,
				"Streaming search started."
			);

			return Ok(SearchOutcome::Stream(stream::transcode(source)));
		}

		let answer = self.complete(&prompt).await?;
		let reconciled = reconcile(&scope, &answer.matched_ids);
		let explanation = answer.explanation.unwrap_or_else(|| NO_EXPLANATION.to_string());

		tracing::info!(
			stage = "reconciled",
			principal_id = %principal.id,
			matched = reconciled.kept.len(),
			dropped = reconciled.dropped,
			"Reasoning answer reconciled."
		);

		let conversation_id = if policy.persist_conversation {
			let base = match &thread {
				Some(thread) => thread.turns(),
				None => prompt.history.as_slice(),
			};
			let context = ConversationContext::advance(base, query, &explanation, &reconciled.kept);

			Some(self.save_turn(principal, thread.as_ref().map(|t| t.id), query, context).await?)
		} else {
			req.conversation_id
		};

		if policy.log_event {
			self.record_event(Served {
				principal,
				query,
				normalized: &normalized,
				conversation_id,
				result_count: reconciled.kept.len(),
				response_text: &explanation,
				cache_hit: false,
				started,
			})
			.await;
		}
		if policy.use_cache {
			let cached = CachedSearch {
				ids: reconciled.kept.iter().map(|record| record.id.to_string()).collect(),
				explanation: explanation.clone(),
			};

			self.cache()
				.put_json(
					CacheKind::Search,
					&cache_key,
					&cached,
					self.cfg.cache.search_ttl_secs,
					OffsetDateTime::now_utc(),
				)
				.await;
		}

		Ok(SearchOutcome::Complete(SearchResponse {
			results: reconciled.kept,
			explanation,
			cached: false,
			conversation_id,
		}))
	}

	async fn resolve_scope(&self, principal: &Principal) -> Result<Vec<CandidateRecord>> {
		self.collaborators.resumes.list_visible(principal.id).await.map_err(persistence)
	}

	async fn owned_thread(
		&self,
		thread_id: Uuid,
		principal: &Principal,
	) -> Result<ConversationThread> {
		self.collaborators
			.conversations
			.get(thread_id, principal.id)
			.await
			.map_err(persistence)?
			.ok_or_else(not_owned)
	}

	async fn complete(&self, prompt: &PromptContext) -> Result<ReasoningAnswer> {
		let timeout_ms = self.cfg.providers.reasoning.timeout_ms;

		match tokio::time::timeout(
			std::time::Duration::from_millis(timeout_ms),
			self.collaborators.gateway.complete(prompt),
		)
		.await
		{
			Ok(result) => result.map_err(reasoning),
			Err(_) => Err(timed_out(timeout_ms)),
		}
	}

	async fn open_stream(&self, prompt: &PromptContext) -> Result<Box<dyn FragmentSource>> {
		let timeout_ms = self.cfg.providers.reasoning.timeout_ms;

		match tokio::time::timeout(
			std::time::Duration::from_millis(timeout_ms),
			self.collaborators.gateway.stream(prompt),
		)
		.await
		{
			Ok(result) => result.map_err(reasoning),
			Err(_) => Err(timed_out(timeout_ms)),
		}
	}

	/// Creates the thread on first use, then stores the full new context. Returns the thread id.
	async fn save_turn(
		&self,
		principal: &Principal,
		thread_id: Option<Uuid>,
		query: &str,
		context: ConversationContext,
	) -> Result<Uuid> {
		let conversations = &self.collaborators.conversations;
		let thread_id = match thread_id {
			Some(thread_id) => thread_id,
			None => conversations.create(principal.id, query).await.map_err(persistence)?.id,
		};

		conversations
			.update(thread_id, principal.id, context)
			.await
			.map_err(persistence)?
			.map(|thread| thread.id)
			.ok_or_else(not_owned)
	}

	async fn record_event(&self, served: Served<'_>) {
		let latency_ms = served.started.elapsed().as_millis() as i64;
		let event = SearchEvent {
			principal_id: served.principal.id,
			query: served.query.to_string(),
			normalized_query: served.normalized.to_string(),
			conversation_id: served.conversation_id,
			result_count: served.result_count as u32,
			tokens_used: query::estimate_tokens(served.response_text),
			latency_ms,
			cache_hit: served.cache_hit,
			created_at: OffsetDateTime::now_utc(),
		};

		tracing::info!(
			stage = "logged",
			principal_id = %served.principal.id,
			latency_ms,
			cache_hit = served.cache_hit,
			matched = served.result_count,
			"Search served."
		);

		if let Err(err) = self.collaborators.events.append(event).await {
			tracing::warn!(error = %err, principal_id = %served.principal.id, "Event append failed.");
		}
	}
}

// Absent and foreign threads are indistinguishable to the caller.
fn not_owned() -> Error {
	Error::Forbidden { message: "Conversation does not belong to the caller.".to_string() }
}

fn persistence(err: Error) -> Error {
	match err {
		Error::PersistenceUnavailable { .. } | Error::Forbidden { .. } => err,
		other => Error::PersistenceUnavailable { message: other.to_string() },
	}
}

fn reasoning(err: Error) -> Error {
	match err {
		Error::ReasoningUnavailable { .. } => err,
		other => Error::ReasoningUnavailable { message: other.to_string() },
	}
}

fn timed_out(timeout_ms: u64) -> Error {
	Error::ReasoningUnavailable {
		message: format!("Reasoning service did not answer within {timeout_ms} ms."),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn record(name: &str) -> CandidateRecord {
		CandidateRecord {
			id: Uuid::new_v4(),
			name: name.to_string(),
			email: None,
			phone: None,
			location: None,
			skills: Vec::new(),
			experience: Vec::new(),
			education: Vec::new(),
			salary_expectation: None,
			summary: None,
		}
	}

	#[test]
	fn reconcile_intersects_with_scope() {
		let a = record("A");
		let b = record("B");
		let foreign = Uuid::new_v4().to_string();
		let reconciled = reconcile(&[a.clone(), b], &[a.id.to_string(), foreign]);

		assert_eq!(reconciled.kept, vec![a]);
		assert_eq!(reconciled.dropped, 1);
	}

	#[test]
	fn reconcile_keeps_ranking_and_drops_duplicates() {
		let a = record("A");
		let b = record("B");
		let ids = vec![b.id.to_string(), "not-an-id".to_string(), a.id.to_string(), b.id.to_string()];
		let reconciled = reconcile(&[a.clone(), b.clone()], &ids);

		assert_eq!(reconciled.kept, vec![b, a]);
		assert_eq!(reconciled.dropped, 1);
	}

	#[test]
	fn stream_policy_disables_every_side_effect() {
		let policy = DeliveryPolicy::for_mode(DeliveryMode::Stream);

		assert!(!policy.use_cache);
		assert!(!policy.persist_conversation);
		assert!(!policy.log_event);
		assert!(!policy.accepts_thread);
		assert!(policy.streams);

		let complete = DeliveryPolicy::for_mode(DeliveryMode::Complete);

		assert!(complete.log_event);
		assert!(!complete.streams);
	}
}
