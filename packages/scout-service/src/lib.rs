pub mod analytics;
pub mod cache;
pub mod events;
pub mod memory;
pub mod pg;
pub mod search;
pub mod stream;

mod error;

pub use analytics::{AnalyticsReport, AnalyticsRequest, ReportSummary, ReportType};
pub use error::{Error, Result};
pub use events::{DailyStat, EventSummary, EventTotals, EventWindow, PopularQuery, SearchEvent};
pub use scout_providers::ReasoningAnswer;
pub use search::{
	DeliveryMode, DeliveryPolicy, SearchOutcome, SearchRequest, SearchResponse, reconcile,
};
pub use stream::{Frame, FrameStream};

use std::{future::Future, pin::Pin, sync::Arc};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use scout_config::Config;
use scout_domain::{CandidateRecord, ConversationContext, ConversationThread, prompt::PromptContext};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Permission-scoped read access to candidate records.
pub trait ResumeStore
where
	Self: Send + Sync,
{
	fn list_visible<'a>(&'a self, principal_id: Uuid) -> BoxFuture<'a, Result<Vec<CandidateRecord>>>;
}

/// Per-thread context storage. Every operation is keyed by thread id and owner; a thread owned by
/// another principal reads as absent.
pub trait ConversationStore
where
	Self: Send + Sync,
{
	fn create<'a>(
		&'a self,
		principal_id: Uuid,
		first_query: &'a str,
	) -> BoxFuture<'a, Result<ConversationThread>>;

	fn get<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>>;

	/// Replaces the stored context wholesale.
	fn update<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
		context: ConversationContext,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>>;
}

pub trait EventLog
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, event: SearchEvent) -> BoxFuture<'a, Result<()>>;

	fn summarize<'a>(&'a self, window: EventWindow) -> BoxFuture<'a, Result<EventSummary>>;
}

/// Raw key/value access. Freshness is judged by [`cache::Cache`], not by the store.
pub trait CacheStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CacheEntry>>>;

	fn put<'a>(&'a self, key: &'a str, entry: CacheEntry) -> BoxFuture<'a, Result<()>>;
}

pub trait ReasoningGateway
where
	Self: Send + Sync,
{
	fn complete<'a>(&'a self, prompt: &'a PromptContext) -> BoxFuture<'a, Result<ReasoningAnswer>>;

	fn stream<'a>(
		&'a self,
		prompt: &'a PromptContext,
	) -> BoxFuture<'a, Result<Box<dyn FragmentSource>>>;
}

/// Finite, non-restartable sequence of answer fragments. `None` marks the end.
pub trait FragmentSource
where
	Self: Send,
{
	fn next_fragment(&mut self) -> BoxFuture<'_, Option<Result<String>>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
	pub value: Value,
	pub created_at: OffsetDateTime,
	pub ttl_secs: i64,
}
impl CacheEntry {
	pub fn new(value: Value, created_at: OffsetDateTime, ttl_secs: i64) -> Self {
		Self { value, created_at, ttl_secs }
	}

	pub fn expires_at(&self) -> OffsetDateTime {
		self.created_at + Duration::seconds(self.ttl_secs)
	}

	/// An entry whose age has reached its ttl is expired.
	pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
		now - self.created_at < Duration::seconds(self.ttl_secs)
	}
}

#[derive(Clone)]
pub struct Collaborators {
	pub resumes: Arc<dyn ResumeStore>,
	pub conversations: Arc<dyn ConversationStore>,
	pub events: Arc<dyn EventLog>,
	pub cache: Arc<dyn CacheStore>,
	pub gateway: Arc<dyn ReasoningGateway>,
}
impl Collaborators {
	pub fn new(
		resumes: Arc<dyn ResumeStore>,
		conversations: Arc<dyn ConversationStore>,
		events: Arc<dyn EventLog>,
		cache: Arc<dyn CacheStore>,
		gateway: Arc<dyn ReasoningGateway>,
	) -> Self {
		Self { resumes, conversations, events, cache, gateway }
	}
}

pub struct ScoutService {
	pub cfg: Config,
	pub collaborators: Collaborators,
}
impl ScoutService {
	pub fn new(cfg: Config, collaborators: Collaborators) -> Self {
		Self { cfg, collaborators }
	}

	pub(crate) fn cache(&self) -> cache::Cache<'_> {
		cache::Cache::new(self.collaborators.cache.as_ref(), self.cfg.cache.enabled)
	}
}
