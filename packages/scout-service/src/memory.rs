//! In-process collaborators for tests and single-node development.

use std::{
	collections::HashMap,
	future,
	sync::{Mutex, MutexGuard},
};

use time::OffsetDateTime;
use uuid::Uuid;

use scout_domain::{CandidateRecord, ConversationContext, ConversationThread};

use crate::{
	BoxFuture, CacheEntry, CacheStore, ConversationStore, EventLog, ResumeStore, Result,
	events::{self, EventSummary, EventWindow, SearchEvent},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|err| err.into_inner())
}

/// Candidate visibility as an explicit grant table.
#[derive(Default)]
pub struct MemoryResumeStore {
	grants: Mutex<HashMap<Uuid, Vec<CandidateRecord>>>,
}
impl MemoryResumeStore {
	pub fn grant(&self, principal_id: Uuid, record: CandidateRecord) {
		let mut grants = lock(&self.grants);
		let visible = grants.entry(principal_id).or_default();

		visible.retain(|existing| existing.id != record.id);
		visible.push(record);
	}

	pub fn revoke(&self, principal_id: Uuid, candidate_id: Uuid) {
		if let Some(visible) = lock(&self.grants).get_mut(&principal_id) {
			visible.retain(|record| record.id != candidate_id);
		}
	}
}
impl ResumeStore for MemoryResumeStore {
	fn list_visible<'a>(&'a self, principal_id: Uuid) -> BoxFuture<'a, Result<Vec<CandidateRecord>>> {
		let visible = lock(&self.grants).get(&principal_id).cloned().unwrap_or_default();

		Box::pin(future::ready(Ok(visible)))
	}
}

#[derive(Default)]
pub struct MemoryConversationStore {
	threads: Mutex<HashMap<Uuid, ConversationThread>>,
}
impl MemoryConversationStore {
	pub fn len(&self) -> usize {
		lock(&self.threads).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl ConversationStore for MemoryConversationStore {
	fn create<'a>(
		&'a self,
		principal_id: Uuid,
		first_query: &'a str,
	) -> BoxFuture<'a, Result<ConversationThread>> {
		let now = OffsetDateTime::now_utc();
		let thread = ConversationThread {
			id: Uuid::new_v4(),
			owner_id: principal_id,
			context: ConversationContext {
				last_query: Some(first_query.to_string()),
				..ConversationContext::default()
			},
			created_at: now,
			updated_at: now,
		};

		lock(&self.threads).insert(thread.id, thread.clone());

		Box::pin(future::ready(Ok(thread)))
	}

	fn get<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>> {
		let thread = lock(&self.threads)
			.get(&thread_id)
			.filter(|thread| thread.is_owned_by(principal_id))
			.cloned();

		Box::pin(future::ready(Ok(thread)))
	}

	fn update<'a>(
		&'a self,
		thread_id: Uuid,
		principal_id: Uuid,
		context: ConversationContext,
	) -> BoxFuture<'a, Result<Option<ConversationThread>>> {
		let mut threads = lock(&self.threads);
		let updated = match threads.get_mut(&thread_id) {
			Some(thread) if thread.is_owned_by(principal_id) => {
				thread.context = context;
				thread.updated_at = OffsetDateTime::now_utc();

				Some(thread.clone())
			},
			_ => None,
		};

		drop(threads);

		Box::pin(future::ready(Ok(updated)))
	}
}

#[derive(Default)]
pub struct MemoryEventLog {
	events: Mutex<Vec<SearchEvent>>,
}
impl MemoryEventLog {
	pub fn events(&self) -> Vec<SearchEvent> {
		lock(&self.events).clone()
	}
}
impl EventLog for MemoryEventLog {
	fn append<'a>(&'a self, event: SearchEvent) -> BoxFuture<'a, Result<()>> {
		lock(&self.events).push(event);

		Box::pin(future::ready(Ok(())))
	}

	fn summarize<'a>(&'a self, window: EventWindow) -> BoxFuture<'a, Result<EventSummary>> {
		let summary = events::summarize_events(&lock(&self.events), window);

		Box::pin(future::ready(Ok(summary)))
	}
}

/// Expired entries are swept out on every write, so the map holds at most the live set plus
/// whatever was written since the last `put`.
#[derive(Default)]
pub struct MemoryCacheStore {
	entries: Mutex<HashMap<String, CacheEntry>>,
}
impl MemoryCacheStore {
	pub fn len(&self) -> usize {
		lock(&self.entries).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn entry(&self, key: &str) -> Option<CacheEntry> {
		lock(&self.entries).get(key).cloned()
	}

	/// Drops every entry that is no longer fresh at `now` and returns how many went.
	pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
		let mut entries = lock(&self.entries);
		let before = entries.len();

		entries.retain(|_, entry| entry.is_fresh(now));

		before - entries.len()
	}
}
impl CacheStore for MemoryCacheStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<CacheEntry>>> {
		let entry = self.entry(key);

		Box::pin(future::ready(Ok(entry)))
	}

	fn put<'a>(&'a self, key: &'a str, entry: CacheEntry) -> BoxFuture<'a, Result<()>> {
		let purged = self.purge_expired(OffsetDateTime::now_utc());

		if purged > 0 {
			tracing::debug!(purged, "Evicted expired in-memory cache entries.");
		}

		lock(&self.entries).insert(key.to_string(), entry);

		Box::pin(future::ready(Ok(())))
	}
}
