//! Cache layer over a raw [`CacheStore`].
//!
//! Reads re-check freshness from the entry's own creation time and ttl, so an entry the store
//! has not evicted yet is still treated as absent once it is expired. Every store failure is
//! logged and reported to the caller as a miss.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{CacheEntry, CacheStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
	Search,
	Analytics,
}
impl CacheKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Search => "search",
			Self::Analytics => "analytics",
		}
	}
}

pub struct Cache<'a> {
	store: &'a dyn CacheStore,
	enabled: bool,
}
impl<'a> Cache<'a> {
	pub fn new(store: &'a dyn CacheStore, enabled: bool) -> Self {
		Self { store, enabled }
	}

	pub async fn get(&self, kind: CacheKind, key: &str, now: OffsetDateTime) -> Option<Value> {
		if !self.enabled {
			return None;
		}

		match self.store.get(key).await {
			Ok(Some(entry)) if entry.is_fresh(now) => {
				tracing::info!(
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					hit = true,
					ttl_secs = entry.ttl_secs,
					"Cache hit."
				);

				Some(entry.value)
			},
			Ok(Some(entry)) => {
				tracing::info!(
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					hit = false,
					expired = true,
					ttl_secs = entry.ttl_secs,
					"Cache miss."
				);

				None
			},
			Ok(None) => {
				tracing::info!(
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					hit = false,
					"Cache miss."
				);

				None
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					"Cache read failed."
				);

				None
			},
		}
	}

	pub async fn get_json<T>(&self, kind: CacheKind, key: &str, now: OffsetDateTime) -> Option<T>
	where
		T: DeserializeOwned,
	{
		let value = self.get(kind, key, now).await?;

		match serde_json::from_value(value) {
			Ok(decoded) => Some(decoded),
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					"Cache payload decode failed."
				);

				None
			},
		}
	}

	pub async fn put_json<T>(
		&self,
		kind: CacheKind,
		key: &str,
		value: &T,
		ttl_secs: i64,
		now: OffsetDateTime,
	) where
		T: Serialize,
	{
		if !self.enabled {
			return;
		}

		let value = match serde_json::to_value(value) {
			Ok(value) => value,
			Err(err) => {
				tracing::warn!(
					error = %err,
					cache_kind = kind.as_str(),
					cache_key_prefix = cache_key_prefix(key),
					"Cache payload encode failed."
				);

				return;
			},
		};

		match self.store.put(key, CacheEntry::new(value, now, ttl_secs)).await {
			Ok(()) => tracing::info!(
				cache_kind = kind.as_str(),
				cache_key_prefix = cache_key_prefix(key),
				ttl_secs,
				"Cache write."
			),
			Err(err) => tracing::warn!(
				error = %err,
				cache_kind = kind.as_str(),
				cache_key_prefix = cache_key_prefix(key),
				"Cache write failed."
			),
		}
	}
}

/// First twelve characters of a key, safe to log.
pub fn cache_key_prefix(key: &str) -> &str {
	match key.char_indices().nth(12) {
		Some((end, _)) => &key[..end],
		None => key,
	}
}
