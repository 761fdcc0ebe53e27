use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub analytics: Analytics,
	pub security: Security,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub reasoning: ReasoningProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReasoningProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	/// Sampling temperature for structured (blocking) answers.
	pub temperature: f32,
	/// Sampling temperature for conversational streamed answers.
	#[serde(default = "default_stream_temperature")]
	pub stream_temperature: f32,
	/// Upper bound on a single reasoning call. Exceeding it is reported as unavailable.
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub max_query_chars: u32,
	pub max_history_turns: u32,
	pub max_field_chars: u32,
	/// Bound on the text of any single history turn sent to the reasoning service.
	pub max_turn_chars: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			max_query_chars: 500,
			max_history_turns: 20,
			max_field_chars: 400,
			max_turn_chars: 2_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	/// Either "postgres" or "memory".
	pub backend: String,
	pub search_ttl_secs: i64,
	pub analytics_ttl_secs: i64,
	/// How often expired entries are deleted from the backing store.
	pub purge_interval_secs: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self {
			enabled: true,
			backend: "postgres".to_string(),
			search_ttl_secs: 3_600,
			analytics_ttl_secs: 300,
			purge_interval_secs: 600,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Analytics {
	pub max_window_days: u32,
	pub overview_popular_limit: u32,
	pub searches_popular_limit: u32,
	pub popular_window_days: u32,
}
impl Default for Analytics {
	fn default() -> Self {
		Self {
			max_window_days: 365,
			overview_popular_limit: 10,
			searches_popular_limit: 20,
			popular_window_days: 30,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	#[serde(default)]
	pub principals: Vec<PrincipalToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrincipalToken {
	pub token: String,
	pub principal_id: Uuid,
	/// One of "viewer", "manager", or "admin".
	pub role: String,
}

fn default_stream_temperature() -> f32 {
	0.7
}
