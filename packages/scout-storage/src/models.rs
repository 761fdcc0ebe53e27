use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRow {
	pub candidate_id: Uuid,
	pub name: String,
	pub email: Option<String>,
	pub phone: Option<String>,
	pub location: Option<String>,
	pub skills: Value,
	pub experience: Value,
	pub education: Value,
	pub salary_expectation: Option<i64>,
	pub summary: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
	pub conversation_id: Uuid,
	pub owner_id: Uuid,
	pub turns: Value,
	pub last_query: Option<String>,
	pub last_results: Value,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchEventRow {
	pub event_id: Uuid,
	pub principal_id: Uuid,
	pub query: String,
	pub normalized_query: String,
	pub conversation_id: Option<Uuid>,
	pub result_count: i32,
	pub tokens_used: i64,
	pub latency_ms: i64,
	pub cache_hit: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheRow {
	pub cache_key: String,
	pub value: Value,
	pub created_at: OffsetDateTime,
	pub ttl_secs: i64,
	pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DailyStatRow {
	pub day: String,
	pub searches: i64,
	pub unique_principals: i64,
	pub avg_results: f64,
	pub avg_latency_ms: f64,
	pub cache_hits: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PopularQueryRow {
	pub query: String,
	pub searches: i64,
	pub avg_results: f64,
}

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct EventTotalsRow {
	pub searches: i64,
	pub unique_principals: i64,
	pub avg_results: f64,
	pub cache_hits: i64,
}
