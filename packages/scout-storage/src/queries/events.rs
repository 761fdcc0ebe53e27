use time::OffsetDateTime;

use crate::{
	Result,
	db::Db,
	models::{DailyStatRow, EventTotalsRow, PopularQueryRow, SearchEventRow},
};

pub async fn insert_event(db: &Db, row: &SearchEventRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO search_events (
	event_id,
	principal_id,
	query,
	normalized_query,
	conversation_id,
	result_count,
	tokens_used,
	latency_ms,
	cache_hit,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
	)
	.bind(row.event_id)
	.bind(row.principal_id)
	.bind(row.query.as_str())
	.bind(row.normalized_query.as_str())
	.bind(row.conversation_id)
	.bind(row.result_count)
	.bind(row.tokens_used)
	.bind(row.latency_ms)
	.bind(row.cache_hit)
	.bind(row.created_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// One row per UTC day with at least one search since `since`, oldest first.
pub async fn daily_stats(db: &Db, since: OffsetDateTime) -> Result<Vec<DailyStatRow>> {
	let rows = sqlx::query_as::<_, DailyStatRow>(
		"\
SELECT
	to_char(date_trunc('day', created_at AT TIME ZONE 'UTC'), 'YYYY-MM-DD') AS day,
	COUNT(*) AS searches,
	COUNT(DISTINCT principal_id) AS unique_principals,
	COALESCE(AVG(result_count), 0)::float8 AS avg_results,
	COALESCE(AVG(latency_ms), 0)::float8 AS avg_latency_ms,
	COUNT(*) FILTER (WHERE cache_hit) AS cache_hits
FROM search_events
WHERE created_at >= $1
GROUP BY 1
ORDER BY 1 ASC",
	)
	.bind(since)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn popular_queries(
	db: &Db,
	since: OffsetDateTime,
	limit: i64,
) -> Result<Vec<PopularQueryRow>> {
	let rows = sqlx::query_as::<_, PopularQueryRow>(
		"\
SELECT
	normalized_query AS query,
	COUNT(*) AS searches,
	COALESCE(AVG(result_count), 0)::float8 AS avg_results
FROM search_events
WHERE created_at >= $1
GROUP BY normalized_query
ORDER BY searches DESC, query ASC
LIMIT $2",
	)
	.bind(since)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn totals(db: &Db, since: OffsetDateTime) -> Result<EventTotalsRow> {
	let row = sqlx::query_as::<_, EventTotalsRow>(
		"\
SELECT
	COUNT(*) AS searches,
	COUNT(DISTINCT principal_id) AS unique_principals,
	COALESCE(AVG(result_count), 0)::float8 AS avg_results,
	COUNT(*) FILTER (WHERE cache_hit) AS cache_hits
FROM search_events
WHERE created_at >= $1",
	)
	.bind(since)
	.fetch_one(&db.pool)
	.await?;

	Ok(row)
}
