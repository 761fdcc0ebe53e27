use time::OffsetDateTime;

use crate::{Result, db::Db, models::CacheRow};

/// Raw read. Expiry is judged by the caller from `created_at` and `ttl_secs`.
pub async fn get(db: &Db, cache_key: &str) -> Result<Option<CacheRow>> {
	let row = sqlx::query_as::<_, CacheRow>(
		"SELECT cache_key, value, created_at, ttl_secs, expires_at FROM kv_cache WHERE cache_key = $1",
	)
	.bind(cache_key)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn put(db: &Db, row: &CacheRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO kv_cache (cache_key, value, created_at, ttl_secs, expires_at)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (cache_key) DO UPDATE
SET
	value = EXCLUDED.value,
	created_at = EXCLUDED.created_at,
	ttl_secs = EXCLUDED.ttl_secs,
	expires_at = EXCLUDED.expires_at",
	)
	.bind(row.cache_key.as_str())
	.bind(&row.value)
	.bind(row.created_at)
	.bind(row.ttl_secs)
	.bind(row.expires_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn purge_expired(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let result =
		sqlx::query("DELETE FROM kv_cache WHERE expires_at <= $1").bind(now).execute(&db.pool).await?;

	Ok(result.rows_affected())
}
