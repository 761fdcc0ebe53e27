use std::time::Duration as StdDuration;

use serde_json::json;
use time::{Duration, OffsetDateTime};

use scout_service::pg;
use scout_storage::{db::Db, models::CacheRow, queries::cache};
use scout_testkit::TestDatabase;

fn row(key: &str, created_at: OffsetDateTime, ttl_secs: i64) -> CacheRow {
	CacheRow {
		cache_key: key.to_string(),
		value: json!({ "ids": [] }),
		created_at,
		ttl_secs,
		expires_at: created_at + Duration::seconds(ttl_secs),
	}
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SCOUT_PG_DSN to run."]
async fn background_purge_deletes_only_expired_rows() {
	let Some(test_db) = TestDatabase::from_env().await.expect("Failed to create test database.")
	else {
		eprintln!(
			"Skipping background_purge_deletes_only_expired_rows; set SCOUT_PG_DSN to run this test."
		);

		return;
	};
	let db = Db::connect(&test_db.postgres(2)).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let now = OffsetDateTime::now_utc();

	cache::put(&db, &row("search:stale", now - Duration::seconds(120), 60))
		.await
		.expect("Failed to write cache.");
	cache::put(&db, &row("search:live", now, 3_600)).await.expect("Failed to write cache.");

	let purge = tokio::spawn(pg::run_cache_purge(db.clone(), StdDuration::from_millis(20)));
	let mut stale = true;

	for _ in 0..50 {
		stale = cache::get(&db, "search:stale").await.expect("Failed to read cache.").is_some();

		if !stale {
			break;
		}

		tokio::time::sleep(StdDuration::from_millis(20)).await;
	}

	purge.abort();

	assert!(!stale, "The expired row must be purged.");
	assert!(cache::get(&db, "search:live").await.expect("Failed to read cache.").is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
