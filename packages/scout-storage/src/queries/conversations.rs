use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::ConversationRow};

const COLUMNS: &str =
	"conversation_id, owner_id, turns, last_query, last_results, created_at, updated_at";

pub async fn insert(db: &Db, row: &ConversationRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO conversations (
	conversation_id,
	owner_id,
	turns,
	last_query,
	last_results,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(row.conversation_id)
	.bind(row.owner_id)
	.bind(&row.turns)
	.bind(row.last_query.as_deref())
	.bind(&row.last_results)
	.bind(row.created_at)
	.bind(row.updated_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Ownership is part of the lookup; a thread owned by someone else reads as absent.
pub async fn get_owned(
	db: &Db,
	conversation_id: Uuid,
	owner_id: Uuid,
) -> Result<Option<ConversationRow>> {
	let row = sqlx::query_as::<_, ConversationRow>(&format!(
		"SELECT {COLUMNS} FROM conversations WHERE conversation_id = $1 AND owner_id = $2"
	))
	.bind(conversation_id)
	.bind(owner_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Replaces the stored context wholesale.
pub async fn update_owned(
	db: &Db,
	conversation_id: Uuid,
	owner_id: Uuid,
	turns: &Value,
	last_query: Option<&str>,
	last_results: &Value,
	now: OffsetDateTime,
) -> Result<Option<ConversationRow>> {
	let row = sqlx::query_as::<_, ConversationRow>(&format!(
		"\
UPDATE conversations
SET
	turns = $3,
	last_query = $4,
	last_results = $5,
	updated_at = $6
WHERE conversation_id = $1 AND owner_id = $2
RETURNING {COLUMNS}"
	))
	.bind(conversation_id)
	.bind(owner_id)
	.bind(turns)
	.bind(last_query)
	.bind(last_results)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
