use uuid::Uuid;

use crate::{Result, db::Db, models::CandidateRow};

/// Candidates granted to `principal_id`, oldest first.
pub async fn list_visible(db: &Db, principal_id: Uuid) -> Result<Vec<CandidateRow>> {
	let rows = sqlx::query_as::<_, CandidateRow>(
		"\
SELECT
	c.candidate_id,
	c.name,
	c.email,
	c.phone,
	c.location,
	c.skills,
	c.experience,
	c.education,
	c.salary_expectation,
	c.summary
FROM candidates c
JOIN candidate_grants g ON g.candidate_id = c.candidate_id
WHERE g.principal_id = $1
ORDER BY c.created_at ASC, c.candidate_id ASC",
	)
	.bind(principal_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

// The search path only reads `candidates` and `candidate_grants`; the résumé pipeline that owns
// them writes elsewhere. The writers below seed and administer those tables for fixtures and
// operator tooling, and nothing on the request path calls them.

/// Seeding helper: inserts or refreshes one résumé row.
pub async fn upsert_candidate(db: &Db, row: &CandidateRow) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO candidates (
	candidate_id,
	name,
	email,
	phone,
	location,
	skills,
	experience,
	education,
	salary_expectation,
	summary
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
ON CONFLICT (candidate_id) DO UPDATE
SET
	name = EXCLUDED.name,
	email = EXCLUDED.email,
	phone = EXCLUDED.phone,
	location = EXCLUDED.location,
	skills = EXCLUDED.skills,
	experience = EXCLUDED.experience,
	education = EXCLUDED.education,
	salary_expectation = EXCLUDED.salary_expectation,
	summary = EXCLUDED.summary,
	updated_at = now()",
	)
	.bind(row.candidate_id)
	.bind(row.name.as_str())
	.bind(row.email.as_deref())
	.bind(row.phone.as_deref())
	.bind(row.location.as_deref())
	.bind(&row.skills)
	.bind(&row.experience)
	.bind(&row.education)
	.bind(row.salary_expectation)
	.bind(row.summary.as_deref())
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Seeding helper: makes `candidate_id` visible to `principal_id`. Granting twice is a no-op.
pub async fn grant(db: &Db, candidate_id: Uuid, principal_id: Uuid) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO candidate_grants (candidate_id, principal_id)
VALUES ($1, $2)
ON CONFLICT (candidate_id, principal_id) DO NOTHING",
	)
	.bind(candidate_id)
	.bind(principal_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Seeding helper: withdraws a grant. Returns whether one existed.
pub async fn revoke(db: &Db, candidate_id: Uuid, principal_id: Uuid) -> Result<bool> {
	let result =
		sqlx::query("DELETE FROM candidate_grants WHERE candidate_id = $1 AND principal_id = $2")
			.bind(candidate_id)
			.bind(principal_id)
			.execute(&db.pool)
			.await?;

	Ok(result.rows_affected() > 0)
}
