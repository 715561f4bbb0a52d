use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::CandidateProjection};

pub async fn count(db: &Db) -> Result<u64> {
	let (count,): (i64,) =
		sqlx::query_as("SELECT count(*) FROM candidates").fetch_one(&db.pool).await?;

	Ok(count.max(0) as u64)
}

/// Minimal projections for the given ids. Ids without a row are simply
/// absent from the result; callers treat the gap as a skip, not an error.
pub async fn load_projection(db: &Db, ids: &[Uuid]) -> Result<Vec<CandidateProjection>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, CandidateProjection>(
		"\
SELECT candidate_id, title, location, years_experience, skills
FROM candidates
WHERE candidate_id = ANY($1)",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn upsert(
	db: &Db,
	candidate_id: Uuid,
	full_name: &str,
	title: Option<&str>,
	location: Option<&str>,
	years_experience: Option<f32>,
	skills: Value,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO candidates (candidate_id, full_name, title, location, years_experience, skills, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (candidate_id) DO UPDATE
SET full_name = EXCLUDED.full_name,
	title = EXCLUDED.title,
	location = EXCLUDED.location,
	years_experience = EXCLUDED.years_experience,
	skills = EXCLUDED.skills,
	updated_at = EXCLUDED.updated_at",
	)
	.bind(candidate_id)
	.bind(full_name)
	.bind(title)
	.bind(location)
	.bind(years_experience)
	.bind(skills)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(())
}
