//! Durable pending-set and shadow-profile cache. Producers enqueue
//! candidate ids; the sync worker pops a batch atomically, re-derives each
//! profile from the relational source, and writes it back with a TTL.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::CandidateProjection};

pub const PROFILE_TTL_DAYS: i64 = 30;

/// Idempotent: re-enqueueing an already-pending id is a no-op.
pub async fn enqueue_pending(db: &Db, ids: &[Uuid], now: OffsetDateTime) -> Result<u64> {
	if ids.is_empty() {
		return Ok(0);
	}

	let result = sqlx::query(
		"\
INSERT INTO shadow_sync_pending (candidate_id, enqueued_at)
SELECT unnest($1::uuid[]), $2
ON CONFLICT (candidate_id) DO NOTHING",
	)
	.bind(ids)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(result.rows_affected())
}

/// Atomically removes and returns up to `limit` pending ids. Concurrent
/// workers skip locked rows, so an id is handed to exactly one of them.
pub async fn pop_pending(db: &Db, limit: i64) -> Result<Vec<Uuid>> {
	let rows: Vec<(Uuid,)> = sqlx::query_as(
		"\
DELETE FROM shadow_sync_pending
WHERE candidate_id IN (
	SELECT candidate_id
	FROM shadow_sync_pending
	ORDER BY enqueued_at ASC
	LIMIT $1
	FOR UPDATE SKIP LOCKED
)
RETURNING candidate_id",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Writes one batch of shadow profiles. Location and title are lower-cased
/// at write time so lookups never case-fold. Re-running with the same
/// projections converges on the same rows.
pub async fn upsert_profiles(
	db: &Db,
	candidates: &[CandidateProjection],
	now: OffsetDateTime,
) -> Result<u64> {
	if candidates.is_empty() {
		return Ok(0);
	}

	let expires_at = now + Duration::days(PROFILE_TTL_DAYS);
	let mut builder = sqlx::QueryBuilder::new(
		"INSERT INTO shadow_profiles (candidate_id, location, title, years_experience, indexed_at, expires_at) ",
	);

	builder.push_values(candidates, |mut row, candidate| {
		row.push_bind(candidate.candidate_id)
			.push_bind(candidate.location.as_deref().map(str::to_lowercase))
			.push_bind(candidate.title.as_deref().map(str::to_lowercase))
			.push_bind(candidate.years_experience)
			.push_bind(now)
			.push_bind(expires_at);
	});
	builder.push(
		"\
 ON CONFLICT (candidate_id) DO UPDATE
SET location = EXCLUDED.location,
	title = EXCLUDED.title,
	years_experience = EXCLUDED.years_experience,
	indexed_at = EXCLUDED.indexed_at,
	expires_at = EXCLUDED.expires_at",
	);

	let result = builder.build().execute(&db.pool).await?;

	Ok(result.rows_affected())
}

pub async fn load_profile(
	db: &Db,
	candidate_id: Uuid,
) -> Result<Option<crate::models::ShadowProfile>> {
	let row = sqlx::query_as::<_, crate::models::ShadowProfile>(
		"\
SELECT candidate_id, location, title, years_experience, indexed_at, expires_at
FROM shadow_profiles
WHERE candidate_id = $1",
	)
	.bind(candidate_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn purge_expired(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM shadow_profiles WHERE expires_at <= $1")
		.bind(now)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}

pub async fn pending_count(db: &Db) -> Result<u64> {
	let (count,): (i64,) =
		sqlx::query_as("SELECT count(*) FROM shadow_sync_pending").fetch_one(&db.pool).await?;

	Ok(count.max(0) as u64)
}
