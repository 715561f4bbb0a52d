//! Background job queue with per-logical-key dedup. One live job per
//! `(kind, dedup_key)` pair; completed jobs are deleted, exhausted jobs are
//! parked as dead and purged after a retention window.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::SyncJob};

const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_ERROR_CHARS: usize = 1_024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueOutcome {
	Queued(Uuid),
	/// A live job with the same `(kind, dedup_key)` already exists. Benign;
	/// callers swallow it.
	Duplicate,
}

pub async fn enqueue(
	db: &Db,
	kind: &str,
	dedup_key: &str,
	payload: Value,
	now: OffsetDateTime,
) -> Result<EnqueueOutcome> {
	let job_id = Uuid::new_v4();
	let result = sqlx::query(
		"\
INSERT INTO sync_jobs (job_id, kind, dedup_key, payload, status, available_at, created_at, updated_at)
VALUES ($1, $2, $3, $4, 'PENDING', $5, $5, $5)
ON CONFLICT (kind, dedup_key) WHERE status IN ('PENDING', 'FAILED', 'CLAIMED') DO NOTHING",
	)
	.bind(job_id)
	.bind(kind)
	.bind(dedup_key)
	.bind(payload)
	.bind(now)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		Ok(EnqueueOutcome::Duplicate)
	} else {
		Ok(EnqueueOutcome::Queued(job_id))
	}
}

/// Claims the next due job and leases it. Concurrent workers skip each
/// other's locked rows, so a job is claimed by at most one worker per lease.
pub async fn claim(db: &Db, now: OffsetDateTime, lease_seconds: i64) -> Result<Option<SyncJob>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, SyncJob>(
		"\
SELECT job_id, kind, dedup_key, payload, status, attempts, last_error, available_at, created_at, updated_at
FROM sync_jobs
WHERE status IN ('PENDING', 'FAILED', 'CLAIMED') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + Duration::seconds(lease_seconds);

		sqlx::query(
			"UPDATE sync_jobs SET status = 'CLAIMED', available_at = $1, updated_at = $2 WHERE job_id = $3",
		)
		.bind(lease_until)
		.bind(now)
		.bind(job.job_id)
		.execute(&mut *tx)
		.await?;

		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

/// Remove-on-complete: a finished job leaves no row behind, which frees its
/// dedup key for the next submission.
pub async fn complete(db: &Db, job_id: Uuid) -> Result<()> {
	sqlx::query("DELETE FROM sync_jobs WHERE job_id = $1").bind(job_id).execute(&db.pool).await?;

	Ok(())
}

/// Records a failure with capped exponential backoff; after `max_attempts`
/// the job is parked as dead and only `purge_dead` removes it.
pub async fn fail(
	db: &Db,
	job_id: Uuid,
	attempts: i32,
	error_text: &str,
	max_attempts: i32,
	now: OffsetDateTime,
) -> Result<()> {
	let status = if attempts >= max_attempts { "DEAD" } else { "FAILED" };
	let backoff_ms =
		BASE_BACKOFF_MS.saturating_mul(1_i64 << attempts.clamp(0, 16)).min(MAX_BACKOFF_MS);
	let available_at = now + Duration::milliseconds(backoff_ms);
	let error_text: String = error_text.chars().take(MAX_ERROR_CHARS).collect();

	sqlx::query(
		"\
UPDATE sync_jobs
SET status = $1,
	attempts = $2,
	last_error = $3,
	available_at = $4,
	updated_at = $5
WHERE job_id = $6",
	)
	.bind(status)
	.bind(attempts)
	.bind(error_text)
	.bind(available_at)
	.bind(now)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn purge_dead(db: &Db, before: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM sync_jobs WHERE status = 'DEAD' AND updated_at < $1")
		.bind(before)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}
