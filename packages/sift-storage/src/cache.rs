use serde_json::Value;
use time::OffsetDateTime;

use crate::{Result, db::Db};

/// Returns the payload for `key` unless the entry has expired. Expired rows
/// are left for the purge pass; reads just ignore them.
pub async fn get(db: &Db, key: &str, now: OffsetDateTime) -> Result<Option<Value>> {
	let row: Option<(Value,)> = sqlx::query_as(
		"SELECT payload FROM expansion_cache WHERE cache_key = $1 AND expires_at > $2",
	)
	.bind(key)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row.map(|(payload,)| payload))
}

pub async fn put(
	db: &Db,
	key: &str,
	payload: &Value,
	now: OffsetDateTime,
	expires_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO expansion_cache (cache_key, payload, created_at, expires_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (cache_key) DO UPDATE
SET payload = EXCLUDED.payload,
	created_at = EXCLUDED.created_at,
	expires_at = EXCLUDED.expires_at",
	)
	.bind(key)
	.bind(payload)
	.bind(now)
	.bind(expires_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn purge_expired(db: &Db, now: OffsetDateTime) -> Result<u64> {
	let result = sqlx::query("DELETE FROM expansion_cache WHERE expires_at <= $1")
		.bind(now)
		.execute(&db.pool)
		.await?;

	Ok(result.rows_affected())
}
