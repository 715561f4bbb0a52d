//! Expansion result cache keyed by request fingerprint. The fingerprint is
//! a blake3 hash over a canonical JSON payload carrying the schema,
//! taxonomy, and policy versions, so a version bump orphans every stale
//! entry without an explicit invalidation pass.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex, PoisonError},
};

use serde_json::Value;
use time::OffsetDateTime;

use sift_storage::db::Db;

use crate::{BoxFuture, Error, Result};

const CACHE_SCHEMA_VERSION: u32 = 1;

pub fn fingerprint(
	normalized_query: &str,
	known_skills: &[String],
	taxonomy_version: u32,
	policy_version: u32,
) -> Result<String> {
	let payload = serde_json::json!({
		"kind": "expansion",
		"schema_version": CACHE_SCHEMA_VERSION,
		"query": normalized_query,
		"known_skills": known_skills,
		"taxonomy_version": taxonomy_version,
		"policy_version": policy_version,
	});
	let raw = serde_json::to_vec(&payload)
		.map_err(|err| Error::internal(format!("Failed to encode cache key payload: {err}")))?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub trait ExpansionCache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str, now: OffsetDateTime)
	-> BoxFuture<'a, Result<Option<Value>>>;

	fn put<'a>(
		&'a self,
		key: &'a str,
		payload: Value,
		now: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>>;
}

/// Durable cache backed by the `expansion_cache` table.
pub struct PgCache {
	db: Arc<Db>,
}

impl PgCache {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}

impl ExpansionCache for PgCache {
	fn get<'a>(
		&'a self,
		key: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move { Ok(sift_storage::cache::get(&self.db, key, now).await?) })
	}

	fn put<'a>(
		&'a self,
		key: &'a str,
		payload: Value,
		now: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(sift_storage::cache::put(&self.db, key, &payload, now, expires_at).await?)
		})
	}
}

/// In-memory cache with real expiry semantics. Used by tests and available
/// for single-process deployments that skip the durable table.
#[derive(Default)]
pub struct MemoryCache {
	entries: Mutex<HashMap<String, (Value, OffsetDateTime)>>,
}

impl MemoryCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl ExpansionCache for MemoryCache {
	fn get<'a>(
		&'a self,
		key: &'a str,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

			Ok(entries
				.get(key)
				.filter(|(_, expires_at)| *expires_at > now)
				.map(|(payload, _)| payload.clone()))
		})
	}

	fn put<'a>(
		&'a self,
		key: &'a str,
		payload: Value,
		now: OffsetDateTime,
		expires_at: OffsetDateTime,
	) -> BoxFuture<'a, Result<()>> {
		let _ = now;

		Box::pin(async move {
			self.entries
				.lock()
				.unwrap_or_else(PoisonError::into_inner)
				.insert(key.to_string(), (payload, expires_at));

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use time::Duration;

	use super::*;

	#[test]
	fn fingerprint_changes_with_every_version_axis() {
		let base = fingerprint("react", &[], 1, 1).expect("fingerprint should build");

		assert_ne!(base, fingerprint("redux", &[], 1, 1).expect("fingerprint should build"));
		assert_ne!(base, fingerprint("react", &[], 2, 1).expect("fingerprint should build"));
		assert_ne!(base, fingerprint("react", &[], 1, 2).expect("fingerprint should build"));
		assert_ne!(
			base,
			fingerprint("react", &["redux".to_string()], 1, 1).expect("fingerprint should build"),
		);
		assert_eq!(base, fingerprint("react", &[], 1, 1).expect("fingerprint should build"));
	}

	#[tokio::test]
	async fn memory_cache_honors_expiry() {
		let cache = MemoryCache::new();
		let now = OffsetDateTime::UNIX_EPOCH + Duration::days(20_000);

		cache
			.put("k", json!({"v": 1}), now, now + Duration::minutes(5))
			.await
			.expect("put should succeed");

		assert!(cache.get("k", now).await.expect("get should succeed").is_some());
		assert!(
			cache
				.get("k", now + Duration::minutes(6))
				.await
				.expect("get should succeed")
				.is_none()
		);
	}
}
