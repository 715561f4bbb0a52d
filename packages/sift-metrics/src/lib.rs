//! In-process counter registry bucketed by minute. Producers increment the
//! current bucket; a flush pass drains buckets strictly in the past into
//! durable storage. Increments never touch I/O.

use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard, PoisonError},
};

use time::OffsetDateTime;

pub const BUCKET_SECONDS: i64 = 60;

#[derive(Debug, Default)]
pub struct MetricRegistry {
	buckets: Mutex<HashMap<i64, HashMap<String, f64>>>,
}

impl MetricRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `delta` to `name` in the current minute bucket. Non-finite
	/// deltas are dropped so a bad upstream value cannot poison a bucket.
	pub fn incr(&self, name: &str, delta: f64) {
		self.incr_at(name, delta, OffsetDateTime::now_utc());
	}

	pub fn incr_at(&self, name: &str, delta: f64, now: OffsetDateTime) {
		if !delta.is_finite() {
			return;
		}

		let key = bucket_key(now);
		let mut buckets = self.lock();
		let bucket = buckets.entry(key).or_default();

		*bucket.entry(name.to_string()).or_insert(0.0) += delta;
	}

	/// Bucket keys strictly before the current minute, oldest first. The
	/// current bucket is never offered for flushing; in-flight increments
	/// land there.
	pub fn closed_buckets(&self, now: OffsetDateTime) -> Vec<i64> {
		let current = bucket_key(now);
		let mut keys: Vec<i64> =
			self.lock().keys().filter(|key| **key < current).copied().collect();

		keys.sort_unstable();

		keys
	}

	/// Copy of one bucket's counters. The bucket stays in place until
	/// `clear_bucket`, so an interrupted flush re-reads the same data on the
	/// next run.
	pub fn snapshot_bucket(&self, key: i64) -> HashMap<String, f64> {
		self.lock().get(&key).cloned().unwrap_or_default()
	}

	/// Drops a bucket. Call only after its rows were persisted (or the
	/// snapshot was empty).
	pub fn clear_bucket(&self, key: i64) {
		self.lock().remove(&key);
	}

	pub fn bucket_count(&self) -> usize {
		self.lock().len()
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<i64, HashMap<String, f64>>> {
		self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

pub fn bucket_key(now: OffsetDateTime) -> i64 {
	now.unix_timestamp().div_euclid(BUCKET_SECONDS)
}

pub fn bucket_start(key: i64) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp(key.saturating_mul(BUCKET_SECONDS))
		.unwrap_or(OffsetDateTime::UNIX_EPOCH)
}
