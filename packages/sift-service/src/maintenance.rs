//! Periodic maintenance: metric flush, shadow-profile sync, expiry purges.
//! Every operation treats "nothing to do" as a normal zero-work result.

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use sift_metrics::bucket_start;
use sift_storage::{cache, jobs, metrics, models::MetricPoint, shadow};

use crate::{Result, SiftService};

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct MetricFlushReport {
	pub buckets_flushed: u64,
	pub rows_inserted: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ShadowSyncReport {
	pub popped: u64,
	pub processed: u64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PurgeReport {
	pub cache_rows: u64,
	pub shadow_rows: u64,
	pub dead_jobs: u64,
}

impl SiftService {
	/// Drains every bucket strictly before the current minute into durable
	/// rows. A bucket is cleared only after its rows were persisted (or it
	/// held nothing), so a crash mid-flush re-offers it on the next run:
	/// at-least-once, never exactly-once.
	pub async fn flush_metrics(&self, now: OffsetDateTime) -> Result<MetricFlushReport> {
		let mut report = MetricFlushReport::default();

		for key in self.metrics.closed_buckets(now) {
			let snapshot = self.metrics.snapshot_bucket(key);
			let points: Vec<MetricPoint> = snapshot
				.into_iter()
				.filter(|(_, value)| value.is_finite())
				.map(|(name, value)| MetricPoint {
					bucket_start: bucket_start(key),
					name,
					value,
					dimensions: None,
				})
				.collect();

			if !points.is_empty() {
				report.rows_inserted += metrics::insert_points(&self.db, &points).await?;
			}

			self.metrics.clear_bucket(key);

			report.buckets_flushed += 1;
		}

		Ok(report)
	}

	/// One shadow-sync batch: atomically pop pending candidate ids,
	/// re-derive their profiles from the relational store, write them back
	/// with a fixed TTL. Popped ids without a relational row are silently
	/// skipped. Re-running with the same ids re-derives the same rows.
	pub async fn sync_shadow_profiles(&self, now: OffsetDateTime) -> Result<ShadowSyncReport> {
		let batch = i64::from(self.cfg.worker.shadow_batch_size);
		let ids = shadow::pop_pending(&self.db, batch).await?;

		if ids.is_empty() {
			return Ok(ShadowSyncReport::default());
		}

		let projections = sift_storage::candidates::load_projection(&self.db, &ids).await?;

		shadow::upsert_profiles(&self.db, &projections, now).await?;
		self.metrics.incr("shadow.synced", projections.len() as f64);

		Ok(ShadowSyncReport { popped: ids.len() as u64, processed: projections.len() as u64 })
	}

	pub async fn purge_expired(&self, now: OffsetDateTime) -> Result<PurgeReport> {
		let retention = Duration::days(self.cfg.worker.dead_job_retention_days);
		let report = PurgeReport {
			cache_rows: cache::purge_expired(&self.db, now).await?,
			shadow_rows: shadow::purge_expired(&self.db, now).await?,
			dead_jobs: jobs::purge_dead(&self.db, now - retention).await?,
		};

		if report.cache_rows + report.shadow_rows + report.dead_jobs > 0 {
			tracing::info!(
				cache_rows = report.cache_rows,
				shadow_rows = report.shadow_rows,
				dead_jobs = report.dead_jobs,
				"Purge pass removed expired rows.",
			);
		}

		Ok(report)
	}
}
