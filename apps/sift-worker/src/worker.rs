//! The worker loop: drain due sync jobs, then run whichever periodic
//! maintenance passes are due. Every pass failure is logged and swallowed;
//! the loop itself never exits.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;
use uuid::Uuid;

use sift_service::{SiftService, sync::CANDIDATE_SYNC_KIND};
use sift_storage::jobs;

const CLAIM_LEASE_SECONDS: i64 = 30;
/// Queue job kind for an on-demand proposal re-rank.
const PROPOSAL_RANK_KIND: &str = "proposal_rank";

#[derive(Debug, serde::Deserialize)]
struct CandidateSyncPayload {
	candidate_id: Uuid,
}

struct Cadence {
	last_metrics_flush: OffsetDateTime,
	last_shadow_sync: OffsetDateTime,
	last_proposal_rank: OffsetDateTime,
	last_idf_refresh: OffsetDateTime,
	last_version_refresh: OffsetDateTime,
	last_purge: OffsetDateTime,
}
impl Cadence {
	fn new(now: OffsetDateTime) -> Self {
		Self {
			last_metrics_flush: now,
			last_shadow_sync: now,
			last_proposal_rank: now,
			last_idf_refresh: now,
			last_version_refresh: now,
			last_purge: now,
		}
	}
}

pub async fn run_worker(service: Arc<SiftService>) -> color_eyre::Result<()> {
	let worker_cfg = service.cfg.worker.clone();
	let mut cadence = Cadence::new(OffsetDateTime::now_utc());

	tracing::info!("Worker loop started.");

	loop {
		// One job per tick keeps the maintenance passes responsive even with
		// a deep queue; the lease makes a crashed claim reappear.
		if let Err(err) = claim_one_job(&service, worker_cfg.job_max_attempts).await {
			tracing::error!(error = %err, "Job processing failed.");
		}

		let now = OffsetDateTime::now_utc();

		if now - cadence.last_metrics_flush
			>= Duration::seconds(worker_cfg.metrics_drain_seconds as i64)
		{
			match service.flush_metrics(now).await {
				Ok(report) => {
					cadence.last_metrics_flush = now;

					if report.rows_inserted > 0 {
						tracing::debug!(
							buckets = report.buckets_flushed,
							rows = report.rows_inserted,
							"Metric buckets flushed.",
						);
					}
				},
				Err(err) => {
					tracing::error!(error = %err, "Metric flush failed.");
				},
			}
		}
		if now - cadence.last_shadow_sync
			>= Duration::seconds(worker_cfg.shadow_interval_seconds as i64)
		{
			match service.sync_shadow_profiles(now).await {
				Ok(report) => {
					// Only an empty batch advances the clock; a full batch
					// means there is likely more backlog, so go again on the
					// next tick.
					if report.popped < u64::from(worker_cfg.shadow_batch_size) {
						cadence.last_shadow_sync = now;
					}

					if report.processed > 0 {
						tracing::debug!(processed = report.processed, "Shadow profiles synced.");
					}
				},
				Err(err) => {
					tracing::error!(error = %err, "Shadow profile sync failed.");
				},
			}
		}
		if now - cadence.last_proposal_rank
			>= Duration::seconds(worker_cfg.proposal_interval_seconds as i64)
		{
			match service.rank_proposals(worker_cfg.proposal_batch_size).await {
				Ok(report) => {
					cadence.last_proposal_rank = now;

					if report.processed > 0 {
						tracing::debug!(processed = report.processed, "Proposals re-ranked.");
					}
				},
				Err(err) => {
					tracing::error!(error = %err, "Proposal ranking failed.");
				},
			}
		}
		if now - cadence.last_idf_refresh
			>= Duration::minutes(worker_cfg.idf_refresh_minutes as i64)
		{
			match service.refresh_idf().await {
				Ok(report) => {
					cadence.last_idf_refresh = now;

					tracing::info!(
						candidates = report.total_candidates,
						skills = report.updated_skills,
						"Skill statistics refreshed.",
					);
				},
				Err(err) => {
					tracing::error!(error = %err, "Skill statistics refresh failed.");
				},
			}
		}
		if now - cadence.last_version_refresh
			>= Duration::seconds(worker_cfg.version_refresh_seconds as i64)
		{
			service.refresh_versions().await;

			cadence.last_version_refresh = now;
		}
		if now - cadence.last_purge >= Duration::seconds(worker_cfg.purge_interval_seconds as i64) {
			match service.purge_expired(now).await {
				Ok(_) => {
					cadence.last_purge = now;
				},
				Err(err) => {
					tracing::error!(error = %err, "Purge pass failed.");
				},
			}
		}

		tokio_time::sleep(std::time::Duration::from_millis(worker_cfg.poll_interval_ms)).await;
	}
}

async fn claim_one_job(service: &Arc<SiftService>, max_attempts: i32) -> sift_service::Result<()> {
	let now = OffsetDateTime::now_utc();
	let Some(job) = jobs::claim(&service.db, now, CLAIM_LEASE_SECONDS).await? else {
		return Ok(());
	};

	match process_job(service, &job).await {
		Ok(()) => {
			jobs::complete(&service.db, job.job_id).await?;
		},
		Err(err) => {
			let attempts = job.attempts + 1;

			tracing::warn!(
				job_id = %job.job_id,
				kind = %job.kind,
				attempts,
				error = %err,
				"Job failed.",
			);
			jobs::fail(
				&service.db,
				job.job_id,
				attempts,
				&err.to_string(),
				max_attempts,
				OffsetDateTime::now_utc(),
			)
			.await?;
		},
	}

	Ok(())
}

async fn process_job(
	service: &Arc<SiftService>,
	job: &sift_storage::models::SyncJob,
) -> sift_service::Result<()> {
	match job.kind.as_str() {
		CANDIDATE_SYNC_KIND => {
			let payload: CandidateSyncPayload = serde_json::from_value(job.payload.clone())
				.map_err(|err| sift_service::Error::InvalidRequest {
					message: format!("Malformed candidate sync payload: {err}."),
				})?;

			service.sync_candidate(payload.candidate_id).await?;

			Ok(())
		},
		PROPOSAL_RANK_KIND => {
			service.rank_proposals(service.cfg.worker.proposal_batch_size).await?;

			Ok(())
		},
		other => Err(sift_service::Error::InvalidRequest {
			message: format!("Unknown job kind: {other}."),
		}),
	}
}
