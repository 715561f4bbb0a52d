//! Per-candidate graph sync: queue submission with dedup, and the actual
//! `HAS_SKILL` edge rewrite the queue consumer runs.

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use sift_domain::normalize::skill_key;
use sift_graph::queries;
use sift_storage::{candidates, jobs};

use crate::{Result, SiftService};

pub const CANDIDATE_SYNC_KIND: &str = "candidate_sync";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
	Queued,
	/// A sync for this candidate is already outstanding. Benign.
	Deduplicated,
}

impl SiftService {
	/// Submits a graph-sync job for one candidate. At most one job is
	/// outstanding per candidate id; a duplicate submission is swallowed
	/// and reported as such.
	pub async fn enqueue_candidate_sync(&self, candidate_id: Uuid) -> Result<SyncOutcome> {
		let outcome = jobs::enqueue(
			&self.db,
			CANDIDATE_SYNC_KIND,
			&candidate_id.to_string(),
			json!({ "candidate_id": candidate_id }),
			OffsetDateTime::now_utc(),
		)
		.await?;

		match outcome {
			jobs::EnqueueOutcome::Queued(job_id) => {
				tracing::debug!(%candidate_id, %job_id, "Candidate sync queued.");

				Ok(SyncOutcome::Queued)
			},
			jobs::EnqueueOutcome::Duplicate => {
				tracing::debug!(%candidate_id, "Candidate sync already outstanding.");

				Ok(SyncOutcome::Deduplicated)
			},
		}
	}

	/// Rewrites one candidate's skill edges in the graph. Returns `false`
	/// without erroring when there is nothing to do: no graph configured,
	/// or the candidate is gone from the relational store.
	pub async fn sync_candidate(&self, candidate_id: Uuid) -> Result<bool> {
		let Some(graph) = self.graph.as_ref() else {
			tracing::debug!(%candidate_id, "Candidate sync skipped; no graph configured.");

			return Ok(false);
		};
		let projections = candidates::load_projection(&self.db, &[candidate_id]).await?;
		let Some(projection) = projections.first() else {
			tracing::warn!(%candidate_id, "Candidate sync skipped; candidate not found.");

			return Ok(false);
		};
		let skills: Vec<String> =
			serde_json::from_value(projection.skills.clone()).unwrap_or_default();
		let mut keys: Vec<String> = Vec::new();

		for skill in &skills {
			let key = skill_key(skill);

			if !key.is_empty() && !keys.contains(&key) {
				keys.push(key);
			}
		}

		graph.write(queries::sync_candidate_skills(&candidate_id.to_string(), &keys)).await?;

		self.metrics.incr("sync.candidates", 1.0);

		Ok(true)
	}
}
