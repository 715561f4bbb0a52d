//! Proposal ranking: pending skill-relation proposals get a review score
//! from extraction confidence plus a per-source trust boost. Review status
//! stays untouched; accepting or rejecting is a human action.

use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::task::JoinSet;

use sift_domain::scoring::proposal_score;
use sift_storage::proposals;

use crate::{Result, SiftService};

/// Concurrent score updates per sub-batch, bounding database load.
const RANK_CHUNK: usize = 25;

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct ProposalRankReport {
	pub processed: u64,
}

impl SiftService {
	pub async fn rank_proposals(self: &Arc<Self>, batch_size: u32) -> Result<ProposalRankReport> {
		let pending = proposals::list_pending(&self.db, i64::from(batch_size)).await?;

		if pending.is_empty() {
			return Ok(ProposalRankReport::default());
		}

		let now = OffsetDateTime::now_utc();
		let mut processed = 0u64;

		for chunk in pending.chunks(RANK_CHUNK) {
			let mut tasks = JoinSet::new();

			for proposal in chunk {
				let service = Arc::clone(self);
				let proposal_id = proposal.proposal_id;
				let confidence = proposal.confidence;
				let boost = self.source_boost(&proposal.source);

				tasks.spawn(async move {
					let score = proposal_score(confidence, boost);

					proposals::update_score(&service.db, proposal_id, score, now).await
				});
			}

			while let Some(joined) = tasks.join_next().await {
				match joined {
					Ok(Ok(())) => processed += 1,
					Ok(Err(err)) => {
						tracing::warn!(error = %err, "Proposal score update failed.");
					},
					Err(err) => {
						tracing::warn!(error = %err, "Proposal ranking task panicked.");
					},
				}
			}
		}

		self.metrics.incr("proposals.ranked", processed as f64);

		Ok(ProposalRankReport { processed })
	}

	fn source_boost(&self, source: &str) -> f64 {
		self.cfg
			.proposals
			.source_boosts
			.get(&source.trim().to_lowercase())
			.copied()
			.unwrap_or(0.0)
	}
}
