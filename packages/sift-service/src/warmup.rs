//! Cache priming for known-hot queries, in fixed-size concurrent chunks.
//! One failing query never aborts the batch.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;

use crate::{ExpansionRequest, SiftService};

const WARMUP_CHUNK: usize = 10;

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct WarmupReport {
	pub attempted: u64,
	pub succeeded: u64,
	pub failed: u64,
}

impl SiftService {
	pub async fn warm_up(self: &Arc<Self>, queries: &[String]) -> WarmupReport {
		let mut report = WarmupReport::default();

		for chunk in queries.chunks(WARMUP_CHUNK) {
			let mut tasks = JoinSet::new();

			for query in chunk {
				let service = Arc::clone(self);
				let query = query.clone();

				tasks.spawn(async move {
					service
						.expand(ExpansionRequest { query: query.clone(), known_skills: Vec::new() })
						.await
						.map_err(|err| (query, err))
				});
			}

			while let Some(joined) = tasks.join_next().await {
				report.attempted += 1;

				match joined {
					Ok(Ok(_)) => report.succeeded += 1,
					Ok(Err((query, err))) => {
						report.failed += 1;

						tracing::warn!(%query, error = %err, "Warm-up expansion failed.");
					},
					Err(err) => {
						report.failed += 1;

						tracing::warn!(error = %err, "Warm-up task panicked.");
					},
				}
			}
		}

		tracing::info!(
			attempted = report.attempted,
			succeeded = report.succeeded,
			failed = report.failed,
			"Warm-up pass finished.",
		);

		report
	}
}
