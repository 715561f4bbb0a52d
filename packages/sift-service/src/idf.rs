//! Corpus statistics refresh: re-derives each skill node's IDF from the
//! relational candidate count and the graph's `HAS_SKILL` incidence.

use serde::Serialize;
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use sift_domain::scoring::compute_idf;
use sift_graph::queries::{self, IncidenceRow};
use sift_storage::candidates;

use crate::{Result, SiftService};

const WRITE_CHUNK: usize = 500;

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct IdfRefreshReport {
	pub total_candidates: u64,
	pub updated_skills: u64,
}

impl SiftService {
	/// No-op returning zeros when the graph is unconfigured, unreachable,
	/// or the candidate corpus is empty.
	pub async fn refresh_idf(&self) -> Result<IdfRefreshReport> {
		let Some(graph) = self.graph.as_ref() else {
			return Ok(IdfRefreshReport::default());
		};
		let total_candidates = candidates::count(&self.db).await?;

		if total_candidates == 0 {
			return Ok(IdfRefreshReport::default());
		}

		let read = graph.read(queries::skill_incidence()).await;

		if read.fallback {
			tracing::warn!("IDF refresh skipped; graph read fell back.");

			return Ok(IdfRefreshReport { total_candidates, updated_skills: 0 });
		}

		let mut incidence = Vec::with_capacity(read.rows.len());

		for row in &read.rows {
			match row.decode::<IncidenceRow>() {
				Ok(decoded) => incidence.push(decoded),
				Err(err) => {
					tracing::warn!(error = %err, "Skill incidence row did not decode.");
				},
			}
		}

		let refreshed_at = OffsetDateTime::now_utc()
			.format(&Rfc3339)
			.map_err(|err| crate::Error::internal(err.to_string()))?;
		let mut updated_skills = 0u64;

		for chunk in incidence.chunks(WRITE_CHUNK) {
			let rows = chunk
				.iter()
				.map(|row| {
					json!({
						"key": row.skill_key,
						"idf": compute_idf(total_candidates, row.mentions),
						"mentions": row.mentions,
					})
				})
				.collect();

			graph.write(queries::update_idf(rows, &refreshed_at)).await?;

			updated_skills += chunk.len() as u64;
		}

		tracing::info!(total_candidates, updated_skills, "IDF refresh completed.");

		Ok(IdfRefreshReport { total_candidates, updated_skills })
	}
}
