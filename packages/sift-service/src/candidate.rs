//! Candidate scoring against an expanded query.

use serde::{Deserialize, Serialize};

use sift_domain::{
	normalize::skill_key,
	scoring::{RelationKind, match_contribution, score_matches},
};

use crate::{ExpansionDiagnostics, ExpansionRequest, Result, SiftService};

#[derive(Clone, Debug, Deserialize)]
pub struct ScoreRequest {
	pub query: String,
	pub skills: Vec<String>,
}

/// One contributing match between the expansion and a candidate skill.
#[derive(Clone, Debug, Serialize)]
pub struct GraphMatchDetail {
	pub seed: String,
	pub skill: String,
	pub skill_key: String,
	pub relation: RelationKind,
	pub depth: u32,
	pub path: Vec<String>,
	pub idf: Option<f64>,
	pub contribution: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CandidateGraphScore {
	/// Normalized to `[0, 1]`.
	pub score: f64,
	pub raw_score: f64,
	pub seed_count: usize,
	/// Contributing matches, strongest first.
	pub details: Vec<GraphMatchDetail>,
	pub diagnostics: ExpansionDiagnostics,
}

impl SiftService {
	/// Scores a candidate's skill list against a query. Degrades with the
	/// expansion: no graph means no matches and a zero score.
	pub async fn score_candidate(&self, request: ScoreRequest) -> Result<CandidateGraphScore> {
		let envelope = self
			.expand(ExpansionRequest { query: request.query, known_skills: Vec::new() })
			.await?;
		let candidate_keys: std::collections::HashSet<String> =
			request.skills.iter().map(|skill| skill_key(skill)).collect();
		let mut details: Vec<GraphMatchDetail> = envelope
			.skills
			.iter()
			.filter(|skill| candidate_keys.contains(&skill.skill_key))
			.map(|skill| GraphMatchDetail {
				seed: skill.seed.clone(),
				skill: skill.skill.clone(),
				skill_key: skill.skill_key.clone(),
				relation: skill.relation,
				depth: skill.depth,
				path: skill.path.clone(),
				idf: skill.idf,
				contribution: match_contribution(skill.weight, skill.depth, skill.idf),
			})
			.collect();

		details.sort_by(|a, b| {
			b.contribution.partial_cmp(&a.contribution).unwrap_or(std::cmp::Ordering::Equal)
		});

		let contributions: Vec<f64> = details.iter().map(|detail| detail.contribution).collect();
		let seed_count = envelope.diagnostics.seed_counts.strict;
		let (raw_score, score) = score_matches(&contributions, seed_count);

		self.metrics.incr("scoring.requests", 1.0);

		Ok(CandidateGraphScore {
			score,
			raw_score,
			seed_count,
			details,
			diagnostics: envelope.diagnostics,
		})
	}
}
