//! Query expansion: seeds, tiered guarded traversal, dedup, cache.

use std::{collections::HashSet, time::Instant};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use sift_domain::{
	normalize::normalize_skill,
	scoring::RelationKind,
	seeds::{SeedSet, SeedTier, build_seeds},
};
use sift_graph::queries::{self, ExpansionRow, SeedMatch};

use crate::{Result, SiftService, cache};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExpansionRequest {
	pub query: String,
	#[serde(default)]
	pub known_skills: Vec<String>,
}

/// One graph-discovered skill, tagged with how it was found.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpandedSkill {
	pub seed: String,
	pub skill: String,
	pub skill_key: String,
	pub depth: u32,
	pub relation: RelationKind,
	pub weight: f64,
	pub path: Vec<String>,
	pub idf: Option<f64>,
	pub tier: SeedTier,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
	pub strict: usize,
	pub token: usize,
	pub contains: usize,
}

impl TierCounts {
	pub fn from_seeds(seeds: &SeedSet) -> Self {
		Self {
			strict: seeds.strict.len(),
			token: seeds.token.len(),
			contains: seeds.contains.len(),
		}
	}

	fn set(&mut self, tier: SeedTier, count: usize) {
		match tier {
			SeedTier::Strict => self.strict = count,
			SeedTier::Token => self.token = count,
			SeedTier::Contains => self.contains = count,
		}
	}
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ExpansionDiagnostics {
	pub seed_counts: TierCounts,
	pub row_counts: TierCounts,
	pub tiers_used: Vec<SeedTier>,
	/// The graph was unreachable and the empty fallback produced (part of)
	/// this result.
	pub fallback: bool,
	pub cache_hit: bool,
	/// No graph configured, or fallback; the result is usable but not a
	/// full expansion.
	pub degraded: bool,
	pub latency_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExpansionEnvelope {
	pub query: String,
	pub normalized_query: String,
	pub skills: Vec<ExpandedSkill>,
	pub diagnostics: ExpansionDiagnostics,
}

impl SiftService {
	/// Expands a free-text query into related skills. Never errors on graph
	/// trouble: an unconfigured graph or an open breaker yields an empty,
	/// degraded envelope.
	pub async fn expand(&self, request: ExpansionRequest) -> Result<ExpansionEnvelope> {
		let started = Instant::now();
		let now = OffsetDateTime::now_utc();

		self.metrics.incr("expansion.requests", 1.0);

		let normalized_query = normalize_skill(&request.query);
		let seeds = build_seeds(&request.query, &request.known_skills);
		let seed_counts = TierCounts::from_seeds(&seeds);
		let versions = self.versions();
		let fingerprint = cache::fingerprint(
			&normalized_query,
			&request.known_skills,
			versions.taxonomy,
			versions.policy,
		)?;

		if let Some(payload) = self.cache.get(&fingerprint, now).await? {
			match serde_json::from_value::<Vec<ExpandedSkill>>(payload) {
				Ok(skills) => {
					self.metrics.incr("expansion.cache_hits", 1.0);

					return Ok(ExpansionEnvelope {
						query: request.query,
						normalized_query,
						skills,
						diagnostics: ExpansionDiagnostics {
							seed_counts,
							cache_hit: true,
							latency_ms: started.elapsed().as_millis() as u64,
							..ExpansionDiagnostics::default()
						},
					});
				},
				Err(err) => {
					// Stale payload shape; treat as a miss and overwrite.
					tracing::warn!(error = %err, "Cached expansion payload did not decode.");
				},
			}
		}

		let Some(graph) = self.graph.as_ref() else {
			self.metrics.incr("expansion.degraded", 1.0);

			return Ok(ExpansionEnvelope {
				query: request.query,
				normalized_query,
				skills: Vec::new(),
				diagnostics: ExpansionDiagnostics {
					seed_counts,
					degraded: true,
					latency_ms: started.elapsed().as_millis() as u64,
					..ExpansionDiagnostics::default()
				},
			});
		};
		let expansion_cfg = &self.cfg.expansion;
		let mut skills: Vec<ExpandedSkill> = Vec::new();
		let mut seen: HashSet<(String, String)> = HashSet::new();
		let mut row_counts = TierCounts::default();
		let mut tiers_used = Vec::new();
		let mut fallback = false;

		for tier in SeedTier::ALL {
			// Tiering policy: a looser tier runs only while the stricter
			// ones produced fewer rows than the configured minimum.
			if tier != SeedTier::Strict && skills.len() >= expansion_cfg.min_rows as usize {
				break;
			}

			let seed_list = seeds.tier(tier);

			if seed_list.is_empty() {
				continue;
			}

			let seed_match =
				if tier == SeedTier::Contains { SeedMatch::Contains } else { SeedMatch::Exact };
			let read = graph
				.read(queries::expand_seeds(
					seed_match,
					seed_list,
					expansion_cfg.max_depth,
					expansion_cfg.per_seed_limit,
					expansion_cfg.min_relation_weight,
				))
				.await;

			tiers_used.push(tier);

			if read.fallback {
				fallback = true;

				break;
			}

			let mut tier_rows = 0usize;

			for row in &read.rows {
				let Some(skill) = decode_match(row, tier) else {
					continue;
				};

				tier_rows += 1;

				if seen.insert((skill.seed.clone(), skill.skill_key.clone())) {
					skills.push(skill);
				}
			}

			row_counts.set(tier, tier_rows);
		}

		skills.truncate(expansion_cfg.result_limit as usize);

		self.metrics.incr("expansion.matches", skills.len() as f64);

		if fallback {
			self.metrics.incr("expansion.fallbacks", 1.0);
			self.metrics.incr("expansion.degraded", 1.0);
		} else {
			// A fallback result is never cached; it would pin the degraded
			// answer for the whole TTL.
			let payload = serde_json::to_value(&skills)
				.map_err(|err| crate::Error::internal(err.to_string()))?;
			let expires_at = now + Duration::minutes(expansion_cfg.cache_ttl_minutes);

			self.cache.put(&fingerprint, payload, now, expires_at).await?;
		}

		Ok(ExpansionEnvelope {
			query: request.query,
			normalized_query,
			skills,
			diagnostics: ExpansionDiagnostics {
				seed_counts,
				row_counts,
				tiers_used,
				fallback,
				cache_hit: false,
				degraded: fallback,
				latency_ms: started.elapsed().as_millis() as u64,
			},
		})
	}
}

/// Decodes one traversal row into a match. Shape mismatches and unknown
/// relation kinds reject the row, not the request.
fn decode_match(row: &sift_graph::store::GraphRow, tier: SeedTier) -> Option<ExpandedSkill> {
	let decoded: ExpansionRow = match row.decode() {
		Ok(decoded) => decoded,
		Err(err) => {
			tracing::warn!(error = %err, "Expansion row did not match the expected shape.");

			return None;
		},
	};
	let Some(relation) = RelationKind::parse(&decoded.relation) else {
		tracing::warn!(relation = %decoded.relation, "Unknown relation kind in expansion row.");

		return None;
	};

	if decoded.depth == 0 || !decoded.weight.is_finite() {
		return None;
	}

	Some(ExpandedSkill {
		seed: decoded.seed,
		skill: decoded.skill,
		skill_key: decoded.skill_key,
		depth: decoded.depth,
		relation,
		weight: decoded.weight.clamp(0.0, 1.0),
		path: decoded.path,
		idf: decoded.idf.filter(|idf| idf.is_finite()),
		tier,
	})
}
