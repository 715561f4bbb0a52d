use serde::{Deserialize, Serialize};

pub const IDF_MIN: f64 = 0.2;
pub const IDF_MAX: f64 = 3.0;

/// Decay per traversal hop, indexed by depth starting at 1.
const DEPTH_PENALTIES: [f64; 4] = [1.0, 0.85, 0.65, 0.50];
/// Geometric tail for depths past the table. Keeps the penalty defined and
/// non-increasing for every depth the traversal can produce.
const DEPTH_TAIL_DECAY: f64 = 0.8;

/// Relation vocabulary the scorer understands. Anything else is rejected at
/// the graph boundary, not silently scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
	RelatedTo,
	Implies,
	Specializes,
	CoOccurs,
}

impl RelationKind {
	pub const ALL: [RelationKind; 4] = [
		RelationKind::RelatedTo,
		RelationKind::Implies,
		RelationKind::Specializes,
		RelationKind::CoOccurs,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			RelationKind::RelatedTo => "related_to",
			RelationKind::Implies => "implies",
			RelationKind::Specializes => "specializes",
			RelationKind::CoOccurs => "co_occurs",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"related_to" => Some(RelationKind::RelatedTo),
			"implies" => Some(RelationKind::Implies),
			"specializes" => Some(RelationKind::Specializes),
			"co_occurs" => Some(RelationKind::CoOccurs),
			_ => None,
		}
	}
}

/// Rarity of a skill across the candidate corpus. Clamped so that ubiquitous
/// skills still contribute a little and rare skills cannot dominate.
pub fn compute_idf(corpus_size: u64, match_count: u64) -> f64 {
	let raw = ((corpus_size as f64 + 1.0) / (match_count as f64 + 1.0)).ln();

	raw.clamp(IDF_MIN, IDF_MAX)
}

/// Confidence decay for a match found `depth` hops from its seed.
pub fn depth_penalty(depth: u32) -> f64 {
	// Depth starts at 1; zero is treated as a direct hit.
	let index = depth.max(1) as usize - 1;

	if index < DEPTH_PENALTIES.len() {
		DEPTH_PENALTIES[index]
	} else {
		let beyond = (index + 1 - DEPTH_PENALTIES.len()) as i32;

		DEPTH_PENALTIES[DEPTH_PENALTIES.len() - 1] * DEPTH_TAIL_DECAY.powi(beyond)
	}
}

/// Maps an unbounded raw contribution sum into `[0, 1]`. Saturating: queries
/// with more seeds need proportionally more evidence to approach 1.
pub fn normalize_score(raw_score: f64, seed_count: usize) -> f64 {
	if !raw_score.is_finite() || raw_score <= 0.0 {
		return 0.0;
	}

	let k = seed_count.max(1) as f64;

	raw_score / (raw_score + k)
}

/// Contribution of a single expanded match. A missing IDF (node not yet
/// refreshed) counts as neutral rather than zeroing the match.
pub fn match_contribution(weight: f64, depth: u32, idf: Option<f64>) -> f64 {
	let weight = if weight.is_finite() { weight.clamp(0.0, 1.0) } else { 0.0 };
	let idf = match idf {
		Some(value) if value.is_finite() => value.clamp(IDF_MIN, IDF_MAX),
		_ => 1.0,
	};

	weight * depth_penalty(depth) * idf
}

/// Sums per-match contributions into the raw score and its normalized form.
/// Non-finite contributions are dropped rather than poisoning the sum.
pub fn score_matches(contributions: &[f64], seed_count: usize) -> (f64, f64) {
	let raw: f64 = contributions.iter().copied().filter(|value| value.is_finite()).sum();

	(raw, normalize_score(raw, seed_count))
}

/// Review-queue score for a proposed relation: extraction confidence plus a
/// per-source trust bonus, capped at 1.
pub fn proposal_score(confidence: f64, source_boost: f64) -> f64 {
	let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
	let boost = if source_boost.is_finite() { source_boost.max(0.0) } else { 0.0 };

	(confidence + boost).min(1.0)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn idf_is_clamped_at_both_ends() {
		assert_eq!(compute_idf(10_000, 10_000), IDF_MIN);
		assert_eq!(compute_idf(1_000_000, 1), IDF_MAX);
	}

	#[test]
	fn idf_rewards_rarity() {
		let common = compute_idf(1_000, 900);
		let rare = compute_idf(1_000, 30);

		assert!(rare > common);
	}

	#[test]
	fn depth_penalty_matches_table() {
		assert_eq!(depth_penalty(1), 1.0);
		assert_eq!(depth_penalty(2), 0.85);
		assert_eq!(depth_penalty(3), 0.65);
		assert_eq!(depth_penalty(4), 0.50);
	}

	#[test]
	fn depth_penalty_is_non_increasing() {
		let mut previous = depth_penalty(1);

		for depth in 2..=12 {
			let current = depth_penalty(depth);

			assert!(current <= previous, "penalty increased at depth {depth}");
			assert!(current > 0.0);

			previous = current;
		}
	}

	#[test]
	fn normalize_score_stays_in_unit_range() {
		for raw in [0.0, 0.1, 1.0, 7.5, 1_000.0] {
			for seeds in [0usize, 1, 5, 40] {
				let score = normalize_score(raw, seeds);

				assert!((0.0..=1.0).contains(&score), "raw={raw} seeds={seeds} score={score}");
			}
		}
	}

	#[test]
	fn normalize_score_is_monotone_in_raw() {
		let low = normalize_score(1.0, 4);
		let high = normalize_score(3.0, 4);

		assert!(high > low);
	}

	#[test]
	fn normalize_score_rejects_non_finite() {
		assert_eq!(normalize_score(f64::NAN, 3), 0.0);
		assert_eq!(normalize_score(f64::INFINITY, 3), 0.0);
		assert_eq!(normalize_score(-1.0, 3), 0.0);
	}

	#[test]
	fn contribution_combines_weight_depth_and_idf() {
		let contribution = match_contribution(0.8, 2, Some(2.0));

		assert!((contribution - 0.8 * 0.85 * 2.0).abs() < 1e-12);
	}

	#[test]
	fn contribution_defaults_missing_idf_to_neutral() {
		assert_eq!(match_contribution(1.0, 1, None), 1.0);
		assert_eq!(match_contribution(1.0, 1, Some(f64::NAN)), 1.0);
	}

	#[test]
	fn contribution_clamps_out_of_range_weight() {
		assert_eq!(match_contribution(7.0, 1, None), 1.0);
		assert_eq!(match_contribution(-2.0, 1, None), 0.0);
	}

	#[test]
	fn score_matches_sums_and_normalizes() {
		let (raw, normalized) = score_matches(&[0.5, 1.0, f64::NAN], 2);

		assert!((raw - 1.5).abs() < 1e-12);
		assert!((normalized - 1.5 / 3.5).abs() < 1e-12);
	}

	#[test]
	fn proposal_score_is_capped() {
		assert_eq!(proposal_score(0.95, 0.15), 1.0);
		assert!((proposal_score(0.5, 0.1) - 0.6).abs() < 1e-12);
		assert_eq!(proposal_score(f64::NAN, 0.1), 0.1);
		assert_eq!(proposal_score(1.7, 0.0), 1.0);
	}

	#[test]
	fn relation_kind_round_trips_through_str() {
		for kind in RelationKind::ALL {
			assert_eq!(RelationKind::parse(kind.as_str()), Some(kind));
		}

		assert_eq!(RelationKind::parse("friends_with"), None);
	}
}
