use serde::{Deserialize, Serialize};

use crate::normalize::normalize_skill;

/// Grammatical tokens that never carry skill signal on their own.
const STOPWORDS: &[&str] = &[
	"a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have", "i", "in",
	"is", "it", "its", "my", "of", "on", "or", "our", "that", "the", "their", "to", "was", "we",
	"were", "will", "with", "you", "your",
];

/// Role words and seniority modifiers. Excluded as standalone seeds (a seed
/// of just "developer" matches everything) but kept inside multi-word
/// phrases such as "frontend developer".
const GENERIC_ROLE_TOKENS: &[&str] = &[
	"consultant",
	"consultants",
	"developer",
	"developers",
	"development",
	"engineer",
	"engineering",
	"engineers",
	"expert",
	"experts",
	"intern",
	"junior",
	"lead",
	"principal",
	"professional",
	"professionals",
	"senior",
	"specialist",
	"specialists",
];

/// Substring matching on very short tokens is mostly noise; the protected
/// aliases ("ts", "js", "ml", "nlp") are already expanded before seeding.
const CONTAINS_MIN_LEN: usize = 4;

/// Seeds for one expansion request, one field per retrieval tier. Each list
/// is de-duplicated with insertion order preserved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedSet {
	pub strict: Vec<String>,
	pub token: Vec<String>,
	pub contains: Vec<String>,
}

impl SeedSet {
	pub fn is_empty(&self) -> bool {
		self.strict.is_empty() && self.token.is_empty() && self.contains.is_empty()
	}

	pub fn tier(&self, tier: SeedTier) -> &[String] {
		match tier {
			SeedTier::Strict => &self.strict,
			SeedTier::Token => &self.token,
			SeedTier::Contains => &self.contains,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedTier {
	Strict,
	Token,
	Contains,
}

impl SeedTier {
	pub const ALL: [SeedTier; 3] = [SeedTier::Strict, SeedTier::Token, SeedTier::Contains];

	pub fn as_str(self) -> &'static str {
		match self {
			SeedTier::Strict => "strict",
			SeedTier::Token => "token",
			SeedTier::Contains => "contains",
		}
	}
}

/// Derives the per-tier seed lists for a query plus any skills already known
/// for the request (for example the opening's own skill list).
pub fn build_seeds(query: &str, known_skills: &[String]) -> SeedSet {
	let normalized_query = normalize_skill(query);
	let mut seeds = SeedSet::default();

	if !normalized_query.is_empty() {
		push_unique(&mut seeds.strict, normalized_query.clone());
	}

	for skill in known_skills {
		let normalized = normalize_skill(skill);

		if !normalized.is_empty() {
			push_unique(&mut seeds.strict, normalized);
		}
	}

	let significant: Vec<&str> =
		normalized_query.split_whitespace().filter(|token| !is_stopword(token)).collect();

	for token in &significant {
		if token.chars().count() >= 2 && !is_generic_role_token(token) {
			push_unique(&mut seeds.strict, (*token).to_string());
		}
	}

	for size in [2usize, 3] {
		for window in significant.windows(size) {
			push_unique(&mut seeds.token, window.join(" "));
		}
	}

	for token in &significant {
		if token.chars().count() >= CONTAINS_MIN_LEN && !is_generic_role_token(token) {
			push_unique(&mut seeds.contains, (*token).to_string());
		}
	}

	seeds
}

pub fn is_stopword(token: &str) -> bool {
	STOPWORDS.contains(&token)
}

pub fn is_generic_role_token(token: &str) -> bool {
	GENERIC_ROLE_TOKENS.contains(&token)
}

fn push_unique(seeds: &mut Vec<String>, seed: String) {
	if !seeds.iter().any(|existing| existing == &seed) {
		seeds.push(seed);
	}
}
