use sift_domain::{normalize, scoring, seeds};

#[test]
fn normalizer_handles_the_canonical_aliases() {
	assert_eq!(normalize::normalize_skill("C++"), "cpp");
	assert_eq!(normalize::normalize_skill("C#"), "csharp");
	assert_eq!(normalize::normalize_skill(".NET"), "dotnet");
	assert_eq!(normalize::normalize_skill("Node.js"), "nodejs");
	assert_eq!(normalize::normalize_skill("Python 3.11"), "python");
}

#[test]
fn normalizer_is_idempotent() {
	for raw in ["C++", "Node.js", "Senior ML Engineer", "CI/CD", "Python 3.11"] {
		let once = normalize::normalize_skill(raw);
		let twice = normalize::normalize_skill(&once);

		assert_eq!(once, twice, "normalizing {raw:?} twice changed the result");
	}
}

#[test]
fn seed_tiers_for_a_realistic_query() {
	let seeds = seeds::build_seeds("Senior Frontend Developer with React and TypeScript", &[]);

	assert!(seeds.strict.contains(&"senior frontend developer with react and typescript".into()));
	assert!(seeds.strict.contains(&"react".into()));
	assert!(seeds.strict.contains(&"typescript".into()));
	assert!(seeds.token.contains(&"frontend developer".into()));
	assert!(seeds.contains.contains(&"frontend".into()));
}

#[test]
fn seed_tiers_for_stopword_noise() {
	let seeds = seeds::build_seeds("a and the in", &[]);

	assert!(seeds.token.is_empty());
	assert!(seeds.contains.is_empty());
}

#[test]
fn generic_role_tokens_do_not_leak_into_loose_tiers() {
	let seeds = seeds::build_seeds("Frontend Engineer", &[]);

	assert!(seeds.strict.contains(&"frontend engineer".into()));
	assert!(seeds.token.iter().all(|s| s != "engineer"));
	assert!(seeds.contains.iter().all(|s| s != "engineer"));
}

#[test]
fn scoring_constants_hold_at_the_edges() {
	assert_eq!(scoring::compute_idf(500, 500), scoring::IDF_MIN);
	assert_eq!(scoring::compute_idf(5_000_000, 1), scoring::IDF_MAX);
	assert_eq!(scoring::depth_penalty(1), 1.0);
	assert_eq!(scoring::depth_penalty(2), 0.85);
	assert_eq!(scoring::depth_penalty(3), 0.65);
}

#[test]
fn a_full_scoring_pass_stays_bounded() {
	// Three matched skills at mixed depths against a two-seed query.
	let contributions = [
		scoring::match_contribution(0.9, 1, Some(1.4)),
		scoring::match_contribution(0.7, 2, Some(2.1)),
		scoring::match_contribution(0.4, 3, None),
	];
	let raw: f64 = contributions.iter().sum();
	let score = scoring::normalize_score(raw, 2);

	assert!(raw > 0.0);
	assert!((0.0..=1.0).contains(&score));
}

#[test]
fn seed_set_serializes_for_diagnostics() {
	let seeds = seeds::build_seeds("rust", &[]);
	let value = serde_json::to_value(&seeds).expect("seed set must serialize");

	assert_eq!(value["strict"][0], "rust");
}
