use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Protected-token substitutions, applied in declared order. Later patterns
/// must never re-match the output of an earlier one ("node.js" is folded
/// before the bare `js` rule can see its suffix).
const PROTECTED_TOKENS: &[(&str, &str)] = &[
	(r"c\+\+", "cpp"),
	(r"c#", "csharp"),
	(r"\.net\b", "dotnet"),
	(r"\bnode\.js\b", "nodejs"),
	(r"\bts\b", "typescript"),
	(r"\bjs\b", "javascript"),
	(r"\bml\b", "machine learning"),
	(r"\bnlp\b", "natural language processing"),
	(r"\bk8s\b", "kubernetes"),
	(r"\bpostgres\b", "postgresql"),
];

// Dotted versions first, then bare trailing digits after a known runtime.
// Reversing the order would let the runtime rule eat "python 3" out of
// "python 3.11" and leave ".11" behind.
const VERSION_PATTERNS: &[(&str, &str)] = &[
	(r"\bv?\d+(\.\d+){1,3}\b", ""),
	(r"\b(python|node|nodejs|java|php|ruby|go|scala)\s*\d+\b", "$1"),
];

static PROTECTED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| compile(PROTECTED_TOKENS));
static VERSIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| compile(VERSION_PATTERNS));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| compile_one(r"[_/|]"));
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| compile_one(r"[^a-z0-9 -]"));

fn compile(rules: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
	rules.iter().map(|(pattern, replacement)| (compile_one(pattern), *replacement)).collect()
}

fn compile_one(pattern: &str) -> Regex {
	Regex::new(pattern).expect("hardcoded pattern must compile")
}

/// Canonicalizes a free-text skill string. Pure and deterministic; the same
/// input always yields the same output.
pub fn normalize_skill(raw: &str) -> String {
	let mut text: String = raw.nfkc().collect::<String>().to_lowercase();

	text = text.trim().to_string();

	for (pattern, replacement) in PROTECTED.iter() {
		text = pattern.replace_all(&text, *replacement).into_owned();
	}
	for (pattern, replacement) in VERSIONS.iter() {
		text = pattern.replace_all(&text, *replacement).into_owned();
	}

	text = SEPARATORS.replace_all(&text, " ").into_owned();
	text = DISALLOWED.replace_all(&text, "").into_owned();

	collapse(&text)
}

/// Graph node key form: normalized name with internal spaces as hyphens.
pub fn skill_key(raw: &str) -> String {
	normalize_skill(raw).replace(' ', "-")
}

// Collapses whitespace, folds hyphen runs, and drops hyphens stranded at
// token edges ("front- end" must not leave a bare "-" token behind).
fn collapse(text: &str) -> String {
	let mut tokens = Vec::new();

	for token in text.split_whitespace() {
		let token = token.trim_matches('-');

		if token.is_empty() {
			continue;
		}

		let mut cleaned = String::with_capacity(token.len());

		for ch in token.chars() {
			if ch == '-' && cleaned.ends_with('-') {
				continue;
			}

			cleaned.push(ch);
		}

		tokens.push(cleaned);
	}

	tokens.join(" ")
}
