//! Statement builders and the typed row schema each one returns. Rows are
//! decoded at this boundary; nothing downstream touches untyped maps.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::store::{GraphQuery, GraphRow};

/// How a seed list is matched against skill nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedMatch {
	/// Seed equals the node name, node key, or a registered alias.
	Exact,
	/// Seed is a substring of the node name.
	Contains,
}

/// One traversal hit: a skill reached from a seed, with the closing
/// relation and the full node-key path.
#[derive(Clone, Debug, Deserialize)]
pub struct ExpansionRow {
	pub seed: String,
	pub skill: String,
	pub skill_key: String,
	pub depth: u32,
	pub relation: String,
	pub weight: f64,
	pub path: Vec<String>,
	pub idf: Option<f64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IncidenceRow {
	pub skill_key: String,
	pub mentions: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VersionRow {
	pub version: u32,
}

/// Skill expansion for one seed tier. The depth bound is baked into the
/// statement because variable-length bounds cannot be parameterized.
pub fn expand_seeds(
	seed_match: SeedMatch,
	seeds: &[String],
	max_depth: u32,
	per_seed_limit: u32,
	min_weight: f64,
) -> GraphQuery {
	let filter = match seed_match {
		SeedMatch::Exact =>
			"s.name = seed OR s.key = seed OR EXISTS { (:Alias {name: seed})-[:ALIAS_OF]->(s) }",
		SeedMatch::Contains => "s.name CONTAINS seed",
	};
	let statement = format!(
		"\
UNWIND $seeds AS seed
MATCH (s:Skill)
WHERE {filter}
MATCH path = (s)-[:RELATES*1..{max_depth}]-(m:Skill)
WHERE m <> s AND all(r IN relationships(path) WHERE r.weight >= $min_weight)
WITH seed, m, path, relationships(path)[-1] AS last, length(path) AS depth
ORDER BY depth ASC, last.weight DESC
WITH seed, collect({{
	skill: m.name,
	skill_key: m.key,
	depth: depth,
	relation: last.kind,
	weight: last.weight,
	path: [n IN nodes(path) | n.key],
	idf: m.idf_score
}})[0..$per_seed_limit] AS hits
UNWIND hits AS hit
RETURN seed,
	hit.skill AS skill,
	hit.skill_key AS skill_key,
	hit.depth AS depth,
	hit.relation AS relation,
	hit.weight AS weight,
	hit.path AS path,
	hit.idf AS idf",
	);

	GraphQuery::new(statement)
		.param("seeds", json!(seeds))
		.param("min_weight", json!(min_weight))
		.param("per_seed_limit", json!(per_seed_limit))
}

/// Per-skill count of incident candidate edges, for the IDF refresh.
pub fn skill_incidence() -> GraphQuery {
	GraphQuery::new(
		"\
MATCH (s:Skill)
OPTIONAL MATCH (s)<-[:HAS_SKILL]-(c:Candidate)
RETURN s.key AS skill_key, count(c) AS mentions",
	)
}

/// Batch IDF property write-back. `rows` entries carry `key`, `idf`, and
/// `mentions`.
pub fn update_idf(rows: Vec<Value>, refreshed_at: &str) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MATCH (s:Skill {key: row.key})
SET s.idf_score = row.idf,
	s.candidate_count = row.mentions,
	s.idf_refreshed_at = $refreshed_at
RETURN count(s) AS updated",
	)
	.param("rows", Value::Array(rows))
	.param("refreshed_at", json!(refreshed_at))
}

/// Taxonomy skill upsert. `rows` entries carry `key`, `name`, `category`,
/// `source`, and optional `quality`.
pub fn upsert_skills(rows: Vec<Value>) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MERGE (s:Skill {key: row.key})
SET s.name = row.name,
	s.category = row.category,
	s.quality = row.quality,
	s.sources = [src IN coalesce(s.sources, []) WHERE src <> row.source] + row.source
RETURN count(s) AS written",
	)
	.param("rows", Value::Array(rows))
}

/// Taxonomy role upsert. `rows` entries carry `key`, `title`, `source`,
/// and `tags`.
pub fn upsert_roles(rows: Vec<Value>) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MERGE (r:Role {key: row.key})
SET r.title = row.title,
	r.tags = row.tags,
	r.sources = [src IN coalesce(r.sources, []) WHERE src <> row.source] + row.source
RETURN count(r) AS written",
	)
	.param("rows", Value::Array(rows))
}

/// Alias upsert onto skill nodes. `rows` entries carry `alias`, `target`
/// (skill key), and `source`.
pub fn upsert_aliases(rows: Vec<Value>) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MATCH (s:Skill {key: row.target})
MERGE (a:Alias {name: row.alias})
MERGE (a)-[e:ALIAS_OF]->(s)
SET e.source = row.source
RETURN count(a) AS written",
	)
	.param("rows", Value::Array(rows))
}

/// Role-requirement upsert. `rows` entries carry `role`, `skill`, and
/// `weight`.
pub fn upsert_role_requirements(rows: Vec<Value>) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MATCH (r:Role {key: row.role})
MATCH (s:Skill {key: row.skill})
MERGE (r)-[e:REQUIRES]->(s)
SET e.weight = row.weight
RETURN count(e) AS written",
	)
	.param("rows", Value::Array(rows))
}

/// Skill-relation upsert. `rows` entries carry `from`, `to`, `kind`,
/// `weight`, `directed`, and `source`.
pub fn upsert_relations(rows: Vec<Value>) -> GraphQuery {
	GraphQuery::new(
		"\
UNWIND $rows AS row
MATCH (f:Skill {key: row.from})
MATCH (t:Skill {key: row.to})
MERGE (f)-[e:RELATES {kind: row.kind}]->(t)
SET e.weight = row.weight,
	e.directed = row.directed,
	e.source = row.source
RETURN count(e) AS written",
	)
	.param("rows", Value::Array(rows))
}

pub fn read_taxonomy_version() -> GraphQuery {
	GraphQuery::new("MATCH (m:Meta {id: 'taxonomy'}) RETURN m.version AS version")
}

pub fn write_taxonomy_version(version: u32) -> GraphQuery {
	GraphQuery::new(
		"\
MERGE (m:Meta {id: 'taxonomy'})
SET m.version = $version
RETURN m.version AS version",
	)
	.param("version", json!(version))
}

/// Rewrites one candidate's `HAS_SKILL` edges to exactly `skill_keys`.
/// Re-running with the same keys converges on the same graph state.
pub fn sync_candidate_skills(candidate_id: &str, skill_keys: &[String]) -> GraphQuery {
	GraphQuery::new(
		"\
MERGE (c:Candidate {id: $candidate_id})
WITH c
OPTIONAL MATCH (c)-[old:HAS_SKILL]->(:Skill)
DELETE old
WITH DISTINCT c
UNWIND $skill_keys AS key
MATCH (s:Skill {key: key})
MERGE (c)-[:HAS_SKILL]->(s)
RETURN count(s) AS linked",
	)
	.param("candidate_id", json!(candidate_id))
	.param("skill_keys", json!(skill_keys))
}

pub fn decode_rows<T: serde::de::DeserializeOwned>(rows: &[GraphRow]) -> crate::Result<Vec<T>> {
	rows.iter().map(GraphRow::decode).collect()
}

#[cfg(test)]
mod tests {
	use serde_json::{Map, json};

	use super::*;

	#[test]
	fn exact_tier_matches_names_keys_and_aliases() {
		let query = expand_seeds(SeedMatch::Exact, &["react".to_string()], 3, 25, 0.0);

		assert!(query.statement.contains("ALIAS_OF"));
		assert!(query.statement.contains("*1..3"));
		assert_eq!(query.params["seeds"], json!(["react"]));
	}

	#[test]
	fn contains_tier_uses_substring_matching() {
		let query = expand_seeds(SeedMatch::Contains, &["front".to_string()], 2, 10, 0.2);

		assert!(query.statement.contains("CONTAINS seed"));
		assert!(!query.statement.contains("ALIAS_OF"));
		assert!(query.statement.contains("*1..2"));
		assert_eq!(query.params["min_weight"], json!(0.2));
	}

	#[test]
	fn expansion_rows_decode() {
		let mut row = Map::new();

		row.insert("seed".to_string(), json!("react"));
		row.insert("skill".to_string(), json!("redux"));
		row.insert("skill_key".to_string(), json!("redux"));
		row.insert("depth".to_string(), json!(2));
		row.insert("relation".to_string(), json!("related_to"));
		row.insert("weight".to_string(), json!(0.8));
		row.insert("path".to_string(), json!(["react", "javascript", "redux"]));
		row.insert("idf".to_string(), Value::Null);

		let decoded: Vec<ExpansionRow> = decode_rows(&[GraphRow(row)]).expect("row should decode");

		assert_eq!(decoded[0].depth, 2);
		assert_eq!(decoded[0].path.len(), 3);
		assert_eq!(decoded[0].idf, None);
	}

	#[test]
	fn candidate_sync_carries_id_and_keys() {
		let query = sync_candidate_skills("c-1", &["react".to_string(), "redux".to_string()]);

		assert_eq!(query.params["candidate_id"], json!("c-1"));
		assert_eq!(query.params["skill_keys"], json!(["react", "redux"]));
		assert!(query.statement.contains("DELETE old"));
	}

	#[test]
	fn version_round_trip_statements() {
		let write = write_taxonomy_version(7);

		assert_eq!(write.params["version"], json!(7));
		assert!(read_taxonomy_version().statement.contains("m.version"));
	}
}
