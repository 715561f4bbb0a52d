//! Versioned taxonomy document and its build-time validation. Individual
//! bad rows are counted per reason and dropped; only missing required
//! coverage (version, domain, a usable skill list) fails the build.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use sift_domain::{
	normalize::{normalize_skill, skill_key},
	scoring::RelationKind,
};

use crate::{Error, Result};

pub const DEFAULT_SOURCE: &str = "taxonomy";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxonomyDocument {
	pub version: u32,
	pub domain: String,
	#[serde(default)]
	pub skills: Vec<SkillEntry>,
	#[serde(default)]
	pub roles: Vec<RoleEntry>,
	#[serde(default)]
	pub aliases: Vec<AliasEntry>,
	#[serde(default)]
	pub role_requirements: Vec<RoleRequirementEntry>,
	#[serde(default)]
	pub relations: Vec<RelationEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkillEntry {
	pub name: String,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub quality: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleEntry {
	pub title: String,
	#[serde(default)]
	pub source: Option<String>,
	#[serde(default)]
	pub tags: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AliasEntry {
	pub alias: String,
	pub skill: String,
	#[serde(default)]
	pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleRequirementEntry {
	pub role: String,
	pub skill: String,
	pub weight: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationEntry {
	pub from: String,
	pub to: String,
	pub kind: String,
	pub weight: f64,
	#[serde(default)]
	pub directed: bool,
	#[serde(default)]
	pub source: Option<String>,
}

/// A skill row that passed validation, keyed for the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidSkill {
	pub key: String,
	pub name: String,
	pub category: Option<String>,
	pub source: String,
	pub quality: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidRole {
	pub key: String,
	pub title: String,
	pub source: String,
	pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidAlias {
	pub alias: String,
	pub target: String,
	pub source: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidRequirement {
	pub role: String,
	pub skill: String,
	pub weight: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidRelation {
	pub from: String,
	pub to: String,
	pub kind: RelationKind,
	pub weight: f64,
	pub directed: bool,
	pub source: String,
}

/// Validation outcome: the accepted entries plus a per-reason histogram of
/// everything that was dropped.
#[derive(Clone, Debug, Default)]
pub struct TaxonomyAudit {
	pub version: u32,
	pub domain: String,
	pub skills: Vec<ValidSkill>,
	pub roles: Vec<ValidRole>,
	pub aliases: Vec<ValidAlias>,
	pub requirements: Vec<ValidRequirement>,
	pub relations: Vec<ValidRelation>,
	pub rejections: BTreeMap<String, u64>,
}

impl TaxonomyAudit {
	pub fn accepted_count(&self) -> usize {
		self.skills.len()
			+ self.roles.len()
			+ self.aliases.len()
			+ self.requirements.len()
			+ self.relations.len()
	}

	fn reject(&mut self, reason: &str) {
		*self.rejections.entry(reason.to_string()).or_insert(0) += 1;
	}
}

pub fn validate(doc: &TaxonomyDocument) -> Result<TaxonomyAudit> {
	if doc.version == 0 {
		return Err(Error::Coverage { message: "version must be greater than zero.".to_string() });
	}
	if doc.domain.trim().is_empty() {
		return Err(Error::Coverage { message: "domain must be non-empty.".to_string() });
	}

	let mut audit = TaxonomyAudit {
		version: doc.version,
		domain: doc.domain.trim().to_string(),
		..TaxonomyAudit::default()
	};
	let mut skill_keys = HashSet::new();

	for entry in &doc.skills {
		let name = normalize_skill(&entry.name);

		if name.is_empty() {
			audit.reject("empty_name");

			continue;
		}
		if let Some(quality) = entry.quality
			&& (!quality.is_finite() || !(0.0..=1.0).contains(&quality))
		{
			audit.reject("invalid_quality");

			continue;
		}

		let key = skill_key(&entry.name);

		if !skill_keys.insert(key.clone()) {
			audit.reject("duplicate");

			continue;
		}

		audit.skills.push(ValidSkill {
			key,
			name,
			category: entry.category.as_deref().map(str::trim).map(str::to_lowercase),
			source: source_or_default(entry.source.as_deref()),
			quality: entry.quality,
		});
	}

	if audit.skills.is_empty() {
		return Err(Error::Coverage {
			message: "no skill entries survived validation.".to_string(),
		});
	}

	let mut role_keys = HashSet::new();

	for entry in &doc.roles {
		let title = normalize_skill(&entry.title);

		if title.is_empty() {
			audit.reject("empty_name");

			continue;
		}

		let key = skill_key(&entry.title);

		if !role_keys.insert(key.clone()) {
			audit.reject("duplicate");

			continue;
		}

		audit.roles.push(ValidRole {
			key,
			title,
			source: source_or_default(entry.source.as_deref()),
			tags: entry.tags.iter().map(|tag| tag.trim().to_lowercase()).collect(),
		});
	}

	let mut alias_names = HashSet::new();

	for entry in &doc.aliases {
		let alias = normalize_skill(&entry.alias);
		let target = skill_key(&entry.skill);

		if alias.is_empty() {
			audit.reject("empty_name");

			continue;
		}
		if !skill_keys.contains(&target) {
			audit.reject("unknown_skill_reference");

			continue;
		}
		if !alias_names.insert(alias.clone()) {
			audit.reject("duplicate");

			continue;
		}

		audit.aliases.push(ValidAlias {
			alias,
			target,
			source: source_or_default(entry.source.as_deref()),
		});
	}

	for entry in &doc.role_requirements {
		let role = skill_key(&entry.role);
		let skill = skill_key(&entry.skill);

		if !role_keys.contains(&role) {
			audit.reject("unknown_role_reference");

			continue;
		}
		if !skill_keys.contains(&skill) {
			audit.reject("unknown_skill_reference");

			continue;
		}
		if !entry.weight.is_finite() || !(0.0..=1.0).contains(&entry.weight) {
			audit.reject("invalid_weight");

			continue;
		}

		audit.requirements.push(ValidRequirement { role, skill, weight: entry.weight });
	}

	let mut relation_keys = HashSet::new();

	for entry in &doc.relations {
		let from = skill_key(&entry.from);
		let to = skill_key(&entry.to);
		let Some(kind) = RelationKind::parse(entry.kind.trim()) else {
			audit.reject("unknown_relation_kind");

			continue;
		};

		if !skill_keys.contains(&from) || !skill_keys.contains(&to) {
			audit.reject("unknown_skill_reference");

			continue;
		}
		if from == to {
			audit.reject("self_relation");

			continue;
		}
		if !entry.weight.is_finite() || !(0.0..=1.0).contains(&entry.weight) {
			audit.reject("invalid_weight");

			continue;
		}
		if !relation_keys.insert((from.clone(), to.clone(), kind)) {
			audit.reject("duplicate");

			continue;
		}

		audit.relations.push(ValidRelation {
			from,
			to,
			kind,
			weight: entry.weight,
			directed: entry.directed,
			source: source_or_default(entry.source.as_deref()),
		});
	}

	Ok(audit)
}

fn source_or_default(source: Option<&str>) -> String {
	match source.map(str::trim) {
		Some(source) if !source.is_empty() => source.to_lowercase(),
		_ => DEFAULT_SOURCE.to_string(),
	}
}
