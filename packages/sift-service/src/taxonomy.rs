//! Taxonomy build: validate the document, upsert the graph, bump the
//! version meta node so cache fingerprints roll over.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};

use sift_graph::queries;
use sift_taxonomy::document::{TaxonomyAudit, TaxonomyDocument, validate};

use crate::{Error, Result, SiftService};

const WRITE_CHUNK: usize = 500;

#[derive(Clone, Debug, Default, Serialize)]
pub struct TaxonomyBuildReport {
	pub version: u32,
	pub skills_written: u64,
	pub roles_written: u64,
	pub aliases_written: u64,
	pub requirements_written: u64,
	pub relations_written: u64,
	pub rejections: BTreeMap<String, u64>,
}

impl SiftService {
	pub async fn build_taxonomy(&self, doc: &TaxonomyDocument) -> Result<TaxonomyBuildReport> {
		let Some(graph) = self.graph.as_ref() else {
			return Err(Error::GraphUnconfigured);
		};
		let audit = validate(doc)?;
		let mut report = TaxonomyBuildReport {
			version: audit.version,
			rejections: audit.rejections.clone(),
			..TaxonomyBuildReport::default()
		};

		// Write order matters: nodes before the edges that reference them.
		for chunk in skill_rows(&audit).chunks(WRITE_CHUNK) {
			graph.write(queries::upsert_skills(chunk.to_vec())).await?;

			report.skills_written += chunk.len() as u64;
		}
		for chunk in role_rows(&audit).chunks(WRITE_CHUNK) {
			graph.write(queries::upsert_roles(chunk.to_vec())).await?;

			report.roles_written += chunk.len() as u64;
		}
		for chunk in alias_rows(&audit).chunks(WRITE_CHUNK) {
			graph.write(queries::upsert_aliases(chunk.to_vec())).await?;

			report.aliases_written += chunk.len() as u64;
		}
		for chunk in requirement_rows(&audit).chunks(WRITE_CHUNK) {
			graph.write(queries::upsert_role_requirements(chunk.to_vec())).await?;

			report.requirements_written += chunk.len() as u64;
		}
		for chunk in relation_rows(&audit).chunks(WRITE_CHUNK) {
			graph.write(queries::upsert_relations(chunk.to_vec())).await?;

			report.relations_written += chunk.len() as u64;
		}

		graph.write(queries::write_taxonomy_version(audit.version)).await?;
		self.set_taxonomy_version(audit.version);

		tracing::info!(
			version = report.version,
			skills = report.skills_written,
			relations = report.relations_written,
			rejected = report.rejections.values().sum::<u64>(),
			"Taxonomy build completed.",
		);

		Ok(report)
	}
}

fn skill_rows(audit: &TaxonomyAudit) -> Vec<Value> {
	audit
		.skills
		.iter()
		.map(|skill| {
			json!({
				"key": skill.key,
				"name": skill.name,
				"category": skill.category,
				"source": skill.source,
				"quality": skill.quality,
			})
		})
		.collect()
}

fn role_rows(audit: &TaxonomyAudit) -> Vec<Value> {
	audit
		.roles
		.iter()
		.map(|role| {
			json!({
				"key": role.key,
				"title": role.title,
				"source": role.source,
				"tags": role.tags,
			})
		})
		.collect()
}

fn alias_rows(audit: &TaxonomyAudit) -> Vec<Value> {
	audit
		.aliases
		.iter()
		.map(|alias| {
			json!({
				"alias": alias.alias,
				"target": alias.target,
				"source": alias.source,
			})
		})
		.collect()
}

fn requirement_rows(audit: &TaxonomyAudit) -> Vec<Value> {
	audit
		.requirements
		.iter()
		.map(|requirement| {
			json!({
				"role": requirement.role,
				"skill": requirement.skill,
				"weight": requirement.weight,
			})
		})
		.collect()
}

fn relation_rows(audit: &TaxonomyAudit) -> Vec<Value> {
	audit
		.relations
		.iter()
		.map(|relation| {
			json!({
				"from": relation.from,
				"to": relation.to,
				"kind": relation.kind.as_str(),
				"weight": relation.weight,
				"directed": relation.directed,
				"source": relation.source,
			})
		})
		.collect()
}
