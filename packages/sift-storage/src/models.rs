use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct SyncJob {
	pub job_id: Uuid,
	pub kind: String,
	pub dedup_key: String,
	pub payload: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct SkillRelationProposal {
	pub proposal_id: Uuid,
	pub from_skill: String,
	pub to_skill: String,
	pub relation_kind: String,
	pub confidence: f64,
	pub source: String,
	pub status: String,
	pub score: Option<f64>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Minimal relational projection of a candidate, everything the shadow
/// profile and the graph sync need.
#[derive(Debug, sqlx::FromRow)]
pub struct CandidateProjection {
	pub candidate_id: Uuid,
	pub title: Option<String>,
	pub location: Option<String>,
	pub years_experience: Option<f32>,
	pub skills: Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ShadowProfile {
	pub candidate_id: Uuid,
	pub location: Option<String>,
	pub title: Option<String>,
	pub years_experience: Option<f32>,
	pub indexed_at: OffsetDateTime,
	pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct MetricPoint {
	pub bucket_start: OffsetDateTime,
	pub name: String,
	pub value: f64,
	pub dimensions: Option<Value>,
}
