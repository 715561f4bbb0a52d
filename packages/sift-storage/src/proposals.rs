use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Result, db::Db, models::SkillRelationProposal};

/// Pending proposals, least-recently-scored first so re-ranking cycles
/// through the whole backlog. Review status is never touched here; that is
/// an editorial action.
pub async fn list_pending(db: &Db, limit: i64) -> Result<Vec<SkillRelationProposal>> {
	let rows = sqlx::query_as::<_, SkillRelationProposal>(
		"\
SELECT proposal_id, from_skill, to_skill, relation_kind, confidence, source, status, score, created_at, updated_at
FROM skill_relation_proposals
WHERE status = 'pending'
ORDER BY updated_at ASC
LIMIT $1",
	)
	.bind(limit)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn update_score(
	db: &Db,
	proposal_id: Uuid,
	score: f64,
	now: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"UPDATE skill_relation_proposals SET score = $1, updated_at = $2 WHERE proposal_id = $3",
	)
	.bind(score)
	.bind(now)
	.bind(proposal_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn insert(
	db: &Db,
	from_skill: &str,
	to_skill: &str,
	relation_kind: &str,
	confidence: f64,
	source: &str,
	now: OffsetDateTime,
) -> Result<Uuid> {
	let proposal_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO skill_relation_proposals
	(proposal_id, from_skill, to_skill, relation_kind, confidence, source, status, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)",
	)
	.bind(proposal_id)
	.bind(from_skill)
	.bind(to_skill)
	.bind(relation_kind)
	.bind(confidence)
	.bind(source)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(proposal_id)
}
