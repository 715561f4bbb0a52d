/// Full DDL, applied statement-by-statement by [`crate::db::Db::ensure_schema`].
/// Statements must stay semicolon-splittable: no semicolons inside string
/// literals or function bodies.
pub fn render_schema() -> String {
	SCHEMA.to_string()
}

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS candidates (
	candidate_id UUID PRIMARY KEY,
	full_name TEXT NOT NULL,
	title TEXT,
	location TEXT,
	years_experience REAL,
	skills JSONB NOT NULL DEFAULT '[]'::jsonb,
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS skill_relation_proposals (
	proposal_id UUID PRIMARY KEY,
	from_skill TEXT NOT NULL,
	to_skill TEXT NOT NULL,
	relation_kind TEXT NOT NULL,
	confidence DOUBLE PRECISION NOT NULL,
	source TEXT NOT NULL,
	status TEXT NOT NULL DEFAULT 'pending',
	score DOUBLE PRECISION,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_proposals_status
	ON skill_relation_proposals (status, updated_at);

CREATE TABLE IF NOT EXISTS sync_jobs (
	job_id UUID PRIMARY KEY,
	kind TEXT NOT NULL,
	dedup_key TEXT NOT NULL,
	payload JSONB NOT NULL DEFAULT '{}'::jsonb,
	status TEXT NOT NULL DEFAULT 'PENDING',
	attempts INT NOT NULL DEFAULT 0,
	last_error TEXT,
	available_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_sync_jobs_live_dedup
	ON sync_jobs (kind, dedup_key)
	WHERE status IN ('PENDING', 'FAILED', 'CLAIMED');

CREATE INDEX IF NOT EXISTS idx_sync_jobs_available
	ON sync_jobs (status, available_at);

CREATE TABLE IF NOT EXISTS shadow_sync_pending (
	candidate_id UUID PRIMARY KEY,
	enqueued_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS shadow_profiles (
	candidate_id UUID PRIMARY KEY,
	location TEXT,
	title TEXT,
	years_experience REAL,
	indexed_at TIMESTAMPTZ NOT NULL,
	expires_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_shadow_profiles_expiry
	ON shadow_profiles (expires_at);

CREATE TABLE IF NOT EXISTS expansion_cache (
	cache_key TEXT PRIMARY KEY,
	payload JSONB NOT NULL,
	created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
	expires_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expansion_cache_expiry
	ON expansion_cache (expires_at);

CREATE TABLE IF NOT EXISTS metric_points (
	point_id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
	bucket_start TIMESTAMPTZ NOT NULL,
	name TEXT NOT NULL,
	value DOUBLE PRECISION NOT NULL,
	dimensions JSONB
);

CREATE INDEX IF NOT EXISTS idx_metric_points_bucket
	ON metric_points (bucket_start, name);
";

#[cfg(test)]
mod tests {
	use super::render_schema;

	#[test]
	fn every_statement_is_splittable() {
		let sql = render_schema();
		let statements: Vec<&str> =
			sql.split(';').map(str::trim).filter(|s| !s.is_empty()).collect();

		assert!(statements.len() >= 8);

		for statement in statements {
			assert!(
				statement.starts_with("CREATE TABLE") || statement.starts_with("CREATE INDEX")
					|| statement.starts_with("CREATE UNIQUE INDEX"),
				"unexpected statement start: {statement:.40}"
			);
		}
	}
}
