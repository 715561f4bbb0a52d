use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	/// Absent means no graph store is configured; expansion and statistics
	/// refresh degrade to empty results instead of erroring.
	pub graph: Option<Graph>,
	#[serde(default)]
	pub expansion: Expansion,
	#[serde(default)]
	pub proposals: Proposals,
	#[serde(default)]
	pub warmup: Warmup,
	#[serde(default)]
	pub worker: Worker,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Graph {
	pub url: String,
	#[serde(default = "default_graph_database")]
	pub database: String,
	pub username: String,
	pub password: String,
	#[serde(default = "default_graph_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub breaker: Breaker,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Breaker {
	/// Failure percentage over the rolling window that trips the breaker.
	pub error_threshold_pct: u8,
	/// Minimum calls the window must have seen before it can trip.
	pub min_volume: u32,
	pub window_ms: u64,
	pub reset_timeout_ms: u64,
}

impl Default for Breaker {
	fn default() -> Self {
		Self { error_threshold_pct: 50, min_volume: 10, window_ms: 30_000, reset_timeout_ms: 30_000 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Expansion {
	/// Traversal depth bound, 1 to 4 hops.
	pub max_depth: u32,
	/// A tier escalates to the next looser one only while the total row
	/// count stays below this.
	pub min_rows: u32,
	pub per_seed_limit: u32,
	pub result_limit: u32,
	pub min_relation_weight: f64,
	pub cache_ttl_minutes: i64,
	/// Bumped manually whenever scoring semantics change; part of the cache
	/// fingerprint so stale entries stop matching.
	pub policy_version: u32,
}

impl Default for Expansion {
	fn default() -> Self {
		Self {
			max_depth: 3,
			min_rows: 3,
			per_seed_limit: 25,
			result_limit: 100,
			min_relation_weight: 0.0,
			cache_ttl_minutes: 60,
			policy_version: 1,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Proposals {
	/// Additive trust bonus per proposal source tag. Unknown sources get no
	/// boost.
	pub source_boosts: HashMap<String, f64>,
}

impl Default for Proposals {
	fn default() -> Self {
		let mut source_boosts = HashMap::new();

		source_boosts.insert("curated".to_string(), 0.15);
		source_boosts.insert("partner".to_string(), 0.10);
		source_boosts.insert("extraction".to_string(), 0.02);

		Self { source_boosts }
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Warmup {
	/// Queries pre-expanded at worker startup to prime the cache.
	pub queries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub metrics_drain_seconds: u64,
	pub shadow_interval_seconds: u64,
	pub shadow_batch_size: u32,
	pub proposal_interval_seconds: u64,
	pub proposal_batch_size: u32,
	pub idf_refresh_minutes: u64,
	pub version_refresh_seconds: u64,
	pub purge_interval_seconds: u64,
	pub job_max_attempts: i32,
	pub dead_job_retention_days: i64,
}

impl Default for Worker {
	fn default() -> Self {
		Self {
			poll_interval_ms: 500,
			metrics_drain_seconds: 15,
			shadow_interval_seconds: 10,
			shadow_batch_size: 100,
			proposal_interval_seconds: 60,
			proposal_batch_size: 200,
			idf_refresh_minutes: 360,
			version_refresh_seconds: 300,
			purge_interval_seconds: 900,
			job_max_attempts: 5,
			dead_job_retention_days: 7,
		}
	}
}

fn default_graph_database() -> String {
	"neo4j".to_string()
}

fn default_graph_timeout_ms() -> u64 {
	3_000
}
