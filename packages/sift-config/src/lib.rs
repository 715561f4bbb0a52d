pub mod env;

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Breaker, Config, Expansion, Graph, Postgres, Proposals, Service, Storage, Warmup, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation { message: "service.http_bind must be non-empty.".to_string() });
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation { message: "service.log_level must be non-empty.".to_string() });
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	if let Some(graph) = cfg.graph.as_ref() {
		if graph.url.trim().is_empty() {
			return Err(Error::Validation { message: "graph.url must be non-empty.".to_string() });
		}
		if graph.database.trim().is_empty() {
			return Err(Error::Validation {
				message: "graph.database must be non-empty.".to_string(),
			});
		}
		if graph.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "graph.timeout_ms must be greater than zero.".to_string(),
			});
		}
		if graph.breaker.error_threshold_pct == 0 || graph.breaker.error_threshold_pct > 100 {
			return Err(Error::Validation {
				message: "graph.breaker.error_threshold_pct must be between 1 and 100.".to_string(),
			});
		}
		if graph.breaker.min_volume == 0 {
			return Err(Error::Validation {
				message: "graph.breaker.min_volume must be greater than zero.".to_string(),
			});
		}
		if graph.breaker.window_ms == 0 {
			return Err(Error::Validation {
				message: "graph.breaker.window_ms must be greater than zero.".to_string(),
			});
		}
		if graph.breaker.reset_timeout_ms == 0 {
			return Err(Error::Validation {
				message: "graph.breaker.reset_timeout_ms must be greater than zero.".to_string(),
			});
		}
	}

	if cfg.expansion.max_depth == 0 || cfg.expansion.max_depth > 4 {
		return Err(Error::Validation {
			message: "expansion.max_depth must be between 1 and 4.".to_string(),
		});
	}
	if cfg.expansion.min_rows == 0 {
		return Err(Error::Validation {
			message: "expansion.min_rows must be greater than zero.".to_string(),
		});
	}
	if cfg.expansion.per_seed_limit == 0 {
		return Err(Error::Validation {
			message: "expansion.per_seed_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.expansion.result_limit == 0 {
		return Err(Error::Validation {
			message: "expansion.result_limit must be greater than zero.".to_string(),
		});
	}
	if !cfg.expansion.min_relation_weight.is_finite()
		|| !(0.0..=1.0).contains(&cfg.expansion.min_relation_weight)
	{
		return Err(Error::Validation {
			message: "expansion.min_relation_weight must be within 0.0-1.0.".to_string(),
		});
	}
	if cfg.expansion.cache_ttl_minutes <= 0 {
		return Err(Error::Validation {
			message: "expansion.cache_ttl_minutes must be greater than zero.".to_string(),
		});
	}
	if cfg.expansion.policy_version == 0 {
		return Err(Error::Validation {
			message: "expansion.policy_version must be greater than zero.".to_string(),
		});
	}

	for (source, boost) in &cfg.proposals.source_boosts {
		if !boost.is_finite() || !(0.0..=1.0).contains(boost) {
			return Err(Error::Validation {
				message: format!("proposals.source_boosts.{source} must be within 0.0-1.0."),
			});
		}
	}

	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.metrics_drain_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.metrics_drain_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.shadow_interval_seconds == 0 {
		return Err(Error::Validation {
			message: "worker.shadow_interval_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.shadow_batch_size == 0 {
		return Err(Error::Validation {
			message: "worker.shadow_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.proposal_batch_size == 0 {
		return Err(Error::Validation {
			message: "worker.proposal_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.job_max_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.job_max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.dead_job_retention_days <= 0 {
		return Err(Error::Validation {
			message: "worker.dead_job_retention_days must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for query in &mut cfg.warmup.queries {
		*query = query.trim().to_string();
	}

	cfg.warmup.queries.retain(|query| !query.is_empty());

	// Source tags are matched case-insensitively against proposal rows.
	let boosts = cfg.proposals.source_boosts.drain().collect::<Vec<_>>();

	for (source, boost) in boosts {
		cfg.proposals.source_boosts.insert(source.trim().to_lowercase(), boost);
	}
}
