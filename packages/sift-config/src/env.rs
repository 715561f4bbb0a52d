//! Environment overrides for worker cadence tunables. An unset, malformed,
//! or out-of-range value silently keeps the configured default; operators
//! get exactly the documented behavior, never a crash loop.

use crate::Config;

pub const METRICS_DRAIN_SECONDS: &str = "SIFT_METRICS_DRAIN_SECONDS";
pub const SHADOW_BATCH_SIZE: &str = "SIFT_SHADOW_BATCH_SIZE";
pub const PROPOSAL_BATCH_SIZE: &str = "SIFT_PROPOSAL_BATCH_SIZE";
pub const IDF_REFRESH_MINUTES: &str = "SIFT_IDF_REFRESH_MINUTES";

pub fn apply_worker_overrides(cfg: &mut Config) {
	cfg.worker.metrics_drain_seconds =
		from_env(METRICS_DRAIN_SECONDS, cfg.worker.metrics_drain_seconds, 5, 300);
	cfg.worker.shadow_batch_size =
		from_env(SHADOW_BATCH_SIZE, u64::from(cfg.worker.shadow_batch_size), 1, 1_000) as u32;
	cfg.worker.proposal_batch_size =
		from_env(PROPOSAL_BATCH_SIZE, u64::from(cfg.worker.proposal_batch_size), 1, 1_000) as u32;
	cfg.worker.idf_refresh_minutes =
		from_env(IDF_REFRESH_MINUTES, cfg.worker.idf_refresh_minutes, 5, 10_080);
}

pub fn from_env(name: &str, default: u64, min: u64, max: u64) -> u64 {
	parse_override(std::env::var(name).ok().as_deref(), default, min, max)
}

pub fn parse_override(raw: Option<&str>, default: u64, min: u64, max: u64) -> u64 {
	let Some(raw) = raw else {
		return default;
	};

	match raw.trim().parse::<u64>() {
		Ok(value) if (min..=max).contains(&value) => value,
		_ => default,
	}
}

#[cfg(test)]
mod tests {
	use super::{from_env, parse_override};

	#[test]
	fn unset_value_keeps_default() {
		assert_eq!(parse_override(None, 15, 5, 300), 15);
	}

	#[test]
	fn valid_in_range_value_passes_through() {
		assert_eq!(parse_override(Some("45"), 15, 5, 300), 45);
		assert_eq!(parse_override(Some(" 5 "), 15, 5, 300), 5);
		assert_eq!(parse_override(Some("300"), 15, 5, 300), 300);
	}

	#[test]
	fn invalid_values_fall_back_to_default() {
		for raw in ["0", "-10", "4", "301", "1e3", "ten", "", "15.5"] {
			assert_eq!(parse_override(Some(raw), 15, 5, 300), 15, "raw={raw:?}");
		}
	}

	#[test]
	fn missing_variable_reads_as_default() {
		assert_eq!(from_env("SIFT_TEST_VARIABLE_THAT_IS_NEVER_SET", 100, 1, 1_000), 100);
	}
}
