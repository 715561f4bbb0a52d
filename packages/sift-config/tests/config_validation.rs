use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sift_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn render(value: &Value) -> String {
	toml::to_string(value).expect("Failed to render template config.")
}

fn table_mut<'a>(value: &'a mut Value, path: &[&str]) -> &'a mut toml::map::Map<String, Value> {
	let mut current = value;

	for segment in path {
		let table = current.as_table_mut().expect("Template config path must be a table.");

		current = table
			.get_mut(*segment)
			.unwrap_or_else(|| panic!("Template config must include [{segment}]."));
	}

	current.as_table_mut().expect("Template config path must be a table.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sift_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

fn load_expecting_error(payload: String, needle: &str) {
	let path = write_temp_config(payload);
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let err = result.expect_err("Expected a validation error.");

	assert!(err.to_string().contains(needle), "Unexpected error: {err}");
}

#[test]
fn template_config_loads() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected template config to load.");

	assert!(cfg.graph.is_some());
	assert_eq!(cfg.expansion.max_depth, 3);
	// Worker fields omitted from the template fall back to defaults.
	assert_eq!(cfg.worker.metrics_drain_seconds, 15);
	assert_eq!(cfg.worker.job_max_attempts, 5);
}

#[test]
fn graph_section_is_optional() {
	let mut value = sample_value();

	value.as_table_mut().expect("Template config must be a table.").remove("graph");

	let path = write_temp_config(render(&value));
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config without graph section to load.");

	assert!(cfg.graph.is_none());
}

#[test]
fn expansion_max_depth_is_bounded() {
	let mut value = sample_value();

	table_mut(&mut value, &["expansion"]).insert("max_depth".to_string(), Value::Integer(0));

	load_expecting_error(render(&value), "expansion.max_depth must be between 1 and 4.");

	let mut value = sample_value();

	table_mut(&mut value, &["expansion"]).insert("max_depth".to_string(), Value::Integer(5));

	load_expecting_error(render(&value), "expansion.max_depth must be between 1 and 4.");
}

#[test]
fn expansion_min_rows_must_be_positive() {
	let mut value = sample_value();

	table_mut(&mut value, &["expansion"]).insert("min_rows".to_string(), Value::Integer(0));

	load_expecting_error(render(&value), "expansion.min_rows must be greater than zero.");
}

#[test]
fn expansion_cache_ttl_must_be_positive() {
	let mut value = sample_value();

	table_mut(&mut value, &["expansion"])
		.insert("cache_ttl_minutes".to_string(), Value::Integer(0));

	load_expecting_error(render(&value), "expansion.cache_ttl_minutes must be greater than zero.");
}

#[test]
fn breaker_threshold_must_be_a_percentage() {
	let mut value = sample_value();

	table_mut(&mut value, &["graph", "breaker"])
		.insert("error_threshold_pct".to_string(), Value::Integer(0));

	load_expecting_error(
		render(&value),
		"graph.breaker.error_threshold_pct must be between 1 and 100.",
	);
}

#[test]
fn breaker_min_volume_must_be_positive() {
	let mut value = sample_value();

	table_mut(&mut value, &["graph", "breaker"])
		.insert("min_volume".to_string(), Value::Integer(0));

	load_expecting_error(render(&value), "graph.breaker.min_volume must be greater than zero.");
}

#[test]
fn graph_url_must_be_non_empty() {
	let mut value = sample_value();

	table_mut(&mut value, &["graph"]).insert("url".to_string(), Value::String("   ".to_string()));

	load_expecting_error(render(&value), "graph.url must be non-empty.");
}

#[test]
fn postgres_pool_must_be_positive() {
	let mut value = sample_value();

	table_mut(&mut value, &["storage", "postgres"])
		.insert("pool_max_conns".to_string(), Value::Integer(0));

	load_expecting_error(render(&value), "storage.postgres.pool_max_conns must be greater than zero.");
}

#[test]
fn relation_weight_floor_must_be_in_unit_range() {
	let mut value = sample_value();

	table_mut(&mut value, &["expansion"])
		.insert("min_relation_weight".to_string(), Value::Float(1.5));

	load_expecting_error(render(&value), "expansion.min_relation_weight must be within 0.0-1.0.");
}

#[test]
fn source_boosts_must_be_in_unit_range() {
	let mut value = sample_value();
	let mut boosts = toml::map::Map::new();

	boosts.insert("curated".to_string(), Value::Float(2.0));

	let mut proposals = toml::map::Map::new();

	proposals.insert("source_boosts".to_string(), Value::Table(boosts));
	value
		.as_table_mut()
		.expect("Template config must be a table.")
		.insert("proposals".to_string(), Value::Table(proposals));

	load_expecting_error(render(&value), "proposals.source_boosts.curated must be within 0.0-1.0.");
}

#[test]
fn blank_warmup_queries_are_dropped() {
	let mut value = sample_value();

	table_mut(&mut value, &["warmup"]).insert(
		"queries".to_string(),
		Value::Array(vec![
			Value::String("  backend developer  ".to_string()),
			Value::String("   ".to_string()),
		]),
	);

	let path = write_temp_config(render(&value));
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config to load.");

	assert_eq!(cfg.warmup.queries, vec!["backend developer".to_string()]);
}

#[test]
fn source_boost_keys_are_lowercased() {
	let mut value = sample_value();
	let mut boosts = toml::map::Map::new();

	boosts.insert("Curated".to_string(), Value::Float(0.2));

	let mut proposals = toml::map::Map::new();

	proposals.insert("source_boosts".to_string(), Value::Table(boosts));
	value
		.as_table_mut()
		.expect("Template config must be a table.")
		.insert("proposals".to_string(), Value::Table(proposals));

	let path = write_temp_config(render(&value));
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected config to load.");

	assert_eq!(cfg.proposals.source_boosts.get("curated"), Some(&0.2));
}

#[test]
fn worker_job_attempts_must_be_positive() {
	let mut cfg = base_config();

	cfg.worker.job_max_attempts = 0;

	let err = sift_config::validate(&cfg).expect_err("Expected job_max_attempts validation error.");

	assert!(
		err.to_string().contains("worker.job_max_attempts must be greater than zero."),
		"Unexpected error: {err}"
	);
}

#[test]
fn sift_example_toml_is_valid() {
	let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

	path.push("../../sift.example.toml");

	sift_config::load(&path).expect("Expected sift.example.toml to be a valid config.");
}
