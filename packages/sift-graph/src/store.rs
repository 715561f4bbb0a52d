use std::{future::Future, pin::Pin, time::Duration};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::{Error, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A declarative pattern-matching statement plus its parameter map. The
/// query language itself belongs to the graph store; this crate only moves
/// statements and rows across the wire.
#[derive(Clone, Debug)]
pub struct GraphQuery {
	pub statement: String,
	pub params: Map<String, Value>,
}

impl GraphQuery {
	pub fn new(statement: impl Into<String>) -> Self {
		Self { statement: statement.into(), params: Map::new() }
	}

	pub fn param(mut self, key: &str, value: Value) -> Self {
		self.params.insert(key.to_string(), value);

		self
	}
}

/// One result row, keyed by the statement's return columns.
#[derive(Clone, Debug, Default)]
pub struct GraphRow(pub Map<String, Value>);

impl GraphRow {
	/// Converts the row into the typed schema expected for its query.
	/// Shape mismatches surface here, at the boundary, instead of deep in
	/// scoring logic.
	pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
		serde_json::from_value(Value::Object(self.0.clone()))
			.map_err(|err| Error::Decode { message: err.to_string() })
	}

	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}
}

pub trait GraphStore
where
	Self: Send + Sync,
{
	fn read(&self, query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>>;

	fn write(&self, query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>>;
}

/// Graph store speaking the HTTP transactional endpoint: every query runs
/// as a single auto-committed transaction.
pub struct HttpGraphStore {
	client: Client,
	endpoint: String,
	username: String,
	password: String,
}

impl HttpGraphStore {
	pub fn new(cfg: &sift_config::Graph) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let endpoint =
			format!("{}/db/{}/tx/commit", cfg.url.trim_end_matches('/'), cfg.database);

		Ok(Self {
			client,
			endpoint,
			username: cfg.username.clone(),
			password: cfg.password.clone(),
		})
	}

	async fn execute(&self, query: GraphQuery) -> Result<Vec<GraphRow>> {
		let body = json!({
			"statements": [{
				"statement": query.statement,
				"parameters": Value::Object(query.params),
			}],
		});
		let response = self
			.client
			.post(&self.endpoint)
			.basic_auth(&self.username, Some(&self.password))
			.json(&body)
			.send()
			.await?;
		let payload: Value = response.error_for_status()?.json().await?;

		parse_commit_response(payload)
	}
}

impl GraphStore for HttpGraphStore {
	fn read(&self, query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>> {
		Box::pin(self.execute(query))
	}

	fn write(&self, query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>> {
		Box::pin(self.execute(query))
	}
}

fn parse_commit_response(payload: Value) -> Result<Vec<GraphRow>> {
	if let Some(error) = payload.get("errors").and_then(Value::as_array).and_then(|e| e.first()) {
		let code = error.get("code").and_then(Value::as_str).unwrap_or("unknown");
		let message = error.get("message").and_then(Value::as_str).unwrap_or("");

		return Err(Error::Protocol { message: format!("{code}: {message}") });
	}

	let Some(result) = payload.get("results").and_then(Value::as_array).and_then(|r| r.first())
	else {
		return Ok(Vec::new());
	};
	let columns: Vec<String> = result
		.get("columns")
		.and_then(Value::as_array)
		.map(|columns| {
			columns.iter().filter_map(Value::as_str).map(ToString::to_string).collect()
		})
		.unwrap_or_default();
	let Some(data) = result.get("data").and_then(Value::as_array) else {
		return Ok(Vec::new());
	};
	let mut rows = Vec::with_capacity(data.len());

	for entry in data {
		let Some(values) = entry.get("row").and_then(Value::as_array) else {
			return Err(Error::Protocol { message: "result entry is missing a row.".to_string() });
		};

		if values.len() != columns.len() {
			return Err(Error::Protocol {
				message: format!(
					"row width {} does not match column count {}.",
					values.len(),
					columns.len()
				),
			});
		}

		let mut row = Map::new();

		for (column, value) in columns.iter().zip(values) {
			row.insert(column.clone(), value.clone());
		}

		rows.push(GraphRow(row));
	}

	Ok(rows)
}

#[cfg(test)]
mod tests {
	use serde::Deserialize;
	use serde_json::json;

	use super::{GraphQuery, parse_commit_response};
	use crate::Error;

	#[test]
	fn parses_rows_from_a_commit_response() {
		let payload = json!({
			"results": [{
				"columns": ["skill", "depth"],
				"data": [
					{ "row": ["react", 1] },
					{ "row": ["redux", 2] },
				],
			}],
			"errors": [],
		});
		let rows = parse_commit_response(payload).expect("response should parse");

		assert_eq!(rows.len(), 2);
		assert_eq!(rows[0].get("skill"), Some(&json!("react")));
		assert_eq!(rows[1].get("depth"), Some(&json!(2)));
	}

	#[test]
	fn surfaces_server_errors() {
		let payload = json!({
			"results": [],
			"errors": [{ "code": "Neo.ClientError.Statement.SyntaxError", "message": "bad query" }],
		});
		let err = parse_commit_response(payload).expect_err("errors should surface");

		assert!(matches!(err, Error::Protocol { .. }));
		assert!(err.to_string().contains("SyntaxError"));
	}

	#[test]
	fn rejects_ragged_rows() {
		let payload = json!({
			"results": [{
				"columns": ["a", "b"],
				"data": [{ "row": [1] }],
			}],
			"errors": [],
		});

		assert!(parse_commit_response(payload).is_err());
	}

	#[test]
	fn empty_results_decode_to_no_rows() {
		let payload = json!({ "results": [], "errors": [] });

		assert!(parse_commit_response(payload).expect("should parse").is_empty());
	}

	#[test]
	fn rows_decode_into_typed_schemas() {
		#[derive(Debug, Deserialize)]
		struct Row {
			skill: String,
			depth: u32,
		}

		let payload = json!({
			"results": [{ "columns": ["skill", "depth"], "data": [{ "row": ["react", 1] }] }],
			"errors": [],
		});
		let rows = parse_commit_response(payload).expect("response should parse");
		let row: Row = rows[0].decode().expect("row should decode");

		assert_eq!(row.skill, "react");
		assert_eq!(row.depth, 1);
	}

	#[test]
	fn query_builder_collects_params() {
		let query = GraphQuery::new("RETURN $a, $b")
			.param("a", json!(1))
			.param("b", json!(["x", "y"]));

		assert_eq!(query.params.len(), 2);
		assert_eq!(query.params["b"], json!(["x", "y"]));
	}
}
