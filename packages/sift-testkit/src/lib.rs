//! Test fixtures: a programmable fake graph store, config builders, and a
//! disposable Postgres database helper gated on `SIFT_TEST_PG_DSN`.

mod error;

pub use error::{Error, Result};

use std::{
	collections::VecDeque,
	env,
	str::FromStr,
	sync::{Arc, Mutex, PoisonError},
	thread,
	time::Duration,
};

use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection, PgPoolOptions},
};
use tokio::runtime::Builder;
use uuid::Uuid;

use sift_config::{Config, Expansion, Postgres, Proposals, Service, Storage, Warmup, Worker};
use sift_graph::{
	breaker::BreakerConfig,
	guard::GraphGuard,
	store::{BoxFuture, GraphQuery, GraphRow, GraphStore},
};
use sift_storage::db::Db;

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// Scripted graph store. Responses are consumed in push order; once the
/// script runs out, every call returns no rows. Issued queries are recorded
/// for assertions.
#[derive(Default)]
pub struct FakeGraph {
	responses: Mutex<VecDeque<sift_graph::Result<Vec<GraphRow>>>>,
	calls: Mutex<Vec<GraphQuery>>,
}

impl FakeGraph {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues one response of rows, each built from a JSON object.
	pub fn push_rows(&self, rows: Vec<serde_json::Value>) {
		let rows = rows
			.into_iter()
			.map(|row| match row {
				serde_json::Value::Object(map) => GraphRow(map),
				other => {
					panic!("fake graph rows must be JSON objects, got {other}");
				},
			})
			.collect();

		self.lock_responses().push_back(Ok(rows));
	}

	pub fn push_failure(&self) {
		self.lock_responses()
			.push_back(Err(sift_graph::Error::Protocol { message: "scripted failure".to_string() }));
	}

	pub fn calls(&self) -> Vec<GraphQuery> {
		self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
	}

	fn next(&self, query: GraphQuery) -> sift_graph::Result<Vec<GraphRow>> {
		self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(query);

		self.lock_responses().pop_front().unwrap_or_else(|| Ok(Vec::new()))
	}

	fn lock_responses(
		&self,
	) -> std::sync::MutexGuard<'_, VecDeque<sift_graph::Result<Vec<GraphRow>>>> {
		self.responses.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

impl GraphStore for FakeGraph {
	fn read(&self, query: GraphQuery) -> BoxFuture<'_, sift_graph::Result<Vec<GraphRow>>> {
		Box::pin(async move { self.next(query) })
	}

	fn write(&self, query: GraphQuery) -> BoxFuture<'_, sift_graph::Result<Vec<GraphRow>>> {
		Box::pin(async move { self.next(query) })
	}
}

/// Wraps a fake graph in a guard with breaker settings loose enough that
/// tests exercising the happy path never trip it.
pub fn guard_for(fake: Arc<FakeGraph>) -> Arc<GraphGuard> {
	let cfg = BreakerConfig {
		error_threshold_pct: 99,
		min_volume: 1_000,
		window: Duration::from_secs(60),
		reset_timeout: Duration::from_secs(60),
		call_timeout: Duration::from_secs(5),
	};

	Arc::new(GraphGuard::new(fake as Arc<dyn GraphStore>, cfg))
}

/// Minimal valid config for tests. The DSN is only dialed when a test
/// actually touches Postgres.
pub fn test_config(dsn: &str) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			postgres: Postgres { dsn: dsn.to_string(), pool_max_conns: 4 },
		},
		graph: None,
		expansion: Expansion::default(),
		proposals: Proposals::default(),
		warmup: Warmup::default(),
		worker: Worker::default(),
	}
}

/// A pool handle that connects on first use. Lets pure-logic tests build a
/// full service object without a reachable Postgres.
pub fn lazy_db(dsn: &str) -> Result<Db> {
	let pool = PgPoolOptions::new()
		.max_connections(4)
		.connect_lazy(dsn)
		.map_err(|err| Error::Message(format!("Failed to parse test DSN: {err}.")))?;

	Ok(Db { pool })
}

pub fn env_dsn() -> Option<String> {
	env::var("SIFT_TEST_PG_DSN").ok()
}

pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options: PgConnectOptions = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse SIFT_TEST_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("sift_test_{}", Uuid::new_v4().simple());
		let create_sql = format!(r#"CREATE DATABASE "{}""#, name);

		admin_conn
			.execute(create_sql.as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		cleanup_database(&self.name, &self.admin_options).await?;

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let admin_options = self.admin_options.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test database cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(cleanup_database(&name, &admin_options)) {
				eprintln!("Test database cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub async fn with_test_db<F, T>(base_dsn: &str, f: F) -> Result<T>
where
	F: AsyncFnOnce(&TestDatabase) -> Result<T>,
{
	let db = TestDatabase::new(base_dsn).await?;
	let result = f(&db).await;
	let mut db = db;

	if let Err(err) = db.cleanup_inner().await {
		eprintln!("Test database cleanup warning: {err}.");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => {
				last_err = Some(err);
			},
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn cleanup_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;

	let drop_sql = format!(r#"DROP DATABASE IF EXISTS "{}""#, name);

	sqlx::query(drop_sql.as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}
