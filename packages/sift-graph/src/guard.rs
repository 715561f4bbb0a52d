use std::sync::Arc;

use crate::{
	Error, Result,
	breaker::{BreakerConfig, BreakerError, BreakerState, CircuitBreaker},
	store::{GraphQuery, GraphRow, GraphStore},
};

/// Rows from a guarded read plus whether the fallback path produced them.
/// `fallback == true` means the graph was not consulted (breaker open) or
/// the call failed; `rows` is empty in that case.
#[derive(Debug, Default)]
pub struct GuardedRead {
	pub rows: Vec<GraphRow>,
	pub fallback: bool,
}

/// Breaker-protected front door to the graph store. Reads never error so
/// downstream scoring degrades to "no expansion" instead of failing the
/// request; writes propagate their errors to the caller.
pub struct GraphGuard {
	store: Arc<dyn GraphStore>,
	breaker: CircuitBreaker,
}

impl GraphGuard {
	pub fn new(store: Arc<dyn GraphStore>, cfg: BreakerConfig) -> Self {
		let breaker = CircuitBreaker::new(cfg);

		breaker.on_state_change(|old, new| {
			tracing::warn!(
				old = old.as_str(),
				new = new.as_str(),
				"Graph circuit breaker changed state.",
			);
		});

		Self { store, breaker }
	}

	pub fn state(&self) -> BreakerState {
		self.breaker.state()
	}

	pub async fn read(&self, query: GraphQuery) -> GuardedRead {
		match self.breaker.call(self.store.read(query)).await {
			Ok(rows) => GuardedRead { rows, fallback: false },
			Err(err) => {
				log_breaker_error(&err, "read");

				GuardedRead { rows: Vec::new(), fallback: true }
			},
		}
	}

	pub async fn write(&self, query: GraphQuery) -> Result<Vec<GraphRow>> {
		self.breaker.call(self.store.write(query)).await.map_err(|err| {
			log_breaker_error(&err, "write");

			match err {
				BreakerError::Open => Error::CircuitOpen,
				BreakerError::Timeout => Error::Timeout,
				BreakerError::Inner(inner) => inner,
			}
		})
	}
}

fn log_breaker_error(err: &BreakerError<Error>, op: &str) {
	match err {
		BreakerError::Open => tracing::debug!(op, "Graph call short-circuited; breaker is open."),
		BreakerError::Timeout => tracing::warn!(op, "Graph call timed out."),
		BreakerError::Inner(inner) => tracing::warn!(op, error = %inner, "Graph call failed."),
	}
}

#[cfg(test)]
mod tests {
	use std::{
		sync::{
			Arc, Mutex,
			atomic::{AtomicU32, Ordering},
		},
		time::Duration,
	};

	use super::*;
	use crate::store::BoxFuture;

	struct ScriptedStore {
		responses: Mutex<Vec<Result<Vec<GraphRow>>>>,
		calls: AtomicU32,
	}

	impl ScriptedStore {
		fn new(responses: Vec<Result<Vec<GraphRow>>>) -> Self {
			Self { responses: Mutex::new(responses), calls: AtomicU32::new(0) }
		}

		fn next(&self) -> Result<Vec<GraphRow>> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let mut responses = self.responses.lock().expect("scripted responses lock");

			if responses.is_empty() {
				Ok(Vec::new())
			} else {
				responses.remove(0)
			}
		}
	}

	impl GraphStore for ScriptedStore {
		fn read(&self, _query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>> {
			Box::pin(async move { self.next() })
		}

		fn write(&self, _query: GraphQuery) -> BoxFuture<'_, Result<Vec<GraphRow>>> {
			Box::pin(async move { self.next() })
		}
	}

	fn guard_with(responses: Vec<Result<Vec<GraphRow>>>) -> (GraphGuard, Arc<ScriptedStore>) {
		let store = Arc::new(ScriptedStore::new(responses));
		let cfg = BreakerConfig {
			error_threshold_pct: 50,
			min_volume: 2,
			window: Duration::from_secs(10),
			reset_timeout: Duration::from_secs(10),
			call_timeout: Duration::from_millis(50),
		};

		(GraphGuard::new(Arc::clone(&store) as Arc<dyn GraphStore>, cfg), store)
	}

	fn failure() -> Result<Vec<GraphRow>> {
		Err(Error::Protocol { message: "boom".to_string() })
	}

	#[tokio::test]
	async fn read_falls_back_to_empty_rows_on_failure() {
		let (guard, _store) = guard_with(vec![failure()]);
		let read = guard.read(GraphQuery::new("RETURN 1")).await;

		assert!(read.fallback);
		assert!(read.rows.is_empty());
	}

	#[tokio::test]
	async fn read_short_circuits_once_the_breaker_opens() {
		let (guard, store) = guard_with(vec![failure(), failure()]);

		for _ in 0..2 {
			let _ = guard.read(GraphQuery::new("RETURN 1")).await;
		}

		assert_eq!(guard.state(), BreakerState::Open);

		let read = guard.read(GraphQuery::new("RETURN 1")).await;

		assert!(read.fallback);
		assert_eq!(store.calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn write_errors_propagate() {
		let (guard, _store) = guard_with(vec![failure()]);
		let result = guard.write(GraphQuery::new("CREATE ()")).await;

		assert!(matches!(result, Err(Error::Protocol { .. })));
	}

	#[tokio::test]
	async fn write_reports_circuit_open_when_failing_fast() {
		let (guard, _store) = guard_with(vec![failure(), failure()]);

		for _ in 0..2 {
			let _ = guard.write(GraphQuery::new("CREATE ()")).await;
		}

		let result = guard.write(GraphQuery::new("CREATE ()")).await;

		assert!(matches!(result, Err(Error::CircuitOpen)));
	}
}
