use std::{
	future::Future,
	sync::{Mutex, MutexGuard, PoisonError},
	time::{Duration, Instant},
};

/// Sub-buckets the rolling window is divided into; counts age out one
/// sub-bucket at a time instead of all at once.
const WINDOW_BUCKETS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BreakerState {
	Closed,
	Open,
	HalfOpen,
}

impl BreakerState {
	pub fn as_str(self) -> &'static str {
		match self {
			BreakerState::Closed => "closed",
			BreakerState::Open => "open",
			BreakerState::HalfOpen => "half_open",
		}
	}
}

#[derive(Clone, Debug)]
pub struct BreakerConfig {
	/// Failure percentage that trips the breaker. The rate must strictly
	/// exceed this value.
	pub error_threshold_pct: u8,
	/// Calls the window must have seen before the rate is meaningful.
	pub min_volume: u32,
	pub window: Duration,
	pub reset_timeout: Duration,
	/// Hard bound on every admitted call; an elapsed timeout is a failure.
	pub call_timeout: Duration,
}

impl BreakerConfig {
	pub fn from_graph(cfg: &sift_config::Graph) -> Self {
		Self {
			error_threshold_pct: cfg.breaker.error_threshold_pct,
			min_volume: cfg.breaker.min_volume,
			window: Duration::from_millis(cfg.breaker.window_ms),
			reset_timeout: Duration::from_millis(cfg.breaker.reset_timeout_ms),
			call_timeout: Duration::from_millis(cfg.timeout_ms),
		}
	}
}

#[derive(Debug)]
pub enum BreakerError<E> {
	/// Failing fast; the wrapped call was never started.
	Open,
	Timeout,
	Inner(E),
}

type StateObserver = Box<dyn Fn(BreakerState, BreakerState) + Send + Sync>;

#[derive(Clone, Copy, Debug, Default)]
struct WindowBucket {
	successes: u32,
	failures: u32,
}

#[derive(Debug)]
struct Inner {
	state: BreakerState,
	opened_at: Option<Instant>,
	/// When the half-open probe was admitted. `None` means the slot is free.
	/// A probe older than `call_timeout` can only be a dropped call (the
	/// timeout would have recorded it otherwise), so its slot is reclaimed.
	probe_started_at: Option<Instant>,
	buckets: [WindowBucket; WINDOW_BUCKETS],
	cursor: usize,
	rotated_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Admission {
	Pass,
	Probe,
}

/// Closed/open/half-open breaker around a single async dependency call.
/// Wraps any `Future<Output = Result<_, _>>`, so the same instance pattern
/// serves the graph store or any other remote call that must not
/// cascade-fail the request path.
///
/// The lock guards only counter updates and state transitions; it is never
/// held across an await, so concurrent requests do not serialize on it.
pub struct CircuitBreaker {
	cfg: BreakerConfig,
	inner: Mutex<Inner>,
	observers: Mutex<Vec<StateObserver>>,
}

impl CircuitBreaker {
	pub fn new(cfg: BreakerConfig) -> Self {
		let now = Instant::now();

		Self {
			cfg,
			inner: Mutex::new(Inner {
				state: BreakerState::Closed,
				opened_at: None,
				probe_started_at: None,
				buckets: [WindowBucket::default(); WINDOW_BUCKETS],
				cursor: 0,
				rotated_at: now,
			}),
			observers: Mutex::new(Vec::new()),
		}
	}

	/// Registers a transition observer. Callbacks run on the thread that
	/// caused the transition, after the state lock is released; keep them
	/// cheap.
	pub fn on_state_change<F>(&self, observer: F)
	where
		F: Fn(BreakerState, BreakerState) + Send + Sync + 'static,
	{
		self.observers.lock().unwrap_or_else(PoisonError::into_inner).push(Box::new(observer));
	}

	pub fn state(&self) -> BreakerState {
		self.lock_inner().state
	}

	pub async fn call<F, T, E>(&self, call: F) -> Result<T, BreakerError<E>>
	where
		F: Future<Output = Result<T, E>>,
	{
		let Some(admission) = self.admit(Instant::now()) else {
			return Err(BreakerError::Open);
		};
		let probe = admission == Admission::Probe;

		match tokio::time::timeout(self.cfg.call_timeout, call).await {
			Ok(Ok(value)) => {
				self.record(true, probe);

				Ok(value)
			},
			Ok(Err(err)) => {
				self.record(false, probe);

				Err(BreakerError::Inner(err))
			},
			Err(_) => {
				self.record(false, probe);

				Err(BreakerError::Timeout)
			},
		}
	}

	fn admit(&self, now: Instant) -> Option<Admission> {
		let mut transition = None;
		let admission = {
			let mut inner = self.lock_inner();

			rotate(&self.cfg, &mut inner, now);

			match inner.state {
				BreakerState::Closed => Some(Admission::Pass),
				BreakerState::Open => {
					let reset_due = inner
						.opened_at
						.map(|at| now.duration_since(at) >= self.cfg.reset_timeout)
						.unwrap_or(true);

					if reset_due {
						transition = Some((BreakerState::Open, BreakerState::HalfOpen));
						inner.state = BreakerState::HalfOpen;
						inner.probe_started_at = Some(now);

						Some(Admission::Probe)
					} else {
						None
					}
				},
				BreakerState::HalfOpen => {
					let probe_live = inner
						.probe_started_at
						.map(|at| now.duration_since(at) < self.cfg.call_timeout)
						.unwrap_or(false);

					if probe_live {
						None
					} else {
						inner.probe_started_at = Some(now);

						Some(Admission::Probe)
					}
				},
			}
		};

		if let Some((old, new)) = transition {
			self.notify(old, new);
		}

		admission
	}

	fn record(&self, success: bool, probe: bool) {
		let now = Instant::now();
		let mut transition = None;

		{
			let mut inner = self.lock_inner();

			rotate(&self.cfg, &mut inner, now);

			if probe {
				inner.probe_started_at = None;

				if inner.state == BreakerState::HalfOpen {
					if success {
						transition = Some((BreakerState::HalfOpen, BreakerState::Closed));
						inner.state = BreakerState::Closed;
						inner.opened_at = None;

						reset_window(&mut inner, now);
					} else {
						transition = Some((BreakerState::HalfOpen, BreakerState::Open));
						inner.state = BreakerState::Open;
						inner.opened_at = Some(now);
					}
				}
			} else {
				let cursor = inner.cursor;

				if success {
					inner.buckets[cursor].successes += 1;
				} else {
					inner.buckets[cursor].failures += 1;
				}

				if inner.state == BreakerState::Closed && !success && should_trip(&self.cfg, &inner)
				{
					transition = Some((BreakerState::Closed, BreakerState::Open));
					inner.state = BreakerState::Open;
					inner.opened_at = Some(now);
				}
			}
		}

		if let Some((old, new)) = transition {
			self.notify(old, new);
		}
	}

	fn notify(&self, old: BreakerState, new: BreakerState) {
		let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);

		for observer in observers.iter() {
			observer(old, new);
		}
	}

	fn lock_inner(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

fn should_trip(cfg: &BreakerConfig, inner: &Inner) -> bool {
	let mut successes = 0u64;
	let mut failures = 0u64;

	for bucket in &inner.buckets {
		successes += u64::from(bucket.successes);
		failures += u64::from(bucket.failures);
	}

	let total = successes + failures;

	total >= u64::from(cfg.min_volume)
		&& failures * 100 > u64::from(cfg.error_threshold_pct) * total
}

fn rotate(cfg: &BreakerConfig, inner: &mut Inner, now: Instant) {
	let bucket_len = cfg.window / WINDOW_BUCKETS as u32;

	if bucket_len.is_zero() {
		return;
	}

	let elapsed = now.duration_since(inner.rotated_at);
	let steps = (elapsed.as_nanos() / bucket_len.as_nanos()) as u64;

	if steps == 0 {
		return;
	}
	if steps >= WINDOW_BUCKETS as u64 {
		reset_window(inner, now);

		return;
	}

	for _ in 0..steps {
		inner.cursor = (inner.cursor + 1) % WINDOW_BUCKETS;
		inner.buckets[inner.cursor] = WindowBucket::default();
	}

	inner.rotated_at += bucket_len * steps as u32;
}

fn reset_window(inner: &mut Inner, now: Instant) {
	inner.buckets = [WindowBucket::default(); WINDOW_BUCKETS];
	inner.cursor = 0;
	inner.rotated_at = now;
}
