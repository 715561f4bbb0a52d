pub mod cache;
pub mod candidate;
pub mod expansion;
pub mod idf;
pub mod maintenance;
pub mod proposals;
pub mod sync;
pub mod taxonomy;
pub mod warmup;

mod error;

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, RwLock},
};

pub use cache::{ExpansionCache, MemoryCache, PgCache};
pub use candidate::{CandidateGraphScore, GraphMatchDetail, ScoreRequest};
pub use error::{Error, Result};
pub use expansion::{
	ExpandedSkill, ExpansionDiagnostics, ExpansionEnvelope, ExpansionRequest, TierCounts,
};
pub use idf::IdfRefreshReport;
pub use maintenance::{MetricFlushReport, PurgeReport, ShadowSyncReport};
pub use proposals::ProposalRankReport;
pub use sync::SyncOutcome;
pub use taxonomy::TaxonomyBuildReport;
pub use warmup::WarmupReport;

use sift_config::Config;
use sift_graph::{
	breaker::BreakerConfig,
	guard::GraphGuard,
	store::{GraphStore, HttpGraphStore},
};
use sift_metrics::MetricRegistry;
use sift_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Taxonomy and scoring-policy versions, both part of every cache
/// fingerprint so entries die the moment either bumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Versions {
	pub taxonomy: u32,
	pub policy: u32,
}

/// The expansion engine: seeds, guarded graph traversal, scoring, cache,
/// and the maintenance operations the workers schedule. All collaborators
/// are injected; tests construct isolated instances with fakes.
pub struct SiftService {
	pub cfg: Config,
	pub db: Arc<Db>,
	pub graph: Option<Arc<GraphGuard>>,
	pub cache: Arc<dyn ExpansionCache>,
	pub metrics: Arc<MetricRegistry>,
	versions: RwLock<Versions>,
}

impl SiftService {
	pub fn new(cfg: Config, db: Db) -> Result<Self> {
		let db = Arc::new(db);
		let graph = match cfg.graph.as_ref() {
			Some(graph_cfg) => {
				let store: Arc<dyn GraphStore> = Arc::new(HttpGraphStore::new(graph_cfg)?);

				Some(Arc::new(GraphGuard::new(store, BreakerConfig::from_graph(graph_cfg))))
			},
			None => None,
		};
		let cache: Arc<dyn ExpansionCache> = Arc::new(PgCache::new(Arc::clone(&db)));
		let metrics = Arc::new(MetricRegistry::new());

		Ok(Self::with_parts(cfg, db, graph, cache, metrics))
	}

	/// Assembles a service from explicit parts. Tests use this with a fake
	/// graph store and an in-memory cache.
	pub fn with_parts(
		cfg: Config,
		db: Arc<Db>,
		graph: Option<Arc<GraphGuard>>,
		cache: Arc<dyn ExpansionCache>,
		metrics: Arc<MetricRegistry>,
	) -> Self {
		let versions = RwLock::new(Versions { taxonomy: 0, policy: cfg.expansion.policy_version });

		Self { cfg, db, graph, cache, metrics, versions }
	}

	pub fn versions(&self) -> Versions {
		*self.versions.read().unwrap_or_else(std::sync::PoisonError::into_inner)
	}

	pub(crate) fn set_taxonomy_version(&self, taxonomy: u32) {
		self.versions.write().unwrap_or_else(std::sync::PoisonError::into_inner).taxonomy =
			taxonomy;
	}

	/// Re-reads the taxonomy version from the graph meta node. A fallback
	/// read keeps the last known value rather than resetting it.
	pub async fn refresh_versions(&self) {
		let Some(graph) = self.graph.as_ref() else {
			return;
		};
		let read = graph.read(sift_graph::queries::read_taxonomy_version()).await;

		if read.fallback {
			return;
		}

		let Some(row) = read.rows.first() else {
			return;
		};

		match row.decode::<sift_graph::queries::VersionRow>() {
			Ok(version) => self.set_taxonomy_version(version.version),
			Err(err) => {
				tracing::warn!(error = %err, "Taxonomy version row did not decode.");
			},
		}
	}
}
