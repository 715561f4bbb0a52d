pub mod worker;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sift_service::SiftService;
use sift_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let mut config = sift_config::load(&args.config)?;

	sift_config::env::apply_worker_overrides(&mut config);

	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let warmup_queries = config.warmup.queries.clone();
	let service = Arc::new(SiftService::new(config, db)?);

	if !warmup_queries.is_empty() {
		let report = service.warm_up(&warmup_queries).await;

		tracing::info!(
			attempted = report.attempted,
			succeeded = report.succeeded,
			"Startup warm-up finished.",
		);
	}

	worker::run_worker(service).await
}
