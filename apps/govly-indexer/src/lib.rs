pub mod manifest;

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use color_eyre::eyre;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use govly_service::GovlyService;
use govly_storage::{db::Db, qdrant::QdrantStore};

#[derive(Debug, Parser)]
#[command(
	version = govly_cli::VERSION,
	rename_all = "kebab",
	styles = govly_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// TOML manifest listing the sources to index.
	#[arg(long, short = 'm', value_name = "FILE")]
	pub manifest: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = govly_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let manifest = manifest::load(&args.manifest)?;
	let manifest_dir =
		args.manifest.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	qdrant.ensure_collection().await?;

	let concurrency = config.indexer.concurrency;
	let ocr_config = Arc::new(config.providers.ocr.clone());
	let service = Arc::new(GovlyService::new(config, db, qdrant));
	let total = manifest.sources.len();
	let mut sources = manifest.sources.into_iter();
	let mut tasks = JoinSet::new();
	let mut failed = 0_usize;
	let mut embedded = 0_usize;
	let mut skipped = 0_usize;

	loop {
		while tasks.len() < concurrency {
			let Some(source) = sources.next() else { break };
			let service = service.clone();
			let ocr_config = ocr_config.clone();
			let manifest_dir = manifest_dir.clone();
			let source_id = source.source_id.clone();

			tasks.spawn(async move {
				let request = manifest::resolve(source, &manifest_dir, &ocr_config).await?;

				service
					.index_source(request)
					.await
					.map_err(|err| eyre::eyre!("{source_id}: {err}"))
			});
		}

		let Some(joined) = tasks.join_next().await else { break };

		match joined {
			Ok(Ok(summary)) => {
				embedded += summary.embedded;
				skipped += summary.skipped;

				tracing::info!(
					source_id = summary.source_id.as_str(),
					total_chunks = summary.total_chunks,
					embedded = summary.embedded,
					skipped = summary.skipped,
					deleted = summary.deleted,
					"Source done."
				);
			},
			Ok(Err(err)) => {
				failed += 1;

				tracing::error!(error = %err, "Source failed.");
			},
			Err(err) => {
				failed += 1;

				tracing::error!(error = %err, "Indexing task panicked.");
			},
		}
	}

	tracing::info!(total, failed, embedded, skipped, "Indexing run finished.");

	if failed > 0 {
		return Err(eyre::eyre!("{failed} of {total} sources failed."));
	}

	Ok(())
}
