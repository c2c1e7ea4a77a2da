use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = govly_indexer::Args::parse();

	govly_indexer::run(args).await
}
