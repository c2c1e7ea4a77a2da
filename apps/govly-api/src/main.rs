use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = govly_api::Args::parse();

	govly_api::run(args).await
}
