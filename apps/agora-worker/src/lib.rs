pub mod worker;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use agora_service::AgoraService;
use agora_storage::db::Db;

#[derive(Debug, Parser)]
#[command(
	version = agora_cli::VERSION,
	rename_all = "kebab",
	styles = agora_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = agora_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema(config.providers.embedding.dimensions).await?;

	let poll_interval_ms = config.worker.poll_interval_ms;
	let service = AgoraService::new(config, db);

	worker::run_worker(&service, poll_interval_ms).await
}
