use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = agora_worker::Args::parse();

	agora_worker::run(args).await
}
