use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = kueater_agent::Args::parse();
	kueater_agent::run(args).await
}
