use clap::Parser;
use dotenv::dotenv;

use fast_conduit::{app::*, error::*};

#[derive(Debug, Parser)]
#[command(name = "fast-conduit", about = "Conduit server with fragment-rendering action endpoints")]
struct Cli {
  /// Config file, replaces the RUN_MODE file and environment overrides.
  #[arg(short, long)]
  config: Option<String>,
}

fn main() -> Result<()> {
  dotenv().ok();
  env_logger::init();

  let cli = Cli::parse();

  let config = AppConfig::load(cli.config.as_deref())?;

  serve::execute(config)?;
  log::info!("Main finished");
  Ok(())
}
