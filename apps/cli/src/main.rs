mod commands;

use anvil_ssg::{BuildMode, DEFAULT_CONFIG_FILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "anvil")]
#[command(about = "Builds a static site from markdown, collections and layouts", long_about = None)]
struct Cli {
    /// Site configuration file.
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Overrides `build.mode` from the configuration (development or production).
    #[arg(long, short)]
    mode: Option<BuildMode>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(error) = commands::run(&cli.config, cli.mode).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
