// src/main.rs
// ares: terminal client for the Ares Club landing page and live chat

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use ares_club::cli::{self, CliArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from ~/.ares/.env or current dir)
    let env_path = dirs::home_dir()
        .map(|h| h.join(".ares").join(".env"))
        .filter(|p| p.exists());
    if let Some(path) = env_path {
        let _ = dotenvy::from_path(&path);
    } else {
        let _ = dotenvy::dotenv();
    }

    let args = CliArgs::parse();

    // Logs go to stderr so they never interleave with rendered output
    let default_level = if args.verbose { "ares_club=debug" } else { "ares_club=info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::run(args).await
}
