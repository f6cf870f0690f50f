//! entkit command-line inspector.
//!
//! Usage:
//!   entkit --config site.toml show node 1 --field body
//!   entkit --config site.toml exists node 4f1c...
//!   entkit --config site.toml revisions node 1 --switch 3

use anyhow::Result;
use clap::Parser;
use entkit_cli::{App, Cli};
use entkit_schema::EntkitConfig;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins, then --verbose, then the config file's filter
    let configured = EntkitConfig::load(&cli.config)
        .map(|c| c.logging.filter)
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(configured)
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let app = App::open(&cli.config, cli.database.as_deref())?;
    let output = app.run(&cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
