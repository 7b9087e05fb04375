//! wuart-tool entry point.
//!
//! Parses the command line, loads the configuration, installs the tracing
//! subscriber and runs one subcommand.
//!
//! ```text
//! main()
//!  └─ Cli::parse()
//!  └─ load_config()          -- --config path or platform default
//!  └─ tracing_subscriber     -- RUST_LOG, else log_level; --debug wins
//!  └─ cli::execute()         -- writes to stdout
//! ```

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use wuart_tool::cli::{self, Cli};
use wuart_tool::infrastructure::storage::config::load_config;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    // Logs go to stderr so stdout carries only command output.
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.tool.log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.debug {
        warn!("debug mode enabled");
    }
    debug!(?config, "configuration in effect");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli::execute(&cli.command, cli.config.as_deref(), &config, &mut out)?;
    out.flush()?;
    Ok(())
}
