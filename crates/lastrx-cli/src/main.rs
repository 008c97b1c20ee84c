//! LAS-TRX CLI - Command-line interface
//!
//! Batch conversion of LAS/LAZ files between reference frames, epochs, vertical datums and
//! coordinate types.

mod batch;
mod cli;
mod commands;
mod config_loader;
mod dry_run;
mod errors;
mod output;
mod output_types;
mod progress;

use clap::Parser;
use cli::Cli;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();
    let json = cli.json;

    // Logs go to stderr so JSON results on stdout stay parseable
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| {
            let result = runtime.block_on(commands::execute(cli));
            // Stopped file tasks finish their current chunk before exiting
            runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
            result
        });

    if let Err(e) = result {
        let cli_error = errors::from_anyhow(e);
        if json {
            eprintln!("{:#}", cli_error.to_json());
        } else {
            cli_error.display();
        }
        std::process::exit(cli_error.exit_code);
    }

    std::process::exit(errors::EXIT_SUCCESS);
}
