//! Command implementations

mod config;
mod convert;
mod doctor;
mod inspect;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use anyhow::Result;

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let settings = cli.settings.as_deref();

    match cli.command {
        Commands::Convert(args) => convert::execute(args, settings, &output).await,
        Commands::Config(args) => config::execute(args, settings, &output),
        Commands::Inspect(args) => inspect::execute(args, &output),
        Commands::Doctor => doctor::execute(settings, cli.verbose, &output),
    }
}
