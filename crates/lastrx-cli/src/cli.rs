use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// LAS-TRX - Batch conversion of LAS/LAZ point clouds between reference frames
#[derive(Parser, Debug)]
#[command(name = "lastrx")]
#[command(
    about = "Convert LAS/LAZ point clouds between reference frames, epochs, vertical datums and coordinate types",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Settings file to use instead of ./lastrx.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert every file matching a pattern
    Convert(ConvertArgs),

    /// Create, show or validate configuration
    Config(ConfigArgs),

    /// Show the header and CRS records of a point-cloud file
    Inspect(InspectArgs),

    /// Report available backends and effective settings
    Doctor,
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input files; the file name may contain `*` wildcards (quote it to stop shell expansion)
    pub input: String,

    /// Output path; `{}` is replaced by each input's file stem
    pub output: String,

    #[command(flatten)]
    pub transform: TransformArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Resolve and validate the file set, then stop without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Also save the effective transform configuration to this path
    #[arg(long, value_name = "PATH")]
    pub save_config: Option<PathBuf>,
}

/// Origin and destination of a transform, from a saved configuration and/or flags.
/// Flags override the matching fields of the saved configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct TransformArgs {
    /// Saved transform configuration (JSON)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Origin reference frame, e.g. ITRF2014
    #[arg(long, value_name = "FRAME")]
    pub from_frame: Option<String>,

    /// Origin epoch as YYYY-MM-DD or a decimal year
    #[arg(long, value_name = "EPOCH")]
    pub from_epoch: Option<String>,

    /// Origin vertical datum, e.g. GRS80
    #[arg(long, value_name = "DATUM")]
    pub from_vd: Option<String>,

    /// Origin coordinate type: geographic, cartesian or UTM<zone>
    #[arg(long, value_name = "TYPE")]
    pub from_coord: Option<String>,

    /// Destination reference frame, e.g. "NAD83(CSRS)"
    #[arg(long, value_name = "FRAME")]
    pub to_frame: Option<String>,

    /// Destination epoch as YYYY-MM-DD or a decimal year
    #[arg(long, value_name = "EPOCH")]
    pub to_epoch: Option<String>,

    /// Destination vertical datum, e.g. CGVD2013/CGG2013a
    #[arg(long, value_name = "DATUM")]
    pub to_vd: Option<String>,

    /// Destination coordinate type: geographic, cartesian or UTM<zone>
    #[arg(long, value_name = "TYPE")]
    pub to_coord: Option<String>,
}

/// Run settings overriding the settings file and environment
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Maximum number of files converted at once
    #[arg(long, short = 'j', value_name = "N")]
    pub max_workers: Option<i64>,

    /// Points streamed per chunk
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<i64>,

    /// Progress polling interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<i64>,

    /// Extension appended to outputs without one
    #[arg(long, value_name = "EXT")]
    pub default_extension: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a transform configuration file
    Init(ConfigInitArgs),

    /// Show effective run settings and where each value comes from
    Show,

    /// Check a transform configuration file and show the derived CRSs
    Validate(ConfigValidateArgs),
}

#[derive(Parser, Debug)]
pub struct ConfigInitArgs {
    /// Where to write the configuration
    #[arg(default_value = "transform.json")]
    pub path: PathBuf,

    #[command(flatten)]
    pub transform: TransformArgs,

    /// Number of workers recorded in the configuration (defaults to the CPU count)
    #[arg(long, short = 'j', value_name = "N")]
    pub max_workers: Option<i64>,

    /// Also write a lastrx.toml settings file with the current values
    #[arg(long)]
    pub with_settings: bool,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct ConfigValidateArgs {
    /// Transform configuration to check
    #[arg(default_value = "transform.json")]
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// LAS or LAZ file
    pub path: PathBuf,
}
