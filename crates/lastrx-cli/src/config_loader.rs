//! Settings and transform configuration loading for CLI commands

use crate::cli::{RunArgs, TransformArgs};
use crate::errors::missing_transform_field;
use anyhow::{Context, Result};
use lastrx_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig, SETTINGS_FILE_NAME};
use lastrx_core::models::{
    parse_epoch, CoordType, ReferenceConfig, ReferenceFrame, TransformConfig, VerticalDatum,
};
use lastrx_core::persist::load_transform_config;
use std::path::{Path, PathBuf};

/// Defaults, then the settings file, then the environment
pub fn load_settings(settings_path: Option<&Path>) -> Result<LayeredConfig> {
    let config = LayeredConfig::with_defaults();
    let config = match settings_path {
        Some(path) => config
            .load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => config
            .load_from_working_dir()
            .context("Failed to load settings file")?,
    };
    Ok(config.load_from_env())
}

/// Settings with command-line overrides applied on top
pub fn load_settings_with_overrides(
    settings_path: Option<&Path>,
    run: &RunArgs,
) -> Result<LayeredConfig> {
    let mut config = load_settings(settings_path)?;
    config.update_from_cli(CliConfigOverrides {
        max_workers: run.max_workers,
        chunk_size: run.chunk_size,
        poll_interval_ms: run.poll_interval_ms,
        default_extension: run.default_extension.clone(),
    })?;
    Ok(config)
}

/// Settings file that `load_settings` would read, if any
pub fn settings_file(settings_path: Option<&Path>) -> Option<PathBuf> {
    match settings_path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let path = PathBuf::from(SETTINGS_FILE_NAME);
            path.is_file().then_some(path)
        }
    }
}

/// Build the transform configuration from an optional saved file and the flags.
///
/// A worker count set anywhere above the defaults layer wins over the saved file.
pub fn resolve_transform(args: &TransformArgs, settings: &LayeredConfig) -> Result<TransformConfig> {
    let saved = match &args.config {
        Some(path) => Some(load_transform_config(path).with_context(|| {
            format!("Failed to load transform configuration {}", path.display())
        })?),
        None => None,
    };

    let origin = resolve_side(
        "from",
        saved.as_ref().map(|c| &c.origin),
        [&args.from_frame, &args.from_epoch, &args.from_vd, &args.from_coord],
    )?;
    let destination = resolve_side(
        "to",
        saved.as_ref().map(|c| &c.destination),
        [&args.to_frame, &args.to_epoch, &args.to_vd, &args.to_coord],
    )?;

    let max_workers = match (&saved, settings.max_workers.source) {
        (Some(saved), ConfigSource::Default) => saved.max_workers,
        _ => settings.max_workers.value,
    };

    Ok(TransformConfig::new(origin, destination, max_workers)?)
}

/// `flags` holds frame, epoch, vertical datum and coordinate type in that order
fn resolve_side(
    prefix: &str,
    saved: Option<&ReferenceConfig>,
    flags: [&Option<String>; 4],
) -> Result<ReferenceConfig> {
    let [frame, epoch, vd, coord] = flags;

    let ref_frame = pick(prefix, "frame", frame, saved.map(|s| s.ref_frame), |s| {
        s.parse::<ReferenceFrame>()
    })?;
    let epoch = pick(prefix, "epoch", epoch, saved.map(|s| s.epoch), parse_epoch)?;
    let vertical_datum = pick(prefix, "vd", vd, saved.map(|s| s.vertical_datum), |s| {
        s.parse::<VerticalDatum>()
    })?;
    let coord_type = pick(prefix, "coord", coord, saved.map(|s| s.coord_type), |s| {
        s.parse::<CoordType>()
    })?;

    Ok(ReferenceConfig::new(ref_frame, epoch, vertical_datum, coord_type)?)
}

fn pick<T>(
    prefix: &str,
    field: &str,
    flag: &Option<String>,
    saved: Option<T>,
    parse: impl Fn(&str) -> lastrx_core::Result<T>,
) -> Result<T> {
    match (flag, saved) {
        (Some(raw), _) => {
            Ok(parse(raw).with_context(|| format!("Invalid value for --{}-{}", prefix, field))?)
        }
        (None, Some(value)) => Ok(value),
        (None, None) => Err(missing_transform_field(&format!("--{}-{}", prefix, field)).into()),
    }
}
