//! Config command implementation

use crate::cli::{ConfigArgs, ConfigCommand, ConfigInitArgs, ConfigValidateArgs, RunArgs};
use crate::config_loader::{load_settings, load_settings_with_overrides, resolve_transform};
use crate::errors::CliError;
use crate::output::OutputWriter;
use crate::output_types::{ConfigInitOutput, ConfigValidateOutput, ReferenceOutput, SettingRow};
use anyhow::{Context, Result};
use lastrx_core::config::{FileConfig, LayeredConfig, SETTINGS_FILE_NAME};
use lastrx_core::models::{decimal_year, ReferenceConfig};
use lastrx_core::persist::{load_transform_config, save_transform_config};
use lastrx_core::ports::TransformerFactory;
use lastrx_geo::{CrsDescriptor, DefaultTransformerFactory};
use std::fs;
use std::path::{Path, PathBuf};

pub fn execute(args: ConfigArgs, settings_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    match args.command {
        ConfigCommand::Init(args) => init(args, settings_path, output),
        ConfigCommand::Show => show(settings_path, output),
        ConfigCommand::Validate(args) => validate(args, output),
    }
}

fn init(args: ConfigInitArgs, settings_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    refuse_overwrite(&args.path, args.force)?;
    let settings_target = PathBuf::from(SETTINGS_FILE_NAME);
    if args.with_settings {
        refuse_overwrite(&settings_target, args.force)?;
    }

    let run = RunArgs {
        max_workers: args.max_workers,
        ..RunArgs::default()
    };
    let settings = load_settings_with_overrides(settings_path, &run)?;
    let config = resolve_transform(&args.transform, &settings)?;

    save_transform_config(&config, &args.path)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;

    let settings_written = if args.with_settings {
        write_settings_file(&settings, &settings_target)?;
        Some(settings_target.display().to_string())
    } else {
        None
    };

    tracing::info!("Wrote transform configuration {}", args.path.display());

    if output.is_json() {
        output.result(ConfigInitOutput {
            path: args.path.display().to_string(),
            settings_path: settings_written,
            origin: config.origin.to_string(),
            destination: config.destination.to_string(),
            max_workers: config.max_workers,
        })?;
    } else {
        output.success(format!("Wrote {}", args.path.display()));
        output.kv("Origin", config.origin);
        output.kv("Destination", config.destination);
        output.kv("Max workers", config.max_workers);
        if let Some(path) = settings_written {
            output.success(format!("Wrote {}", path));
        }
        output.info(format!(
            "Use it with: lastrx convert --config {} <input> <output>",
            args.path.display()
        ));
    }

    Ok(())
}

fn refuse_overwrite(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::new(format!("{} already exists", path.display()))
            .with_suggestion("Pass --force to overwrite it")
            .into());
    }
    Ok(())
}

fn write_settings_file(settings: &LayeredConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&FileConfig::from(settings))
        .context("Failed to serialize settings")?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn show(settings_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let rows = setting_rows(&settings);

    if output.is_json() {
        output.result(&rows)?;
    } else {
        output.section("Effective Settings");
        output.table(rows);
    }
    Ok(())
}

/// Settings sorted by key, each with the layer it came from
pub fn setting_rows(settings: &LayeredConfig) -> Vec<SettingRow> {
    let mut rows: Vec<SettingRow> = settings
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| SettingRow {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

fn validate(args: ConfigValidateArgs, output: &OutputWriter) -> Result<()> {
    let config = load_transform_config(&args.path)?;
    let origin = describe(&config.origin)?;
    let destination = describe(&config.destination)?;

    let mut issues: Vec<String> = config.issues().iter().map(ToString::to_string).collect();
    let factory = DefaultTransformerFactory::new();
    let transformer = match factory.build(&config.to_params()) {
        Ok(_) => factory.name().to_string(),
        Err(e) => {
            issues.push(e.to_string());
            "unavailable".to_string()
        }
    };

    let result = ConfigValidateOutput {
        path: args.path.display().to_string(),
        origin,
        destination,
        max_workers: config.max_workers,
        identity: config.is_identity(),
        transformer,
        issues,
    };

    if output.is_json() {
        return output.result(&result);
    }

    output.success(format!("{} is valid", result.path));
    for (title, side) in [("Origin", &result.origin), ("Destination", &result.destination)] {
        output.section(title);
        output.kv("Reference", &side.reference);
        output.kv("Decimal epoch", format!("{:.4}", side.decimal_epoch));
        output.kv("CRS", &side.crs);
        if let Some(code) = side.epsg {
            output.kv("EPSG", code);
        }
    }
    output.section("Run");
    output.kv("Max workers", result.max_workers);
    output.kv("Transformer", &result.transformer);
    for issue in &result.issues {
        output.warning(issue);
    }
    Ok(())
}

fn describe(reference: &ReferenceConfig) -> Result<ReferenceOutput> {
    let crs = CrsDescriptor::from_reference(reference)?;
    Ok(ReferenceOutput {
        reference: reference.to_string(),
        decimal_epoch: decimal_year(reference.epoch),
        crs: crs.name.clone(),
        epsg: crs.epsg,
        compound: crs.is_compound(),
    })
}
