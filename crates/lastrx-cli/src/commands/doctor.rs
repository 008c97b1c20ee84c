//! Doctor command implementation

use super::config::setting_rows;
use crate::config_loader::{load_settings, settings_file};
use crate::output::OutputWriter;
use crate::output_types::DoctorOutput;
use anyhow::Result;
use console::style;
use lastrx_core::config::available_cpus;
use lastrx_core::formats::{LasFormat, SUPPORTED_EXTENSIONS};
use lastrx_core::ports::{PointCloudFormat, TransformerFactory};
use lastrx_geo::DefaultTransformerFactory;
use std::path::Path;

pub fn execute(settings_path: Option<&Path>, verbose: bool, output: &OutputWriter) -> Result<()> {
    let mut checks_passed = 0;
    let mut total_checks = 0;
    let mut lines = Vec::new();

    // Transformation backend
    total_checks += 1;
    let factory = DefaultTransformerFactory::new();
    let proj_backend = DefaultTransformerFactory::has_proj();
    if proj_backend {
        lines.push(format!("{} Transformer: {} with PROJ", style("✓").green(), factory.name()));
        checks_passed += 1;
    } else {
        lines.push(format!(
            "{} Transformer: {} without PROJ, only identical origin and destination are supported",
            style("⚠").yellow(),
            factory.name()
        ));
        lines.push("  → Rebuild with: cargo install lastrx-cli --features proj".to_string());
    }

    // Formats
    total_checks += 1;
    let format = LasFormat::new();
    lines.push(format!(
        "{} Formats: {} ({})",
        style("✓").green(),
        format.name(),
        SUPPORTED_EXTENSIONS.join(", ")
    ));
    checks_passed += 1;

    // Workers
    total_checks += 1;
    let cpus = available_cpus();
    lines.push(format!("{} CPUs: {} available for workers", style("✓").green(), cpus));
    checks_passed += 1;

    // Settings
    total_checks += 1;
    let settings_file = settings_file(settings_path);
    let settings = match load_settings(settings_path) {
        Ok(settings) => {
            match &settings_file {
                Some(path) => lines.push(format!(
                    "{} Settings: loaded {}",
                    style("✓").green(),
                    path.display()
                )),
                None => lines.push(format!("{} Settings: defaults", style("✓").green())),
            }
            checks_passed += 1;
            setting_rows(&settings)
        }
        Err(e) => {
            lines.push(format!("{} Settings: {:#}", style("✗").red(), e));
            Vec::new()
        }
    };

    if output.is_json() {
        return output.result(DoctorOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            cpus,
            proj_backend,
            transformer: factory.name().to_string(),
            formats: SUPPORTED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            settings_file: settings_file.map(|p| p.display().to_string()),
            settings,
            checks_passed,
            total_checks,
        });
    }

    println!("\n{}", style("LAS-TRX Health Check").bold().underlined());
    println!("{}", style("═".repeat(60)).dim());
    println!();
    for line in lines {
        println!("{}", line);
    }

    if verbose {
        output.section("Effective Settings");
        output.table(settings);
    }

    println!();
    println!("{}", style("═".repeat(60)).dim());
    let summary = format!("{}/{} checks passed", checks_passed, total_checks);
    if checks_passed == total_checks {
        println!("{} {}", style("✓").green().bold(), summary);
    } else {
        println!("{} {}", style("⚠").yellow().bold(), summary);
    }

    Ok(())
}
