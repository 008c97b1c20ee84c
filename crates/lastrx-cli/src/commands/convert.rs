//! Convert command implementation

use crate::batch::ConvertSummary;
use crate::cli::ConvertArgs;
use crate::config_loader::{load_settings_with_overrides, resolve_transform};
use crate::dry_run::{display_plan, ActionType, DryRunPlan, PlannedAction};
use crate::errors::{partial_failure, stopped};
use crate::output::OutputWriter;
use crate::progress::ConvertProgress;
use anyhow::{Context, Result};
use lastrx_batch::{BatchEvent, BatchOrchestrator, BatchOutcome, BatchSettings, PreparedBatch, StopSignal};
use lastrx_core::formats::LasFormat;
use lastrx_core::persist::save_transform_config;
use lastrx_core::ports::{Compression, PointCloudFormat, TransformerFactory};
use lastrx_geo::DefaultTransformerFactory;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::sync::mpsc;

pub async fn execute(args: ConvertArgs, settings_path: Option<&Path>, output: &OutputWriter) -> Result<()> {
    let settings = load_settings_with_overrides(settings_path, &args.run)?;
    let config = resolve_transform(&args.transform, &settings)?;

    let orchestrator = BatchOrchestrator::new(LasFormat::new(), DefaultTransformerFactory::new())
        .with_settings(BatchSettings::from(&settings));
    let files = orchestrator.resolve(&args.input, &args.output)?;
    let prepared = orchestrator.prepare(&config, files)?;

    if args.dry_run {
        let plan = build_plan(&prepared, args.save_config.as_deref());
        return display_plan(output, &plan);
    }

    if let Some(path) = &args.save_config {
        save_transform_config(&config, path)
            .with_context(|| format!("Failed to save configuration to {}", path.display()))?;
        output.info(format!("Saved configuration to {}", path.display()));
    }

    let total_files = prepared.files().len();
    let progress = ConvertProgress::new(total_files, prepared.workers(), !output.is_json());
    let stop = StopSignal::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let (report, ()) = tokio::join!(
        prepared.run(events_tx, stop.clone()),
        drive_events(events_rx, &progress, &stop, total_files),
    );

    let summary = ConvertSummary::from_report(&report, total_files);
    if output.is_json() {
        output.result(&summary)?;
    } else {
        summary.display(output);
    }

    match report.outcome {
        BatchOutcome::Completed => Ok(()),
        BatchOutcome::Failed => {
            Err(partial_failure(summary.failure_count(), summary.success_count()).into())
        }
        BatchOutcome::Stopped => Err(stopped(summary.success_count()).into()),
    }
}

/// Forward run events to the progress display until the run finishes; Ctrl-C requests a stop
async fn drive_events(
    mut events: mpsc::UnboundedReceiver<BatchEvent>,
    progress: &ConvertProgress,
    stop: &StopSignal,
    total_files: usize,
) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(BatchEvent::Finished) | None => break,
                Some(event) => apply_event(event, progress, total_files),
            },
            signal = tokio::signal::ctrl_c(), if !stop.is_stopped() => {
                if let Err(e) = signal {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Stop requested, waiting for running files to notice");
                stop.stop();
            }
        }
    }
}

fn apply_event(event: BatchEvent, progress: &ConvertProgress, total_files: usize) {
    match event {
        BatchEvent::Started {
            files,
            total_chunks,
            workers,
        } => {
            tracing::debug!(
                "Run started: {} file(s), {} chunk(s), {} worker(s)",
                files,
                total_chunks,
                workers
            );
        }
        BatchEvent::Progress(percent) => progress.set_percent(percent),
        BatchEvent::FileCompleted { input, output } => progress.file_completed(&input, &output),
        BatchEvent::FileFailed(error) => progress.file_failed(&error),
        BatchEvent::Succeeded => progress.succeeded(total_files),
        BatchEvent::Failed { errors, .. } => progress.failed(errors.len()),
        BatchEvent::Stopped => progress.stopped(),
        BatchEvent::Finished => {}
    }
}

fn build_plan<F, T>(prepared: &PreparedBatch<F, T>, save_config: Option<&Path>) -> DryRunPlan
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    let mut planned_actions = Vec::new();

    let missing_dirs: BTreeSet<_> = prepared
        .files()
        .outputs()
        .filter_map(|output| output.parent())
        .filter(|parent| !parent.as_os_str().is_empty() && !parent.exists())
        .collect();
    for dir in missing_dirs {
        planned_actions.push(PlannedAction::new(
            ActionType::CreateDirectory,
            dir.display().to_string(),
        ));
    }

    for (pair, chunks) in prepared.plan() {
        let compression = if Compression::from_path(&pair.output).is_compressed() {
            "compressed (LAZ)"
        } else {
            "uncompressed (LAS)"
        };
        planned_actions.push(
            PlannedAction::new(
                ActionType::WriteFile,
                format!("{} -> {}", pair.input.display(), pair.output.display()),
            )
            .with_detail(format!("{} chunk(s)", chunks))
            .with_detail(compression),
        );
    }

    if let Some(path) = save_config {
        planned_actions.push(PlannedAction::new(
            ActionType::SaveConfig,
            path.display().to_string(),
        ));
    }

    DryRunPlan {
        files: prepared.files().len(),
        total_chunks: prepared.total_chunks(),
        workers: prepared.workers(),
        planned_actions,
    }
}
