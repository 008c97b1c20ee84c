//! Batch orchestration: pre-flight checks, the bounded worker pool and progress polling

use lastrx_core::config::{clamp_workers, LayeredConfig, DEFAULT_CHUNK_SIZE, DEFAULT_EXTENSION, DEFAULT_POLL_INTERVAL_MS};
use lastrx_core::error::{FileTransformError, LastrxError, Result};
use lastrx_core::models::{TransformConfig, TransformParams};
use lastrx_core::ports::{MetadataRecord, PointCloudFormat, PointCloudHeader, TransformerFactory};
use lastrx_geo::{crs_records, CrsDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;

use crate::events::{BatchEvent, BatchOutcome, BatchReport, StopSignal};
use crate::fileset::{FilePair, FileSet};
use crate::progress::{chunks_for, ProgressCounter};
use crate::task::{transform_file, FileSummary, FileTaskContext};

/// Tunables of a run that are not part of the transform configuration
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub chunk_size: u64,
    pub poll_interval: Duration,
    pub default_extension: String,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl From<&LayeredConfig> for BatchSettings {
    fn from(config: &LayeredConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.value,
            poll_interval: Duration::from_millis(config.poll_interval_ms.value),
            default_extension: config.default_extension.value.clone(),
        }
    }
}

/// Runs transform configurations over file sets
pub struct BatchOrchestrator<F, T>
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    format: Arc<F>,
    factory: Arc<T>,
    settings: BatchSettings,
}

impl<F, T> BatchOrchestrator<F, T>
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    pub fn new(format: F, factory: T) -> Self {
        Self {
            format: Arc::new(format),
            factory: Arc::new(factory),
            settings: BatchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: BatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Expand an input pattern and output template into a validated file set
    pub fn resolve(&self, input_pattern: &str, output_template: &str) -> Result<FileSet> {
        FileSet::resolve(input_pattern, output_template, &self.settings.default_extension)
    }

    /// Everything that can fail before a worker starts.
    ///
    /// Derives both CRSs, builds the destination records, tries the transformer factory and
    /// reads every input header to size the run. Nothing is written.
    pub fn prepare(&self, config: &TransformConfig, files: FileSet) -> Result<PreparedBatch<F, T>> {
        let origin = CrsDescriptor::from_reference(&config.origin)?;
        let destination = CrsDescriptor::from_reference(&config.destination)?;
        let records = crs_records(&destination)?;

        for issue in config.issues() {
            tracing::warn!("{}", issue);
        }

        let params = config.to_params();
        self.factory.build(&params)?;

        if files.is_empty() {
            return Err(LastrxError::NoInputFiles {
                pattern: "<empty file set>".to_string(),
            });
        }

        let file_chunks = files
            .inputs()
            .map(|input| {
                let header = self.format.read_header(input)?;
                Ok(chunks_for(header.point_count(), self.settings.chunk_size))
            })
            .collect::<Result<Vec<u64>>>()?;
        let total_chunks = file_chunks.iter().sum();
        let workers = clamp_workers(config.max_workers).min(files.len());

        tracing::info!(
            "Prepared {} file(s), {} chunk(s), {} worker(s): {} -> {} ({} via {})",
            files.len(),
            total_chunks,
            workers,
            origin,
            destination,
            self.format.name(),
            self.factory.name()
        );

        Ok(PreparedBatch {
            format: Arc::clone(&self.format),
            factory: Arc::clone(&self.factory),
            files,
            file_chunks,
            total_chunks,
            workers,
            params,
            crs_records: Arc::new(records),
            chunk_size: self.settings.chunk_size,
            poll_interval: self.settings.poll_interval,
        })
    }
}

/// A validated run waiting to be started
pub struct PreparedBatch<F, T>
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    format: Arc<F>,
    factory: Arc<T>,
    files: FileSet,
    file_chunks: Vec<u64>,
    total_chunks: u64,
    workers: usize,
    params: TransformParams,
    crs_records: Arc<Vec<MetadataRecord>>,
    chunk_size: u64,
    poll_interval: Duration,
}

impl<F, T> PreparedBatch<F, T>
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    pub fn files(&self) -> &FileSet {
        &self.files
    }

    /// Each file pair with the number of chunks it will be streamed in
    pub fn plan(&self) -> impl Iterator<Item = (&FilePair, u64)> {
        self.files.pairs().iter().zip(self.file_chunks.iter().copied())
    }

    pub fn total_chunks(&self) -> u64 {
        self.total_chunks
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn crs_records(&self) -> &[MetadataRecord] {
        &self.crs_records
    }

    /// Run every file task and report the outcome.
    ///
    /// Events are sent as they happen; `Finished` is always the last one. A stop request is
    /// honoured between polls: the run returns without waiting for tasks still streaming,
    /// which notice the request at their next chunk.
    pub async fn run(self, events: mpsc::UnboundedSender<BatchEvent>, stop: StopSignal) -> BatchReport {
        let counter = ProgressCounter::new();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let ctx = FileTaskContext {
            params: self.params,
            crs_records: Arc::clone(&self.crs_records),
            chunk_size: self.chunk_size,
            counter: counter.clone(),
            stop: stop.clone(),
        };

        emit(
            &events,
            BatchEvent::Started {
                files: self.files.len(),
                total_chunks: self.total_chunks,
                workers: self.workers,
            },
        );

        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();
        for pair in self.files {
            let handle = tasks.spawn(run_file(
                Arc::clone(&self.format),
                Arc::clone(&self.factory),
                Arc::clone(&semaphore),
                pair.clone(),
                ctx.clone(),
            ));
            pending.insert(handle.id(), pair);
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_percent = None;
        let mut completed = Vec::new();
        let mut errors = Vec::new();
        let mut cancelled = 0usize;
        let mut stopped = false;

        while !tasks.is_empty() {
            if stop.is_stopped() {
                stopped = true;
                break;
            }

            tokio::select! {
                joined = tasks.join_next_with_id() => {
                    let (id, result) = match joined {
                        Some(Ok((id, result))) => (id, result),
                        Some(Err(e)) => {
                            let id = e.id();
                            let message = join_error_message(e);
                            (id, Err(LastrxError::Worker(message)))
                        }
                        None => break,
                    };
                    let Some(pair) = pending.remove(&id) else {
                        continue;
                    };

                    match result {
                        Ok(summary) => {
                            tracing::info!(
                                "Converted {} -> {} ({} points)",
                                pair.input.display(),
                                pair.output.display(),
                                summary.points
                            );
                            emit(
                                &events,
                                BatchEvent::FileCompleted {
                                    input: pair.input.clone(),
                                    output: pair.output.clone(),
                                },
                            );
                            completed.push(pair);
                        }
                        Err(LastrxError::Cancelled) if stop.is_stopped() => {
                            tracing::debug!("{} cancelled", pair.input.display());
                            cancelled += 1;
                        }
                        Err(source) => {
                            let error = Arc::new(FileTransformError::new(&pair.input, &pair.output, source));
                            tracing::error!("{}", error);
                            emit(&events, BatchEvent::FileFailed(Arc::clone(&error)));
                            errors.push(error);
                        }
                    }
                }
                _ = ticker.tick() => {
                    report_progress(&events, &counter, self.total_chunks, &mut last_percent);
                }
            }
        }

        // Every task may have noticed the stop before the loop did
        let stopped = stopped || cancelled > 0;
        if stopped {
            tracing::warn!("Stop requested, abandoning {} unfinished file(s)", pending.len());
            tasks.abort_all();
        } else {
            report_progress(&events, &counter, self.total_chunks, &mut last_percent);
        }

        let outcome = if stopped {
            emit(&events, BatchEvent::Stopped);
            BatchOutcome::Stopped
        } else if errors.is_empty() {
            tracing::info!("All {} file(s) converted", completed.len());
            emit(&events, BatchEvent::Succeeded);
            BatchOutcome::Completed
        } else {
            tracing::error!("{} file(s) failed, {} succeeded", errors.len(), completed.len());
            emit(
                &events,
                BatchEvent::Failed {
                    succeeded: completed.len(),
                    errors: errors.clone(),
                },
            );
            BatchOutcome::Failed
        };
        emit(&events, BatchEvent::Finished);

        BatchReport {
            outcome,
            completed,
            errors,
            chunks_done: counter.get(),
            total_chunks: self.total_chunks,
        }
    }
}

/// Wait for a worker slot, then stream one file on the blocking pool
async fn run_file<F, T>(
    format: Arc<F>,
    factory: Arc<T>,
    semaphore: Arc<Semaphore>,
    pair: FilePair,
    ctx: FileTaskContext,
) -> Result<FileSummary>
where
    F: PointCloudFormat,
    T: TransformerFactory,
{
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| LastrxError::Worker(e.to_string()))?;

    if ctx.stop.is_stopped() {
        return Err(LastrxError::Cancelled);
    }

    tracing::debug!("Starting {}", pair.input.display());
    let joined = tokio::task::spawn_blocking(move || {
        transform_file(format.as_ref(), factory.as_ref(), &pair, &ctx)
    })
    .await;

    match joined {
        Ok(result) => result.map_err(|e| e.source),
        Err(e) => Err(LastrxError::Worker(join_error_message(e))),
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }

    let payload = error.into_panic();
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("file task panicked: {}", message)
}

fn report_progress(
    events: &mpsc::UnboundedSender<BatchEvent>,
    counter: &ProgressCounter,
    total: u64,
    last: &mut Option<u8>,
) {
    let percent = counter.percent(total);
    if *last != Some(percent) {
        *last = Some(percent);
        emit(events, BatchEvent::Progress(percent));
    }
}

fn emit(events: &mpsc::UnboundedSender<BatchEvent>, event: BatchEvent) {
    if events.send(event).is_err() {
        tracing::trace!("Batch event receiver dropped");
    }
}
