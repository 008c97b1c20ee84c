//! LAS-TRX Batch - Parallel point-cloud transformation runs
//!
//! This crate resolves input and output files, streams each file through a coordinate
//! transformer on a bounded worker pool, and reports progress and per-file outcomes.

pub mod events;
pub mod fileset;
pub mod orchestrator;
pub mod progress;
pub mod task;

#[cfg(test)]
mod test_support;

pub use events::{BatchEvent, BatchOutcome, BatchReport, StopSignal};
pub use fileset::{FilePair, FileSet};
pub use orchestrator::{BatchOrchestrator, BatchSettings, PreparedBatch};
pub use progress::{chunks_for, percent, ProgressCounter};
pub use task::{transform_file, FileSummary, FileTaskContext, OUTPUT_SCALE};
