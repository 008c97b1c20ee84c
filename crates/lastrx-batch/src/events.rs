//! Notifications a running batch sends to its caller

use lastrx_core::error::FileTransformError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::fileset::FilePair;

#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Workers are about to start
    Started {
        files: usize,
        total_chunks: u64,
        workers: usize,
    },
    /// Whole-percent progress over all files; only sent when the value changes
    Progress(u8),
    FileCompleted { input: PathBuf, output: PathBuf },
    FileFailed(Arc<FileTransformError>),
    /// Every file was written
    Succeeded,
    /// At least one file failed; the others still ran to completion
    Failed {
        succeeded: usize,
        errors: Vec<Arc<FileTransformError>>,
    },
    /// A stop request ended the run
    Stopped,
    /// Sent exactly once, after whichever terminal event above
    Finished,
}

impl BatchEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchEvent::Succeeded | BatchEvent::Failed { .. } | BatchEvent::Stopped)
    }
}

/// Cooperative stop request shared between the caller, the orchestrator and every file task
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requested: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Failed,
    Stopped,
}

/// Everything the caller needs once a run is over
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcome: BatchOutcome,
    pub completed: Vec<FilePair>,
    pub errors: Vec<Arc<FileTransformError>>,
    pub chunks_done: u64,
    pub total_chunks: u64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.outcome == BatchOutcome::Completed
    }

    pub fn succeeded(&self) -> usize {
        self.completed.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }
}
