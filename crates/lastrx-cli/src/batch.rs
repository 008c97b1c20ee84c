use crate::output::OutputWriter;
use lastrx_batch::{BatchOutcome, BatchReport, FilePair};
use serde::Serialize;

/// A file that could not be converted
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub input: String,
    pub output: String,
    pub error: String,
}

/// Summary of a conversion run
#[derive(Debug, Clone, Serialize)]
pub struct ConvertSummary {
    pub outcome: String,
    pub total_files: usize,
    pub succeeded: Vec<FilePair>,
    pub failed: Vec<FailedFile>,
    pub chunks_done: u64,
    pub total_chunks: u64,
}

impl ConvertSummary {
    pub fn from_report(report: &BatchReport, total_files: usize) -> Self {
        let outcome = match report.outcome {
            BatchOutcome::Completed => "completed",
            BatchOutcome::Failed => "failed",
            BatchOutcome::Stopped => "stopped",
        };

        Self {
            outcome: outcome.to_string(),
            total_files,
            succeeded: report.completed.clone(),
            failed: report
                .errors
                .iter()
                .map(|e| FailedFile {
                    input: e.input.display().to_string(),
                    output: e.output.display().to_string(),
                    error: e.source.to_string(),
                })
                .collect(),
            chunks_done: report.chunks_done,
            total_chunks: report.total_chunks,
        }
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Files neither converted nor failed, left behind by a stop request
    pub fn unfinished_count(&self) -> usize {
        self.total_files
            .saturating_sub(self.success_count() + self.failure_count())
    }

    /// Display summary to output
    pub fn display(&self, output: &OutputWriter) {
        output.section("Conversion Summary");
        output.kv("Total Files", self.total_files);
        output.kv("Converted", self.success_count());
        output.kv("Failed", self.failure_count());
        if self.unfinished_count() > 0 {
            output.kv("Unfinished", self.unfinished_count());
        }
        output.kv("Chunks", format!("{}/{}", self.chunks_done, self.total_chunks));

        if !self.failed.is_empty() {
            output.section("Failed Files");
            for failed in &self.failed {
                output.error(format!("{} -> {}: {}", failed.input, failed.output, failed.error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastrx_core::{FileTransformError, LastrxError};
    use std::sync::Arc;

    #[test]
    fn test_summary_counts() {
        let report = BatchReport {
            outcome: BatchOutcome::Failed,
            completed: vec![FilePair::new("a.las", "out/a.laz")],
            errors: vec![Arc::new(FileTransformError::new(
                "b.las",
                "out/b.laz",
                LastrxError::Transform("boom".to_string()),
            ))],
            chunks_done: 4,
            total_chunks: 6,
        };

        let summary = ConvertSummary::from_report(&report, 3);
        assert_eq!(summary.outcome, "failed");
        assert_eq!(summary.success_count(), 1);
        assert_eq!(summary.failure_count(), 1);
        assert_eq!(summary.unfinished_count(), 1);
        assert!(summary.failed[0].error.contains("boom"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["succeeded"][0]["output"], "out/a.laz");
    }
}
