use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use lastrx_core::FileTransformError;
use std::path::Path;
use std::time::Duration;

/// Create a progress bar counting whole percent
pub fn create_percent_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{msg}\n[{bar:40.cyan/blue}] {pos}% ({elapsed_precise}, ETA: {eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", style("✓").green(), message));
}

/// Finish a progress bar with error message
pub fn finish_error(pb: &ProgressBar, message: &str) {
    pb.abandon_with_message(format!("{} {}", style("✗").red(), message));
}

/// Progress display of a conversion run
pub struct ConvertProgress {
    bar: ProgressBar,
}

impl ConvertProgress {
    pub fn new(files: usize, workers: usize, visible: bool) -> Self {
        let bar = create_percent_bar(&format!("Converting {} file(s) with {} worker(s)", files, workers));
        if !visible {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    pub fn set_percent(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    pub fn file_completed(&self, input: &Path, output: &Path) {
        self.bar.println(format!(
            "{} {} -> {}",
            style("✓").green(),
            input.display(),
            output.display()
        ));
    }

    pub fn file_failed(&self, error: &FileTransformError) {
        self.bar.println(format!(
            "{} {}: {}",
            style("✗").red(),
            error.input.display(),
            error.source
        ));
    }

    pub fn succeeded(&self, files: usize) {
        finish_success(&self.bar, &format!("Converted {} file(s)", files));
    }

    pub fn failed(&self, failed: usize) {
        finish_error(&self.bar, &format!("{} file(s) failed", failed));
    }

    pub fn stopped(&self) {
        finish_error(&self.bar, "Stopped");
    }
}
