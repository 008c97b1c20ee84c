use console::style;
use lastrx_core::models::{ReferenceFrame, VerticalDatum};
use lastrx_core::LastrxError;
use std::fmt;

/// Exit code when every file was converted
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when the run started but at least one file failed or it was stopped
pub const EXIT_PARTIAL_FAILURE: i32 = 1;
/// Exit code when nothing was written
pub const EXIT_PREFLIGHT: i32 = 2;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
    pub exit_code: i32,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
            exit_code: EXIT_PREFLIGHT,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }

    /// Single JSON object for `--json` mode
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": "error",
            "message": self.message,
            "context": self.context,
            "suggestions": self.suggestions,
            "exit_code": self.exit_code,
        })
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Some files failed after the run started
pub fn partial_failure(failed: usize, succeeded: usize) -> CliError {
    CliError::new(format!("{} file(s) failed, {} converted", failed, succeeded))
        .with_context("The files listed above were not converted. Other outputs were written.")
        .with_suggestion("Fix the reported problems and rerun with an input pattern matching only the failed files")
        .with_exit_code(EXIT_PARTIAL_FAILURE)
}

/// The run was interrupted by a stop request
pub fn stopped(succeeded: usize) -> CliError {
    CliError::new("Conversion stopped")
        .with_context(format!(
            "{} file(s) were converted before the stop request. Outputs of unfinished files may be incomplete.",
            succeeded
        ))
        .with_exit_code(EXIT_PARTIAL_FAILURE)
}

/// Transform flags missing and no saved configuration to fall back on
pub fn missing_transform_field(flag: &str) -> CliError {
    CliError::new(format!("Missing {}", flag))
        .with_context("Both sides of the transform must be fully described.")
        .with_suggestion(format!("Pass {} on the command line", flag))
        .with_suggestion("Or load a saved configuration: --config transform.json")
        .with_suggestion("Create one with: lastrx config init")
        .with_help("Run: lastrx convert --help")
}

/// Map a library error to a message with remediation steps
pub fn from_lastrx(error: &LastrxError) -> CliError {
    let base = CliError::new(error.to_string());
    match error {
        LastrxError::InputOutputCollision { path } => base
            .with_context(format!("Refusing to overwrite input file {}", path.display()))
            .with_suggestion("Write into a different directory: out/{}.laz")
            .with_suggestion("Or add a suffix to the output name: {}_converted.laz"),
        LastrxError::DuplicateOutput { .. } => base
            .with_suggestion("Include '{}' in the output path, e.g. 'out/{}_nad83csrs.laz'"),
        LastrxError::NoInputFiles { .. } => base
            .with_suggestion("Check the directory and the file name pattern")
            .with_suggestion("Quote the pattern so the shell does not expand it: 'data/*.laz'"),
        LastrxError::InvalidPattern { .. } => base
            .with_suggestion("Wildcards are only allowed in the file name, e.g. data/tiles/*.laz"),
        LastrxError::UnsupportedCombination { ref_frame, .. } => {
            let options = ref_frame
                .parse::<ReferenceFrame>()
                .map(|frame| {
                    VerticalDatum::options_for(frame)
                        .iter()
                        .map(|vd| vd.label())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            base.with_suggestion(format!("Vertical datums offered for {}: {}", ref_frame, options))
        }
        LastrxError::UtmZoneOutOfRange { .. } => {
            base.with_suggestion("Use a coordinate type between UTM3 and UTM23")
        }
        LastrxError::ConfigFileUnreadable { .. } | LastrxError::ConfigFileInvalid { .. } => base
            .with_suggestion("Check the file for syntax errors")
            .with_suggestion("Or recreate it: lastrx config init --force")
            .with_help("Run: lastrx config validate"),
        LastrxError::ConfigInvalid { .. } => base.with_help("Run: lastrx config show"),
        LastrxError::Transform(_) => base
            .with_suggestion("Identical origin and destination always work")
            .with_suggestion("Horizontal conversions need a build with the `proj` feature")
            .with_help("Run: lastrx doctor"),
        LastrxError::Format { .. } => base
            .with_suggestion("Check that the file is a valid LAS or LAZ file")
            .with_help("Run: lastrx inspect <file>"),
        _ => base,
    }
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    if let Some(lastrx_error) = error.downcast_ref::<LastrxError>() {
        let mut cli_error = from_lastrx(lastrx_error);
        let chain: Vec<String> = error.chain().map(|e| e.to_string()).collect();
        if chain.len() > 1 {
            cli_error.message = chain.join(": ");
        }
        return cli_error;
    }

    let message = format!("{:#}", error);
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.contains("ermission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
    } else {
        CliError::new(message)
    }
}
