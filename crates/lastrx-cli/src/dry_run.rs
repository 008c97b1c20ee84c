use crate::output::OutputWriter;
use serde::Serialize;

/// Represents a planned action in dry-run mode
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub description: String,
    pub details: Vec<String>,
}

/// Types of actions that can be planned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateDirectory,
    WriteFile,
    SaveConfig,
}

impl PlannedAction {
    /// Create a new planned action
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a detail to the planned action
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// A conversion run that was validated but not started
#[derive(Debug, Clone, Serialize)]
pub struct DryRunPlan {
    pub files: usize,
    pub total_chunks: u64,
    pub workers: usize,
    pub planned_actions: Vec<PlannedAction>,
}

/// Display a dry-run plan
pub fn display_plan(output: &OutputWriter, plan: &DryRunPlan) -> anyhow::Result<()> {
    if output.is_json() {
        return output.result(serde_json::json!({
            "dry_run": true,
            "plan": plan,
        }));
    }

    output.section("Planned Actions (Dry Run)");
    output.kv("Files", plan.files);
    output.kv("Chunks", plan.total_chunks);
    output.kv("Workers", plan.workers);
    for (i, action) in plan.planned_actions.iter().enumerate() {
        output.info(format!("{}. {:?}: {}", i + 1, action.action_type, action.description));
        for detail in &action.details {
            output.info(format!("   - {}", detail));
        }
    }
    output.info("No files were written. Run without --dry-run to convert.");
    Ok(())
}
