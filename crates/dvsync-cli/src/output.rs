//! Terminal output for plans and execution logs

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use dvsync_schema_tools::{ExecutionLog, SchemaChangePlan};

pub const NO_CHANGES_MESSAGE: &str = "No schema changes are required.";

/// Plan counts as a two-column table, or the no-changes message
pub fn format_plan_summary(plan: &SchemaChangePlan) -> String {
    if !plan.has_changes() {
        return NO_CHANGES_MESSAGE.to_string();
    }

    let mut table = new_table(vec!["Change", "Count"]);
    for (label, count) in plan.summary().rows() {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    format!("Schema change summary:\n{table}")
}

pub fn format_execution_log(log: &ExecutionLog) -> String {
    if log.entries.is_empty() {
        return format!("Outcome: {:?}", log.outcome());
    }

    let mut table = new_table(vec!["Step", "Entity", "Item", "Outcome", "Message"]);
    for entry in &log.entries {
        table.add_row(vec![
            entry.step.as_str().to_string(),
            entry.entity.clone().unwrap_or_default(),
            entry.item.clone(),
            entry.outcome.label().to_string(),
            entry.message.clone(),
        ]);
    }

    format!(
        "{table}\nOutcome: {:?} ({} applied, {} skipped, {} failed)",
        log.outcome(),
        log.applied_count(),
        log.skipped_count(),
        log.failed_count()
    )
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}
