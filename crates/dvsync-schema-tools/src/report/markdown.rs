//! Markdown alignment report

use std::path::Path;

use dvsync_core::{MetadataRetrieval, NativeFieldMap, Result};

use crate::alignment::{AlignmentAnalysis, ColumnStatus, KeyStatus, RelationshipStatus, TableAlignmentResult};
use crate::apply::{ExecutionLog, ItemOutcome};
use crate::planning::SchemaChangePlan;

/// Builds the Markdown report for one run
///
/// The analysis and retrieval are always rendered; the plan and execution
/// log sections appear only when supplied.
pub struct AlignmentReport<'a> {
    analysis: &'a AlignmentAnalysis,
    retrieval: &'a MetadataRetrieval,
    native_fields: &'a NativeFieldMap,
    source: Option<String>,
    plan: Option<&'a SchemaChangePlan>,
    execution_log: Option<&'a ExecutionLog>,
}

impl<'a> AlignmentReport<'a> {
    pub fn new(
        analysis: &'a AlignmentAnalysis,
        retrieval: &'a MetadataRetrieval,
        native_fields: &'a NativeFieldMap,
    ) -> Self {
        Self {
            analysis,
            retrieval,
            native_fields,
            source: None,
            plan: None,
            execution_log: None,
        }
    }

    /// Where the reference schema was loaded from
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_plan(mut self, plan: &'a SchemaChangePlan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_execution_log(mut self, log: &'a ExecutionLog) -> Self {
        self.execution_log = Some(log);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# Schema Alignment Report\n\n");
        out.push_str(&format!(
            "Generated: {} UTC\n",
            self.analysis.generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        match &self.source {
            Some(source) => out.push_str(&format!(
                "Source schema: `{}` tables parsed from {}\n",
                self.analysis.tables.len(),
                source
            )),
            None => out.push_str(&format!(
                "Source schema: `{}` tables\n",
                self.analysis.tables.len()
            )),
        }
        out.push_str(&format!(
            "Endpoint: {}\n",
            self.retrieval.endpoint.as_deref().unwrap_or("(not configured)")
        ));
        out.push_str(&format!(
            "Connection: {}\n",
            if self.retrieval.available {
                "available"
            } else {
                "not available"
            }
        ));

        let mut warnings: Vec<&str> = Vec::new();
        if let Some(reason) = &self.retrieval.unavailable_reason {
            warnings.push(reason);
        }
        warnings.extend(self.retrieval.errors.iter().map(String::as_str));
        if !warnings.is_empty() {
            out.push_str("\n## Connection Warnings\n\n");
            for warning in warnings {
                out.push_str(&format!("- {}\n", warning));
            }
        }

        if !self.native_fields.is_empty() {
            out.push_str("\n## Native Field Replacement Map\n\n");
            for (column, attribute) in self.native_fields.iter() {
                out.push_str(&format!("- `{}` → `{}`\n", column, attribute));
            }
        }

        for table in &self.analysis.tables {
            render_table(&mut out, table);
        }

        if let Some(plan) = self.plan {
            render_plan(&mut out, plan);
        }
        if let Some(log) = self.execution_log {
            render_execution_log(&mut out, log);
        }

        out
    }

    /// Render and write, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        tracing::info!(path = %path.display(), "wrote alignment report");
        Ok(())
    }
}

fn column_label(status: ColumnStatus) -> &'static str {
    match status {
        ColumnStatus::Matched => "Matched",
        ColumnStatus::NativeReplacement => "Use native",
        ColumnStatus::MissingInTarget => "Missing",
    }
}

fn key_label(status: KeyStatus) -> &'static str {
    match status {
        KeyStatus::Matched => "Matched",
        KeyStatus::MissingInTarget => "Missing",
        KeyStatus::AdditionalInTarget => "Additional in target",
    }
}

fn render_table(out: &mut String, result: &TableAlignmentResult) {
    out.push_str(&format!("\n## Table `{}`\n\n", result.table.name));
    out.push_str(&format!("- Entity: `{}`\n", result.entity_name));
    out.push_str(&format!(
        "- Entity status: {}\n",
        if result.entity_available() {
            "retrieved"
        } else {
            "missing"
        }
    ));

    out.push_str("\n### Column Alignment\n\n");
    out.push_str("| Column | SQL Type | Nullable | Alignment | Attribute | Attribute Type | Notes |\n");
    out.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
    for column in &result.columns {
        let (name, attribute_type) = column
            .attribute
            .as_ref()
            .map(|a| (a.logical_name.as_str(), a.attribute_type.as_str()))
            .unwrap_or_default();
        out.push_str(&format!(
            "| `{}` | `{}` | {} | {} | `{}` | `{}` | {} |\n",
            column.column.name,
            column.column.data_type,
            if column.column.nullable { "Yes" } else { "No" },
            column_label(column.status),
            name,
            attribute_type,
            column.note.as_deref().unwrap_or_default()
        ));
    }

    out.push_str("\n### Key Alignment\n\n");
    out.push_str("| Key | Kind | Columns | Target | Status |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for key in &result.keys {
        out.push_str(&format!(
            "| `{}` | {} | `{}` | `{}` | {} |\n",
            key.name,
            key.kind.as_str(),
            key.columns.join(", "),
            key.target_name.as_deref().unwrap_or_default(),
            key_label(key.status)
        ));
    }

    out.push_str("\n### Foreign Key Alignment\n\n");
    out.push_str("| Foreign Key | Columns | References | Status | Relationship |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for alignment in &result.foreign_keys {
        let fk = &alignment.foreign_key;
        out.push_str(&format!(
            "| `{}` | `{}` | `{}({})` | {} | `{}` |\n",
            fk.name,
            fk.columns.join(", "),
            fk.referenced_table,
            fk.referenced_columns.join(", "),
            match alignment.status {
                RelationshipStatus::Matched => "Matched",
                RelationshipStatus::MissingInTarget => "Missing",
            },
            alignment
                .relationship
                .as_ref()
                .map(|r| r.schema_name.as_str())
                .unwrap_or_default()
        ));
    }

    if !result.unmatched_attributes.is_empty() {
        out.push_str("\n### Unmatched Attributes\n\n");
        for attribute in &result.unmatched_attributes {
            out.push_str(&format!(
                "- `{}` ({})\n",
                attribute.logical_name, attribute.attribute_type
            ));
        }
    }

    if !result.unmatched_alternate_keys.is_empty() {
        out.push_str("\n### Unmatched Alternate Keys\n\n");
        for key in &result.unmatched_alternate_keys {
            out.push_str(&format!(
                "- `{}` → `{}`\n",
                key.logical_name,
                key.key_attributes.join(", ")
            ));
        }
    }

    if !result.unmatched_relationships.is_empty() {
        out.push_str("\n### Unmatched Relationships\n\n");
        for relationship in &result.unmatched_relationships {
            out.push_str(&format!(
                "- `{}` ({} → {})\n",
                relationship.schema_name,
                relationship.referencing_attribute,
                relationship.referenced_entity
            ));
        }
    }
}

fn render_plan(out: &mut String, plan: &SchemaChangePlan) {
    out.push_str("\n## Change Plan\n\n");
    if !plan.has_changes() {
        out.push_str("No schema changes are required.\n");
    }

    out.push_str("\n| Change | Count |\n| --- | --- |\n");
    for (label, count) in plan.summary().rows() {
        out.push_str(&format!("| {} | {} |\n", label, count));
    }

    if !plan.deferred_alternate_keys.is_empty() {
        out.push_str("\n### Deferred Alternate Keys\n\n");
        for key in &plan.deferred_alternate_keys {
            out.push_str(&format!(
                "- `{}` on `{}` waits for: {}\n",
                key.key_name,
                key.entity_name,
                key.unresolved_columns.join(", ")
            ));
        }
    }

    if !plan.missing_entities.is_empty() {
        out.push_str("\n### Missing Entities\n\n");
        for missing in &plan.missing_entities {
            out.push_str(&format!(
                "- `{}` (table `{}`)\n",
                missing.entity_name, missing.table_name
            ));
        }
    }
}

fn render_execution_log(out: &mut String, log: &ExecutionLog) {
    out.push_str("\n## Execution Log\n\n");
    out.push_str(&format!("Outcome: {:?}\n", log.outcome()));
    if let Some(path) = &log.backup_path {
        out.push_str(&format!("Backup: `{}`\n", path.display()));
    }
    if log.entries.is_empty() {
        return;
    }

    out.push_str("\n| Step | Entity | Item | Outcome | Message |\n");
    out.push_str("| --- | --- | --- | --- | --- |\n");
    for entry in &log.entries {
        let detail = match &entry.outcome {
            ItemOutcome::Skipped { reason } => format!("{} ({})", entry.message, reason),
            ItemOutcome::Failed { error } => format!("{} ({})", entry.message, error),
            _ => entry.message.clone(),
        };
        out.push_str(&format!(
            "| {} | `{}` | `{}` | {} | {} |\n",
            entry.step.as_str(),
            entry.entity.as_deref().unwrap_or("-"),
            entry.item,
            entry.outcome.label(),
            detail
        ));
    }
}
