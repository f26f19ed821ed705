//! Execution log for apply runs
//!
//! Every item the applier touches gets one entry, so a run never ends
//! without saying what happened to each planned change.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The kind of work an entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStep {
    Backup,
    CreateAttribute,
    CreateAlternateKey,
    NativeReplacement,
    Relationship,
    DeleteAttribute,
    DeleteRelationship,
    DeleteAlternateKey,
    Drops,
}

impl ExecutionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStep::Backup => "backup",
            ExecutionStep::CreateAttribute => "create-attribute",
            ExecutionStep::CreateAlternateKey => "create-alternate-key",
            ExecutionStep::NativeReplacement => "native-replacement",
            ExecutionStep::Relationship => "relationship",
            ExecutionStep::DeleteAttribute => "delete-attribute",
            ExecutionStep::DeleteRelationship => "delete-relationship",
            ExecutionStep::DeleteAlternateKey => "delete-alternate-key",
            ExecutionStep::Drops => "drops",
        }
    }
}

/// What happened to one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Applied,
    Skipped { reason: String },
    Failed { error: String },
    /// Informational; requires follow-up outside the tool
    Advisory,
    /// Withheld by the drop policy
    Gated,
}

impl ItemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Applied => "applied",
            ItemOutcome::Skipped { .. } => "skipped",
            ItemOutcome::Failed { .. } => "failed",
            ItemOutcome::Advisory => "advisory",
            ItemOutcome::Gated => "gated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEntry {
    pub step: ExecutionStep,
    pub entity: Option<String>,
    pub item: String,
    pub outcome: ItemOutcome,
    pub message: String,
}

/// Aggregate outcome of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    NoChanges,
    Applied,
    PartiallyApplied,
    Aborted,
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub entries: Vec<ExecutionEntry>,
    pub backup_path: Option<PathBuf>,
    pub no_changes: bool,
    pub aborted: bool,
    pub cancelled: bool,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and emit it as a tracing event
    pub fn record(
        &mut self,
        step: ExecutionStep,
        entity: Option<&str>,
        item: impl Into<String>,
        outcome: ItemOutcome,
        message: impl Into<String>,
    ) {
        let entry = ExecutionEntry {
            step,
            entity: entity.map(str::to_string),
            item: item.into(),
            outcome,
            message: message.into(),
        };

        let entity = entry.entity.as_deref().unwrap_or("-");
        match &entry.outcome {
            ItemOutcome::Applied | ItemOutcome::Advisory => tracing::info!(
                step = entry.step.as_str(),
                entity,
                item = %entry.item,
                "{}",
                entry.message
            ),
            ItemOutcome::Skipped { reason } => tracing::warn!(
                step = entry.step.as_str(),
                entity,
                item = %entry.item,
                reason = %reason,
                "{}",
                entry.message
            ),
            ItemOutcome::Failed { error } => tracing::warn!(
                step = entry.step.as_str(),
                entity,
                item = %entry.item,
                error = %error,
                "{}",
                entry.message
            ),
            ItemOutcome::Gated => tracing::warn!(
                step = entry.step.as_str(),
                item = %entry.item,
                "{}",
                entry.message
            ),
        }

        self.entries.push(entry);
    }

    fn count(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome.label() == label)
            .count()
    }

    pub fn applied_count(&self) -> usize {
        self.count("applied")
    }

    pub fn failed_count(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped_count(&self) -> usize {
        self.count("skipped")
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    pub fn entries_for(&self, step: ExecutionStep) -> impl Iterator<Item = &ExecutionEntry> {
        self.entries.iter().filter(move |entry| entry.step == step)
    }

    pub fn outcome(&self) -> BatchOutcome {
        if self.cancelled {
            BatchOutcome::Cancelled
        } else if self.aborted {
            BatchOutcome::Aborted
        } else if self.no_changes {
            BatchOutcome::NoChanges
        } else if self.has_failures() || self.skipped_count() > 0 {
            BatchOutcome::PartiallyApplied
        } else {
            BatchOutcome::Applied
        }
    }
}
