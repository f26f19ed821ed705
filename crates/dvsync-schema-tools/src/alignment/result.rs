//! Alignment result types
//!
//! Pure classifications produced by the analyzer. Nothing here is mutated
//! after the analysis that contains it has been built.

use chrono::{DateTime, Utc};
use dvsync_core::{
    AlternateKeyMetadata, AttributeMetadata, EntityMetadata, NameMap, RelationshipMetadata,
    SqlColumn, SqlForeignKey, SqlTable,
};
use serde::{Deserialize, Serialize};

/// How a reference column relates to the target entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnStatus {
    Matched,
    NativeReplacement,
    MissingInTarget,
}

impl ColumnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnStatus::Matched => "Matched",
            ColumnStatus::NativeReplacement => "NativeReplacement",
            ColumnStatus::MissingInTarget => "MissingInTarget",
        }
    }
}

/// How a key relates across both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyStatus {
    Matched,
    MissingInTarget,
    /// A target candidate key with no reference unique key
    AdditionalInTarget,
}

impl KeyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyStatus::Matched => "Matched",
            KeyStatus::MissingInTarget => "MissingInTarget",
            KeyStatus::AdditionalInTarget => "AdditionalInTarget",
        }
    }
}

/// How a reference foreign key relates to the target relationships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipStatus {
    Matched,
    MissingInTarget,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Matched => "Matched",
            RelationshipStatus::MissingInTarget => "MissingInTarget",
        }
    }
}

/// Origin of a key alignment entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    Primary,
    Unique,
    /// Target-only candidate key
    Alternate,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Primary => "Primary",
            KeyKind::Unique => "Unique",
            KeyKind::Alternate => "Alternate",
        }
    }
}

/// Alignment of one reference column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAlignment {
    pub column: SqlColumn,
    pub status: ColumnStatus,
    /// The target attribute the column resolved to
    pub attribute: Option<AttributeMetadata>,
    pub note: Option<String>,
}

impl ColumnAlignment {
    /// Logical name of the resolved target attribute
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute
            .as_ref()
            .map(|attribute| attribute.logical_name.as_str())
    }
}

/// Alignment of one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAlignment {
    pub name: String,
    pub kind: KeyKind,
    /// Reference column names, or target attribute names for `Alternate`
    pub columns: Vec<String>,
    pub status: KeyStatus,
    /// The target key (or primary id attribute) this key matched
    pub target_name: Option<String>,
}

/// Alignment of one reference foreign key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyAlignment {
    pub foreign_key: SqlForeignKey,
    pub status: RelationshipStatus,
    pub relationship: Option<RelationshipMetadata>,
    pub note: Option<String>,
}

/// Everything the analyzer learned about one reference table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAlignmentResult {
    pub table: SqlTable,
    pub entity_name: String,
    /// `None` when the entity could not be retrieved
    pub entity: Option<EntityMetadata>,
    pub columns: Vec<ColumnAlignment>,
    pub keys: Vec<KeyAlignment>,
    pub foreign_keys: Vec<ForeignKeyAlignment>,
    pub unmatched_attributes: Vec<AttributeMetadata>,
    pub unmatched_alternate_keys: Vec<AlternateKeyMetadata>,
    pub unmatched_relationships: Vec<RelationshipMetadata>,
}

impl TableAlignmentResult {
    pub fn entity_available(&self) -> bool {
        self.entity.is_some()
    }

    /// Look up a column alignment by reference column name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&ColumnAlignment> {
        self.columns
            .iter()
            .find(|alignment| alignment.column.name.eq_ignore_ascii_case(name))
    }

    pub fn columns_with_status(&self, status: ColumnStatus) -> impl Iterator<Item = &ColumnAlignment> {
        self.columns
            .iter()
            .filter(move |alignment| alignment.status == status)
    }

    /// Whether anything differs between the table and its entity
    pub fn has_drift(&self) -> bool {
        self.entity.is_none()
            || self
                .columns
                .iter()
                .any(|c| c.status == ColumnStatus::MissingInTarget)
            || self.keys.iter().any(|k| k.status != KeyStatus::Matched)
            || self
                .foreign_keys
                .iter()
                .any(|fk| fk.status != RelationshipStatus::Matched)
            || !self.unmatched_attributes.is_empty()
            || !self.unmatched_alternate_keys.is_empty()
            || !self.unmatched_relationships.is_empty()
    }
}

/// Output of one analyzer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentAnalysis {
    pub generated_at: DateTime<Utc>,
    pub table_to_entity: NameMap,
    pub tables: Vec<TableAlignmentResult>,
}

impl AlignmentAnalysis {
    /// Look up a table result by reference table name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&TableAlignmentResult> {
        self.tables
            .iter()
            .find(|result| result.table.name.eq_ignore_ascii_case(name))
    }

    pub fn summary(&self) -> AlignmentSummary {
        let mut summary = AlignmentSummary {
            tables: self.tables.len(),
            ..AlignmentSummary::default()
        };

        for result in &self.tables {
            if result.entity.is_none() {
                summary.missing_entities += 1;
            }
            for column in &result.columns {
                match column.status {
                    ColumnStatus::Matched => summary.matched_columns += 1,
                    ColumnStatus::NativeReplacement => summary.native_replacements += 1,
                    ColumnStatus::MissingInTarget => summary.missing_columns += 1,
                }
            }
            for key in &result.keys {
                match key.status {
                    KeyStatus::Matched => summary.matched_keys += 1,
                    KeyStatus::MissingInTarget => summary.missing_keys += 1,
                    KeyStatus::AdditionalInTarget => summary.additional_keys += 1,
                }
            }
            for foreign_key in &result.foreign_keys {
                match foreign_key.status {
                    RelationshipStatus::Matched => summary.matched_foreign_keys += 1,
                    RelationshipStatus::MissingInTarget => summary.missing_foreign_keys += 1,
                }
            }
            summary.unmatched_attributes += result.unmatched_attributes.len();
            summary.unmatched_relationships += result.unmatched_relationships.len();
        }

        summary
    }
}

/// Counts over an analysis, for summaries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub tables: usize,
    pub missing_entities: usize,
    pub matched_columns: usize,
    pub native_replacements: usize,
    pub missing_columns: usize,
    pub matched_keys: usize,
    pub missing_keys: usize,
    pub additional_keys: usize,
    pub matched_foreign_keys: usize,
    pub missing_foreign_keys: usize,
    pub unmatched_attributes: usize,
    pub unmatched_relationships: usize,
}
