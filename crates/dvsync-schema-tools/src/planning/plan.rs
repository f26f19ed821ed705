//! Schema change plan data structures
//!
//! A plan is pure data. It never references a live connection, so it can be
//! serialized, diffed or replayed later.

use dvsync_core::{AlternateKeyMetadata, AttributeMetadata, RelationshipMetadata, SqlColumn, SqlForeignKey};
use serde::{Deserialize, Serialize};

/// A reference column to create as a new attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeAddition {
    pub table_name: String,
    pub entity_name: String,
    pub column: SqlColumn,
}

/// A reference unique key to create as an alternate key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateKeyAddition {
    pub table_name: String,
    pub entity_name: String,
    pub key_name: String,
    /// Reference column names, in key order
    pub columns: Vec<String>,
}

/// A foreign key that needs a lookup relationship created by hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAddition {
    pub table_name: String,
    pub entity_name: String,
    pub referenced_entity: String,
    pub foreign_key: SqlForeignKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRemoval {
    pub entity_name: String,
    pub attribute: AttributeMetadata,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateKeyRemoval {
    pub entity_name: String,
    pub key: AlternateKeyMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRemoval {
    pub entity_name: String,
    pub relationship: RelationshipMetadata,
}

/// A reference column already served by a built-in attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeReplacement {
    pub table_name: String,
    pub entity_name: String,
    pub column_name: String,
    pub native_attribute: String,
}

/// A reference table whose entity was not retrieved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingEntity {
    pub table_name: String,
    pub entity_name: String,
}

/// A missing unique key left out of the plan because some columns do not
/// resolve to an attribute yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredAlternateKey {
    pub table_name: String,
    pub entity_name: String,
    pub key_name: String,
    pub unresolved_columns: Vec<String>,
}

/// The complete set of changes that would align the target with the
/// reference schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaChangePlan {
    pub attributes_to_add: Vec<AttributeAddition>,
    pub alternate_keys_to_add: Vec<AlternateKeyAddition>,
    /// Advisory only; never executed
    pub relationships_to_add: Vec<RelationshipAddition>,
    pub attributes_to_remove: Vec<AttributeRemoval>,
    pub alternate_keys_to_remove: Vec<AlternateKeyRemoval>,
    pub relationships_to_remove: Vec<RelationshipRemoval>,
    pub native_replacements: Vec<NativeReplacement>,
    pub missing_entities: Vec<MissingEntity>,
    pub deferred_alternate_keys: Vec<DeferredAlternateKey>,
}

impl SchemaChangePlan {
    /// Creates a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any additive or destructive item is planned
    pub fn has_changes(&self) -> bool {
        self.has_additive_changes() || self.has_destructive_changes()
    }

    pub fn has_additive_changes(&self) -> bool {
        !self.attributes_to_add.is_empty()
            || !self.alternate_keys_to_add.is_empty()
            || !self.relationships_to_add.is_empty()
    }

    pub fn has_destructive_changes(&self) -> bool {
        self.destructive_count() > 0
    }

    pub fn additive_count(&self) -> usize {
        self.attributes_to_add.len()
            + self.alternate_keys_to_add.len()
            + self.relationships_to_add.len()
    }

    pub fn destructive_count(&self) -> usize {
        self.attributes_to_remove.len()
            + self.alternate_keys_to_remove.len()
            + self.relationships_to_remove.len()
    }

    /// Total number of additive and destructive items
    pub fn change_count(&self) -> usize {
        self.additive_count() + self.destructive_count()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            attributes_to_add: self.attributes_to_add.len(),
            alternate_keys_to_add: self.alternate_keys_to_add.len(),
            relationships_to_add: self.relationships_to_add.len(),
            attributes_to_remove: self.attributes_to_remove.len(),
            alternate_keys_to_remove: self.alternate_keys_to_remove.len(),
            relationships_to_remove: self.relationships_to_remove.len(),
            native_replacements: self.native_replacements.len(),
            missing_entities: self.missing_entities.len(),
            deferred_alternate_keys: self.deferred_alternate_keys.len(),
        }
    }
}

/// Item counts per plan collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub attributes_to_add: usize,
    pub alternate_keys_to_add: usize,
    pub relationships_to_add: usize,
    pub attributes_to_remove: usize,
    pub alternate_keys_to_remove: usize,
    pub relationships_to_remove: usize,
    pub native_replacements: usize,
    pub missing_entities: usize,
    pub deferred_alternate_keys: usize,
}

impl PlanSummary {
    /// `(label, count)` rows in display order
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("Attributes to add", self.attributes_to_add),
            ("Alternate keys to add", self.alternate_keys_to_add),
            ("Relationships to add (manual)", self.relationships_to_add),
            ("Attributes to remove", self.attributes_to_remove),
            ("Alternate keys to remove", self.alternate_keys_to_remove),
            ("Relationships to remove", self.relationships_to_remove),
            ("Native replacements", self.native_replacements),
            ("Missing entities", self.missing_entities),
            ("Deferred alternate keys", self.deferred_alternate_keys),
        ]
    }
}
