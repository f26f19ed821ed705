//! Removal candidates export
//!
//! Written on dry runs so the destructive half of a plan can be reviewed
//! before anyone opts in to drops.

use std::path::Path;

use chrono::{DateTime, Utc};
use dvsync_core::Result;
use serde::{Deserialize, Serialize};

use crate::planning::{MissingEntity, SchemaChangePlan};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeCandidate {
    pub entity: String,
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub display_name: Option<String>,
    pub attribute_type: String,
    pub targets: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipCandidate {
    pub entity: String,
    pub schema_name: String,
    pub referencing_entity: String,
    pub referencing_attribute: String,
    pub referenced_entity: String,
    pub referenced_attribute: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateKeyCandidate {
    pub entity: String,
    pub logical_name: String,
    pub key_attributes: Vec<String>,
}

/// Everything a plan proposes to remove, plus the entities that could not
/// be compared at all
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCandidates {
    pub generated_at: DateTime<Utc>,
    pub attributes: Vec<AttributeCandidate>,
    pub relationships: Vec<RelationshipCandidate>,
    pub alternate_keys: Vec<AlternateKeyCandidate>,
    pub missing_entities: Vec<MissingEntity>,
}

impl DeleteCandidates {
    pub fn from_plan(plan: &SchemaChangePlan, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            attributes: plan
                .attributes_to_remove
                .iter()
                .map(|item| AttributeCandidate {
                    entity: item.entity_name.clone(),
                    logical_name: item.attribute.logical_name.clone(),
                    schema_name: item.attribute.schema_name.clone(),
                    display_name: item.attribute.display_name.clone(),
                    attribute_type: item.attribute.attribute_type.clone(),
                    targets: item.attribute.targets.clone(),
                    reason: item.reason.clone(),
                })
                .collect(),
            relationships: plan
                .relationships_to_remove
                .iter()
                .map(|item| RelationshipCandidate {
                    entity: item.entity_name.clone(),
                    schema_name: item.relationship.schema_name.clone(),
                    referencing_entity: item.relationship.referencing_entity.clone(),
                    referencing_attribute: item.relationship.referencing_attribute.clone(),
                    referenced_entity: item.relationship.referenced_entity.clone(),
                    referenced_attribute: item.relationship.referenced_attribute.clone(),
                })
                .collect(),
            alternate_keys: plan
                .alternate_keys_to_remove
                .iter()
                .map(|item| AlternateKeyCandidate {
                    entity: item.entity_name.clone(),
                    logical_name: item.key.logical_name.clone(),
                    key_attributes: item.key.key_attributes.clone(),
                })
                .collect(),
            missing_entities: plan.missing_entities.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.relationships.is_empty() && self.alternate_keys.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as indented JSON, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            attributes = self.attributes.len(),
            relationships = self.relationships.len(),
            alternate_keys = self.alternate_keys.len(),
            "wrote delete candidates"
        );
        Ok(())
    }
}
