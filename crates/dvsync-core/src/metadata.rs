//! Remote entity metadata snapshot types
//!
//! A snapshot is taken once per run and never mutated by the analysis,
//! planning or apply stages. Attribute and entity lookups are
//! case-insensitive.

use crate::names::normalize_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single attribute (column) of a remote entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub logical_name: String,
    pub schema_name: Option<String>,
    /// Declared type tag as reported by the platform, e.g. `StringType`
    pub attribute_type: String,
    pub nullable: bool,
    pub is_custom: bool,
    pub display_name: Option<String>,
    /// Entities a lookup attribute can point at
    #[serde(default)]
    pub targets: Vec<String>,
}

impl AttributeMetadata {
    pub fn new(logical_name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            schema_name: None,
            attribute_type: attribute_type.into(),
            nullable: true,
            is_custom: false,
            display_name: None,
            targets: Vec::new(),
        }
    }

    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    pub fn is_lookup(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Whether `name` equals the logical or schema name (case-insensitive)
    pub fn is_named(&self, name: &str) -> bool {
        self.logical_name.eq_ignore_ascii_case(name)
            || self
                .schema_name
                .as_deref()
                .is_some_and(|schema| schema.eq_ignore_ascii_case(name))
    }
}

/// A candidate (alternate) key on a remote entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateKeyMetadata {
    pub logical_name: String,
    pub key_attributes: Vec<String>,
}

impl AlternateKeyMetadata {
    pub fn new(logical_name: impl Into<String>, key_attributes: Vec<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            key_attributes,
        }
    }
}

/// A many-to-one lookup relationship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    pub schema_name: String,
    pub referencing_entity: String,
    pub referencing_attribute: String,
    pub referenced_entity: String,
    pub referenced_attribute: String,
    pub is_custom: bool,
}

impl RelationshipMetadata {
    pub fn new(
        schema_name: impl Into<String>,
        referencing_entity: impl Into<String>,
        referencing_attribute: impl Into<String>,
        referenced_entity: impl Into<String>,
        referenced_attribute: impl Into<String>,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            referencing_entity: referencing_entity.into(),
            referencing_attribute: referencing_attribute.into(),
            referenced_entity: referenced_entity.into(),
            referenced_attribute: referenced_attribute.into(),
            is_custom: false,
        }
    }

    pub fn custom(mut self) -> Self {
        self.is_custom = true;
        self
    }
}

/// Structural snapshot of one remote entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub display_name: Option<String>,
    pub primary_id_attribute: String,
    #[serde(with = "attribute_list")]
    attributes: BTreeMap<String, AttributeMetadata>,
    #[serde(default)]
    pub alternate_keys: Vec<AlternateKeyMetadata>,
    #[serde(default)]
    pub relationships: Vec<RelationshipMetadata>,
}

impl EntityMetadata {
    pub fn new(logical_name: impl Into<String>, primary_id_attribute: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            schema_name: None,
            display_name: None,
            primary_id_attribute: primary_id_attribute.into(),
            attributes: BTreeMap::new(),
            alternate_keys: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_schema_name(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = Some(schema_name.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.insert_attribute(attribute);
        self
    }

    pub fn with_alternate_key(mut self, key: AlternateKeyMetadata) -> Self {
        self.alternate_keys.push(key);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipMetadata) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Insert or replace an attribute keyed by its logical name
    pub fn insert_attribute(&mut self, attribute: AttributeMetadata) {
        self.attributes
            .insert(normalize_name(&attribute.logical_name), attribute);
    }

    pub fn remove_attribute(&mut self, logical_name: &str) -> Option<AttributeMetadata> {
        self.attributes.remove(&normalize_name(logical_name))
    }

    /// Look up an attribute by logical name (case-insensitive)
    pub fn attribute(&self, logical_name: &str) -> Option<&AttributeMetadata> {
        self.attributes.get(&normalize_name(logical_name))
    }

    /// Look up an attribute by logical or schema name (case-insensitive)
    pub fn find_attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attribute(name)
            .or_else(|| self.attributes.values().find(|attr| attr.is_named(name)))
    }

    /// Attributes ordered by normalized logical name
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.values()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Customization prefix derived from the schema name
    ///
    /// `None` when no schema name was retrieved.
    pub fn customization_prefix(&self) -> Option<&str> {
        self.schema_name
            .as_deref()
            .and_then(crate::naming::customization_prefix)
    }
}

/// Serializes the attribute map as a plain list ordered by logical name
mod attribute_list {
    use super::AttributeMetadata;
    use crate::names::normalize_name;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        attributes: &BTreeMap<String, AttributeMetadata>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&AttributeMetadata> = attributes.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, AttributeMetadata>, D::Error> {
        let list = Vec::<AttributeMetadata>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|attr| (normalize_name(&attr.logical_name), attr))
            .collect())
    }
}

/// Entity snapshots keyed case-insensitively by logical name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<EntityMetadata>", into = "Vec<EntityMetadata>")]
pub struct EntitySnapshots {
    entities: BTreeMap<String, EntityMetadata>,
}

impl EntitySnapshots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityMetadata) {
        self.entities
            .insert(normalize_name(&entity.logical_name), entity);
    }

    pub fn with_entity(mut self, entity: EntityMetadata) -> Self {
        self.insert(entity);
        self
    }

    pub fn get(&self, logical_name: &str) -> Option<&EntityMetadata> {
        self.entities.get(&normalize_name(logical_name))
    }

    pub fn get_mut(&mut self, logical_name: &str) -> Option<&mut EntityMetadata> {
        self.entities.get_mut(&normalize_name(logical_name))
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.entities.contains_key(&normalize_name(logical_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityMetadata> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl FromIterator<EntityMetadata> for EntitySnapshots {
    fn from_iter<I: IntoIterator<Item = EntityMetadata>>(iter: I) -> Self {
        let mut snapshots = EntitySnapshots::new();
        for entity in iter {
            snapshots.insert(entity);
        }
        snapshots
    }
}

impl From<Vec<EntityMetadata>> for EntitySnapshots {
    fn from(entities: Vec<EntityMetadata>) -> Self {
        entities.into_iter().collect()
    }
}

impl From<EntitySnapshots> for Vec<EntityMetadata> {
    fn from(snapshots: EntitySnapshots) -> Self {
        snapshots.entities.into_values().collect()
    }
}

/// Outcome of a best-effort metadata retrieval
///
/// An unconfigured transport yields `available == false` with a reason
/// rather than an error. Per-entity failures are collected in `errors`
/// alongside the entities that were retrieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRetrieval {
    pub available: bool,
    pub endpoint: Option<String>,
    pub unavailable_reason: Option<String>,
    pub entities: EntitySnapshots,
    pub errors: Vec<String>,
}

impl MetadataRetrieval {
    pub fn available(
        endpoint: Option<String>,
        entities: EntitySnapshots,
        errors: Vec<String>,
    ) -> Self {
        Self {
            available: true,
            endpoint,
            unavailable_reason: None,
            entities,
            errors,
        }
    }

    pub fn unavailable(endpoint: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            available: false,
            endpoint,
            unavailable_reason: Some(reason.into()),
            entities: EntitySnapshots::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
