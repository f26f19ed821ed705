//! Web API payloads
//!
//! Response shapes are deserialized from the PascalCase metadata documents
//! and converted into `EntityMetadata`. Request bodies for attribute and key
//! creation are built as JSON values with their `@odata.type` annotations.

use std::collections::HashMap;

use dvsync_core::{
    AlternateKeyDefinition, AlternateKeyMetadata, AttributeDefinition, AttributeKind,
    AttributeMetadata, DateTimeBehavior, DateTimeFormat, EntityMetadata, RelationshipMetadata,
    DEFAULT_LANGUAGE_CODE,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::odata_literal;

const ENTITY_SELECT: &str = "LogicalName,SchemaName,DisplayName,PrimaryIdAttribute";
const ATTRIBUTE_SELECT: &str =
    "LogicalName,SchemaName,AttributeTypeName,RequiredLevel,IsCustomAttribute,DisplayName,AttributeOf";
const KEY_SELECT: &str = "LogicalName,KeyAttributes";
const RELATIONSHIP_SELECT: &str = "SchemaName,ReferencingEntity,ReferencingAttribute,ReferencedEntity,ReferencedAttribute,IsCustomRelationship";

/// Path of one entity definition
pub fn entity_path(logical_name: &str) -> String {
    format!("EntityDefinitions(LogicalName={})", odata_literal(logical_name))
}

/// Entity definition with attributes, keys and many-to-one relationships expanded
pub fn entity_query(logical_name: &str) -> String {
    format!(
        "{}?$select={}&$expand=Attributes($select={}),Keys($select={}),ManyToOneRelationships($select={})",
        entity_path(logical_name),
        ENTITY_SELECT,
        ATTRIBUTE_SELECT,
        KEY_SELECT,
        RELATIONSHIP_SELECT
    )
}

/// Lookup attributes with their target entities
pub fn lookup_targets_query(logical_name: &str) -> String {
    format!(
        "{}/Attributes/Microsoft.Dynamics.CRM.LookupAttributeMetadata?$select=LogicalName,Targets",
        entity_path(logical_name)
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalizedLabel {
    pub label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    pub user_localized_label: Option<LocalizedLabel>,
}

impl Label {
    fn text(self) -> Option<String> {
        self.user_localized_label.and_then(|label| label.label)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedValue {
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDto {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub attribute_type_name: Option<ManagedValue>,
    pub attribute_type: Option<String>,
    pub required_level: Option<ManagedValue>,
    pub is_custom_attribute: Option<bool>,
    pub display_name: Option<Label>,
    pub attribute_of: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyDto {
    pub logical_name: String,
    #[serde(default)]
    pub key_attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipDto {
    pub schema_name: String,
    pub referencing_entity: String,
    pub referencing_attribute: String,
    pub referenced_entity: String,
    pub referenced_attribute: String,
    pub is_custom_relationship: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityDto {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub display_name: Option<Label>,
    pub primary_id_attribute: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDto>,
    #[serde(default)]
    pub keys: Vec<KeyDto>,
    #[serde(default)]
    pub many_to_one_relationships: Vec<RelationshipDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LookupTargetsDto {
    pub logical_name: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// OData collection envelope
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    pub value: Vec<T>,
}

impl AttributeDto {
    /// Required levels `None`, `Recommended` and unset allow nulls
    fn nullable(&self) -> bool {
        match self.required_level.as_ref().and_then(|level| level.value.as_deref()) {
            None => true,
            Some(level) => level == "None" || level == "Recommended",
        }
    }

    fn into_metadata(self, targets: Vec<String>) -> AttributeMetadata {
        let nullable = self.nullable();
        let attribute_type = self
            .attribute_type_name
            .and_then(|name| name.value)
            .or(self.attribute_type)
            .unwrap_or_else(|| "Unknown".to_string());

        AttributeMetadata {
            logical_name: self.logical_name,
            schema_name: self.schema_name,
            attribute_type,
            nullable,
            is_custom: self.is_custom_attribute.unwrap_or(false),
            display_name: self.display_name.and_then(Label::text),
            targets,
        }
    }
}

impl EntityDto {
    /// Convert to a snapshot, dropping attributes that are "attribute of"
    /// another attribute and attaching lookup targets by logical name
    pub fn into_metadata(self, lookup_targets: Vec<LookupTargetsDto>) -> EntityMetadata {
        let mut targets: HashMap<String, Vec<String>> = lookup_targets
            .into_iter()
            .map(|lookup| (lookup.logical_name.to_lowercase(), lookup.targets))
            .collect();

        let mut entity = EntityMetadata::new(
            self.logical_name,
            self.primary_id_attribute.unwrap_or_default(),
        );
        entity.schema_name = self.schema_name;
        entity.display_name = self.display_name.and_then(Label::text);

        for attribute in self.attributes {
            if attribute.attribute_of.is_some() {
                continue;
            }
            let attribute_targets = targets
                .remove(&attribute.logical_name.to_lowercase())
                .unwrap_or_default();
            entity.insert_attribute(attribute.into_metadata(attribute_targets));
        }

        entity.alternate_keys = self
            .keys
            .into_iter()
            .map(|key| AlternateKeyMetadata::new(key.logical_name, key.key_attributes))
            .collect();

        entity.relationships = self
            .many_to_one_relationships
            .into_iter()
            .map(|relationship| RelationshipMetadata {
                schema_name: relationship.schema_name,
                referencing_entity: relationship.referencing_entity,
                referencing_attribute: relationship.referencing_attribute,
                referenced_entity: relationship.referenced_entity,
                referenced_attribute: relationship.referenced_attribute,
                is_custom: relationship.is_custom_relationship.unwrap_or(false),
            })
            .collect();

        entity
    }
}

/// A `Label` with a single localized label in the default language
pub fn label(text: &str) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.Label",
        "LocalizedLabels": [{
            "@odata.type": "Microsoft.Dynamics.CRM.LocalizedLabel",
            "Label": text,
            "LanguageCode": DEFAULT_LANGUAGE_CODE,
        }],
    })
}

fn date_time_format(format: DateTimeFormat) -> &'static str {
    match format {
        DateTimeFormat::DateAndTime => "DateAndTime",
        DateTimeFormat::DateOnly => "DateOnly",
    }
}

fn date_time_behavior(behavior: DateTimeBehavior) -> &'static str {
    match behavior {
        DateTimeBehavior::UserLocal => "UserLocal",
        DateTimeBehavior::DateOnly => "DateOnly",
    }
}

/// Request body for `POST EntityDefinitions(...)/Attributes`
pub fn attribute_payload(definition: &AttributeDefinition) -> Value {
    let mut body = json!({
        "SchemaName": definition.schema_name,
        "LogicalName": definition.logical_name,
        "DisplayName": label(&definition.display_name),
        "RequiredLevel": {
            "Value": definition.required_level.as_str(),
            "CanBeChanged": true,
            "ManagedPropertyLogicalName": "canmodifyrequirementlevelsettings",
        },
    });

    let (odata_type, extra) = match &definition.kind {
        AttributeKind::Boolean {
            true_label,
            false_label,
        } => (
            "BooleanAttributeMetadata",
            json!({
                "OptionSet": {
                    "@odata.type": "Microsoft.Dynamics.CRM.BooleanOptionSetMetadata",
                    "OptionSetType": "Boolean",
                    "TrueOption": { "Value": 1, "Label": label(true_label) },
                    "FalseOption": { "Value": 0, "Label": label(false_label) },
                },
            }),
        ),
        AttributeKind::BigInt => ("BigIntAttributeMetadata", json!({})),
        AttributeKind::Integer => ("IntegerAttributeMetadata", json!({ "Format": "None" })),
        AttributeKind::Decimal {
            scale,
            min_value,
            max_value,
            ..
        } => (
            "DecimalAttributeMetadata",
            json!({
                "Precision": scale,
                "MinValue": min_value,
                "MaxValue": max_value,
            }),
        ),
        AttributeKind::Double => ("DoubleAttributeMetadata", json!({})),
        AttributeKind::Money { precision_source } => (
            "MoneyAttributeMetadata",
            json!({ "PrecisionSource": precision_source }),
        ),
        AttributeKind::DateTime { format, behavior } => (
            "DateTimeAttributeMetadata",
            json!({
                "Format": date_time_format(*format),
                "DateTimeBehavior": { "Value": date_time_behavior(*behavior) },
            }),
        ),
        AttributeKind::Memo { max_length } => (
            "MemoAttributeMetadata",
            json!({ "Format": "TextArea", "MaxLength": max_length }),
        ),
        AttributeKind::String { max_length } => (
            "StringAttributeMetadata",
            json!({ "FormatName": { "Value": "Text" }, "MaxLength": max_length }),
        ),
    };

    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.insert(
            "@odata.type".to_string(),
            Value::String(format!("Microsoft.Dynamics.CRM.{}", odata_type)),
        );
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

/// Request body for `POST EntityDefinitions(...)/Keys`
pub fn alternate_key_payload(definition: &AlternateKeyDefinition) -> Value {
    json!({
        "SchemaName": definition.logical_name,
        "DisplayName": label(&definition.display_name),
        "KeyAttributes": definition.key_attributes,
    })
}

/// Response of the `ExportSolution` action
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportSolutionResponse {
    pub export_solution_file: String,
}
