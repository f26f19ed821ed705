//! Attribute shapes sent to the remote platform when creating attributes

use serde::{Deserialize, Serialize};

/// Language code used for labels on generated metadata
pub const DEFAULT_LANGUAGE_CODE: u32 = 1033;

/// Maximum length of an unbounded multi-line text attribute
pub const MEMO_MAX_LENGTH: u32 = 1_048_576;

/// Whether a value is required for an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredLevel {
    None,
    ApplicationRequired,
}

impl RequiredLevel {
    /// Non-nullable source columns become required attributes
    pub fn from_nullable(nullable: bool) -> Self {
        if nullable {
            RequiredLevel::None
        } else {
            RequiredLevel::ApplicationRequired
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredLevel::None => "None",
            RequiredLevel::ApplicationRequired => "ApplicationRequired",
        }
    }
}

/// Display format of a date/time attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateTimeFormat {
    DateAndTime,
    DateOnly,
}

/// Time zone behavior of a date/time attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateTimeBehavior {
    UserLocal,
    DateOnly,
}

/// Kind-specific shape of a new attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    Boolean {
        true_label: String,
        false_label: String,
    },
    BigInt,
    Integer,
    Decimal {
        precision: u32,
        scale: u32,
        min_value: f64,
        max_value: f64,
    },
    Double,
    Money {
        precision_source: u32,
    },
    DateTime {
        format: DateTimeFormat,
        behavior: DateTimeBehavior,
    },
    Memo {
        max_length: u32,
    },
    String {
        max_length: u32,
    },
}

impl AttributeKind {
    pub fn boolean(true_label: &str, false_label: &str) -> Self {
        AttributeKind::Boolean {
            true_label: true_label.to_string(),
            false_label: false_label.to_string(),
        }
    }

    /// Short name used in logs and reports
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeKind::Boolean { .. } => "Boolean",
            AttributeKind::BigInt => "BigInt",
            AttributeKind::Integer => "Integer",
            AttributeKind::Decimal { .. } => "Decimal",
            AttributeKind::Double => "Double",
            AttributeKind::Money { .. } => "Money",
            AttributeKind::DateTime { .. } => "DateTime",
            AttributeKind::Memo { .. } => "Memo",
            AttributeKind::String { .. } => "String",
        }
    }
}

/// A fully resolved attribute ready to be created on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub logical_name: String,
    pub schema_name: String,
    pub display_name: String,
    pub required_level: RequiredLevel,
    pub kind: AttributeKind,
}

/// A candidate key ready to be created on an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternateKeyDefinition {
    pub logical_name: String,
    pub display_name: String,
    pub key_attributes: Vec<String>,
}
