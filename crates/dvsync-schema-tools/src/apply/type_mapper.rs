//! SQL type to attribute shape mapping
//!
//! Raw type strings are matched case-insensitively by substring, in a fixed
//! priority order. The first rule that applies wins.

use std::sync::LazyLock;

use dvsync_core::{
    naming, AttributeDefinition, AttributeKind, DateTimeBehavior, DateTimeFormat, RequiredLevel,
    SqlColumn, SyncError, MEMO_MAX_LENGTH,
};
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_DECIMAL_PRECISION: u32 = 18;
pub const DEFAULT_DECIMAL_SCALE: u32 = 2;
pub const DEFAULT_STRING_LENGTH: u32 = 255;
pub const MAX_STRING_LENGTH: u32 = 4000;
pub const MONEY_PRECISION_SOURCE: u32 = 2;

static DECIMAL_PRECISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)\s*,\s*(\d+)\s*\)").expect("valid regex"));

static LENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)\s*\)").expect("valid regex"));

/// Errors that can occur while mapping a column type
#[derive(Debug, Error)]
pub enum TypeMapError {
    #[error("unsupported SQL type '{data_type}' for column '{column}'")]
    Unsupported { column: String, data_type: String },
}

impl From<TypeMapError> for SyncError {
    fn from(error: TypeMapError) -> Self {
        SyncError::UnsupportedType(error.to_string())
    }
}

/// Result type for type mapping
pub type TypeMapResult<T> = Result<T, TypeMapError>;

/// Maps reference columns to attribute definitions
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeTypeMapper;

impl AttributeTypeMapper {
    pub fn new() -> Self {
        Self
    }

    /// Shape of the attribute for a raw SQL type string
    pub fn map_kind(&self, column: &SqlColumn) -> TypeMapResult<AttributeKind> {
        let data_type = column.data_type.trim().to_lowercase();
        let compact: String = data_type.chars().filter(|c| !c.is_whitespace()).collect();

        if data_type.contains("tinyint") && compact.contains("(1)") {
            return Ok(AttributeKind::boolean("Yes", "No"));
        }
        if data_type.contains("bigint") {
            return Ok(AttributeKind::BigInt);
        }
        if data_type.contains("int") {
            return Ok(AttributeKind::Integer);
        }
        if data_type.contains("decimal") || data_type.contains("numeric") {
            let (precision, scale) = parse_precision_scale(&data_type);
            let (min_value, max_value) = decimal_bounds(precision, scale);
            return Ok(AttributeKind::Decimal {
                precision,
                scale,
                min_value,
                max_value,
            });
        }
        if data_type.contains("float") || data_type.contains("double") {
            return Ok(AttributeKind::Double);
        }
        if data_type.contains("money") {
            return Ok(AttributeKind::Money {
                precision_source: MONEY_PRECISION_SOURCE,
            });
        }
        if data_type.contains("datetime") || data_type.contains("timestamp") {
            return Ok(AttributeKind::DateTime {
                format: DateTimeFormat::DateAndTime,
                behavior: DateTimeBehavior::UserLocal,
            });
        }
        if data_type == "date" {
            return Ok(AttributeKind::DateTime {
                format: DateTimeFormat::DateOnly,
                behavior: DateTimeBehavior::DateOnly,
            });
        }
        if data_type.contains("bit") {
            return Ok(AttributeKind::boolean("True", "False"));
        }
        if data_type.contains("text") {
            return Ok(AttributeKind::Memo {
                max_length: MEMO_MAX_LENGTH,
            });
        }
        if data_type.contains("char") {
            return Ok(AttributeKind::String {
                max_length: parse_length(&data_type),
            });
        }

        Err(TypeMapError::Unsupported {
            column: column.name.clone(),
            data_type: column.data_type.clone(),
        })
    }

    /// Full definition for `column` on an entity with customization `prefix`
    pub fn definition(&self, column: &SqlColumn, prefix: &str) -> TypeMapResult<AttributeDefinition> {
        Ok(AttributeDefinition {
            logical_name: naming::attribute_logical_name(prefix, &column.name),
            schema_name: naming::attribute_schema_name(prefix, &column.name),
            display_name: column.name.clone(),
            required_level: RequiredLevel::from_nullable(column.nullable),
            kind: self.map_kind(column)?,
        })
    }
}

fn parse_precision_scale(data_type: &str) -> (u32, u32) {
    DECIMAL_PRECISION
        .captures(data_type)
        .and_then(|captures| {
            let precision = captures.get(1)?.as_str().parse().ok()?;
            let scale = captures.get(2)?.as_str().parse().ok()?;
            Some((precision, scale))
        })
        .unwrap_or((DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE))
}

/// Symmetric bounds `±(10^(p-s) - 10^-s)`
pub fn decimal_bounds(precision: u32, scale: u32) -> (f64, f64) {
    let integer_digits = precision as i32 - scale as i32;
    let max = 10f64.powi(integer_digits) - 10f64.powi(-(scale as i32));
    (-max, max)
}

fn parse_length(data_type: &str) -> u32 {
    LENGTH
        .captures(data_type)
        .and_then(|captures| captures.get(1)?.as_str().parse::<u32>().ok())
        .unwrap_or(DEFAULT_STRING_LENGTH)
        .min(MAX_STRING_LENGTH)
}
