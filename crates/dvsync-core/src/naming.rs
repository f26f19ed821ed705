//! Deterministic naming rules for generated attributes and keys
//!
//! New target attributes and keys are named from the reference column or key
//! name plus the owning entity's customization prefix. The same inputs always
//! produce the same names, which lets the analyzer recognize attributes that
//! an earlier run created.

/// Maximum length of the sanitized part of a generated logical name
pub const MAX_SANITIZED_LENGTH: usize = 40;

const FALLBACK_LOGICAL: &str = "customfield";
const FALLBACK_SCHEMA: &str = "CustomField";

/// The customization prefix of a schema name: its first non-empty `_`
/// delimited segment
///
/// A schema name without a separator is its own prefix. Returns `None` for a
/// blank name or one made only of separators.
pub fn customization_prefix(schema_name: &str) -> Option<&str> {
    if schema_name.trim().is_empty() {
        return None;
    }
    schema_name.split('_').find(|segment| !segment.is_empty())
}

/// Lowercase `name`, keep only ASCII alphanumerics and cap the length
pub fn sanitize_identifier(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_SANITIZED_LENGTH)
        .collect();

    if sanitized.is_empty() {
        FALLBACK_LOGICAL.to_string()
    } else {
        sanitized
    }
}

/// Convert `order_line-id` style names to `OrderLineId`
///
/// Each segment keeps only its first letter upper case, so `customerID`
/// becomes `Customerid`.
pub fn pascal_case(name: &str) -> String {
    let pascal: String = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();

    if pascal.is_empty() {
        FALLBACK_SCHEMA.to_string()
    } else {
        pascal
    }
}

/// Logical name of an attribute generated for `column`
pub fn attribute_logical_name(prefix: &str, column: &str) -> String {
    format!("{}_{}", prefix.to_lowercase(), sanitize_identifier(column))
}

/// Schema name of an attribute generated for `column`
pub fn attribute_schema_name(prefix: &str, column: &str) -> String {
    format!("{}_{}", prefix, pascal_case(column))
}

/// Logical name of an alternate key generated for the unique key `key_name`
pub fn key_logical_name(prefix: &str, key_name: &str) -> String {
    format!("{}_{}", prefix.to_lowercase(), sanitize_identifier(key_name))
}

#[cfg(test)]
mod tests;
