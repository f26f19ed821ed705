//! Alignment analyzer implementation
//!
//! Matches every reference table against its target entity snapshot. The
//! analyzer never fails: a missing entity, an unmatched column or an
//! unmatched key is recorded as a status in the result.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use dvsync_core::{
    normalize_name, naming, AttributeMetadata, EntityMetadata, EntitySnapshots, NameMap,
    NativeFieldMap, RelationshipMetadata, SqlSchema, SqlTable,
};

use super::result::{
    AlignmentAnalysis, ColumnAlignment, ColumnStatus, ForeignKeyAlignment, KeyAlignment, KeyKind,
    KeyStatus, RelationshipStatus, TableAlignmentResult,
};

/// Key name used for primary keys declared without a constraint name
pub const DEFAULT_PRIMARY_KEY_NAME: &str = "PRIMARY";

const NOTE_ENTITY_UNAVAILABLE: &str = "Target entity not available.";
const NOTE_NO_MATCH: &str = "No matching attribute found.";
const NOTE_COMPOSITE_FOREIGN_KEY: &str = "Composite foreign keys cannot map to a lookup relationship.";

/// Resolve the target entity for every table in `schema`
///
/// Tables without an override map to an entity of the same name. Overrides
/// for tables absent from the schema are dropped.
pub fn table_entity_map(schema: &SqlSchema, overrides: &NameMap) -> NameMap {
    let mut map = NameMap::new();
    for table in &schema.tables {
        let entity = overrides.get(&table.name).unwrap_or(&table.name).to_string();
        map.insert(&table.name, entity);
    }
    map
}

/// Distinct target entity names of `map`, ordered by table name
pub fn target_entities(map: &NameMap) -> Vec<String> {
    let mut seen = HashSet::new();
    map.iter()
        .map(|(_, entity)| entity.to_string())
        .filter(|entity| seen.insert(normalize_name(entity)))
        .collect()
}

/// Compares reference tables with target entity snapshots
#[derive(Debug, Clone, Default)]
pub struct AlignmentAnalyzer {
    native_fields: NativeFieldMap,
}

impl AlignmentAnalyzer {
    /// Creates an analyzer with the given native-field substitutions
    pub fn new(native_fields: NativeFieldMap) -> Self {
        Self { native_fields }
    }

    pub fn native_fields(&self) -> &NativeFieldMap {
        &self.native_fields
    }

    /// Analyze `schema` against `snapshots`, stamped with the current time
    pub fn analyze(
        &self,
        schema: &SqlSchema,
        snapshots: &EntitySnapshots,
        table_to_entity: &NameMap,
    ) -> AlignmentAnalysis {
        self.analyze_at(schema, snapshots, table_to_entity, Utc::now())
    }

    /// Analyze with an explicit generation timestamp
    ///
    /// For fixed inputs the result is identical across calls.
    pub fn analyze_at(
        &self,
        schema: &SqlSchema,
        snapshots: &EntitySnapshots,
        table_to_entity: &NameMap,
        generated_at: DateTime<Utc>,
    ) -> AlignmentAnalysis {
        let mut tables: Vec<&SqlTable> = schema.tables.iter().collect();
        tables.sort_by(|a, b| {
            normalize_name(&a.name)
                .cmp(&normalize_name(&b.name))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut effective_map = table_to_entity.clone();
        let mut results = Vec::with_capacity(tables.len());

        for table in tables {
            let entity_name = table_to_entity
                .get(&table.name)
                .unwrap_or(&table.name)
                .to_string();
            effective_map.insert(&table.name, &entity_name);

            let result = match snapshots.get(&entity_name) {
                Some(entity) => self.align_table(table, entity_name, entity),
                None => Self::unresolved_table(table, entity_name),
            };

            tracing::debug!(
                table = %result.table.name,
                entity = %result.entity_name,
                entity_available = result.entity_available(),
                drift = result.has_drift(),
                "aligned table"
            );
            results.push(result);
        }

        let analysis = AlignmentAnalysis {
            generated_at,
            table_to_entity: effective_map,
            tables: results,
        };

        let summary = analysis.summary();
        tracing::info!(
            tables = summary.tables,
            missing_entities = summary.missing_entities,
            missing_columns = summary.missing_columns,
            unmatched_attributes = summary.unmatched_attributes,
            "alignment analysis complete"
        );

        analysis
    }

    /// Result for a table whose entity was not retrieved
    fn unresolved_table(table: &SqlTable, entity_name: String) -> TableAlignmentResult {
        let columns = table
            .columns
            .iter()
            .map(|column| ColumnAlignment {
                column: column.clone(),
                status: ColumnStatus::MissingInTarget,
                attribute: None,
                note: Some(NOTE_ENTITY_UNAVAILABLE.to_string()),
            })
            .collect();

        let mut keys = Vec::new();
        if let Some(primary_key) = &table.primary_key {
            keys.push(KeyAlignment {
                name: primary_key
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PRIMARY_KEY_NAME.to_string()),
                kind: KeyKind::Primary,
                columns: primary_key.columns.clone(),
                status: KeyStatus::MissingInTarget,
                target_name: None,
            });
        }
        keys.extend(table.unique_keys.iter().map(|unique_key| KeyAlignment {
            name: unique_key.name.clone(),
            kind: KeyKind::Unique,
            columns: unique_key.columns.clone(),
            status: KeyStatus::MissingInTarget,
            target_name: None,
        }));

        let foreign_keys = table
            .foreign_keys
            .iter()
            .map(|foreign_key| ForeignKeyAlignment {
                foreign_key: foreign_key.clone(),
                status: RelationshipStatus::MissingInTarget,
                relationship: None,
                note: Some(NOTE_ENTITY_UNAVAILABLE.to_string()),
            })
            .collect();

        TableAlignmentResult {
            table: table.clone(),
            entity_name,
            entity: None,
            columns,
            keys,
            foreign_keys,
            unmatched_attributes: Vec::new(),
            unmatched_alternate_keys: Vec::new(),
            unmatched_relationships: Vec::new(),
        }
    }

    fn align_table(
        &self,
        table: &SqlTable,
        entity_name: String,
        entity: &EntityMetadata,
    ) -> TableAlignmentResult {
        let mut remaining: Vec<&AttributeMetadata> = entity.attributes().collect();
        let mut columns = Vec::with_capacity(table.columns.len());
        // normalized column name -> normalized attribute logical name
        let mut aligned: HashMap<String, String> = HashMap::new();

        for column in &table.columns {
            let (status, attribute, note) = self.match_column(&column.name, entity);

            if let Some(attribute) = attribute {
                remaining.retain(|candidate| {
                    !candidate
                        .logical_name
                        .eq_ignore_ascii_case(&attribute.logical_name)
                });
                aligned.insert(
                    normalize_name(&column.name),
                    normalize_name(&attribute.logical_name),
                );
            }

            columns.push(ColumnAlignment {
                column: column.clone(),
                status,
                attribute: attribute.cloned(),
                note,
            });
        }

        let resolve = |column: &str| -> String {
            let normalized = normalize_name(column);
            aligned.get(&normalized).cloned().unwrap_or(normalized)
        };

        let mut keys = Vec::new();

        if let Some(primary_key) = &table.primary_key {
            let matched = primary_key
                .single_column()
                .is_some_and(|column| column.eq_ignore_ascii_case(&entity.primary_id_attribute));

            keys.push(KeyAlignment {
                name: primary_key
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PRIMARY_KEY_NAME.to_string()),
                kind: KeyKind::Primary,
                columns: primary_key.columns.clone(),
                status: if matched {
                    KeyStatus::Matched
                } else {
                    KeyStatus::MissingInTarget
                },
                target_name: matched.then(|| entity.primary_id_attribute.clone()),
            });
        }

        let key_columns = |attributes: &[String]| -> BTreeSet<String> {
            attributes.iter().map(|a| normalize_name(a)).collect()
        };
        let wanted_keys: Vec<BTreeSet<String>> = table
            .unique_keys
            .iter()
            .map(|unique_key| unique_key.columns.iter().map(|c| resolve(c)).collect())
            .collect();

        // Several reference keys may resolve to the same target key
        for (unique_key, wanted) in table.unique_keys.iter().zip(&wanted_keys) {
            let target_name = entity
                .alternate_keys
                .iter()
                .find(|key| key_columns(key.key_attributes.as_slice()) == *wanted)
                .map(|key| key.logical_name.clone());

            keys.push(KeyAlignment {
                name: unique_key.name.clone(),
                kind: KeyKind::Unique,
                columns: unique_key.columns.clone(),
                status: if target_name.is_some() {
                    KeyStatus::Matched
                } else {
                    KeyStatus::MissingInTarget
                },
                target_name,
            });
        }

        let mut unmatched_alternate_keys = Vec::new();
        for key in &entity.alternate_keys {
            let attributes = key_columns(key.key_attributes.as_slice());
            if wanted_keys.contains(&attributes) {
                continue;
            }
            keys.push(KeyAlignment {
                name: key.logical_name.clone(),
                kind: KeyKind::Alternate,
                columns: key.key_attributes.clone(),
                status: KeyStatus::AdditionalInTarget,
                target_name: Some(key.logical_name.clone()),
            });
            unmatched_alternate_keys.push(key.clone());
        }

        // (raw column, resolved attribute) per single-column foreign key
        let referencing_columns: Vec<(&str, String)> = table
            .foreign_keys
            .iter()
            .filter_map(|foreign_key| foreign_key.single_column())
            .map(|column| (column, resolve(column)))
            .collect();
        let references = |relationship: &RelationshipMetadata, column: &str, resolved: &str| {
            relationship
                .referencing_attribute
                .eq_ignore_ascii_case(resolved)
                || relationship.referencing_attribute.eq_ignore_ascii_case(column)
        };

        let mut foreign_keys = Vec::with_capacity(table.foreign_keys.len());
        for foreign_key in &table.foreign_keys {
            let Some(column) = foreign_key.single_column() else {
                foreign_keys.push(ForeignKeyAlignment {
                    foreign_key: foreign_key.clone(),
                    status: RelationshipStatus::MissingInTarget,
                    relationship: None,
                    note: Some(NOTE_COMPOSITE_FOREIGN_KEY.to_string()),
                });
                continue;
            };

            let referencing = resolve(column);
            let relationship = entity
                .relationships
                .iter()
                .find(|&relationship| references(relationship, column, referencing.as_str()));

            foreign_keys.push(ForeignKeyAlignment {
                foreign_key: foreign_key.clone(),
                status: if relationship.is_some() {
                    RelationshipStatus::Matched
                } else {
                    RelationshipStatus::MissingInTarget
                },
                relationship: relationship.cloned(),
                note: relationship
                    .is_none()
                    .then(|| format!("No lookup relationship on '{}'.", column)),
            });
        }

        let unmatched_relationships = entity
            .relationships
            .iter()
            .filter(|&relationship| {
                !referencing_columns
                    .iter()
                    .any(|(column, resolved)| references(relationship, *column, resolved.as_str()))
            })
            .cloned()
            .collect();

        TableAlignmentResult {
            table: table.clone(),
            entity_name,
            entity: Some(entity.clone()),
            columns,
            keys,
            foreign_keys,
            unmatched_attributes: remaining.into_iter().cloned().collect(),
            unmatched_alternate_keys,
            unmatched_relationships,
        }
    }

    /// Exact name, then the generated name, then a native substitution
    fn match_column<'a>(
        &self,
        column: &str,
        entity: &'a EntityMetadata,
    ) -> (ColumnStatus, Option<&'a AttributeMetadata>, Option<String>) {
        if let Some(attribute) = entity.attribute(column) {
            return (ColumnStatus::Matched, Some(attribute), None);
        }

        if let Some(prefix) = entity.customization_prefix() {
            let generated = naming::attribute_logical_name(prefix, column);
            if let Some(attribute) = entity.attribute(&generated) {
                return (
                    ColumnStatus::Matched,
                    Some(attribute),
                    Some(format!("Matched generated attribute '{}'.", attribute.logical_name)),
                );
            }
        }

        if let Some(native) = self.native_fields.substitute(column)
            && let Some(attribute) = entity.attribute(native)
        {
            return (
                ColumnStatus::NativeReplacement,
                Some(attribute),
                Some(format!("Use native attribute '{}'.", attribute.logical_name)),
            );
        }

        (ColumnStatus::MissingInTarget, None, Some(NOTE_NO_MATCH.to_string()))
    }
}
