//! Schema change planner implementation

use std::collections::HashSet;

use dvsync_core::{normalize_name, AttributeMetadata, EntityMetadata, NativeFieldMap};

use crate::alignment::{
    AlignmentAnalysis, ColumnStatus, KeyKind, KeyStatus, RelationshipStatus, TableAlignmentResult,
};

use super::plan::{
    AlternateKeyAddition, AlternateKeyRemoval, AttributeAddition, AttributeRemoval,
    DeferredAlternateKey, MissingEntity, NativeReplacement, RelationshipAddition,
    RelationshipRemoval, SchemaChangePlan,
};

/// Reason recorded on every planned attribute removal
pub const ATTRIBUTE_REMOVAL_REASON: &str = "Custom attribute is not present in the SQL schema.";

/// Configuration for change planning
#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    /// Plan unique keys whose columns are only queued for creation in the
    /// same plan. Off by default: such keys wait for the next run, when the
    /// attributes exist in the entity's metadata.
    pub include_pending_key_members: bool,
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans keys over attributes that this plan itself creates
    pub fn with_pending_key_members(mut self) -> Self {
        self.include_pending_key_members = true;
        self
    }
}

/// Builds a [`SchemaChangePlan`] from an [`AlignmentAnalysis`]
///
/// Planning is pure. Destructive items are always planned; whether they run
/// is decided when the plan is applied.
#[derive(Debug, Clone, Default)]
pub struct SchemaChangePlanner {
    native_fields: NativeFieldMap,
    config: PlannerConfig,
}

impl SchemaChangePlanner {
    pub fn new(native_fields: NativeFieldMap) -> Self {
        Self {
            native_fields,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(native_fields: NativeFieldMap, config: PlannerConfig) -> Self {
        Self {
            native_fields,
            config,
        }
    }

    pub fn plan(&self, analysis: &AlignmentAnalysis) -> SchemaChangePlan {
        let mut plan = SchemaChangePlan::new();

        for result in &analysis.tables {
            self.plan_relationship_additions(analysis, result, &mut plan);

            let Some(entity) = &result.entity else {
                plan.missing_entities.push(MissingEntity {
                    table_name: result.table.name.clone(),
                    entity_name: result.entity_name.clone(),
                });
                continue;
            };

            self.plan_columns(result, &mut plan);
            self.plan_alternate_keys(result, &mut plan);
            self.plan_removals(result, entity, &mut plan);
        }

        tracing::info!(
            additive = plan.additive_count(),
            destructive = plan.destructive_count(),
            native_replacements = plan.native_replacements.len(),
            missing_entities = plan.missing_entities.len(),
            "schema change plan built"
        );

        plan
    }

    fn plan_columns(&self, result: &TableAlignmentResult, plan: &mut SchemaChangePlan) {
        for alignment in &result.columns {
            match alignment.status {
                ColumnStatus::MissingInTarget => plan.attributes_to_add.push(AttributeAddition {
                    table_name: result.table.name.clone(),
                    entity_name: result.entity_name.clone(),
                    column: alignment.column.clone(),
                }),
                ColumnStatus::NativeReplacement => {
                    if let Some(native) = alignment.attribute_name() {
                        plan.native_replacements.push(NativeReplacement {
                            table_name: result.table.name.clone(),
                            entity_name: result.entity_name.clone(),
                            column_name: alignment.column.name.clone(),
                            native_attribute: native.to_string(),
                        });
                    }
                }
                ColumnStatus::Matched => {}
            }
        }
    }

    fn plan_alternate_keys(&self, result: &TableAlignmentResult, plan: &mut SchemaChangePlan) {
        for key in &result.keys {
            if key.kind != KeyKind::Unique || key.status != KeyStatus::MissingInTarget {
                continue;
            }

            let unresolved: Vec<String> = key
                .columns
                .iter()
                .filter(|column| !self.key_member_resolves(result, column))
                .cloned()
                .collect();

            if unresolved.is_empty() {
                plan.alternate_keys_to_add.push(AlternateKeyAddition {
                    table_name: result.table.name.clone(),
                    entity_name: result.entity_name.clone(),
                    key_name: key.name.clone(),
                    columns: key.columns.clone(),
                });
            } else {
                tracing::debug!(
                    entity = %result.entity_name,
                    key = %key.name,
                    unresolved = ?unresolved,
                    "deferring alternate key with unresolved columns"
                );
                plan.deferred_alternate_keys.push(DeferredAlternateKey {
                    table_name: result.table.name.clone(),
                    entity_name: result.entity_name.clone(),
                    key_name: key.name.clone(),
                    unresolved_columns: unresolved,
                });
            }
        }
    }

    /// Whether a unique key column maps to an attribute the key can use
    fn key_member_resolves(&self, result: &TableAlignmentResult, column: &str) -> bool {
        match result.column(column).map(|alignment| alignment.status) {
            Some(ColumnStatus::Matched) | Some(ColumnStatus::NativeReplacement) => true,
            Some(ColumnStatus::MissingInTarget) => self.config.include_pending_key_members,
            None => false,
        }
    }

    fn plan_removals(
        &self,
        result: &TableAlignmentResult,
        entity: &EntityMetadata,
        plan: &mut SchemaChangePlan,
    ) {
        let matched_referencing: HashSet<String> = result
            .foreign_keys
            .iter()
            .filter(|fk| fk.status == RelationshipStatus::Matched)
            .filter_map(|fk| fk.relationship.as_ref())
            .map(|relationship| normalize_name(&relationship.referencing_attribute))
            .collect();

        for attribute in &result.unmatched_attributes {
            if self.is_removable_attribute(attribute, entity, &matched_referencing) {
                plan.attributes_to_remove.push(AttributeRemoval {
                    entity_name: result.entity_name.clone(),
                    attribute: attribute.clone(),
                    reason: ATTRIBUTE_REMOVAL_REASON.to_string(),
                });
            } else {
                tracing::debug!(
                    entity = %result.entity_name,
                    attribute = %attribute.logical_name,
                    "keeping unmatched attribute"
                );
            }
        }

        for key in &result.unmatched_alternate_keys {
            plan.alternate_keys_to_remove.push(AlternateKeyRemoval {
                entity_name: result.entity_name.clone(),
                key: key.clone(),
            });
        }

        for relationship in result
            .unmatched_relationships
            .iter()
            .filter(|relationship| relationship.is_custom)
        {
            plan.relationships_to_remove.push(RelationshipRemoval {
                entity_name: result.entity_name.clone(),
                relationship: relationship.clone(),
            });
        }
    }

    /// Only custom, non-native, non-key, non-lookup attributes are removable
    fn is_removable_attribute(
        &self,
        attribute: &AttributeMetadata,
        entity: &EntityMetadata,
        matched_referencing: &HashSet<String>,
    ) -> bool {
        attribute.is_custom
            && !self.native_fields.is_native_attribute(&attribute.logical_name)
            && !attribute
                .logical_name
                .eq_ignore_ascii_case(&entity.primary_id_attribute)
            && !matched_referencing.contains(&normalize_name(&attribute.logical_name))
            && !attribute.is_lookup()
    }

    fn plan_relationship_additions(
        &self,
        analysis: &AlignmentAnalysis,
        result: &TableAlignmentResult,
        plan: &mut SchemaChangePlan,
    ) {
        for alignment in &result.foreign_keys {
            if alignment.status != RelationshipStatus::MissingInTarget
                || alignment.foreign_key.single_column().is_none()
            {
                continue;
            }

            let referenced_table = &alignment.foreign_key.referenced_table;
            let referenced_entity = analysis
                .table_to_entity
                .get(referenced_table)
                .unwrap_or(referenced_table)
                .to_string();

            plan.relationships_to_add.push(RelationshipAddition {
                table_name: result.table.name.clone(),
                entity_name: result.entity_name.clone(),
                referenced_entity,
                foreign_key: alignment.foreign_key.clone(),
            });
        }
    }
}
