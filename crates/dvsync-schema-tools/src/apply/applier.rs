//! Schema applier implementation
//!
//! Items run strictly one after another. A failing item is logged and the
//! batch moves on; earlier successes are never rolled back.

use std::sync::Arc;

use dvsync_core::{
    naming, AlternateKeyDefinition, CancellationToken, EntityMetadata, EntitySnapshots,
    MetadataTransport, NativeFieldMap,
};

use crate::planning::{AlternateKeyAddition, SchemaChangePlan};

use super::log::{ExecutionLog, ExecutionStep, ItemOutcome};
use super::options::{ExecutionOptions, DROP_OPT_IN_INSTRUCTION};
use super::type_mapper::AttributeTypeMapper;

const REASON_NO_ENTITY: &str = "entity metadata is not available";
const REASON_NO_PREFIX: &str = "no customization prefix can be derived from the entity schema name";

/// Applies a [`SchemaChangePlan`] through a [`MetadataTransport`]
pub struct SchemaApplier {
    transport: Arc<dyn MetadataTransport>,
    native_fields: NativeFieldMap,
    type_mapper: AttributeTypeMapper,
}

impl SchemaApplier {
    pub fn new(transport: Arc<dyn MetadataTransport>, native_fields: NativeFieldMap) -> Self {
        Self {
            transport,
            native_fields,
            type_mapper: AttributeTypeMapper::new(),
        }
    }

    /// Apply `plan` against the entities described by `snapshots`
    ///
    /// Additive items always run. Destructive items run only when
    /// `options.drops_permitted` is set. Cancellation is checked before each
    /// item; work already sent to the platform is not undone.
    #[tracing::instrument(
        skip_all,
        fields(changes = plan.change_count(), drops_permitted = options.drops_permitted)
    )]
    pub async fn apply(
        &self,
        plan: &SchemaChangePlan,
        options: &ExecutionOptions,
        snapshots: &EntitySnapshots,
        cancel: &CancellationToken,
    ) -> ExecutionLog {
        let mut log = ExecutionLog::new();

        if !plan.has_changes() {
            tracing::info!("No schema changes to apply.");
            log.no_changes = true;
            return log;
        }

        if let Some(backup) = &options.backup {
            if is_cancelled(cancel, &mut log) {
                return log;
            }
            match self
                .transport
                .export_backup(&backup.package_name, &backup.directory)
                .await
            {
                Ok(path) => {
                    log.record(
                        ExecutionStep::Backup,
                        None,
                        &backup.package_name,
                        ItemOutcome::Applied,
                        format!("Exported backup to {}", path.display()),
                    );
                    log.backup_path = Some(path);
                }
                Err(e) => {
                    log.record(
                        ExecutionStep::Backup,
                        None,
                        &backup.package_name,
                        ItemOutcome::Failed {
                            error: e.to_string(),
                        },
                        "Backup export failed",
                    );
                    if options.abort_on_backup_failure {
                        log.aborted = true;
                        return log;
                    }
                }
            }
        }

        if !self.create_attributes(plan, snapshots, cancel, &mut log).await {
            return log;
        }
        if !self.create_alternate_keys(plan, snapshots, cancel, &mut log).await {
            return log;
        }

        for replacement in &plan.native_replacements {
            log.record(
                ExecutionStep::NativeReplacement,
                Some(&replacement.entity_name),
                &replacement.column_name,
                ItemOutcome::Advisory,
                format!(
                    "Column '{}' is served by native attribute '{}'; point the data layer at it",
                    replacement.column_name, replacement.native_attribute
                ),
            );
        }

        for relationship in &plan.relationships_to_add {
            log.record(
                ExecutionStep::Relationship,
                Some(&relationship.entity_name),
                &relationship.foreign_key.name,
                ItemOutcome::Advisory,
                format!(
                    "Lookup from '{}' to '{}' requires manual creation",
                    relationship.foreign_key.columns.join(", "),
                    relationship.referenced_entity
                ),
            );
        }

        if plan.has_destructive_changes() {
            if options.drops_permitted {
                self.remove_items(plan, cancel, &mut log).await;
            } else {
                record_gated_drops(plan, &mut log);
            }
        }

        tracing::info!(
            applied = log.applied_count(),
            failed = log.failed_count(),
            skipped = log.skipped_count(),
            "apply finished"
        );
        log
    }

    /// Returns false when the run was cancelled
    async fn create_attributes(
        &self,
        plan: &SchemaChangePlan,
        snapshots: &EntitySnapshots,
        cancel: &CancellationToken,
        log: &mut ExecutionLog,
    ) -> bool {
        for item in &plan.attributes_to_add {
            if is_cancelled(cancel, log) {
                return false;
            }

            let Some((entity, prefix)) =
                resolve_entity(snapshots, &item.entity_name, &item.column.name, ExecutionStep::CreateAttribute, log)
            else {
                continue;
            };

            let definition = match self.type_mapper.definition(&item.column, prefix) {
                Ok(definition) => definition,
                Err(e) => {
                    log.record(
                        ExecutionStep::CreateAttribute,
                        Some(&item.entity_name),
                        &item.column.name,
                        ItemOutcome::Skipped {
                            reason: e.to_string(),
                        },
                        "Attribute not created",
                    );
                    continue;
                }
            };

            match self
                .transport
                .create_attribute(&entity.logical_name, &definition)
                .await
            {
                Ok(()) => log.record(
                    ExecutionStep::CreateAttribute,
                    Some(&item.entity_name),
                    &item.column.name,
                    ItemOutcome::Applied,
                    format!(
                        "Created {} attribute '{}'",
                        definition.kind.type_name(),
                        definition.logical_name
                    ),
                ),
                Err(e) => log.record(
                    ExecutionStep::CreateAttribute,
                    Some(&item.entity_name),
                    &item.column.name,
                    ItemOutcome::Failed {
                        error: e.to_string(),
                    },
                    format!("Failed to create attribute '{}'", definition.logical_name),
                ),
            }
        }
        true
    }

    /// Returns false when the run was cancelled
    async fn create_alternate_keys(
        &self,
        plan: &SchemaChangePlan,
        snapshots: &EntitySnapshots,
        cancel: &CancellationToken,
        log: &mut ExecutionLog,
    ) -> bool {
        for item in &plan.alternate_keys_to_add {
            if is_cancelled(cancel, log) {
                return false;
            }

            let Some((entity, prefix)) =
                resolve_entity(snapshots, &item.entity_name, &item.key_name, ExecutionStep::CreateAlternateKey, log)
            else {
                continue;
            };

            let mut key_attributes = Vec::with_capacity(item.columns.len());
            let mut unresolved = Vec::new();
            for column in &item.columns {
                match self.resolve_key_member(plan, item, entity, prefix, column) {
                    Some(attribute) => key_attributes.push(attribute),
                    None => unresolved.push(column.as_str()),
                }
            }

            if !unresolved.is_empty() {
                log.record(
                    ExecutionStep::CreateAlternateKey,
                    Some(&item.entity_name),
                    &item.key_name,
                    ItemOutcome::Skipped {
                        reason: format!("unresolved columns: {}", unresolved.join(", ")),
                    },
                    "Alternate key not created",
                );
                continue;
            }

            let definition = AlternateKeyDefinition {
                logical_name: naming::key_logical_name(prefix, &item.key_name),
                display_name: item.key_name.clone(),
                key_attributes,
            };

            match self
                .transport
                .create_alternate_key(&entity.logical_name, &definition)
                .await
            {
                Ok(()) => log.record(
                    ExecutionStep::CreateAlternateKey,
                    Some(&item.entity_name),
                    &item.key_name,
                    ItemOutcome::Applied,
                    format!(
                        "Created alternate key '{}' on ({})",
                        definition.logical_name,
                        definition.key_attributes.join(", ")
                    ),
                ),
                Err(e) => log.record(
                    ExecutionStep::CreateAlternateKey,
                    Some(&item.entity_name),
                    &item.key_name,
                    ItemOutcome::Failed {
                        error: e.to_string(),
                    },
                    format!("Failed to create alternate key '{}'", definition.logical_name),
                ),
            }
        }
        true
    }

    /// Current metadata first, then a native substitution present on the
    /// entity, then the name an attribute queued in this plan receives
    fn resolve_key_member(
        &self,
        plan: &SchemaChangePlan,
        item: &AlternateKeyAddition,
        entity: &EntityMetadata,
        prefix: &str,
        column: &str,
    ) -> Option<String> {
        let generated = naming::attribute_logical_name(prefix, column);

        if let Some(attribute) = entity
            .find_attribute(column)
            .or_else(|| entity.attribute(&generated))
        {
            return Some(attribute.logical_name.clone());
        }

        // A native substitute only counts when the entity carries it
        if let Some(native) = self.native_fields.substitute(column) {
            if let Some(attribute) = entity.attribute(native) {
                return Some(attribute.logical_name.clone());
            }
            if plan.native_replacements.iter().any(|replacement| {
                replacement.entity_name.eq_ignore_ascii_case(&item.entity_name)
                    && replacement.column_name.eq_ignore_ascii_case(column)
            }) {
                return Some(native.to_string());
            }
        }

        plan.attributes_to_add
            .iter()
            .any(|queued| {
                queued.entity_name.eq_ignore_ascii_case(&item.entity_name)
                    && queued.column.name.eq_ignore_ascii_case(column)
            })
            .then_some(generated)
    }

    async fn remove_items(
        &self,
        plan: &SchemaChangePlan,
        cancel: &CancellationToken,
        log: &mut ExecutionLog,
    ) {
        for item in &plan.attributes_to_remove {
            if is_cancelled(cancel, log) {
                return;
            }
            let name = &item.attribute.logical_name;
            let result = self
                .transport
                .delete_attribute(&item.entity_name, name)
                .await;
            record_removal(log, ExecutionStep::DeleteAttribute, &item.entity_name, name, result);
        }

        for item in &plan.relationships_to_remove {
            if is_cancelled(cancel, log) {
                return;
            }
            let name = &item.relationship.schema_name;
            let result = self.transport.delete_relationship(name).await;
            record_removal(log, ExecutionStep::DeleteRelationship, &item.entity_name, name, result);
        }

        for item in &plan.alternate_keys_to_remove {
            if is_cancelled(cancel, log) {
                return;
            }
            let name = &item.key.logical_name;
            let result = self
                .transport
                .delete_alternate_key(&item.entity_name, name)
                .await;
            record_removal(log, ExecutionStep::DeleteAlternateKey, &item.entity_name, name, result);
        }
    }
}

fn is_cancelled(cancel: &CancellationToken, log: &mut ExecutionLog) -> bool {
    if !cancel.is_cancelled() {
        return false;
    }
    if !log.cancelled {
        tracing::warn!("apply cancelled; remaining items were not started");
        log.cancelled = true;
    }
    true
}

/// Entity snapshot and prefix for an item, or a skip entry when either is missing
fn resolve_entity<'s>(
    snapshots: &'s EntitySnapshots,
    entity_name: &str,
    item: &str,
    step: ExecutionStep,
    log: &mut ExecutionLog,
) -> Option<(&'s EntityMetadata, &'s str)> {
    let Some(entity) = snapshots.get(entity_name) else {
        log.record(
            step,
            Some(entity_name),
            item,
            ItemOutcome::Skipped {
                reason: REASON_NO_ENTITY.to_string(),
            },
            "Item not applied",
        );
        return None;
    };

    let Some(prefix) = entity.customization_prefix() else {
        log.record(
            step,
            Some(entity_name),
            item,
            ItemOutcome::Skipped {
                reason: REASON_NO_PREFIX.to_string(),
            },
            "Item not applied",
        );
        return None;
    };

    Some((entity, prefix))
}

fn record_removal(
    log: &mut ExecutionLog,
    step: ExecutionStep,
    entity: &str,
    name: &str,
    result: dvsync_core::Result<()>,
) {
    match result {
        Ok(()) => log.record(
            step,
            Some(entity),
            name,
            ItemOutcome::Applied,
            format!("Removed '{}'", name),
        ),
        Err(e) => log.record(
            step,
            Some(entity),
            name,
            ItemOutcome::Failed {
                error: e.to_string(),
            },
            format!("Failed to remove '{}'", name),
        ),
    }
}

fn record_gated_drops(plan: &SchemaChangePlan, log: &mut ExecutionLog) {
    for item in &plan.attributes_to_remove {
        log.record(
            ExecutionStep::DeleteAttribute,
            Some(&item.entity_name),
            &item.attribute.logical_name,
            ItemOutcome::Gated,
            "Removal withheld",
        );
    }
    for item in &plan.relationships_to_remove {
        log.record(
            ExecutionStep::DeleteRelationship,
            Some(&item.entity_name),
            &item.relationship.schema_name,
            ItemOutcome::Gated,
            "Removal withheld",
        );
    }
    for item in &plan.alternate_keys_to_remove {
        log.record(
            ExecutionStep::DeleteAlternateKey,
            Some(&item.entity_name),
            &item.key.logical_name,
            ItemOutcome::Gated,
            "Removal withheld",
        );
    }

    log.record(
        ExecutionStep::Drops,
        None,
        "destructive changes",
        ItemOutcome::Gated,
        format!(
            "{} destructive change(s) planned but not applied. {}",
            plan.destructive_count(),
            DROP_OPT_IN_INSTRUCTION
        ),
    );
}
