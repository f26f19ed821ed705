//! Integration tests for the schema applier

mod common;

use std::sync::Arc;

use common::{MockPlatform, TransportCall};
use dvsync_core::{
    AlternateKeyMetadata, AttributeMetadata, CancellationToken, EntityMetadata, EntitySnapshots,
    NativeFieldMap, RelationshipMetadata, SqlColumn, SqlForeignKey,
};
use dvsync_schema_tools::{
    AlternateKeyAddition, AlternateKeyRemoval, AttributeAddition, AttributeRemoval, BatchOutcome,
    ExecutionOptions, ExecutionStep, ItemOutcome, RelationshipAddition, RelationshipRemoval,
    SchemaApplier, SchemaChangePlan, DROP_OPT_IN_INSTRUCTION,
};

fn customer_entity() -> EntityMetadata {
    EntityMetadata::new("cr123_customer", "cr123_customerid")
        .with_schema_name("cr123_Customer")
        .with_attribute(AttributeMetadata::new("cr123_customerid", "UniqueidentifierType").required())
        .with_attribute(AttributeMetadata::new("cr123_name", "StringType").custom())
        .with_attribute(AttributeMetadata::new("cr123_legacy", "StringType").custom())
        .with_alternate_key(AlternateKeyMetadata::new("cr123_oldkey", vec!["cr123_legacy".into()]))
        .with_relationship(
            RelationshipMetadata::new(
                "cr123_region_customer",
                "cr123_customer",
                "cr123_regionid",
                "cr123_region",
                "cr123_regionid",
            )
            .custom(),
        )
}

fn snapshots() -> EntitySnapshots {
    EntitySnapshots::new().with_entity(customer_entity())
}

fn addition(column: SqlColumn) -> AttributeAddition {
    AttributeAddition {
        table_name: "Customer".into(),
        entity_name: "cr123_customer".into(),
        column,
    }
}

fn destructive_plan() -> SchemaChangePlan {
    let entity = customer_entity();
    let mut plan = SchemaChangePlan::new();
    plan.attributes_to_remove.push(AttributeRemoval {
        entity_name: "cr123_customer".into(),
        attribute: entity.attribute("cr123_legacy").cloned().unwrap(),
        reason: "Custom attribute is not present in the SQL schema.".into(),
    });
    plan.alternate_keys_to_remove.push(AlternateKeyRemoval {
        entity_name: "cr123_customer".into(),
        key: entity.alternate_keys[0].clone(),
    });
    plan.relationships_to_remove.push(RelationshipRemoval {
        entity_name: "cr123_customer".into(),
        relationship: entity.relationships[0].clone(),
    });
    plan
}

fn applier(platform: &Arc<MockPlatform>) -> SchemaApplier {
    SchemaApplier::new(platform.clone(), NativeFieldMap::dataverse_defaults())
}

mod gating_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_drops_withheld_without_opt_in() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = destructive_plan();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("code", "varchar(20)", true)));

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(platform.delete_calls(), 0);
        assert_eq!(log.applied_count(), 1);

        let gated: Vec<_> = log
            .entries
            .iter()
            .filter(|entry| entry.outcome == ItemOutcome::Gated)
            .collect();
        assert_eq!(gated.len(), 4);

        let summary = log.entries_for(ExecutionStep::Drops).next().unwrap();
        assert!(summary.message.starts_with("3 destructive change(s)"));
        assert!(summary.message.contains(DROP_OPT_IN_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_permitted_drops_run_in_order() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));

        let log = applier(&platform)
            .apply(
                &destructive_plan(),
                &ExecutionOptions::new().with_drops_permitted(true),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            platform.calls(),
            vec![
                TransportCall::DeleteAttribute {
                    entity: "cr123_customer".into(),
                    logical_name: "cr123_legacy".into(),
                },
                TransportCall::DeleteRelationship {
                    schema_name: "cr123_region_customer".into(),
                },
                TransportCall::DeleteAlternateKey {
                    entity: "cr123_customer".into(),
                    logical_name: "cr123_oldkey".into(),
                },
            ]
        );
        assert_eq!(log.outcome(), BatchOutcome::Applied);

        let remaining = platform.snapshots();
        let entity = remaining.get("cr123_customer").unwrap();
        assert!(entity.attribute("cr123_legacy").is_none());
        assert!(entity.alternate_keys.is_empty());
        assert!(entity.relationships.is_empty());
    }
}

mod additive_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_no_changes() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));

        let log = applier(&platform)
            .apply(
                &SchemaChangePlan::new(),
                &ExecutionOptions::default().with_backup("Core", "/tmp"),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::NoChanges);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_batch() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]).fail_on("cr123_code"));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("code", "varchar(20)", true)));
        plan.attributes_to_add
            .push(addition(SqlColumn::new("notes", "text", true)));

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.failed_count(), 1);
        assert_eq!(log.applied_count(), 1);
        assert_eq!(log.outcome(), BatchOutcome::PartiallyApplied);
        assert!(
            platform
                .snapshots()
                .get("cr123_customer")
                .unwrap()
                .attribute("cr123_notes")
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_unsupported_type_and_unknown_entity_are_skipped() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("shape", "geometry", true)));
        plan.attributes_to_add.push(AttributeAddition {
            table_name: "Invoice".into(),
            entity_name: "cr123_invoice".into(),
            column: SqlColumn::new("total", "decimal(10,2)", false),
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert!(platform.calls().is_empty());
        assert_eq!(log.skipped_count(), 2);
        assert_eq!(
            log.entries[0].outcome,
            ItemOutcome::Skipped {
                reason: "unsupported SQL type 'geometry' for column 'shape'".into()
            }
        );
        assert_eq!(
            log.entries[1].outcome,
            ItemOutcome::Skipped {
                reason: "entity metadata is not available".into()
            }
        );
    }

    #[tokio::test]
    async fn test_schema_name_without_separator_is_the_prefix() {
        let account = EntityMetadata::new("account", "accountid").with_schema_name("Account");
        let platform = Arc::new(MockPlatform::new(vec![account.clone()]));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add.push(AttributeAddition {
            table_name: "Account".into(),
            entity_name: "account".into(),
            column: SqlColumn::new("code", "varchar(20)", true),
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &EntitySnapshots::new().with_entity(account),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::Applied);
        assert_eq!(
            platform.calls(),
            vec![TransportCall::CreateAttribute {
                entity: "account".into(),
                logical_name: "account_code".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_entity_without_schema_name_is_skipped() {
        let account = EntityMetadata::new("account", "accountid");
        let platform = Arc::new(MockPlatform::new(vec![account.clone()]));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add.push(AttributeAddition {
            table_name: "Account".into(),
            entity_name: "account".into(),
            column: SqlColumn::new("code", "varchar(20)", true),
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &EntitySnapshots::new().with_entity(account),
                &CancellationToken::new(),
            )
            .await;

        assert!(platform.calls().is_empty());
        assert_eq!(
            log.entries[0].outcome,
            ItemOutcome::Skipped {
                reason: "no customization prefix can be derived from the entity schema name".into()
            }
        );
    }

    #[tokio::test]
    async fn test_key_members_resolve_through_queued_and_native_names() {
        let entity =
            customer_entity().with_attribute(AttributeMetadata::new("createdon", "DateTimeType"));
        let platform = Arc::new(MockPlatform::new(vec![entity.clone()]));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("code", "varchar(20)", true)));
        plan.alternate_keys_to_add.push(AlternateKeyAddition {
            table_name: "Customer".into(),
            entity_name: "cr123_customer".into(),
            key_name: "UQ_Customer_Code".into(),
            columns: vec!["code".into(), "CreatedAt".into(), "name".into()],
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &EntitySnapshots::new().with_entity(entity),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::Applied);
        assert!(platform.calls().contains(&TransportCall::CreateAlternateKey {
            entity: "cr123_customer".into(),
            logical_name: "cr123_uqcustomercode".into(),
            attributes: vec![
                "cr123_code".into(),
                "createdon".into(),
                "cr123_name".into()
            ],
        }));
    }

    #[tokio::test]
    async fn test_queued_column_shadows_absent_native_attribute() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("Status", "varchar(20)", true)));
        plan.alternate_keys_to_add.push(AlternateKeyAddition {
            table_name: "Customer".into(),
            entity_name: "cr123_customer".into(),
            key_name: "UQ_Customer_Status".into(),
            columns: vec!["Status".into()],
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::Applied);
        assert!(platform.calls().contains(&TransportCall::CreateAlternateKey {
            entity: "cr123_customer".into(),
            logical_name: "cr123_uqcustomerstatus".into(),
            attributes: vec!["cr123_status".into()],
        }));
    }

    #[tokio::test]
    async fn test_absent_native_attribute_is_unresolved() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = SchemaChangePlan::new();
        plan.alternate_keys_to_add.push(AlternateKeyAddition {
            table_name: "Customer".into(),
            entity_name: "cr123_customer".into(),
            key_name: "UQ_Customer_Created".into(),
            columns: vec!["CreatedAt".into()],
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert!(platform.calls().is_empty());
        assert_eq!(
            log.entries[0].outcome,
            ItemOutcome::Skipped {
                reason: "unresolved columns: CreatedAt".into()
            }
        );
    }

    #[tokio::test]
    async fn test_key_with_unknown_member_is_skipped() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = SchemaChangePlan::new();
        plan.alternate_keys_to_add.push(AlternateKeyAddition {
            table_name: "Customer".into(),
            entity_name: "cr123_customer".into(),
            key_name: "UQ_Customer_Code".into(),
            columns: vec!["code".into()],
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert!(platform.calls().is_empty());
        assert_eq!(
            log.entries[0].outcome,
            ItemOutcome::Skipped {
                reason: "unresolved columns: code".into()
            }
        );
    }

    #[tokio::test]
    async fn test_relationships_are_advisory() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = SchemaChangePlan::new();
        plan.relationships_to_add.push(RelationshipAddition {
            table_name: "Order".into(),
            entity_name: "cr123_order".into(),
            referenced_entity: "cr123_customer".into(),
            foreign_key: SqlForeignKey::new(
                "FK_Order_Customer",
                vec!["customer_id".into()],
                "Customer",
                vec!["id".into()],
            ),
        });

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::default(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert!(platform.calls().is_empty());
        assert_eq!(log.entries[0].outcome, ItemOutcome::Advisory);
        assert!(log.entries[0].message.contains("requires manual creation"));
    }
}

mod backup_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plan() -> SchemaChangePlan {
        let mut plan = SchemaChangePlan::new();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("code", "varchar(20)", true)));
        plan
    }

    #[tokio::test]
    async fn test_backup_runs_first() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));

        let log = applier(&platform)
            .apply(
                &plan(),
                &ExecutionOptions::new().with_backup("CoreSolution", "/tmp/backups"),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(
            platform.calls()[0],
            TransportCall::ExportBackup {
                package_name: "CoreSolution".into()
            }
        );
        assert_eq!(
            log.backup_path,
            Some("/tmp/backups/CoreSolution_20240101_000000.zip".into())
        );
    }

    #[tokio::test]
    async fn test_backup_failure_continues_by_default() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]).with_backup_failure());

        let log = applier(&platform)
            .apply(
                &plan(),
                &ExecutionOptions::new().with_backup("CoreSolution", "/tmp/backups"),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.failed_count(), 1);
        assert_eq!(log.applied_count(), 1);
        assert_eq!(log.outcome(), BatchOutcome::PartiallyApplied);
    }

    #[tokio::test]
    async fn test_backup_failure_can_abort() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]).with_backup_failure());

        let log = applier(&platform)
            .apply(
                &plan(),
                &ExecutionOptions::new()
                    .with_backup("CoreSolution", "/tmp/backups")
                    .abort_on_backup_failure(),
                &snapshots(),
                &CancellationToken::new(),
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::Aborted);
        assert_eq!(platform.calls().len(), 1);
    }
}

mod cancellation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let platform = Arc::new(MockPlatform::new(vec![customer_entity()]));
        let mut plan = destructive_plan();
        plan.attributes_to_add
            .push(addition(SqlColumn::new("code", "varchar(20)", true)));

        let cancel = CancellationToken::new();
        cancel.cancel();

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::new().with_drops_permitted(true),
                &snapshots(),
                &cancel,
            )
            .await;

        assert_eq!(log.outcome(), BatchOutcome::Cancelled);
        assert!(platform.calls().is_empty());
        assert!(log.entries.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mid_batch_keeps_finished_items() {
        let cancel = CancellationToken::new();
        let platform =
            Arc::new(MockPlatform::new(vec![customer_entity()]).cancel_after(1, cancel.clone()));
        let mut plan = destructive_plan();
        for column in ["code", "email", "phone"] {
            plan.attributes_to_add
                .push(addition(SqlColumn::new(column, "varchar(20)", true)));
        }

        let log = applier(&platform)
            .apply(
                &plan,
                &ExecutionOptions::new().with_drops_permitted(true),
                &snapshots(),
                &cancel,
            )
            .await;

        assert_eq!(
            platform.calls(),
            vec![TransportCall::CreateAttribute {
                entity: "cr123_customer".into(),
                logical_name: "cr123_code".into(),
            }]
        );
        assert!(log.cancelled);
        assert_eq!(log.outcome(), BatchOutcome::Cancelled);
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].outcome, ItemOutcome::Applied);
        assert_eq!(platform.delete_calls(), 0);
    }
}
