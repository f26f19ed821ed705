//! Tests for report rendering

use super::*;
use crate::{AlignmentAnalysis, AlignmentAnalyzer, ExecutionLog, SchemaChangePlan, SchemaChangePlanner};
use chrono::TimeZone;
use dvsync_core::{
    AttributeMetadata, EntityMetadata, EntitySnapshots, MetadataRetrieval, NameMap,
    NativeFieldMap, SqlColumn, SqlPrimaryKey, SqlSchema, SqlTable,
};

fn fixed_time() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

fn schema() -> SqlSchema {
    SqlSchema::new(vec![
        SqlTable::new("Customer")
            .with_column(SqlColumn::new("id", "int", false))
            .with_column(SqlColumn::new("code", "varchar(20)", true))
            .with_primary_key(SqlPrimaryKey::new(vec!["id".into()])),
        SqlTable::new("Invoice").with_column(SqlColumn::new("id", "int", false)),
    ])
}

fn snapshots() -> EntitySnapshots {
    EntitySnapshots::new().with_entity(
        EntityMetadata::new("cr123_customer", "id")
            .with_schema_name("cr123_Customer")
            .with_attribute(AttributeMetadata::new("id", "UniqueidentifierType"))
            .with_attribute(AttributeMetadata::new("cr123_legacy", "StringType").custom()),
    )
}

fn analysis() -> AlignmentAnalysis {
    AlignmentAnalyzer::new(NativeFieldMap::empty()).analyze_at(
        &schema(),
        &snapshots(),
        &NameMap::new()
            .with_entry("Customer", "cr123_customer")
            .with_entry("Invoice", "cr123_invoice"),
        fixed_time(),
    )
}

mod markdown_tests {
    use super::*;

    #[test]
    fn test_header_and_tables() {
        let analysis = analysis();
        let retrieval = MetadataRetrieval::available(
            Some("https://contoso.crm.dynamics.com".into()),
            snapshots(),
            vec!["Entity 'cr123_invoice' was not found.".into()],
        );
        let native = NativeFieldMap::empty().with_entry("CreatedAt", "createdon");

        let report = AlignmentReport::new(&analysis, &retrieval, &native)
            .with_source("schema.sql")
            .render();

        assert!(report.starts_with("# Schema Alignment Report\n\nGenerated: 2024-03-01 08:00:00 UTC\n"));
        assert!(report.contains("Source schema: `2` tables parsed from schema.sql\n"));
        assert!(report.contains("Endpoint: https://contoso.crm.dynamics.com\n"));
        assert!(report.contains("Connection: available\n"));
        assert!(report.contains("## Connection Warnings\n\n- Entity 'cr123_invoice' was not found.\n"));
        assert!(report.contains("- `CreatedAt` → `createdon`\n"));
        assert!(report.contains("## Table `Customer`"));
        assert!(report.contains(
            "| `code` | `varchar(20)` | Yes | Missing | `` | `` | No matching attribute found. |"
        ));
        assert!(report.contains("### Unmatched Attributes\n\n- `cr123_legacy` (StringType)\n"));
        assert!(report.contains("- Entity status: missing\n"));
        assert!(!report.contains("## Change Plan"));
    }

    #[test]
    fn test_unavailable_connection() {
        let analysis = analysis();
        let retrieval = MetadataRetrieval::unavailable(None, "DV_ORG_URL is not set");

        let report = AlignmentReport::new(&analysis, &retrieval, &NativeFieldMap::empty()).render();

        assert!(report.contains("Endpoint: (not configured)\n"));
        assert!(report.contains("Connection: not available\n"));
        assert!(report.contains("- DV_ORG_URL is not set\n"));
        assert!(!report.contains("## Native Field Replacement Map"));
    }

    #[test]
    fn test_plan_and_log_sections() {
        let analysis = analysis();
        let retrieval = MetadataRetrieval::available(None, snapshots(), Vec::new());
        let native = NativeFieldMap::empty();
        let plan = SchemaChangePlanner::new(native.clone()).plan(&analysis);
        let log = ExecutionLog {
            no_changes: true,
            ..ExecutionLog::default()
        };

        let report = AlignmentReport::new(&analysis, &retrieval, &native)
            .with_plan(&plan)
            .with_execution_log(&log)
            .render();

        assert!(report.contains("| Attributes to add | 1 |"));
        assert!(report.contains("| Attributes to remove | 1 |"));
        assert!(report.contains("### Missing Entities\n\n- `cr123_invoice` (table `Invoice`)\n"));
        assert!(report.contains("## Execution Log\n\nOutcome: NoChanges\n"));
    }

    #[test]
    fn test_empty_plan_message() {
        let analysis = analysis();
        let retrieval = MetadataRetrieval::available(None, snapshots(), Vec::new());
        let native = NativeFieldMap::empty();
        let plan = SchemaChangePlan::new();

        let report = AlignmentReport::new(&analysis, &retrieval, &native)
            .with_plan(&plan)
            .render();

        assert!(report.contains("No schema changes are required."));
    }
}

mod delete_candidates_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_candidates_from_plan() {
        let plan = SchemaChangePlanner::new(NativeFieldMap::empty()).plan(&analysis());

        let candidates = DeleteCandidates::from_plan(&plan, fixed_time());

        assert!(!candidates.is_empty());
        assert_eq!(candidates.attributes.len(), 1);
        assert_eq!(candidates.attributes[0].entity, "cr123_customer");
        assert_eq!(candidates.attributes[0].logical_name, "cr123_legacy");
        assert_eq!(
            candidates.attributes[0].reason,
            "Custom attribute is not present in the SQL schema."
        );
        assert_eq!(candidates.missing_entities.len(), 1);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let plan = SchemaChangePlanner::new(NativeFieldMap::empty()).plan(&analysis());
        let candidates = DeleteCandidates::from_plan(&plan, fixed_time());

        let json: serde_json::Value = serde_json::from_str(&candidates.to_json().unwrap()).unwrap();

        assert_eq!(json["generatedAt"], "2024-03-01T08:00:00Z");
        assert_eq!(json["attributes"][0]["logicalName"], "cr123_legacy");
        assert_eq!(json["attributes"][0]["attributeType"], "StringType");
        assert_eq!(json["missingEntities"][0]["entity_name"], "cr123_invoice");
    }

    #[test]
    fn test_write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("delete-candidates.json");
        let plan = SchemaChangePlanner::new(NativeFieldMap::empty()).plan(&analysis());

        DeleteCandidates::from_plan(&plan, fixed_time())
            .write_to(&path)
            .unwrap();

        let written: DeleteCandidates =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.attributes.len(), 1);
    }
}
