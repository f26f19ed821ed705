//! Subcommand implementations

pub mod analyze;
pub mod apply;
pub mod snapshot;


use anyhow::{Context, Result};
use dvsync_core::{
    CancellationToken, MetadataRetrieval, MetadataTransport, NameMap, NativeFieldMap, SqlSchema,
    ddl::load_schema,
};
use dvsync_dataverse::ConnectionSettings;
use dvsync_schema_tools::{
    AlignmentAnalysis, AlignmentAnalyzer, SchemaChangePlan, SchemaChangePlanner, table_entity_map,
    target_entities,
};
use std::path::Path;
use std::process::ExitCode;

use crate::args::ConnectionArgs;
use crate::config::FileConfig;

/// Fatal error, or at least one failed remote change
pub const EXIT_FAILURE: u8 = 1;
/// Interrupted before completion
pub const EXIT_CANCELLED: u8 = 130;

/// How a command finished when it did not return an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            RunStatus::Success => ExitCode::SUCCESS,
            RunStatus::Failed => ExitCode::from(EXIT_FAILURE),
            RunStatus::Cancelled => ExitCode::from(EXIT_CANCELLED),
        }
    }
}

/// Connection settings from flags and environment, gaps filled from the config file
pub fn connection_settings(args: &ConnectionArgs, config: &FileConfig) -> ConnectionSettings {
    args.settings().or(config.connection_settings())
}

/// The reference schema and its resolved table to entity map
pub struct Reference {
    pub schema: SqlSchema,
    pub table_map: NameMap,
    pub native_fields: NativeFieldMap,
}

impl Reference {
    pub fn load(schema_path: &Path, map_file: Option<&Path>, config: &FileConfig) -> Result<Self> {
        let schema = load_schema(schema_path).with_context(|| {
            format!("Failed to load SQL schema {}", schema_path.display())
        })?;
        let overrides = config.table_overrides(map_file)?;
        let table_map = table_entity_map(&schema, &overrides);
        tracing::info!(
            path = %schema_path.display(),
            tables = schema.tables.len(),
            "loaded reference schema"
        );

        Ok(Self {
            schema,
            table_map,
            native_fields: config.native_fields(),
        })
    }

    pub fn entity_names(&self) -> Vec<String> {
        target_entities(&self.table_map)
    }
}

/// Everything an analysis run produced
pub struct Alignment {
    pub retrieval: MetadataRetrieval,
    pub analysis: AlignmentAnalysis,
    pub plan: SchemaChangePlan,
}

/// Retrieve target metadata, align the reference schema with it and plan the changes
pub async fn align(
    reference: &Reference,
    transport: &dyn MetadataTransport,
    cancel: &CancellationToken,
) -> Alignment {
    let retrieval = transport
        .retrieve_entities(&reference.entity_names(), cancel)
        .await;
    if let Some(reason) = &retrieval.unavailable_reason {
        tracing::warn!(%reason, "target metadata unavailable");
    }
    for error in &retrieval.errors {
        tracing::warn!("{}", error);
    }

    let analysis = AlignmentAnalyzer::new(reference.native_fields.clone()).analyze(
        &reference.schema,
        &retrieval.entities,
        &reference.table_map,
    );
    let plan = SchemaChangePlanner::new(reference.native_fields.clone()).plan(&analysis);

    Alignment {
        retrieval,
        analysis,
        plan,
    }
}
