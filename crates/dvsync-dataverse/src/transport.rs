//! `MetadataTransport` over the Dataverse Web API

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use dvsync_core::{
    AlternateKeyDefinition, AttributeDefinition, CancellationToken, EntitySnapshots,
    MetadataRetrieval, MetadataTransport, Result, SyncError,
};
use serde_json::json;

use crate::client::{odata_literal, DataverseClient, DataverseError, DataverseResult};
use crate::settings::ConnectionSettings;
use crate::wire::{self, Collection, EntityDto, ExportSolutionResponse, LookupTargetsDto};

/// Live binding to one Dataverse organization
///
/// Construction never fails: missing settings are reported by
/// `retrieve_entities` as an unavailable retrieval and by every mutation as
/// an error.
pub struct DataverseTransport {
    endpoint: Option<String>,
    client: std::result::Result<DataverseClient, String>,
}

impl DataverseTransport {
    pub fn new(settings: ConnectionSettings) -> Self {
        let endpoint = settings.base_url();
        let client = DataverseClient::new(settings).map_err(|e| e.to_string());
        if let Err(reason) = &client {
            tracing::warn!(%reason, "Dataverse transport is not usable");
        }
        Self { endpoint, client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_ok()
    }

    fn client(&self) -> Result<&DataverseClient> {
        self.client
            .as_ref()
            .map_err(|reason| SyncError::Unavailable(reason.clone()))
    }

    async fn retrieve_entity(
        &self,
        client: &DataverseClient,
        logical_name: &str,
    ) -> DataverseResult<dvsync_core::EntityMetadata> {
        let entity: EntityDto = client.get_json(&wire::entity_query(logical_name)).await?;
        let lookups: Collection<LookupTargetsDto> = client
            .get_json(&wire::lookup_targets_query(logical_name))
            .await?;
        Ok(entity.into_metadata(lookups.value))
    }
}

/// Distinct, trimmed, non-empty names in first-seen order
fn distinct_names(logical_names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    logical_names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// `<name>_<yyyyMMdd_HHmmss>.zip` inside `directory`
pub fn backup_file_name(
    directory: &Path,
    package_name: &str,
    at: chrono::DateTime<chrono::Utc>,
) -> PathBuf {
    directory.join(format!("{}_{}.zip", package_name, at.format("%Y%m%d_%H%M%S")))
}

#[async_trait]
impl MetadataTransport for DataverseTransport {
    fn endpoint(&self) -> Option<String> {
        self.endpoint.clone()
    }

    #[tracing::instrument(skip_all, fields(entities = logical_names.len()))]
    async fn retrieve_entities(
        &self,
        logical_names: &[String],
        cancel: &CancellationToken,
    ) -> MetadataRetrieval {
        let names = distinct_names(logical_names);
        if names.is_empty() {
            return MetadataRetrieval::available(self.endpoint(), EntitySnapshots::new(), Vec::new());
        }

        let client = match &self.client {
            Ok(client) => client,
            Err(reason) => return MetadataRetrieval::unavailable(self.endpoint(), reason.clone()),
        };

        let mut entities = EntitySnapshots::new();
        let mut errors = Vec::new();

        for name in &names {
            if cancel.is_cancelled() {
                errors.push("Retrieval cancelled before all entities were read.".to_string());
                break;
            }

            match self.retrieve_entity(client, name).await {
                Ok(entity) => {
                    tracing::debug!(
                        entity = %name,
                        attributes = entity.attribute_count(),
                        "retrieved entity metadata"
                    );
                    entities.insert(entity);
                }
                Err(DataverseError::Authentication(reason)) => {
                    return MetadataRetrieval::unavailable(
                        self.endpoint(),
                        format!("Dataverse authentication failed: {}", reason),
                    );
                }
                Err(e) => {
                    tracing::warn!(entity = %name, error = %e, "entity metadata retrieval failed");
                    errors.push(format!("Failed to retrieve metadata for '{}': {}", name, e));
                }
            }
        }

        tracing::info!(
            retrieved = entities.len(),
            failed = errors.len(),
            "metadata retrieval complete"
        );
        MetadataRetrieval::available(self.endpoint(), entities, errors)
    }

    async fn create_attribute(&self, entity: &str, attribute: &AttributeDefinition) -> Result<()> {
        let path = format!("{}/Attributes", wire::entity_path(entity));
        self.client()?
            .post_json(&path, &wire::attribute_payload(attribute))
            .await?;
        Ok(())
    }

    async fn create_alternate_key(&self, entity: &str, key: &AlternateKeyDefinition) -> Result<()> {
        let path = format!("{}/Keys", wire::entity_path(entity));
        self.client()?
            .post_json(&path, &wire::alternate_key_payload(key))
            .await?;
        Ok(())
    }

    async fn delete_attribute(&self, entity: &str, attribute: &str) -> Result<()> {
        let path = format!(
            "{}/Attributes(LogicalName={})",
            wire::entity_path(entity),
            odata_literal(attribute)
        );
        self.client()?.delete(&path).await?;
        Ok(())
    }

    async fn delete_alternate_key(&self, entity: &str, key: &str) -> Result<()> {
        let path = format!(
            "{}/Keys(LogicalName={})",
            wire::entity_path(entity),
            odata_literal(key)
        );
        self.client()?.delete(&path).await?;
        Ok(())
    }

    async fn delete_relationship(&self, schema_name: &str) -> Result<()> {
        let path = format!("RelationshipDefinitions(SchemaName={})", odata_literal(schema_name));
        self.client()?.delete(&path).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, destination))]
    async fn export_backup(&self, package_name: &str, destination: &Path) -> Result<PathBuf> {
        let body = json!({ "SolutionName": package_name, "Managed": false });
        let response = self.client()?.post_json("ExportSolution", &body).await?;
        let export: ExportSolutionResponse = serde_json::from_value(response)?;

        let bytes = STANDARD
            .decode(export.export_solution_file.as_bytes())
            .map_err(|e| SyncError::Transport(format!("invalid solution file encoding: {}", e)))?;

        tokio::fs::create_dir_all(destination).await?;
        let path = backup_file_name(destination, package_name, chrono::Utc::now());
        tokio::fs::write(&path, bytes).await?;

        tracing::info!(path = %path.display(), "exported solution");
        Ok(path)
    }
}
