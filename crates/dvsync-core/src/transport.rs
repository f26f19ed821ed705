//! Remote metadata transport interface

use crate::{AlternateKeyDefinition, AttributeDefinition, MetadataRetrieval, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Binding to a remote metadata platform
///
/// Every mutation is a single remote call that can fail on its own.
/// Retrieval is best-effort: it never returns an error, reporting missing
/// configuration and per-entity failures inside the returned
/// [`MetadataRetrieval`].
#[async_trait]
pub trait MetadataTransport: Send + Sync {
    /// Endpoint this transport talks to, for reports
    fn endpoint(&self) -> Option<String>;

    /// Retrieve snapshots for the given entity logical names
    async fn retrieve_entities(
        &self,
        logical_names: &[String],
        cancel: &CancellationToken,
    ) -> MetadataRetrieval;

    async fn create_attribute(&self, entity: &str, attribute: &AttributeDefinition) -> Result<()>;

    async fn create_alternate_key(&self, entity: &str, key: &AlternateKeyDefinition) -> Result<()>;

    async fn delete_attribute(&self, entity: &str, attribute: &str) -> Result<()>;

    async fn delete_alternate_key(&self, entity: &str, key: &str) -> Result<()>;

    async fn delete_relationship(&self, schema_name: &str) -> Result<()>;

    /// Export a backup package into `destination` and return the written file
    async fn export_backup(&self, package_name: &str, destination: &Path) -> Result<PathBuf>;
}
