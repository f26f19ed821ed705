//! Offline transport backed by a snapshot file
//!
//! A snapshot file is a JSON array of `EntityMetadata`. Retrieval is served
//! from it; every mutation is rejected.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dvsync_core::{
    AlternateKeyDefinition, AttributeDefinition, CancellationToken, EntitySnapshots,
    MetadataRetrieval, MetadataTransport, Result, SyncError,
};

pub struct SnapshotFileTransport {
    path: PathBuf,
    snapshots: EntitySnapshots,
}

impl SnapshotFileTransport {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)?;
        let snapshots: EntitySnapshots = serde_json::from_str(&contents)?;
        tracing::info!(path = %path.display(), entities = snapshots.len(), "loaded snapshot file");
        Ok(Self { path, snapshots })
    }

    pub fn from_snapshots(path: impl Into<PathBuf>, snapshots: EntitySnapshots) -> Self {
        Self {
            path: path.into(),
            snapshots,
        }
    }

    pub fn snapshots(&self) -> &EntitySnapshots {
        &self.snapshots
    }

    fn read_only(&self) -> SyncError {
        SyncError::NotSupported(format!(
            "snapshot file '{}' is read-only",
            self.path.display()
        ))
    }
}

/// Write `snapshots` as a JSON array that `SnapshotFileTransport::open` reads back
pub fn write_snapshot_file(path: &Path, snapshots: &EntitySnapshots) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(snapshots)?)?;
    Ok(())
}

#[async_trait]
impl MetadataTransport for SnapshotFileTransport {
    fn endpoint(&self) -> Option<String> {
        Some(format!("file://{}", self.path.display()))
    }

    async fn retrieve_entities(
        &self,
        logical_names: &[String],
        cancel: &CancellationToken,
    ) -> MetadataRetrieval {
        let mut entities = EntitySnapshots::new();
        let mut errors = Vec::new();

        for name in logical_names {
            if cancel.is_cancelled() {
                break;
            }
            match self.snapshots.get(name) {
                Some(entity) => entities.insert(entity.clone()),
                None => errors.push(format!(
                    "Failed to retrieve metadata for '{}': not present in snapshot file",
                    name
                )),
            }
        }

        MetadataRetrieval::available(self.endpoint(), entities, errors)
    }

    async fn create_attribute(&self, _entity: &str, _attribute: &AttributeDefinition) -> Result<()> {
        Err(self.read_only())
    }

    async fn create_alternate_key(&self, _entity: &str, _key: &AlternateKeyDefinition) -> Result<()> {
        Err(self.read_only())
    }

    async fn delete_attribute(&self, _entity: &str, _attribute: &str) -> Result<()> {
        Err(self.read_only())
    }

    async fn delete_alternate_key(&self, _entity: &str, _key: &str) -> Result<()> {
        Err(self.read_only())
    }

    async fn delete_relationship(&self, _schema_name: &str) -> Result<()> {
        Err(self.read_only())
    }

    async fn export_backup(&self, _package_name: &str, _destination: &Path) -> Result<PathBuf> {
        Err(self.read_only())
    }
}
