//! Common test utilities for schema tools integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dvsync_core::{
    AlternateKeyDefinition, AlternateKeyMetadata, AttributeDefinition, AttributeMetadata,
    CancellationToken, EntityMetadata, EntitySnapshots, MetadataRetrieval, MetadataTransport,
    RequiredLevel, Result, SyncError,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One call received by the mock platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateAttribute { entity: String, logical_name: String },
    CreateAlternateKey { entity: String, logical_name: String, attributes: Vec<String> },
    DeleteAttribute { entity: String, logical_name: String },
    DeleteAlternateKey { entity: String, logical_name: String },
    DeleteRelationship { schema_name: String },
    ExportBackup { package_name: String },
}

impl TransportCall {
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            TransportCall::DeleteAttribute { .. }
                | TransportCall::DeleteAlternateKey { .. }
                | TransportCall::DeleteRelationship { .. }
        )
    }
}

/// In-memory platform that applies mutations to its own snapshots
pub struct MockPlatform {
    state: Mutex<EntitySnapshots>,
    calls: Mutex<Vec<TransportCall>>,
    failing: Mutex<HashSet<String>>,
    backup_fails: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MockPlatform {
    pub fn new(entities: Vec<EntityMetadata>) -> Self {
        Self {
            state: Mutex::new(entities.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            backup_fails: false,
            cancel_after: None,
        }
    }

    /// Make every mutation naming `name` fail
    pub fn fail_on(self, name: &str) -> Self {
        self.failing.lock().insert(name.to_lowercase());
        self
    }

    pub fn with_backup_failure(mut self) -> Self {
        self.backup_fails = true;
        self
    }

    /// Cancel `token` once `count` mutations have been received
    pub fn cancel_after(mut self, count: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((count, token));
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn delete_calls(&self) -> usize {
        self.calls.lock().iter().filter(|call| call.is_delete()).count()
    }

    pub fn snapshots(&self) -> EntitySnapshots {
        self.state.lock().clone()
    }

    fn record(&self, call: TransportCall, name: &str) -> Result<()> {
        let received = {
            let mut calls = self.calls.lock();
            calls.push(call);
            calls.len()
        };
        if let Some((count, token)) = &self.cancel_after
            && received >= *count
        {
            token.cancel();
        }
        if self.failing.lock().contains(&name.to_lowercase()) {
            Err(SyncError::Transport(format!("simulated failure for '{}'", name)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataTransport for MockPlatform {
    fn endpoint(&self) -> Option<String> {
        Some("https://mock.crm.dynamics.com".to_string())
    }

    async fn retrieve_entities(
        &self,
        logical_names: &[String],
        cancel: &CancellationToken,
    ) -> MetadataRetrieval {
        let state = self.state.lock().clone();
        let mut entities = EntitySnapshots::new();
        let mut errors = Vec::new();

        for name in logical_names {
            if cancel.is_cancelled() {
                break;
            }
            match state.get(name) {
                Some(entity) => entities.insert(entity.clone()),
                None => errors.push(format!("Entity '{}' was not found.", name)),
            }
        }

        MetadataRetrieval::available(self.endpoint(), entities, errors)
    }

    async fn create_attribute(&self, entity: &str, attribute: &AttributeDefinition) -> Result<()> {
        self.record(
            TransportCall::CreateAttribute {
                entity: entity.to_string(),
                logical_name: attribute.logical_name.clone(),
            },
            &attribute.logical_name,
        )?;

        let mut metadata = AttributeMetadata::new(&attribute.logical_name, attribute.kind.type_name())
            .custom()
            .with_schema_name(&attribute.schema_name)
            .with_display_name(&attribute.display_name);
        metadata.nullable = attribute.required_level == RequiredLevel::None;

        if let Some(target) = self.state.lock().get_mut(entity) {
            target.insert_attribute(metadata);
        }
        Ok(())
    }

    async fn create_alternate_key(&self, entity: &str, key: &AlternateKeyDefinition) -> Result<()> {
        self.record(
            TransportCall::CreateAlternateKey {
                entity: entity.to_string(),
                logical_name: key.logical_name.clone(),
                attributes: key.key_attributes.clone(),
            },
            &key.logical_name,
        )?;

        if let Some(target) = self.state.lock().get_mut(entity) {
            target.alternate_keys.push(AlternateKeyMetadata::new(
                &key.logical_name,
                key.key_attributes.clone(),
            ));
        }
        Ok(())
    }

    async fn delete_attribute(&self, entity: &str, attribute: &str) -> Result<()> {
        self.record(
            TransportCall::DeleteAttribute {
                entity: entity.to_string(),
                logical_name: attribute.to_string(),
            },
            attribute,
        )?;

        if let Some(target) = self.state.lock().get_mut(entity) {
            target.remove_attribute(attribute);
        }
        Ok(())
    }

    async fn delete_alternate_key(&self, entity: &str, key: &str) -> Result<()> {
        self.record(
            TransportCall::DeleteAlternateKey {
                entity: entity.to_string(),
                logical_name: key.to_string(),
            },
            key,
        )?;

        if let Some(target) = self.state.lock().get_mut(entity) {
            target
                .alternate_keys
                .retain(|existing| !existing.logical_name.eq_ignore_ascii_case(key));
        }
        Ok(())
    }

    async fn delete_relationship(&self, schema_name: &str) -> Result<()> {
        self.record(
            TransportCall::DeleteRelationship {
                schema_name: schema_name.to_string(),
            },
            schema_name,
        )?;

        let mut state = self.state.lock();
        let names: Vec<String> = state.iter().map(|e| e.logical_name.clone()).collect();
        for name in names {
            if let Some(entity) = state.get_mut(&name) {
                entity
                    .relationships
                    .retain(|r| !r.schema_name.eq_ignore_ascii_case(schema_name));
            }
        }
        Ok(())
    }

    async fn export_backup(&self, package_name: &str, destination: &Path) -> Result<PathBuf> {
        self.calls.lock().push(TransportCall::ExportBackup {
            package_name: package_name.to_string(),
        });
        if self.backup_fails {
            return Err(SyncError::Transport("export rejected".to_string()));
        }
        Ok(destination.join(format!("{}_20240101_000000.zip", package_name)))
    }
}
