//! In-Memory Resource Store
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and embedding without a real configuration store

use super::{check_version, ConfigValueSource, ResourceError, ResourceLocator, ValueKind};
use crate::core::MemoryRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type RecordKey = (String, String);
type ValueKey = (ValueKind, String, String);

/// In-memory store for records and config values
/// Data is lost when process terminates
#[derive(Clone, Default)]
pub struct InMemoryResourceStore {
    records: Arc<RwLock<HashMap<RecordKey, MemoryRecord>>>,
    values: Arc<RwLock<HashMap<ValueKey, HashMap<String, String>>>>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a record. Returns the stored copy with its new version.
    pub async fn put(&self, mut record: MemoryRecord) -> MemoryRecord {
        let key = (
            record.metadata.namespace.clone(),
            record.metadata.name.clone(),
        );
        let mut records = self.records.write().await;
        let version = records
            .get(&key)
            .map(|existing| existing.metadata.resource_version)
            .unwrap_or(0);
        record.metadata.resource_version = version + 1;
        records.insert(key, record.clone());
        tracing::debug!(
            "[InMemoryResourceStore] Stored memory '{}' at version {}",
            record.target(),
            record.metadata.resource_version
        );
        record
    }

    pub async fn delete(&self, name: &str, namespace: &str) {
        let mut records = self.records.write().await;
        records.remove(&(namespace.to_string(), name.to_string()));
        tracing::debug!("[InMemoryResourceStore] Deleted memory '{}/{}'", namespace, name);
    }

    pub async fn set_value(
        &self,
        kind: ValueKind,
        namespace: &str,
        name: &str,
        key: &str,
        value: impl Into<String>,
    ) {
        let mut values = self.values.write().await;
        values
            .entry((kind, namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.into());
    }
}

#[async_trait]
impl ResourceLocator for InMemoryResourceStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<MemoryRecord, ResourceError> {
        let records = self.records.read().await;
        records
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })
    }

    async fn update_status(&self, record: &MemoryRecord) -> Result<(), ResourceError> {
        let mut records = self.records.write().await;
        let key = (
            record.metadata.namespace.clone(),
            record.metadata.name.clone(),
        );
        let stored = records.get_mut(&key).ok_or_else(|| ResourceError::NotFound {
            name: record.metadata.name.clone(),
            namespace: record.metadata.namespace.clone(),
        })?;

        check_version(stored, record)?;
        stored.status = record.status.clone();
        stored.metadata.resource_version += 1;

        tracing::debug!(
            "[InMemoryResourceStore] Updated status of '{}' to version {}",
            record.target(),
            stored.metadata.resource_version
        );
        Ok(())
    }
}

#[async_trait]
impl ConfigValueSource for InMemoryResourceStore {
    async fn config_value(
        &self,
        kind: ValueKind,
        name: &str,
        key: &str,
        namespace: &str,
    ) -> Result<Option<String>, ResourceError> {
        let values = self.values.read().await;
        Ok(values
            .get(&(kind, namespace.to_string(), name.to_string()))
            .and_then(|entries| entries.get(key))
            .cloned())
    }
}
