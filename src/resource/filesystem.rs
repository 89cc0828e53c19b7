//! File System Resource Store
//!
//! Information Hiding:
//! - File paths and JSON serialization format hidden from users
//! - Directory structure management hidden behind interface
//! - Write serialization within one process hidden behind a lock

use super::{check_version, ConfigValueSource, ResourceError, ResourceLocator, ValueKind};
use crate::core::MemoryRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// File system store - each resource is a JSON file
/// Records live at {root}/{namespace}/memories/{name}.json,
/// config values at {root}/{namespace}/{configmaps|secrets}/{name}.json
pub struct FileSystemResourceStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSystemResourceStore {
    pub async fn new(root: PathBuf) -> Result<Self, ResourceError> {
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str, namespace: &str) -> Result<PathBuf, ResourceError> {
        Ok(self
            .root
            .join(path_segment(namespace)?)
            .join("memories")
            .join(format!("{}.json", path_segment(name)?)))
    }

    fn values_path(
        &self,
        kind: ValueKind,
        name: &str,
        namespace: &str,
    ) -> Result<PathBuf, ResourceError> {
        let dir = match kind {
            ValueKind::ConfigMap => "configmaps",
            ValueKind::Secret => "secrets",
        };
        Ok(self
            .root
            .join(path_segment(namespace)?)
            .join(dir)
            .join(format!("{}.json", path_segment(name)?)))
    }

    /// Create or replace a record, bumping its version past the stored one.
    pub async fn put(&self, mut record: MemoryRecord) -> Result<MemoryRecord, ResourceError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(&record.metadata.name, &record.metadata.namespace)?;

        let version = match read_record(&path).await? {
            Some(existing) => existing.metadata.resource_version,
            None => 0,
        };
        record.metadata.resource_version = version + 1;
        write_json(&path, &record).await?;

        tracing::debug!(
            "[FileSystemResourceStore] Stored memory '{}' to {:?}",
            record.target(),
            path
        );
        Ok(record)
    }

    pub async fn set_value(
        &self,
        kind: ValueKind,
        namespace: &str,
        name: &str,
        key: &str,
        value: impl Into<String>,
    ) -> Result<(), ResourceError> {
        let _guard = self.write_lock.lock().await;
        let path = self.values_path(kind, name, namespace)?;

        let mut entries = read_values(&path).await?.unwrap_or_default();
        entries.insert(key.to_string(), value.into());
        write_json(&path, &entries).await?;

        tracing::debug!(
            "[FileSystemResourceStore] Set {} '{}/{}' key '{}'",
            kind.as_str(),
            namespace,
            name,
            key
        );
        Ok(())
    }
}

/// Names and namespaces become single path components under the root.
fn path_segment(value: &str) -> Result<&str, ResourceError> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(['/', '\\']) {
        "must not contain path separators"
    } else if value.contains("..") {
        "must not contain `..`"
    } else {
        return Ok(value);
    };
    Err(ResourceError::InvalidName {
        value: value.to_string(),
        reason,
    })
}

async fn read_record(path: &Path) -> Result<Option<MemoryRecord>, ResourceError> {
    match fs::read_to_string(path).await {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn read_values(path: &Path) -> Result<Option<HashMap<String, String>>, ResourceError> {
    match fs::read_to_string(path).await {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write through a sibling temp file so readers never see a partial file.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ResourceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ResourceLocator for FileSystemResourceStore {
    async fn get(&self, name: &str, namespace: &str) -> Result<MemoryRecord, ResourceError> {
        let path = self.record_path(name, namespace)?;
        let record = read_record(&path).await?.ok_or_else(|| ResourceError::NotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })?;

        tracing::debug!(
            "[FileSystemResourceStore] Loaded memory '{}/{}' at version {}",
            namespace,
            name,
            record.metadata.resource_version
        );
        Ok(record)
    }

    async fn update_status(&self, record: &MemoryRecord) -> Result<(), ResourceError> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(&record.metadata.name, &record.metadata.namespace)?;

        let mut stored = read_record(&path).await?.ok_or_else(|| ResourceError::NotFound {
            name: record.metadata.name.clone(),
            namespace: record.metadata.namespace.clone(),
        })?;
        check_version(&stored, record)?;

        stored.status = record.status.clone();
        stored.metadata.resource_version += 1;
        write_json(&path, &stored).await?;

        tracing::debug!(
            "[FileSystemResourceStore] Updated status of '{}' to version {}",
            stored.target(),
            stored.metadata.resource_version
        );
        Ok(())
    }
}

#[async_trait]
impl ConfigValueSource for FileSystemResourceStore {
    async fn config_value(
        &self,
        kind: ValueKind,
        name: &str,
        key: &str,
        namespace: &str,
    ) -> Result<Option<String>, ResourceError> {
        let path = self.values_path(kind, name, namespace)?;
        Ok(read_values(&path)
            .await?
            .and_then(|mut entries| entries.remove(key)))
    }
}
