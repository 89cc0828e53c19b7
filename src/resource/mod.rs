//! Memory Resource Access
//!
//! Information Hiding:
//! - Record storage backend hidden behind the locator trait
//! - Allows swapping between memory, filesystem or a cluster API without client changes
//! - Each store owns its own optimistic-concurrency bookkeeping

use crate::core::MemoryRecord;
use async_trait::async_trait;
use thiserror::Error;

pub mod filesystem;
pub mod memory;

pub use filesystem::FileSystemResourceStore;
pub use memory::InMemoryResourceStore;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("memory {namespace}/{name} not found")]
    NotFound { name: String, namespace: String },

    #[error("configuration store unavailable: {0}")]
    BackendUnavailable(String),

    /// The submitted record was read at an older version than the stored one.
    #[error("memory {namespace}/{name} was modified concurrently (have version {submitted}, store has {current})")]
    Conflict {
        name: String,
        namespace: String,
        submitted: u64,
        current: u64,
    },

    /// A name or namespace that cannot be used as a store key.
    #[error("invalid resource name `{value}`: {reason}")]
    InvalidName { value: String, reason: &'static str },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed stored resource: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Kind of named key/value collection an address can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    ConfigMap,
    Secret,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::ConfigMap => "configmap",
            ValueKind::Secret => "secret",
        }
    }
}

/// Read and status-write access to memory records
#[async_trait]
pub trait ResourceLocator: Send + Sync {
    /// Fetch the current record. No caching.
    async fn get(&self, name: &str, namespace: &str) -> Result<MemoryRecord, ResourceError>;

    /// Persist `record.status`. Fails with [`ResourceError::Conflict`] when the
    /// record's `resource_version` is not the stored one.
    async fn update_status(&self, record: &MemoryRecord) -> Result<(), ResourceError>;
}

/// Lookup of values referenced from an address specification
#[async_trait]
pub trait ConfigValueSource: Send + Sync {
    /// Returns `Ok(None)` when the collection or the key does not exist.
    async fn config_value(
        &self,
        kind: ValueKind,
        name: &str,
        key: &str,
        namespace: &str,
    ) -> Result<Option<String>, ResourceError>;
}

fn check_version(stored: &MemoryRecord, submitted: &MemoryRecord) -> Result<(), ResourceError> {
    if stored.metadata.resource_version != submitted.metadata.resource_version {
        return Err(ResourceError::Conflict {
            name: submitted.metadata.name.clone(),
            namespace: submitted.metadata.namespace.clone(),
            submitted: submitted.metadata.resource_version,
            current: stored.metadata.resource_version,
        });
    }
    Ok(())
}
