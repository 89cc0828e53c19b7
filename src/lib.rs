//! Remote Memory - conversation history client for HTTP memory services
//!
//! This library stores and retrieves a session's message history against a
//! memory backend whose address is resolved from a mutable memory record and
//! reconciled before every operation.

pub mod cli;
pub mod client;
mod config;
pub mod core;
pub mod error;
pub mod resolver;
pub mod resource;
pub mod telemetry;
pub mod utils;

pub use crate::client::{HttpMemory, HttpMemoryBuilder, OperationContext};
pub use crate::config::{
    LoggingConfig, MemoryConfig, Settings, StoreConfig, DEFAULT_MESSAGES_PATH, DEFAULT_USER_AGENT,
};
pub use crate::core::{AddressSpec, MemoryRecord, Message, Role};
pub use crate::error::{MemoryError, Result};
pub use crate::resolver::{AddressResolver, ResolveError, ValueSourceResolver};
pub use crate::resource::{
    ConfigValueSource, FileSystemResourceStore, InMemoryResourceStore, ResourceError,
    ResourceLocator, ValueKind,
};
pub use crate::telemetry::{EventEmitter, OperationTracker, RecordingEmitter, TracingEventEmitter};

/// Re-exported so callers can build an [`OperationContext`] without a direct dependency.
pub use tokio_util::sync::CancellationToken;

/// Initialize `tracing` output
/// `RUST_LOG` takes precedence over the configured level
pub fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
