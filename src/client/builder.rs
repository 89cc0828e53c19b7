//! HttpMemory Builder
//!
//! Information Hiding:
//! - Collaborator wiring and Arc wrapping hidden behind a fluent interface
//! - Argument validation happens before any store access

use super::HttpMemory;
use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::resolver::{AddressResolver, ValueSourceResolver};
use crate::resource::{ConfigValueSource, ResourceLocator};
use crate::telemetry::{EventEmitter, TracingEventEmitter};
use crate::Settings;
use std::sync::Arc;
use tokio::sync::RwLock;

const CONSTRUCT: &str = "NewHTTPMemory";

/// Builder for [`HttpMemory`]
///
/// # Example
/// ```no_run
/// use remote_memory::{HttpMemory, InMemoryResourceStore};
/// use std::sync::Arc;
///
/// # async fn run() -> remote_memory::Result<()> {
/// let store = Arc::new(InMemoryResourceStore::new());
/// let memory = HttpMemory::builder()
///     .store(store)
///     .name("chat-memory")
///     .namespace("default")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct HttpMemoryBuilder {
    locator: Option<Arc<dyn ResourceLocator>>,
    resolver: Option<Arc<dyn AddressResolver>>,
    emitter: Option<Arc<dyn EventEmitter>>,
    name: String,
    namespace: String,
    session_id: Option<String>,
    settings: Option<MemoryConfig>,
    http_client: Option<reqwest::Client>,
}

impl HttpMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one store both as the record locator and as the value source of
    /// a [`ValueSourceResolver`].
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: ResourceLocator + ConfigValueSource + 'static,
    {
        self.resolver = Some(Arc::new(ValueSourceResolver::new(store.clone())));
        self.locator = Some(store);
        self
    }

    pub fn locator(mut self, locator: Arc<dyn ResourceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn AddressResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Defaults to the record's uid.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn settings(mut self, settings: MemoryConfig) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Share an existing transport instead of building one from the settings.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the arguments, read the record once and build the client.
    ///
    /// The record must already carry a `lastResolvedAddress`; no resolution
    /// happens here.
    pub async fn build(self) -> Result<HttpMemory> {
        let locator = self
            .locator
            .ok_or_else(|| {
                MemoryError::InvalidArgument("a resource locator is required".into())
            })?;
        if self.name.is_empty() {
            return Err(MemoryError::InvalidArgument("memory name must not be empty".into()));
        }
        if self.namespace.is_empty() {
            return Err(MemoryError::InvalidArgument("namespace must not be empty".into()));
        }

        let target = format!("{}/{}", self.namespace, self.name);
        let record = locator
            .get(&self.name, &self.namespace)
            .await
            .map_err(|source| MemoryError::Configuration {
                operation: CONSTRUCT,
                target: target.clone(),
                source,
            })?;

        let base_url = match record.status.last_resolved_address.as_deref() {
            Some(address) if !address.is_empty() => super::normalize(address),
            _ => return Err(MemoryError::NotReady { target }),
        };

        let session_id = match self.session_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None if !record.metadata.uid.is_empty() => record.metadata.uid.clone(),
            None => {
                return Err(MemoryError::InvalidArgument(format!(
                    "memory {} has no uid and no session id was given",
                    target
                )))
            }
        };

        let settings = self.settings.unwrap_or_else(|| Settings::default().memory);

        tracing::debug!(
            "[HttpMemory] Created client for '{}' (session '{}') at {}",
            target,
            session_id,
            base_url
        );

        Ok(HttpMemory {
            locator,
            resolver: self.resolver.unwrap_or_else(|| {
                Arc::new(ValueSourceResolver::literal_only()) as Arc<dyn AddressResolver>
            }),
            emitter: self
                .emitter
                .unwrap_or_else(|| Arc::new(TracingEventEmitter) as Arc<dyn EventEmitter>),
            transport: RwLock::new(self.http_client.clone()),
            shared_transport: self.http_client,
            base_url: RwLock::new(base_url),
            session_id,
            name: self.name,
            namespace: self.namespace,
            settings,
        })
    }
}
