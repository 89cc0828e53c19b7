//! Address Resolution
//!
//! Information Hiding:
//! - How an address specification becomes a URL is hidden behind the resolver trait
//! - Config-key lookups go through a pluggable value source
//! - Callers only see a concrete endpoint or a resolution error

use crate::core::{AddressSpec, KeyRef, ServiceRef};
use crate::resource::{ConfigValueSource, ResourceError, ValueKind};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("address specification has no value or valueFrom source")]
    EmptySpec,

    #[error("{kind} {namespace}/{name} has no key '{key}'")]
    KeyNotFound {
        kind: &'static str,
        name: String,
        key: String,
        namespace: String,
    },

    #[error("resolved address '{address}' is not a valid http(s) URL: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The spec references config values but the resolver has no source for them.
    #[error("no config value source configured for {0} references")]
    NoValueSource(&'static str),

    #[error("failed to read referenced value: {0}")]
    Source(#[from] ResourceError),
}

/// Turns an address specification into a concrete endpoint URL
///
/// Implementations must not mutate the record being resolved.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, spec: &AddressSpec, namespace: &str) -> Result<String, ResolveError>;
}

/// Resolver for literal values, config map / secret keys and service references
#[derive(Clone, Default)]
pub struct ValueSourceResolver {
    values: Option<Arc<dyn ConfigValueSource>>,
    cluster_domain: Option<String>,
}

const DEFAULT_CLUSTER_DOMAIN: &str = "svc.cluster.local";

impl ValueSourceResolver {
    pub fn new(values: Arc<dyn ConfigValueSource>) -> Self {
        Self {
            values: Some(values),
            cluster_domain: None,
        }
    }

    /// Resolver without a value source: only literal and service addresses work.
    pub fn literal_only() -> Self {
        Self::default()
    }

    pub fn with_cluster_domain(mut self, domain: impl Into<String>) -> Self {
        self.cluster_domain = Some(domain.into());
        self
    }

    async fn lookup(
        &self,
        kind: ValueKind,
        key_ref: &KeyRef,
        namespace: &str,
    ) -> Result<String, ResolveError> {
        let values = self
            .values
            .as_ref()
            .ok_or(ResolveError::NoValueSource(kind.as_str()))?;

        values
            .config_value(kind, &key_ref.name, &key_ref.key, namespace)
            .await?
            .ok_or_else(|| ResolveError::KeyNotFound {
                kind: kind.as_str(),
                name: key_ref.name.clone(),
                key: key_ref.key.clone(),
                namespace: namespace.to_string(),
            })
    }

    fn service_url(&self, service: &ServiceRef, namespace: &str) -> String {
        let namespace = service.namespace.as_deref().unwrap_or(namespace);
        let domain = self
            .cluster_domain
            .as_deref()
            .unwrap_or(DEFAULT_CLUSTER_DOMAIN);

        let mut url = format!("http://{}.{}.{}", service.name, namespace, domain);
        if let Some(port) = service.port.as_deref().filter(|p| !p.is_empty()) {
            url.push(':');
            url.push_str(port);
        }
        if let Some(path) = service.path.as_deref().filter(|p| !p.is_empty()) {
            if !path.starts_with('/') {
                url.push('/');
            }
            url.push_str(path);
        }
        url
    }
}

#[async_trait]
impl AddressResolver for ValueSourceResolver {
    async fn resolve(&self, spec: &AddressSpec, namespace: &str) -> Result<String, ResolveError> {
        let address = if let Some(value) = spec.value.as_deref().filter(|v| !v.is_empty()) {
            value.to_string()
        } else if let Some(from) = &spec.value_from {
            if let Some(key_ref) = &from.config_map_key_ref {
                self.lookup(ValueKind::ConfigMap, key_ref, namespace).await?
            } else if let Some(key_ref) = &from.secret_key_ref {
                self.lookup(ValueKind::Secret, key_ref, namespace).await?
            } else if let Some(service) = &from.service_ref {
                self.service_url(service, namespace)
            } else {
                return Err(ResolveError::EmptySpec);
            }
        } else {
            return Err(ResolveError::EmptySpec);
        };

        let address = address.trim().to_string();
        validate_address(&address)?;
        tracing::debug!("[ValueSourceResolver] Resolved address to {}", address);
        Ok(address)
    }
}

fn validate_address(address: &str) -> Result<(), ResolveError> {
    let invalid = |reason: String| ResolveError::InvalidAddress {
        address: address.to_string(),
        reason,
    };
    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
