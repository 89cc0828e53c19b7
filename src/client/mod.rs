//! HTTP Memory Client
//!
//! Information Hiding:
//! - Address discovery and drift handling hidden inside every operation
//! - Wire format of the messages endpoint hidden from callers
//! - Transport pooling and telemetry bookkeeping internalized

mod builder;
mod context;

pub use builder::HttpMemoryBuilder;
pub use context::{Interrupt, OperationContext};

use crate::config::MemoryConfig;
use crate::core::Message;
use crate::error::{MemoryError, Result};
use crate::resolver::AddressResolver;
use crate::resource::ResourceLocator;
use crate::telemetry::{metadata, EventEmitter, OperationTracker};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

const ADD_MESSAGES: &str = "MemoryAddMessages";
const GET_MESSAGES: &str = "MemoryGetMessages";
const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Vec<Value>,
}

/// Conversation memory for one session, backed by an HTTP memory service.
///
/// The backend address is re-resolved from the memory record at the start of
/// every operation. The cached base URL is only a hint; each operation works
/// on its own copy of the freshly resolved address.
pub struct HttpMemory {
    locator: Arc<dyn ResourceLocator>,
    resolver: Arc<dyn AddressResolver>,
    emitter: Arc<dyn EventEmitter>,
    transport: RwLock<Option<Client>>,
    /// Caller-supplied client, reused whenever the transport is reopened.
    shared_transport: Option<Client>,
    base_url: RwLock<String>,
    session_id: String,
    name: String,
    namespace: String,
    settings: MemoryConfig,
}

fn normalize(address: &str) -> String {
    address.strip_suffix('/').unwrap_or(address).to_string()
}

impl HttpMemory {
    pub fn builder() -> HttpMemoryBuilder {
        HttpMemoryBuilder::new()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Last resolved base URL, without trailing slash.
    pub async fn base_url(&self) -> String {
        self.base_url.read().await.clone()
    }

    /// Append `messages` to the session history, in order.
    ///
    /// An empty slice returns immediately without any I/O or telemetry.
    pub async fn add_messages(&self, ctx: &OperationContext, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let tracker = OperationTracker::start(
            self.emitter.clone(),
            ADD_MESSAGES,
            &self.name,
            metadata([
                ("namespace", self.namespace.clone()),
                ("sessionId", self.session_id.clone()),
                ("messages", messages.len().to_string()),
            ]),
        );

        match self.interruptible(ctx, ADD_MESSAGES, self.put_messages(messages)).await {
            Ok(()) => {
                tracker.complete("messages added");
                Ok(())
            }
            Err(e) => {
                tracker.fail(&e);
                Err(e)
            }
        }
    }

    /// Fetch the full session history. Either every message decodes or the
    /// call fails; partial histories are never returned.
    pub async fn get_messages(&self, ctx: &OperationContext) -> Result<Vec<Message>> {
        let mut tracker = OperationTracker::start(
            self.emitter.clone(),
            GET_MESSAGES,
            &self.name,
            metadata([
                ("namespace", self.namespace.clone()),
                ("sessionId", self.session_id.clone()),
            ]),
        );

        match self.interruptible(ctx, GET_MESSAGES, self.fetch_messages()).await {
            Ok(messages) => {
                tracker.set_metadata("messages", messages.len());
                tracker.complete("retrieved");
                Ok(messages)
            }
            Err(e) => {
                tracker.fail(&e);
                Err(e)
            }
        }
    }

    /// Release pooled connections. A later operation opens a fresh pool, or
    /// goes back to the client given to [`HttpMemoryBuilder::http_client`].
    pub async fn close(&self) {
        if self.transport.write().await.take().is_some() {
            tracing::debug!("[HttpMemory] Closed transport for '{}'", self.target());
        }
    }

    fn target(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    async fn interruptible<T>(
        &self,
        ctx: &OperationContext,
        operation: &'static str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let ctx = ctx.or_timeout(self.settings.operation_timeout());
        match ctx.run(fut).await {
            Ok(result) => result,
            Err(interrupt) => Err(MemoryError::Cancelled {
                operation,
                target: self.target(),
                reason: interrupt.to_string(),
            }),
        }
    }

    /// Re-read the record, resolve its address and refresh the cached base URL.
    ///
    /// A changed address is written back to the record's status on a
    /// best-effort basis; the write-back never fails the operation.
    async fn reconcile(&self, operation: &'static str) -> Result<String> {
        let mut record = self
            .locator
            .get(&self.name, &self.namespace)
            .await
            .map_err(|source| MemoryError::Configuration {
                operation,
                target: self.target(),
                source,
            })?;

        let resolved = self
            .resolver
            .resolve(&record.spec.address, &self.namespace)
            .await
            .map_err(|source| MemoryError::Resolution {
                operation,
                target: self.target(),
                source,
            })?;

        let new_base_url = normalize(&resolved);
        let current = normalize(&self.base_url().await);

        if current != new_base_url {
            tracing::info!(
                "[HttpMemory] Address of '{}' changed from {} to {}",
                self.target(),
                current,
                new_base_url
            );
            record.status.message = Some(format!("Address dynamically resolved to: {}", resolved));
            record.status.last_resolved_address = Some(resolved.clone());

            if let Err(e) = self.locator.update_status(&record).await {
                tracing::error!(
                    memory = %self.name,
                    namespace = %self.namespace,
                    new_address = %resolved,
                    "[HttpMemory] Failed to update memory status with new address: {}",
                    e
                );
            }
        }

        *self.base_url.write().await = new_base_url.clone();
        Ok(new_base_url)
    }

    fn messages_url(&self, base_url: &str) -> String {
        format!(
            "{}{}/{}",
            base_url,
            self.settings.messages_path,
            urlencoding::encode(&self.session_id)
        )
    }

    async fn transport(&self, operation: &'static str) -> Result<Client> {
        if let Some(client) = self.transport.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut transport = self.transport.write().await;
        if let Some(client) = transport.as_ref() {
            return Ok(client.clone());
        }
        if let Some(shared) = &self.shared_transport {
            *transport = Some(shared.clone());
            return Ok(shared.clone());
        }

        let mut builder = Client::builder();
        if let Some(timeout) = self.settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| self.transport_error(operation, source))?;
        *transport = Some(client.clone());
        Ok(client)
    }

    fn transport_error(&self, operation: &'static str, source: reqwest::Error) -> MemoryError {
        MemoryError::Transport {
            operation,
            target: self.target(),
            source,
        }
    }

    fn backend_error(&self, operation: &'static str, status: reqwest::StatusCode) -> MemoryError {
        MemoryError::Backend {
            operation,
            target: self.target(),
            status: status.as_u16(),
        }
    }

    fn decode_error(&self, index: Option<usize>, reason: impl ToString) -> MemoryError {
        MemoryError::Decode {
            operation: GET_MESSAGES,
            target: self.target(),
            index,
            reason: reason.to_string(),
        }
    }

    async fn put_messages(&self, messages: &[Message]) -> Result<()> {
        let base_url = self.reconcile(ADD_MESSAGES).await?;

        let body = serde_json::to_vec(&MessagesRequest { messages }).map_err(|source| {
            MemoryError::Encode {
                operation: ADD_MESSAGES,
                target: self.target(),
                source,
            }
        })?;

        let url = self.messages_url(&base_url);
        tracing::debug!("[HttpMemory] PUT {} ({} messages)", url, messages.len());

        let response = self
            .transport(ADD_MESSAGES)
            .await?
            .put(&url)
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header(USER_AGENT, &self.settings.user_agent)
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(ADD_MESSAGES, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.backend_error(ADD_MESSAGES, status));
        }
        Ok(())
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>> {
        let base_url = self.reconcile(GET_MESSAGES).await?;

        let url = self.messages_url(&base_url);
        tracing::debug!("[HttpMemory] GET {}", url);

        let response = self
            .transport(GET_MESSAGES)
            .await?
            .get(&url)
            .header(ACCEPT, CONTENT_TYPE_JSON)
            .header(USER_AGENT, &self.settings.user_agent)
            .send()
            .await
            .map_err(|e| self.transport_error(GET_MESSAGES, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.backend_error(GET_MESSAGES, status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(GET_MESSAGES, e))?;
        let decoded: MessagesResponse =
            serde_json::from_slice(&body).map_err(|e| self.decode_error(None, e))?;

        decoded
            .messages
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Message::from_value(raw).map_err(|e| self.decode_error(Some(index), e))
            })
            .collect()
    }
}
