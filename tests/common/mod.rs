//! Shared fixtures for the HttpMemory integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use remote_memory::resource::{ResourceError, ResourceLocator};
use remote_memory::{
    AddressResolver, AddressSpec, HttpMemory, HttpMemoryBuilder, InMemoryResourceStore,
    MemoryRecord, RecordingEmitter, ResolveError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const NAME: &str = "chat-memory";
pub const NAMESPACE: &str = "default";
pub const UID: &str = "uid-chat-memory";

/// Locator that counts calls and can be told to reject status writes.
#[derive(Default)]
pub struct CountingLocator {
    pub inner: InMemoryResourceStore,
    gets: AtomicUsize,
    updates: AtomicUsize,
    fail_updates: AtomicBool,
}

impl CountingLocator {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceLocator for CountingLocator {
    async fn get(&self, name: &str, namespace: &str) -> Result<MemoryRecord, ResourceError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(name, namespace).await
    }

    async fn update_status(&self, record: &MemoryRecord) -> Result<(), ResourceError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ResourceError::BackendUnavailable(
                "status subresource is read-only".to_string(),
            ));
        }
        self.inner.update_status(record).await
    }
}

/// Resolver whose answer the test controls.
pub struct SwitchableResolver {
    answer: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl SwitchableResolver {
    pub fn new(address: &str) -> Self {
        Self {
            answer: Mutex::new(Some(address.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn point_to(&self, address: &str) {
        *self.answer.lock().unwrap() = Some(address.to_string());
    }

    pub fn break_resolution(&self) {
        *self.answer.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressResolver for SwitchableResolver {
    async fn resolve(&self, _spec: &AddressSpec, _namespace: &str) -> Result<String, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or(ResolveError::EmptySpec)
    }
}

type Histories = Arc<Mutex<HashMap<String, Vec<Value>>>>;

/// PUT handler that appends the posted messages to the history of the path.
struct AppendHistory(Histories);

impl Respond for AppendHistory {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let Some(messages) = body["messages"].as_array() else {
            return ResponseTemplate::new(400);
        };
        self.0
            .lock()
            .unwrap()
            .entry(request.url.path().to_string())
            .or_default()
            .extend(messages.iter().cloned());
        ResponseTemplate::new(200)
    }
}

/// GET handler returning the stored history of the path.
struct ReadHistory(Histories);

impl Respond for ReadHistory {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let messages = self
            .0
            .lock()
            .unwrap()
            .get(request.url.path())
            .cloned()
            .unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({ "messages": messages }))
    }
}

/// Mount a memory backend that persists what it receives.
pub async fn mount_history_backend(server: &MockServer) {
    let histories = Histories::default();
    Mock::given(method("PUT"))
        .and(path_regex(r"^/messages/.+$"))
        .respond_with(AppendHistory(histories.clone()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/messages/.+$"))
        .respond_with(ReadHistory(histories))
        .mount(server)
        .await;
}

pub struct Harness {
    pub server: MockServer,
    pub locator: Arc<CountingLocator>,
    pub resolver: Arc<SwitchableResolver>,
    pub recorder: Arc<RecordingEmitter>,
}

impl Harness {
    /// A record already resolved to a fresh mock server, and a resolver
    /// that keeps answering with that server.
    pub async fn new() -> Self {
        let server = MockServer::start().await;
        let locator = Arc::new(CountingLocator::default());
        locator
            .inner
            .put(
                MemoryRecord::new(NAME, NAMESPACE, AddressSpec::literal(server.uri()))
                    .with_uid(UID)
                    .with_resolved_address(server.uri()),
            )
            .await;

        Self {
            resolver: Arc::new(SwitchableResolver::new(&server.uri())),
            server,
            locator,
            recorder: Arc::new(RecordingEmitter::new()),
        }
    }

    pub fn builder(&self) -> HttpMemoryBuilder {
        HttpMemory::builder()
            .locator(self.locator.clone())
            .resolver(self.resolver.clone())
            .emitter(self.recorder.clone())
            .name(NAME)
            .namespace(NAMESPACE)
    }

    pub async fn memory(&self) -> HttpMemory {
        self.builder().build().await.unwrap()
    }

    pub async fn backend_requests(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    pub async fn record(&self) -> MemoryRecord {
        self.locator.inner.get(NAME, NAMESPACE).await.unwrap()
    }
}
