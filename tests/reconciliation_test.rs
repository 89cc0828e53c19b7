//! Address reconciliation and construction of HttpMemory

mod common;

use common::{mount_history_backend, CountingLocator, Harness, NAME, NAMESPACE, UID};
use remote_memory::resource::ValueKind;
use remote_memory::{
    AddressSpec, FileSystemResourceStore, HttpMemory, InMemoryResourceStore, MemoryError,
    MemoryRecord, Message, OperationContext, RecordingEmitter, ResourceLocator,
};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_empty_namespace_rejected_before_store_access() {
    let harness = Harness::new().await;
    let gets_before = harness.locator.gets();

    let result = harness.builder().namespace("").build().await;

    assert!(matches!(result, Err(MemoryError::InvalidArgument(_))));
    assert_eq!(harness.locator.gets(), gets_before);
}

#[tokio::test]
async fn test_missing_name_or_locator_rejected() {
    let harness = Harness::new().await;
    let result = harness.builder().name("").build().await;
    assert!(matches!(result, Err(MemoryError::InvalidArgument(_))));

    let result = HttpMemory::builder()
        .name(NAME)
        .namespace(NAMESPACE)
        .build()
        .await;
    assert!(matches!(result, Err(MemoryError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_unresolved_record_is_not_ready() {
    let locator = Arc::new(CountingLocator::default());
    let record = MemoryRecord::new(NAME, NAMESPACE, AddressSpec::literal("http://memory"));
    locator.inner.put(record.with_uid(UID)).await;

    let result = HttpMemory::builder()
        .locator(locator.clone())
        .name(NAME)
        .namespace(NAMESPACE)
        .build()
        .await;

    assert!(matches!(result, Err(MemoryError::NotReady { .. })));
    assert_eq!(locator.gets(), 1);
}

#[tokio::test]
async fn test_missing_record_fails_construction() {
    let locator = Arc::new(CountingLocator::default());
    let result = HttpMemory::builder()
        .locator(locator)
        .name("absent")
        .namespace(NAMESPACE)
        .build()
        .await;

    assert!(matches!(result, Err(MemoryError::Configuration { .. })));
}

#[tokio::test]
async fn test_session_id_defaults_to_uid() {
    let harness = Harness::new().await;
    let memory = harness.memory().await;
    assert_eq!(memory.session_id(), UID);

    let explicit = harness.builder().session_id("thread-7").build().await.unwrap();
    assert_eq!(explicit.session_id(), "thread-7");
}

#[tokio::test]
async fn test_unchanged_address_skips_status_write() {
    let harness = Harness::new().await;
    mount_history_backend(&harness.server).await;
    let memory = harness.memory().await;

    memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap();

    assert_eq!(harness.resolver.calls(), 1);
    assert_eq!(harness.locator.updates(), 0);
}

#[tokio::test]
async fn test_trailing_slash_is_not_drift() {
    let harness = Harness::new().await;
    mount_history_backend(&harness.server).await;
    harness
        .resolver
        .point_to(&format!("{}/", harness.server.uri()));
    let memory = harness.memory().await;

    memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap();

    assert_eq!(harness.locator.updates(), 0);
    assert_eq!(memory.base_url().await, harness.server.uri());
}

#[tokio::test]
async fn test_drift_updates_record_and_cache() {
    let harness = Harness::new().await;
    let moved = MockServer::start().await;
    mount_history_backend(&moved).await;
    let memory = harness.memory().await;

    harness.resolver.point_to(&moved.uri());
    memory
        .add_messages(&OperationContext::background(), &[Message::user("hello")])
        .await
        .unwrap();

    assert_eq!(harness.locator.updates(), 1);
    assert_eq!(memory.base_url().await, moved.uri());
    assert_eq!(harness.backend_requests().await, 0);
    assert_eq!(moved.received_requests().await.unwrap().len(), 1);

    let record = harness.record().await;
    assert_eq!(record.status.last_resolved_address, Some(moved.uri()));
    assert_eq!(
        record.status.message,
        Some(format!("Address dynamically resolved to: {}", moved.uri()))
    );

    // already reconciled, nothing more to write
    memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap();
    assert_eq!(harness.locator.updates(), 1);
}

#[tokio::test]
async fn test_failed_status_write_does_not_block_traffic() {
    let harness = Harness::new().await;
    let moved = MockServer::start().await;
    mount_history_backend(&moved).await;
    harness.locator.fail_updates(true);
    let memory = harness.memory().await;

    harness.resolver.point_to(&moved.uri());
    let messages = memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap();

    assert!(messages.is_empty());
    assert_eq!(harness.locator.updates(), 1);
    assert_eq!(memory.base_url().await, moved.uri());
    assert_eq!(
        harness.record().await.status.last_resolved_address,
        Some(harness.server.uri())
    );
}

#[tokio::test]
async fn test_resolver_failure_makes_no_backend_call() {
    let harness = Harness::new().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&harness.server)
        .await;
    let memory = harness.memory().await;

    harness.resolver.break_resolution();
    let err = memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, MemoryError::Resolution { .. }));
    assert_eq!(harness.backend_requests().await, 0);
    assert_eq!(harness.recorder.terminal_events().len(), 1);

    let err = memory
        .add_messages(&OperationContext::background(), &[Message::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::Resolution { .. }));
    assert_eq!(harness.backend_requests().await, 0);
}

#[tokio::test]
async fn test_deleted_record_is_configuration_error() {
    let harness = Harness::new().await;
    let memory = harness.memory().await;
    harness.locator.inner.delete(NAME, NAMESPACE).await;

    let err = memory
        .get_messages(&OperationContext::background())
        .await
        .unwrap_err();

    assert!(matches!(err, MemoryError::Configuration { .. }));
    assert_eq!(harness.resolver.calls(), 0);
    assert_eq!(harness.backend_requests().await, 0);
}

#[tokio::test]
async fn test_config_map_drift_end_to_end() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_history_backend(&first).await;
    mount_history_backend(&second).await;

    let store = Arc::new(InMemoryResourceStore::new());
    store
        .set_value(ValueKind::ConfigMap, NAMESPACE, "memory-endpoint", "url", first.uri())
        .await;
    store
        .put(
            MemoryRecord::new(NAME, NAMESPACE, AddressSpec::config_map("memory-endpoint", "url"))
                .with_uid(UID)
                .with_resolved_address(first.uri()),
        )
        .await;

    let memory = HttpMemory::builder()
        .store(store.clone())
        .emitter(Arc::new(RecordingEmitter::new()))
        .name(NAME)
        .namespace(NAMESPACE)
        .build()
        .await
        .unwrap();
    let ctx = OperationContext::background();

    memory.add_messages(&ctx, &[Message::user("one")]).await.unwrap();

    store
        .set_value(ValueKind::ConfigMap, NAMESPACE, "memory-endpoint", "url", second.uri())
        .await;
    memory.add_messages(&ctx, &[Message::user("two")]).await.unwrap();

    assert_eq!(first.received_requests().await.unwrap().len(), 1);
    assert_eq!(second.received_requests().await.unwrap().len(), 1);
    assert_eq!(memory.get_messages(&ctx).await.unwrap(), vec![Message::user("two")]);

    let record = store.get(NAME, NAMESPACE).await.unwrap();
    assert_eq!(record.status.last_resolved_address, Some(second.uri()));
    assert_eq!(record.metadata.resource_version, 2);
}

#[tokio::test]
async fn test_secret_drift_on_filesystem_store() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_history_backend(&first).await;
    mount_history_backend(&second).await;

    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(
        FileSystemResourceStore::new(temp_dir.path().to_path_buf())
            .await
            .unwrap(),
    );
    store
        .set_value(ValueKind::Secret, NAMESPACE, "memory-credentials", "endpoint", first.uri())
        .await
        .unwrap();
    let address = AddressSpec::secret("memory-credentials", "endpoint");
    store
        .put(
            MemoryRecord::new(NAME, NAMESPACE, address)
                .with_uid(UID)
                .with_resolved_address(first.uri()),
        )
        .await
        .unwrap();

    let recorder = Arc::new(RecordingEmitter::new());
    let memory = HttpMemory::builder()
        .store(store.clone())
        .emitter(recorder.clone())
        .name(NAME)
        .namespace(NAMESPACE)
        .build()
        .await
        .unwrap();
    let ctx = OperationContext::background();

    memory.add_messages(&ctx, &[Message::user("one")]).await.unwrap();
    assert_eq!(store.get(NAME, NAMESPACE).await.unwrap().metadata.resource_version, 1);

    store
        .set_value(ValueKind::Secret, NAMESPACE, "memory-credentials", "endpoint", second.uri())
        .await
        .unwrap();
    let history = memory.get_messages(&ctx).await.unwrap();

    // the moved backend starts with an empty history
    assert!(history.is_empty());
    assert_eq!(first.received_requests().await.unwrap().len(), 1);
    assert_eq!(second.received_requests().await.unwrap().len(), 1);
    assert_eq!(memory.base_url().await, second.uri());

    // a fresh store over the same directory sees the written-back status
    let reopened = FileSystemResourceStore::new(temp_dir.path().to_path_buf())
        .await
        .unwrap();
    let record = reopened.get(NAME, NAMESPACE).await.unwrap();
    assert_eq!(record.status.last_resolved_address, Some(second.uri()));
    assert_eq!(
        record.status.message,
        Some(format!("Address dynamically resolved to: {}", second.uri()))
    );
    assert_eq!(record.metadata.resource_version, 2);
    assert_eq!(recorder.terminal_events().len(), 2);
}
