//! Operation Telemetry
//!
//! Information Hiding:
//! - Event sink hidden behind the emitter trait (logs, cluster events, test recorders)
//! - Exactly-once terminal outcome enforced by the tracker's ownership
//! - Timing of each operation captured internally

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationEvent {
    pub kind: EventKind,
    pub operation: String,
    /// `{operation}Start`, `{operation}Complete` or `{operation}Error`
    pub reason: String,
    pub target: String,
    pub metadata: BTreeMap<String, String>,
    pub message: String,
    /// Set on terminal events.
    pub duration: Option<Duration>,
}

/// Fire-and-forget telemetry sink
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: OperationEvent);
}

/// Emits every event as a structured `tracing` record
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventEmitter;

impl EventEmitter for TracingEventEmitter {
    fn emit(&self, event: OperationEvent) {
        let metadata = format!("{:?}", event.metadata);
        match event.kind {
            EventKind::Started => tracing::debug!(
                operation = %event.operation,
                memory = %event.target,
                metadata = %metadata,
                "{}", event.reason
            ),
            EventKind::Completed => tracing::info!(
                operation = %event.operation,
                memory = %event.target,
                metadata = %metadata,
                duration_ms = event.duration.map(|d| d.as_millis() as u64).unwrap_or(0),
                "{}: {}", event.reason, event.message
            ),
            EventKind::Failed => tracing::warn!(
                operation = %event.operation,
                memory = %event.target,
                metadata = %metadata,
                duration_ms = event.duration.map(|d| d.as_millis() as u64).unwrap_or(0),
                "{}: {}", event.reason, event.message
            ),
        }
    }
}

/// Keeps every event in memory, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<OperationEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OperationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Completed and failed events only.
    pub fn terminal_events(&self) -> Vec<OperationEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind != EventKind::Started)
            .collect()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: OperationEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}

/// Telemetry record of one operation invocation.
///
/// `complete` and `fail` consume the tracker; a tracker dropped without either
/// (e.g. its future was cancelled) reports a failure on drop.
pub struct OperationTracker {
    emitter: Arc<dyn EventEmitter>,
    operation: &'static str,
    target: String,
    metadata: BTreeMap<String, String>,
    started: Instant,
    finished: bool,
}

impl OperationTracker {
    pub fn start(
        emitter: Arc<dyn EventEmitter>,
        operation: &'static str,
        target: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let tracker = Self {
            emitter,
            operation,
            target: target.into(),
            metadata,
            started: Instant::now(),
            finished: false,
        };
        tracker.emit(EventKind::Started, format!("{} started", operation), None);
        tracker
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl ToString) {
        self.metadata.insert(key.into(), value.to_string());
    }

    pub fn complete(mut self, message: impl Into<String>) {
        self.finish(EventKind::Completed, message.into());
    }

    pub fn fail(mut self, error: &dyn std::error::Error) {
        self.finish(EventKind::Failed, error.to_string());
    }

    fn finish(&mut self, kind: EventKind, message: String) {
        self.finished = true;
        self.emit(kind, message, Some(self.started.elapsed()));
    }

    fn emit(&self, kind: EventKind, message: String, duration: Option<Duration>) {
        let suffix = match kind {
            EventKind::Started => "Start",
            EventKind::Completed => "Complete",
            EventKind::Failed => "Error",
        };
        self.emitter.emit(OperationEvent {
            kind,
            operation: self.operation.to_string(),
            reason: format!("{}{}", self.operation, suffix),
            target: self.target.clone(),
            metadata: self.metadata.clone(),
            message,
            duration,
        });
    }
}

impl Drop for OperationTracker {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(
                EventKind::Failed,
                "operation dropped before completion".to_string(),
            );
        }
    }
}

/// Build a metadata map from string pairs.
pub fn metadata<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
