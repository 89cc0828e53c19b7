//! Error types for memory client operations.

use thiserror::Error;

use crate::resolver::ResolveError;
use crate::resource::ResourceError;

pub type Result<T, E = MemoryError> = std::result::Result<T, E>;

/// Errors returned by [`HttpMemory`](crate::client::HttpMemory).
///
/// Operation-scoped variants carry the operation name and the
/// `namespace/name` of the memory they ran against.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Construction parameters were missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The memory record has never been resolved.
    #[error("memory {target} has no lastResolvedAddress in status")]
    NotReady { target: String },

    #[error("{operation} on {target}: failed to get memory resource: {source}")]
    Configuration {
        operation: &'static str,
        target: String,
        #[source]
        source: ResourceError,
    },

    #[error("{operation} on {target}: failed to resolve memory address: {source}")]
    Resolution {
        operation: &'static str,
        target: String,
        #[source]
        source: ResolveError,
    },

    /// The backend answered with a status outside `[200, 300)`.
    #[error("{operation} on {target}: HTTP status {status}")]
    Backend {
        operation: &'static str,
        target: String,
        status: u16,
    },

    #[error("{operation} on {target}: HTTP request failed: {source}")]
    Transport {
        operation: &'static str,
        target: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} on {target}: failed to serialize messages: {source}")]
    Encode {
        operation: &'static str,
        target: String,
        #[source]
        source: serde_json::Error,
    },

    /// `index` is the zero-based position of the offending message, or
    /// `None` when the response body itself could not be decoded.
    #[error("{operation} on {target}: {}", decode_detail(.index, .reason))]
    Decode {
        operation: &'static str,
        target: String,
        index: Option<usize>,
        reason: String,
    },

    #[error("{operation} on {target}: operation cancelled: {reason}")]
    Cancelled {
        operation: &'static str,
        target: String,
        reason: String,
    },
}

fn decode_detail(index: &Option<usize>, reason: &str) -> String {
    match index {
        Some(i) => format!("failed to unmarshal message at index {}: {}", i, reason),
        None => format!("failed to decode response: {}", reason),
    }
}

impl MemoryError {
    /// Status code of a [`MemoryError::Backend`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            MemoryError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether an outer caller may reasonably retry the same call.
    ///
    /// This crate never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            MemoryError::Transport { .. } | MemoryError::Cancelled { .. } => true,
            MemoryError::Backend { status, .. } => *status == 429 || *status >= 500,
            MemoryError::Configuration { source, .. } => {
                matches!(source, ResourceError::BackendUnavailable(_))
            }
            _ => false,
        }
    }
}
