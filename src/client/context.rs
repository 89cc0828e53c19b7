//! Per-call cancellation and deadlines

use std::fmt;
use std::future::{pending, Future};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope of one operation: an optional deadline and an
/// optional cancellation token. The default context never interrupts.
#[derive(Debug, Clone, Default)]
pub struct OperationContext {
    deadline: Option<Instant>,
    token: Option<CancellationToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Cancelled => f.write_str("context cancelled"),
            Interrupt::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

impl OperationContext {
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Apply `timeout` only when no deadline has been set yet.
    pub(crate) fn or_timeout(&self, timeout: Option<Duration>) -> Self {
        match (self.deadline, timeout) {
            (None, Some(timeout)) => self.clone().with_timeout(timeout),
            _ => self.clone(),
        }
    }

    /// Drive `fut` until it finishes or the context is interrupted.
    /// An already-cancelled context never polls `fut`.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupt> {
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Interrupt::Cancelled),
            _ = expired => Err(Interrupt::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
