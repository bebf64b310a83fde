//! Cooperative Abort Signal
//!
//! A cloneable cancellation handle passed to executors through the task
//! context. Aborting is one-way and carries a reason string.

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

/// Cooperative abort signal for a single task attempt.
///
/// Executors observe the signal by awaiting [`aborted`](Self::aborted) or by
/// polling [`is_aborted`](Self::is_aborted) at their own yield points; the
/// scheduler never preempts executor code.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Arc<OnceLock<String>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the signal. The first reason wins; later calls are no-ops.
    pub fn abort(&self, reason: impl Into<String>) {
        let _ = self.reason.set(reason.into());
        self.token.cancel();
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the signal has been aborted.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }

    /// The reason passed to the first `abort` call, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.get().map(String::as_str)
    }
}
