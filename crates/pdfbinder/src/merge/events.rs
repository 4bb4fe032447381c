//! Messages from the merge executor and the cancellation signal.

use std::sync::Arc;
use tokio::sync::watch;

/// Event emitted by the merge executor, in order.
///
/// `Completed` and `Error` are terminal: nothing follows them.
#[derive(Debug)]
pub enum ExecutorEvent {
    /// Executor-local progress in `[0, 100]`.
    Progress {
        /// Percentage of the executor's own work.
        percent: f64,
        /// Status line.
        message: String,
    },
    /// A file contributed no pages.
    Warning {
        /// Name of the skipped file.
        file_name: String,
        /// Why it was skipped.
        message: String,
    },
    /// The document was serialized.
    Completed {
        /// The finished PDF, moved out of the executor.
        data: Vec<u8>,
        /// Number of pages in the document.
        page_count: usize,
    },
    /// The run failed outside per-file isolation.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ExecutorEvent {
    /// Whether no further events follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

/// Cloneable cancellation flag shared by the host and the executor.
///
/// Cancelling is idempotent. Async code can await [`CancelToken::cancelled`];
/// the blocking executor polls [`CancelToken::is_cancelled`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.tx.send_if_modified(|cancelled| {
            let changed = !*cancelled;
            *cancelled = true;
            changed
        });
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
