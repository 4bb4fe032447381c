//! Merge runs: one staging pass, one executor, one delivery.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{MergeOptions, PipelineConfig};
use crate::error::{PdfBinderError, Result};
use crate::io::delivery::{DeliveryReceipt, OutputDelivery};
use crate::io::stager::{StagedFile, Stager};
use crate::merge::events::{CancelToken, ExecutorEvent};
use crate::merge::executor::{ExecutorState, MergeExecutor};
use crate::queue::{FileQueue, QueuedFile};
use crate::status::{RunState, RunStatus, StatusReporter};

/// Message reported when the executor dies without a terminal event.
pub const WORKER_CRASH_MESSAGE: &str = "Worker error occurred";

/// Launches merge runs, at most one at a time.
#[derive(Debug, Clone)]
pub struct MergeRunner {
    config: PipelineConfig,
    active: Arc<AtomicBool>,
}

impl MergeRunner {
    /// Create a runner.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Snapshot `queue` and reserve the runner for a new run.
    ///
    /// The runner stays busy until the returned [`MergeRun`] is executed or
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PdfBinderError::InvalidInput`] for an empty queue and
    /// [`PdfBinderError::RunInProgress`] if another run is active.
    pub fn prepare(&self, queue: &FileQueue, options: MergeOptions) -> Result<MergeRun> {
        if queue.is_empty() {
            return Err(PdfBinderError::InvalidInput { rejected: 0 });
        }

        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PdfBinderError::RunInProgress)?;

        Ok(MergeRun {
            files: queue.snapshot(),
            options,
            config: self.config.clone(),
            cancel: CancelToken::new(),
            _guard: ActiveGuard(Arc::clone(&self.active)),
        })
    }
}

/// Releases the runner when a run ends.
#[derive(Debug)]
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A prepared run over a queue snapshot.
#[derive(Debug)]
pub struct MergeRun {
    files: Vec<QueuedFile>,
    options: MergeOptions,
    config: PipelineConfig,
    cancel: CancelToken,
    _guard: ActiveGuard,
}

/// How a run ended.
#[derive(Debug)]
pub struct RunOutcome {
    /// Final state as last reported.
    pub state: RunState,
    /// Where the output went, on success.
    pub receipt: Option<DeliveryReceipt>,
    /// Pages in the delivered document.
    pub page_count: usize,
    /// Whether the merge executor was spawned.
    pub executor_started: bool,
    /// The error that ended the run, if it errored.
    pub error: Option<PdfBinderError>,
}

impl RunOutcome {
    /// Whether the output was delivered.
    pub fn is_success(&self) -> bool {
        self.state.status == RunStatus::Completed
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match (&self.error, self.state.status) {
            (Some(e), _) => e.exit_code(),
            (None, RunStatus::Cancelled) => PdfBinderError::Cancelled.exit_code(),
            (None, _) => 0,
        }
    }
}

/// Mutable bookkeeping for one execution.
struct Progress<F> {
    reporter: StatusReporter,
    on_update: F,
    executor_started: bool,
}

impl<F: FnMut(&RunState)> Progress<F> {
    fn publish(&mut self) {
        (self.on_update)(self.reporter.state());
    }

    fn finish(
        mut self,
        receipt: Option<DeliveryReceipt>,
        page_count: usize,
        error: Option<PdfBinderError>,
    ) -> RunOutcome {
        if let Some(e) = &error
            && !self.reporter.state().status.is_terminal()
        {
            self.reporter.fail(e.to_string());
        }
        self.publish();

        RunOutcome {
            state: self.reporter.into_state(),
            receipt,
            page_count,
            executor_started: self.executor_started,
            error,
        }
    }

    fn cancelled(mut self) -> RunOutcome {
        info!("Merge run cancelled");
        self.reporter.cancel();
        self.finish(None, 0, None)
    }
}

impl MergeRun {
    /// A handle that cancels this run.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The options captured for this run.
    pub fn options(&self) -> MergeOptions {
        self.options
    }

    /// Number of files in the snapshot.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Stage, merge and deliver, calling `on_update` after every state change.
    ///
    /// Cancellation is honored until delivery starts. A cancelled run never
    /// reaches `delivery`.
    pub async fn execute<F>(self, delivery: &OutputDelivery, on_update: F) -> RunOutcome
    where
        F: FnMut(&RunState),
    {
        let start = Instant::now();
        let mut progress = Progress {
            reporter: StatusReporter::new(self.config.staging_share),
            on_update,
            executor_started: false,
        };
        progress.reporter.start();
        progress.publish();

        info!(
            files = self.files.len(),
            quality = %self.options.quality,
            fit = %self.options.fit,
            "Merge run started"
        );

        if self.cancel.is_cancelled() {
            return progress.cancelled();
        }

        let Some(staged) = self.stage(&mut progress).await else {
            return progress.cancelled();
        };

        let staged = match staged {
            Ok(staged) => staged,
            Err(e) => {
                warn!(error = %e, "Nothing to merge");
                return progress.finish(None, 0, Some(e));
            }
        };

        let (rx, handle) = MergeExecutor::new(staged, self.cancel.clone()).spawn();
        progress.executor_started = true;

        let (data, page_count) = match self.drive(&mut progress, rx, handle).await {
            Driven::Completed { data, page_count } => (data, page_count),
            Driven::Cancelled => return progress.cancelled(),
            Driven::Failed(e) => return progress.finish(None, 0, Some(e)),
        };

        if self.cancel.is_cancelled() {
            return progress.cancelled();
        }

        match delivery.deliver(data).await {
            Ok(receipt) => {
                progress.reporter.delivered();
                info!(
                    path = %receipt.path.display(),
                    pages = page_count,
                    skipped = progress.reporter.state().skipped_files.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Merge run completed"
                );
                progress.finish(Some(receipt), page_count, None)
            }
            Err(e) => {
                warn!(error = %e, "Delivery failed");
                progress.finish(None, page_count, Some(e))
            }
        }
    }

    /// Stage the snapshot. `None` means the run was cancelled.
    async fn stage<F>(&self, progress: &mut Progress<F>) -> Option<Result<Vec<StagedFile>>>
    where
        F: FnMut(&RunState),
    {
        let stager = Stager::new(self.options, self.config.effective_concurrency());

        let outcome = {
            let staging = stager.stage_with_progress(&self.files, |done, total, name| {
                progress.reporter.staging_progress(done, total, name);
                progress.publish();
            });

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => None,
                outcome = staging => Some(outcome),
            }
        }?;

        for failure in &outcome.failures {
            progress.reporter.skip(failure.name.clone());
        }
        if !outcome.failures.is_empty() {
            progress.publish();
        }

        Some(outcome.into_result().map(|outcome| outcome.staged))
    }

    /// Apply executor events until a terminal event, a crash or cancellation.
    async fn drive<F>(
        &self,
        progress: &mut Progress<F>,
        mut rx: UnboundedReceiver<ExecutorEvent>,
        handle: JoinHandle<ExecutorState>,
    ) -> Driven
    where
        F: FnMut(&RunState),
    {
        loop {
            let event = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Driven::Cancelled,
                event = rx.recv() => event,
            };

            let Some(event) = event else {
                return match handle.await {
                    Ok(ExecutorState::Cancelled) => Driven::Cancelled,
                    Ok(state) => {
                        warn!(?state, "Executor stopped without a result");
                        Driven::Failed(PdfBinderError::executor_fatal(WORKER_CRASH_MESSAGE))
                    }
                    Err(e) => {
                        warn!(error = %e, "Executor crashed");
                        Driven::Failed(PdfBinderError::executor_fatal(WORKER_CRASH_MESSAGE))
                    }
                };
            };

            progress.reporter.executor_event(&event);
            progress.publish();

            match event {
                ExecutorEvent::Completed { data, page_count } => {
                    return Driven::Completed { data, page_count };
                }
                ExecutorEvent::Error { message } => {
                    return Driven::Failed(PdfBinderError::executor_fatal(message));
                }
                ExecutorEvent::Progress { .. } | ExecutorEvent::Warning { .. } => {}
            }
        }
    }
}

enum Driven {
    Completed { data: Vec<u8>, page_count: usize },
    Cancelled,
    Failed(PdfBinderError),
}
