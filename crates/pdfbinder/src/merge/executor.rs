//! The merge executor.
//!
//! Builds the output document from staged files on a blocking worker and
//! reports through [`ExecutorEvent`]s. A file that cannot be merged yields a
//! `Warning` and contributes no pages; only failures outside a single file
//! end the run with an `Error`.

use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{PdfBinderError, Result};
use crate::io::stager::{StagedFile, StagedMime};
use crate::merge::document::OutputDocument;
use crate::merge::events::{CancelToken, ExecutorEvent};

/// Share of executor progress spent appending files; the rest is saving.
pub const APPEND_SHARE: f64 = 95.0;

/// Warning text sent for a file that contributed no pages.
pub const CORRUPTED_FILE_MESSAGE: &str = "File corrupted or invalid structure";

/// Lifecycle of an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Not started.
    Idle,
    /// Appending or saving.
    Running,
    /// Sent `Completed`.
    Completed,
    /// Sent `Error`.
    Errored,
    /// Stopped on request; sent nothing further.
    Cancelled,
}

/// Merges one batch of staged files. Used once per run.
pub struct MergeExecutor {
    files: Vec<StagedFile>,
    cancel: CancelToken,
    state: ExecutorState,
}

impl MergeExecutor {
    /// Create an executor owning `files`.
    pub fn new(files: Vec<StagedFile>, cancel: CancelToken) -> Self {
        Self {
            files,
            cancel,
            state: ExecutorState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// Run on a blocking worker, streaming events through an unbounded
    /// channel.
    ///
    /// The channel closes when the executor stops. The handle resolves to the
    /// final state.
    pub fn spawn(mut self) -> (mpsc::UnboundedReceiver<ExecutorEvent>, JoinHandle<ExecutorState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::task::spawn_blocking(move || {
            self.run(|event| {
                // A dropped receiver means the host stopped listening.
                let _ = tx.send(event);
            })
        });
        (rx, handle)
    }

    /// Run to completion on the current thread.
    ///
    /// `emit` is never called after cancellation is observed.
    pub fn run<F>(&mut self, mut emit: F) -> ExecutorState
    where
        F: FnMut(ExecutorEvent),
    {
        if self.state != ExecutorState::Idle {
            return self.state;
        }
        self.state = ExecutorState::Running;

        let files = std::mem::take(&mut self.files);
        let total = files.len();
        let mut output = OutputDocument::new();
        info!(files = total, "Merge started");

        for (index, file) in files.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return self.stop();
            }

            match append(&mut output, &file) {
                Ok(pages) => debug!(name = %file.name, pages, "File merged"),
                Err(e) => {
                    warn!(name = %file.name, error = %e, "Skipping file");
                    let warning = ExecutorEvent::Warning {
                        file_name: file.name.clone(),
                        message: CORRUPTED_FILE_MESSAGE.to_string(),
                    };
                    if !self.send(&mut emit, warning) {
                        return self.stop();
                    }
                }
            }

            let progress = ExecutorEvent::Progress {
                percent: (index + 1) as f64 / total as f64 * APPEND_SHARE,
                message: format!("Merging {}...", file.name),
            };
            if !self.send(&mut emit, progress) {
                return self.stop();
            }
        }

        let saving = ExecutorEvent::Progress {
            percent: APPEND_SHARE,
            message: "Saving final document...".to_string(),
        };
        if !self.send(&mut emit, saving) {
            return self.stop();
        }

        let page_count = output.page_count();
        let finished = panic::catch_unwind(AssertUnwindSafe(|| output.finish()))
            .unwrap_or_else(|_| Err(PdfBinderError::other("serializer panicked")));

        match finished {
            Ok(data) => {
                info!(pages = page_count, bytes = data.len(), "Merge finished");
                if !self.send(&mut emit, ExecutorEvent::Completed { data, page_count }) {
                    return self.stop();
                }
                self.state = ExecutorState::Completed;
            }
            Err(e) => {
                warn!(error = %e, "Merge failed");
                let error = ExecutorEvent::Error {
                    message: e.to_string(),
                };
                if !self.send(&mut emit, error) {
                    return self.stop();
                }
                self.state = ExecutorState::Errored;
            }
        }

        self.state
    }

    /// Emit unless cancelled. Returns `false` if the event was dropped.
    fn send<F>(&self, emit: &mut F, event: ExecutorEvent) -> bool
    where
        F: FnMut(ExecutorEvent),
    {
        if self.cancel.is_cancelled() {
            return false;
        }
        emit(event);
        true
    }

    fn stop(&mut self) -> ExecutorState {
        debug!("Merge cancelled");
        self.state = ExecutorState::Cancelled;
        self.state
    }
}

/// Append one file, treating a panic inside the PDF library as a per-file
/// failure.
fn append(output: &mut OutputDocument, file: &StagedFile) -> Result<usize> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match file.mime {
        StagedMime::Pdf => output.append_pdf(&file.bytes),
        StagedMime::Jpeg | StagedMime::Png => {
            output.append_image(file.mime, &file.bytes).map(|()| 1)
        }
    }));

    outcome
        .unwrap_or_else(|_| Err(PdfBinderError::other("parser panicked")))
        .map_err(|e| PdfBinderError::merge_failure(&file.name, e))
}
