//! Input staging: turn a queue snapshot into files the merge executor can
//! consume.
//!
//! PDFs pass through untouched. Images are normalized on the blocking pool,
//! with at most `concurrency` files in flight. A failing image is recorded
//! and staging carries on; the staged output always follows queue order no
//! matter which file finishes first.

use futures::stream::{self, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::MergeOptions;
use crate::error::{PdfBinderError, Result};
use crate::io::normalizer::ImageNormalizer;
use crate::policy::RasterPolicy;
use crate::queue::{FileKind, PDF_MIME, QueuedFile};

/// Content type of a staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedMime {
    /// `application/pdf`
    Pdf,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`, embedded losslessly.
    ///
    /// [`Stager`] re-encodes every image as JPEG; this variant is for hosts
    /// that build [`StagedFile`]s themselves and want to skip that step.
    Png,
}

impl StagedMime {
    /// The MIME string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => PDF_MIME,
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for StagedMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file ready for the merge executor.
#[derive(Debug, Clone)]
pub struct StagedFile {
    /// Display name of the source file.
    pub name: String,
    /// Content type.
    pub mime: StagedMime,
    /// Contents.
    pub bytes: Arc<[u8]>,
}

impl StagedFile {
    /// Create a staged file.
    pub fn new(name: impl Into<String>, mime: StagedMime, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime,
            bytes: bytes.into(),
        }
    }
}

/// A file that could not be staged.
#[derive(Debug)]
pub struct StagingFailure {
    /// Name of the file.
    pub name: String,
    /// Why it failed.
    pub error: PdfBinderError,
}

/// Result of staging a whole snapshot.
#[derive(Debug, Default)]
pub struct StagingOutcome {
    /// Staged files in queue order.
    pub staged: Vec<StagedFile>,

    /// Files that failed, in queue order.
    pub failures: Vec<StagingFailure>,

    /// Time spent staging.
    pub elapsed: Duration,
}

impl StagingOutcome {
    /// Names of the failed files.
    pub fn failed_names(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.name.clone()).collect()
    }

    /// Fail the whole stage when nothing survived it.
    ///
    /// # Errors
    ///
    /// Returns [`PdfBinderError::NoValidFiles`] if no file was staged.
    pub fn into_result(self) -> Result<Self> {
        if self.staged.is_empty() {
            return Err(PdfBinderError::NoValidFiles {
                failed: self.failures.len(),
            });
        }
        Ok(self)
    }
}

/// Stages queue snapshots with bounded concurrency.
#[derive(Debug, Clone)]
pub struct Stager {
    normalizer: ImageNormalizer,
    concurrency: usize,
}

impl Stager {
    /// Create a stager for the given options.
    pub fn new(options: MergeOptions, concurrency: usize) -> Self {
        Self {
            normalizer: ImageNormalizer::new(RasterPolicy::for_tier(options.quality), options.fit),
            concurrency: concurrency.max(1),
        }
    }

    /// Stage every file without progress reporting.
    pub async fn stage(&self, files: &[QueuedFile]) -> StagingOutcome {
        self.stage_with_progress(files, |_, _, _| {}).await
    }

    /// Stage every file, calling `on_progress(done, total, name)` after each
    /// one finishes.
    ///
    /// Callbacks arrive in completion order; the returned outcome is in queue
    /// order.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfbinder::io::Stager;
    /// # use pdfbinder::config::MergeOptions;
    /// # use pdfbinder::queue::FileQueue;
    /// # async fn example(queue: FileQueue) {
    /// let stager = Stager::new(MergeOptions::default(), 4);
    /// let outcome = stager
    ///     .stage_with_progress(&queue.snapshot(), |done, total, name| {
    ///         println!("[{done}/{total}] {name}");
    ///     })
    ///     .await;
    /// println!("{} staged, {} failed", outcome.staged.len(), outcome.failures.len());
    /// # }
    /// ```
    pub async fn stage_with_progress<F>(
        &self,
        files: &[QueuedFile],
        on_progress: F,
    ) -> StagingOutcome
    where
        F: FnMut(usize, usize, &str),
    {
        let normalizer = self.normalizer;
        self.stage_each(files, on_progress, move |name, kind, bytes| {
            stage_one(normalizer, name, kind, bytes)
        })
        .await
    }

    /// Run `stage` over `files` with at most `concurrency` calls in flight.
    async fn stage_each<F, S, Fut>(
        &self,
        files: &[QueuedFile],
        mut on_progress: F,
        stage: S,
    ) -> StagingOutcome
    where
        F: FnMut(usize, usize, &str),
        S: Fn(String, FileKind, Arc<[u8]>) -> Fut,
        Fut: Future<Output = Result<StagedFile>>,
    {
        let start = Instant::now();
        let total = files.len();

        let tasks = files.iter().enumerate().map(|(idx, file)| {
            let name = file.name.clone();
            let staging = stage(name.clone(), file.kind, Arc::clone(&file.bytes));
            async move { (idx, name, staging.await) }
        });

        let mut in_flight = stream::iter(tasks).buffer_unordered(self.concurrency);
        let mut slots: Vec<Option<Result<StagedFile>>> = (0..total).map(|_| None).collect();
        let mut done = 0;

        while let Some((idx, name, result)) = in_flight.next().await {
            done += 1;
            on_progress(done, total, &name);
            slots[idx] = Some(result);
        }

        let mut outcome = StagingOutcome::default();
        for (slot, file) in slots.into_iter().zip(files) {
            match slot {
                Some(Ok(staged)) => outcome.staged.push(staged),
                Some(Err(error)) => {
                    warn!(name = %file.name, %error, "Skipping file that failed staging");
                    outcome.failures.push(StagingFailure {
                        name: file.name.clone(),
                        error,
                    });
                }
                None => outcome.failures.push(StagingFailure {
                    name: file.name.clone(),
                    error: PdfBinderError::decode(&file.name, "staging task did not finish"),
                }),
            }
        }

        outcome.elapsed = start.elapsed();
        debug!(
            staged = outcome.staged.len(),
            failed = outcome.failures.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Staging finished"
        );
        outcome
    }
}

async fn stage_one(
    normalizer: ImageNormalizer,
    name: String,
    kind: FileKind,
    bytes: Arc<[u8]>,
) -> Result<StagedFile> {
    match kind {
        FileKind::Pdf => Ok(StagedFile::new(name, StagedMime::Pdf, bytes)),
        FileKind::Image => {
            let task_name = name.clone();
            let normalized =
                tokio::task::spawn_blocking(move || normalizer.normalize(&task_name, &bytes))
                    .await
                    .map_err(|e| PdfBinderError::decode(&name, format!("worker failed: {e}")))??;

            debug!(
                name = %name,
                width = normalized.width,
                height = normalized.height,
                bytes = normalized.bytes.len(),
                "Image normalized"
            );
            Ok(StagedFile::new(name, StagedMime::Jpeg, normalized.bytes))
        }
    }
}
