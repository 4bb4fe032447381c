//! I/O operations for pdfbinder.
//!
//! This module handles everything that moves bytes in or out of the merge:
//! - Reading input files from disk
//! - Normalizing images per the quality policy
//! - Staging a queue snapshot with bounded concurrency
//! - Delivering the merged document

pub mod delivery;
pub mod normalizer;
pub mod stager;

pub use delivery::{
    DeliveryMethod, DeliveryReceipt, DeliveryTarget, DownloadTarget, OutputDelivery,
    StreamingFileTarget,
};
pub use normalizer::{ImageNormalizer, NormalizedImage};
pub use stager::{StagedFile, StagedMime, Stager, StagingFailure, StagingOutcome};

use crate::error::{PdfBinderError, Result};
use crate::queue::IncomingFile;
use crate::utils::detect_mime;
use std::path::Path;

/// Read a file from disk into an [`IncomingFile`].
///
/// The MIME type is derived from the extension.
///
/// # Errors
///
/// Returns [`PdfBinderError::FileNotAccessible`] if the file cannot be read.
///
/// # Examples
///
/// ```no_run
/// use pdfbinder::io::read_incoming;
/// use pdfbinder::queue::FileQueue;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut queue = FileQueue::new();
/// let file = read_incoming("scan.png").await?;
/// queue.add_files([file])?;
/// # Ok(())
/// # }
/// ```
pub async fn read_incoming(path: impl AsRef<Path>) -> Result<IncomingFile> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PdfBinderError::FileNotAccessible {
            path: path.to_path_buf(),
            source: e,
        })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(IncomingFile::new(name, detect_mime(path), bytes))
}

/// Read several files, preserving order.
///
/// # Errors
///
/// Fails on the first unreadable file.
pub async fn read_all_incoming<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<IncomingFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_incoming(path).await?);
    }
    Ok(files)
}
