//! Delivery of the merged document.
//!
//! The finished buffer is handed to a streaming target first, which writes it
//! in chunks to a temporary file and renames it into place. If that fails the
//! buffer goes to a fallback target that writes it in one call. Both are
//! [`DeliveryTarget`]s so hosts can plug in their own sinks.
//!
//! # Examples
//!
//! ```no_run
//! use pdfbinder::io::OutputDelivery;
//!
//! # async fn example(pdf: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let delivery = OutputDelivery::to_directory("out", "PdfBinder");
//! let receipt = delivery.deliver(pdf).await?;
//! println!("Saved {}", receipt.path.display());
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::error::{PdfBinderError, Result};

/// Default chunk size for streaming writes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A sink for the final document.
pub trait DeliveryTarget: Send + Sync {
    /// Short name used in logs and error messages.
    fn label(&self) -> &str;

    /// Persist `data` under `file_name`, returning where it ended up.
    fn deliver<'a>(&'a self, file_name: &'a str, data: &'a [u8])
    -> BoxFuture<'a, Result<PathBuf>>;
}

/// Writes through a buffered writer in fixed-size chunks to a temporary
/// file, then renames it.
#[derive(Debug, Clone)]
pub struct StreamingFileTarget {
    dir: PathBuf,
    chunk_size: usize,
}

impl StreamingFileTarget {
    /// Create a target writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    async fn write(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let final_path = self.dir.join(file_name);
        let temp_path = self.dir.join(format!("{file_name}.part"));

        let result = self.write_chunks(&temp_path, data).await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| PdfBinderError::FileNotAccessible {
                path: final_path.clone(),
                source: e,
            })?;

        Ok(final_path)
    }

    async fn write_chunks(&self, path: &Path, data: &[u8]) -> Result<()> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| PdfBinderError::FileNotAccessible {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        for chunk in data.chunks(self.chunk_size) {
            writer.write_all(chunk).await?;
        }
        writer.flush().await?;
        writer.into_inner().sync_all().await?;

        Ok(())
    }
}

impl DeliveryTarget for StreamingFileTarget {
    fn label(&self) -> &str {
        "streaming write"
    }

    fn deliver<'a>(
        &'a self,
        file_name: &'a str,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<PathBuf>> {
        Box::pin(self.write(file_name, data))
    }
}

/// Writes the whole buffer in a single call.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    dir: PathBuf,
}

impl DownloadTarget {
    /// Create a target writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeliveryTarget for DownloadTarget {
    fn label(&self) -> &str {
        "download"
    }

    fn deliver<'a>(
        &'a self,
        file_name: &'a str,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<PathBuf>> {
        Box::pin(async move {
            let path = self.dir.join(file_name);
            tokio::fs::write(&path, data)
                .await
                .map_err(|e| PdfBinderError::FileNotAccessible {
                    path: path.clone(),
                    source: e,
                })?;
            Ok(path)
        })
    }
}

/// How the document was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMethod {
    /// Through the streaming target.
    Streamed,
    /// Through the fallback target.
    Download,
}

/// Proof of a successful delivery.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    /// Where the document was written.
    pub path: PathBuf,
    /// Generated file name.
    pub file_name: String,
    /// Which path succeeded.
    pub method: DeliveryMethod,
    /// Document size in bytes.
    pub bytes: u64,
}

/// Names the output and routes it to a streaming target with a fallback.
pub struct OutputDelivery {
    product_name: String,
    streaming: Option<Box<dyn DeliveryTarget>>,
    fallback: Box<dyn DeliveryTarget>,
}

impl OutputDelivery {
    /// Create a delivery with explicit targets. `streaming` may be `None`
    /// when no streaming sink is available.
    pub fn new(
        product_name: impl Into<String>,
        streaming: Option<Box<dyn DeliveryTarget>>,
        fallback: Box<dyn DeliveryTarget>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            streaming,
            fallback,
        }
    }

    /// Stream into `dir`, falling back to a single write into the same
    /// directory.
    pub fn to_directory(dir: impl AsRef<Path>, product_name: impl Into<String>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            product_name,
            Some(Box::new(StreamingFileTarget::new(dir))),
            Box::new(DownloadTarget::new(dir)),
        )
    }

    /// Product name used as the file name prefix.
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// File name for a document produced at `now`.
    ///
    /// `<product>_Merged_<UTC ISO-8601 with ':' and '.' replaced by '-'>.pdf`
    pub fn output_file_name(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}_Merged_{}.pdf",
            self.product_name,
            now.format("%Y-%m-%dT%H-%M-%S-%3fZ")
        )
    }

    /// Deliver the buffer, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`PdfBinderError::Delivery`] when both targets fail.
    pub async fn deliver(&self, data: Vec<u8>) -> Result<DeliveryReceipt> {
        let file_name = self.output_file_name(Utc::now());
        let bytes = data.len() as u64;

        let streaming_reason = match &self.streaming {
            Some(target) => {
                let streamed = target.deliver(&file_name, &data).await;
                match streamed {
                    Ok(path) => {
                        info!(path = %path.display(), bytes, "Merged PDF saved");
                        return Ok(DeliveryReceipt {
                            path,
                            file_name,
                            method: DeliveryMethod::Streamed,
                            bytes,
                        });
                    }
                    Err(e) => {
                        warn!(
                            sink = target.label(),
                            error = %e,
                            "Streaming delivery failed, falling back"
                        );
                        e.to_string()
                    }
                }
            }
            None => {
                debug!("No streaming target, using fallback");
                "streaming target unavailable".to_string()
            }
        };

        let fallback = self.fallback.deliver(&file_name, &data).await;
        match fallback {
            Ok(path) => {
                info!(path = %path.display(), bytes, "Merged PDF saved via fallback");
                Ok(DeliveryReceipt {
                    path,
                    file_name,
                    method: DeliveryMethod::Download,
                    bytes,
                })
            }
            Err(e) => Err(PdfBinderError::Delivery {
                streaming: streaming_reason,
                fallback: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for OutputDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputDelivery")
            .field("product_name", &self.product_name)
            .field("streaming", &self.streaming.as_ref().map(|t| t.label()))
            .field("fallback", &self.fallback.label())
            .finish()
    }
}
