//! pdfbinder - Assemble PDFs and images into a single PDF, locally.
//!
//! This library takes an ordered set of PDFs and raster images and produces
//! one merged PDF. It supports:
//!
//! - An ordered, versioned file queue with selection and reordering
//! - Quality tiers and fit modes for image pre-scaling
//! - Concurrent image staging with per-file failure isolation
//! - A blocking merge executor reporting through an event channel
//! - Cancellable runs with monotonic progress
//! - Streaming delivery with a fallback target
//!
//! # Examples
//!
//! ```no_run
//! use pdfbinder::config::{FitMode, MergeOptions, PipelineConfig, QualityTier};
//! use pdfbinder::io::{OutputDelivery, read_all_incoming};
//! use pdfbinder::merge::MergeRunner;
//! use pdfbinder::queue::FileQueue;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut queue = FileQueue::new();
//! queue.add_files(read_all_incoming(&["cover.png", "report.pdf"]).await?)?;
//!
//! let config = PipelineConfig::default();
//! let runner = MergeRunner::new(config.clone())?;
//! let delivery = OutputDelivery::to_directory("out", config.product_name);
//!
//! let run = runner.prepare(&queue, MergeOptions::new(QualityTier::High, FitMode::Width))?;
//! let outcome = run.execute(&delivery, |_| {}).await;
//!
//! if let Some(receipt) = outcome.receipt {
//!     println!("Wrote {} pages to {}", outcome.page_count, receipt.path.display());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod policy;
pub mod queue;
pub mod status;
pub mod utils;

// Re-export commonly used types
pub use config::{MergeOptions, PipelineConfig};
pub use error::{PdfBinderError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
