//! Document assembly.
//!
//! This module provides the merge half of the pipeline:
//! - Page import from source PDFs with inherited attributes resolved
//! - Image pages from staged JPEG and PNG data
//! - The blocking merge executor and its event channel
//! - Run control: staging, executing, delivering, cancelling
//!
//! # Examples
//!
//! ```no_run
//! use pdfbinder::config::{MergeOptions, PipelineConfig};
//! use pdfbinder::io::OutputDelivery;
//! use pdfbinder::merge::MergeRunner;
//! use pdfbinder::queue::{FileQueue, IncomingFile};
//!
//! # async fn example(files: Vec<IncomingFile>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut queue = FileQueue::new();
//! queue.add_files(files)?;
//!
//! let runner = MergeRunner::new(PipelineConfig::default())?;
//! let delivery = OutputDelivery::to_directory(".", "PdfBinder");
//!
//! let run = runner.prepare(&queue, MergeOptions::default())?;
//! let outcome = run
//!     .execute(&delivery, |state| println!("{:>3.0}% {}", state.progress, state.message))
//!     .await;
//! println!("{}", outcome.state.message);
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod events;
pub mod executor;
pub mod images;
pub mod pages;
pub mod run;

pub use document::OutputDocument;
pub use events::{CancelToken, ExecutorEvent};
pub use executor::{ExecutorState, MergeExecutor};
pub use run::{MergeRun, MergeRunner, RunOutcome};
