//! Error types for pdfbinder.
//!
//! Errors fall in two groups. Per-file errors (`Decode`, `Encode`,
//! `MergeFailure`) are recovered where they happen: the file is skipped and
//! its name ends up in the run summary. Every other variant is fatal to the
//! run it occurs in.
//!
//! # Error Categories
//!
//! - **Input Errors**: nothing acceptable was offered, unreadable paths
//! - **Staging Errors**: images that cannot be decoded or re-encoded
//! - **Merge Errors**: unparsable PDFs, unembeddable images, serialization
//! - **Delivery Errors**: the merged file could not be persisted

use std::io;
use std::path::PathBuf;

/// Result type alias for pdfbinder operations.
pub type Result<T> = std::result::Result<T, PdfBinderError>;

/// Main error type for pdfbinder operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfBinderError {
    /// No file in the ingested batch has an accepted type, or the queue is empty.
    #[error("No valid files selected. Please add PDFs or images ({rejected} file(s) rejected)")]
    InvalidInput {
        /// Number of files that were offered and rejected.
        rejected: usize,
    },

    /// An image could not be decoded.
    #[error("Corrupted or unsupported image: {name}\n  Reason: {reason}")]
    Decode {
        /// Name of the offending file.
        name: String,
        /// Decoder message.
        reason: String,
    },

    /// A decoded image could not be re-encoded.
    #[error("Failed to re-encode image: {name}\n  Reason: {reason}")]
    Encode {
        /// Name of the offending file.
        name: String,
        /// Encoder message.
        reason: String,
    },

    /// A staged file could not be merged into the output document.
    #[error("File corrupted or invalid structure: {name}\n  Reason: {reason}")]
    MergeFailure {
        /// Name of the offending file.
        name: String,
        /// Details about the failure.
        reason: String,
    },

    /// Every file in the run failed staging.
    #[error("No files were successfully processed. Check for corrupted inputs ({failed} failed)")]
    NoValidFiles {
        /// Number of files that failed.
        failed: usize,
    },

    /// The merge executor failed outside of per-file isolation.
    #[error("Merge operation failed: {reason}")]
    ExecutorFatal {
        /// Description of what went wrong.
        reason: String,
    },

    /// Neither the streaming write nor the fallback download succeeded.
    #[error(
        "Failed to save merged PDF\n  Streaming write: {streaming}\n  Fallback download: {fallback}"
    )]
    Delivery {
        /// Why the streaming path failed (or why it was unavailable).
        streaming: String,
        /// Why the fallback path failed.
        fallback: String,
    },

    /// A merge is already running on this runner.
    #[error("A merge is already in progress")]
    RunInProgress,

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Input file is not accessible.
    #[error("Cannot access file: {}\n  Reason: {source}", .path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl PdfBinderError {
    /// Create a Decode error.
    pub fn decode(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an Encode error.
    pub fn encode(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encode {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a MergeFailure error.
    pub fn merge_failure(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::MergeFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an ExecutorFatal error.
    pub fn executor_fatal(reason: impl Into<String>) -> Self {
        Self::ExecutorFatal {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error only affects a single file.
    ///
    /// Recoverable errors skip the file and let the run continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Encode { .. } | Self::MergeFailure { .. }
        )
    }

    /// Check if this error ends the run without output.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::NoValidFiles { .. }
                | Self::ExecutorFatal { .. }
                | Self::Delivery { .. }
                | Self::Cancelled
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::RunInProgress => 1,
            Self::FileNotAccessible { .. } => 2,
            Self::Decode { .. } | Self::Encode { .. } => 3,
            Self::MergeFailure { .. } => 3,
            Self::NoValidFiles { .. } => 3,
            Self::Delivery { .. } => 5,
            Self::Io(_) => 5,
            Self::ExecutorFatal { .. } => 6,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Other { .. } => 1,
        }
    }
}

impl From<lopdf::Error> for PdfBinderError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}
