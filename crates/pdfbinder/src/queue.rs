//! The ordered collection of files awaiting a merge.
//!
//! [`FileQueue`] owns every [`QueuedFile`] and is the only way to mutate
//! them. Each effective mutation bumps [`FileQueue::version`] and leaves
//! `display_order` as a permutation of `0..len`.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PdfBinderError, Result};

/// MIME type accepted for PDF inputs.
pub const PDF_MIME: &str = "application/pdf";

/// Opaque identifier of a queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Kind of a queued file, fixed at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    /// A PDF document.
    Pdf,
    /// A raster image.
    Image,
}

impl FileKind {
    /// Classify a declared MIME type. Returns `None` for unsupported types.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == PDF_MIME {
            Some(Self::Pdf)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// A file offered for ingestion.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// File name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    /// Create an incoming file.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// A file accepted into the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedFile {
    /// Stable identifier.
    pub id: FileId,
    /// Display name.
    pub name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// PDF or image.
    pub kind: FileKind,
    /// Shared, read-only contents.
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
    /// Position in the merge sequence.
    pub display_order: usize,
    /// Selection flag for bulk operations.
    pub selected: bool,
    /// Size of the contents in bytes.
    pub size: u64,
}

/// Versioned, ordered queue of files.
#[derive(Debug, Default)]
pub struct FileQueue {
    entries: Vec<QueuedFile>,
    version: u64,
}

impl FileQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a batch of files.
    ///
    /// Files with an accepted MIME type are appended in batch order; the rest
    /// are dropped. Returns the ids of the accepted files.
    ///
    /// # Errors
    ///
    /// Returns [`PdfBinderError::InvalidInput`] when no file in the batch is
    /// accepted. The queue is left unchanged.
    pub fn add_files<I>(&mut self, batch: I) -> Result<Vec<FileId>>
    where
        I: IntoIterator<Item = IncomingFile>,
    {
        let mut rejected = 0;
        let mut accepted = Vec::new();

        for file in batch {
            match FileKind::from_mime(&file.mime_type) {
                Some(kind) => accepted.push((file, kind)),
                None => {
                    debug!(name = %file.name, mime = %file.mime_type, "Rejected file");
                    rejected += 1;
                }
            }
        }

        if accepted.is_empty() {
            return Err(PdfBinderError::InvalidInput { rejected });
        }

        let mut ids = Vec::with_capacity(accepted.len());
        for (file, kind) in accepted {
            let id = FileId::new();
            let size = file.bytes.len() as u64;
            self.entries.push(QueuedFile {
                id,
                name: file.name,
                mime_type: file.mime_type,
                kind,
                bytes: Arc::from(file.bytes),
                display_order: self.entries.len(),
                selected: false,
                size,
            });
            ids.push(id);
        }

        debug!(added = ids.len(), rejected, "Files added to queue");
        self.version += 1;
        Ok(ids)
    }

    /// Remove the files with the given ids. Returns how many were removed.
    pub fn remove(&mut self, ids: &[FileId]) -> usize {
        self.retain(|file| !ids.contains(&file.id))
    }

    /// Remove every selected file. Returns how many were removed.
    pub fn remove_selected(&mut self) -> usize {
        self.retain(|file| !file.selected)
    }

    /// Remove every file.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.version += 1;
        }
    }

    /// Move a file to `new_index`.
    ///
    /// Returns `false` without touching the queue when the id is unknown, the
    /// index is out of range, or the file is already there.
    pub fn reorder(&mut self, id: FileId, new_index: usize) -> bool {
        let Some(old_index) = self.position(id) else {
            return false;
        };
        if new_index >= self.entries.len() || new_index == old_index {
            return false;
        }

        let file = self.entries.remove(old_index);
        self.entries.insert(new_index, file);
        self.reindex();
        self.version += 1;
        true
    }

    /// Toggle the selection of a file.
    ///
    /// Without `multi`, every other file is deselected. Returns `false` if the
    /// id is unknown.
    pub fn toggle_select(&mut self, id: FileId, multi: bool) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };

        let now_selected = !self.entries[index].selected;
        if !multi {
            for file in &mut self.entries {
                file.selected = false;
            }
        }
        self.entries[index].selected = now_selected;
        self.version += 1;
        true
    }

    /// Number of selected files.
    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|f| f.selected).count()
    }

    /// Sum of the sizes of all files.
    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|f| f.size).sum()
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate files in merge order.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedFile> {
        self.entries.iter()
    }

    /// Look up a file by id.
    pub fn get(&self, id: FileId) -> Option<&QueuedFile> {
        self.entries.iter().find(|f| f.id == id)
    }

    /// Look up a file by position.
    pub fn get_at(&self, index: usize) -> Option<&QueuedFile> {
        self.entries.get(index)
    }

    /// Mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Ordered copy of the entries. Contents are shared, not copied.
    pub fn snapshot(&self) -> Vec<QueuedFile> {
        self.entries.clone()
    }

    fn position(&self, id: FileId) -> Option<usize> {
        self.entries.iter().position(|f| f.id == id)
    }

    fn retain<F>(&mut self, keep: F) -> usize
    where
        F: FnMut(&QueuedFile) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(keep);
        let removed = before - self.entries.len();

        if removed > 0 {
            self.reindex();
            self.version += 1;
        }
        removed
    }

    fn reindex(&mut self) {
        for (index, file) in self.entries.iter_mut().enumerate() {
            file.display_order = index;
        }
    }
}
