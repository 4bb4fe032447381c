//! The output document under construction.

use lopdf::{Document, Object, ObjectId, SaveOptions, dictionary};
use tracing::debug;

use crate::error::Result;
use crate::io::stager::StagedMime;
use crate::merge::images::{add_image_page, image_xobject};
use crate::merge::pages::{import_pages, load_source};

/// PDF version of the output. Object streams need 1.5 or later.
const OUTPUT_VERSION: &str = "1.7";

/// Deflate level for object streams.
const OBJECT_STREAM_COMPRESSION: u32 = 6;

/// A single-level page tree that files are appended to.
///
/// Each append either adds all of a file's pages or none of them.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl OutputDocument {
    /// Create an empty document: a catalog and a page tree with no pages.
    pub fn new() -> Self {
        let mut doc = Document::with_version(OUTPUT_VERSION);
        let pages_id = doc.new_object_id();

        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0i64,
            }
            .into(),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Append every page of a PDF. Returns the number of pages added.
    pub fn append_pdf(&mut self, bytes: &[u8]) -> Result<usize> {
        let source = load_source(bytes)?;
        let page_ids = import_pages(&mut self.doc, self.pages_id, source)?;

        let added = page_ids.len();
        self.kids.extend(page_ids);
        Ok(added)
    }

    /// Append an image as a page of its own.
    pub fn append_image(&mut self, mime: StagedMime, bytes: &[u8]) -> Result<()> {
        let image = image_xobject(mime, bytes)?;
        let page_id = add_image_page(&mut self.doc, self.pages_id, image)?;
        self.kids.push(page_id);
        Ok(())
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Serialize the document.
    ///
    /// Writes the page tree, drops objects no page reaches, renumbers objects
    /// densely and deflates every stream without a filter. Non-stream objects
    /// are packed into object streams behind a cross-reference stream.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| id.into()).collect();
        self.doc.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.kids.len() as i64,
            }
            .into(),
        );

        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc.compress();

        let options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .compression_level(OBJECT_STREAM_COMPRESSION)
            .build();

        let mut out = Vec::new();
        self.doc.save_with_options(&mut out, options)?;

        debug!(
            pages = self.kids.len(),
            bytes = out.len(),
            "Output document serialized"
        );
        Ok(out)
    }
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}
