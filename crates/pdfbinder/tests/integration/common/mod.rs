//! Shared fixtures for the integration tests.
//!
//! Every fixture is generated in memory: PDFs with lopdf, rasters with image.
//! A page's MediaBox width identifies where it came from.

#![allow(dead_code)]

use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use lopdf::{Document, Object, dictionary};
use pdfbinder::config::{MergeOptions, PipelineConfig};
use pdfbinder::io::{DeliveryTarget, OutputDelivery};
use pdfbinder::merge::{MergeRunner, RunOutcome};
use pdfbinder::queue::{FileQueue, IncomingFile, PDF_MIME};
use pdfbinder::status::RunState;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A PDF with one page per entry in `widths`.
pub fn pdf_with_widths(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = widths
        .iter()
        .map(|&width| {
            let content_id = doc.add_object(lopdf::Stream::new(
                lopdf::Dictionary::new(),
                b"0 0 m 10 10 l S".to_vec(),
            ));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), 792i64.into()],
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("Failed to save fixture PDF");
    out
}

/// Encoded RGB raster.
pub fn raster(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])))
        .write_to(&mut out, format)
        .expect("Failed to encode fixture image");
    out.into_inner()
}

/// Encoded RGBA PNG with transparent pixels.
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .expect("Failed to encode fixture image");
    out.into_inner()
}

/// An incoming PDF.
pub fn pdf_file(name: &str, widths: &[i64]) -> IncomingFile {
    IncomingFile::new(name, PDF_MIME, pdf_with_widths(widths))
}

/// An incoming JPEG.
pub fn jpeg_file(name: &str, width: u32, height: u32) -> IncomingFile {
    IncomingFile::new(name, "image/jpeg", raster(width, height, ImageFormat::Jpeg))
}

/// An incoming PNG.
pub fn png_file(name: &str, width: u32, height: u32) -> IncomingFile {
    IncomingFile::new(name, "image/png", raster(width, height, ImageFormat::Png))
}

/// An incoming PNG that is fully transparent.
pub fn transparent_png_file(name: &str, width: u32, height: u32) -> IncomingFile {
    IncomingFile::new(name, "image/png", transparent_png(width, height))
}

/// Raw data of every image XObject in `bytes`.
pub fn embedded_images(bytes: &[u8]) -> Vec<Vec<u8>> {
    let doc = Document::load_mem(bytes).expect("Output is not a valid PDF");
    doc.objects
        .values()
        .filter_map(|obj| match obj {
            Object::Stream(stream)
                if stream.dict.get(b"Subtype").and_then(Object::as_name).ok()
                    == Some(b"Image".as_slice()) =>
            {
                Some(stream.content.clone())
            }
            _ => None,
        })
        .collect()
}

/// An incoming file that claims to be a PDF but is not.
pub fn corrupt_pdf(name: &str) -> IncomingFile {
    IncomingFile::new(name, PDF_MIME, b"%PDF-1.7\nthis is not a pdf body".to_vec())
}

/// An incoming file that claims to be an image but is not.
pub fn corrupt_image(name: &str) -> IncomingFile {
    IncomingFile::new(name, "image/png", b"\x89PNG definitely broken".to_vec())
}

/// A queue holding `files` in order.
pub fn queue_of(files: Vec<IncomingFile>) -> FileQueue {
    let mut queue = FileQueue::new();
    queue.add_files(files).expect("Fixture batch was rejected");
    queue
}

/// MediaBox width and height of every page, in page order.
pub fn page_sizes(bytes: &[u8]) -> Vec<(f64, f64)> {
    let doc = Document::load_mem(bytes).expect("Output is not a PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_dictionary(id).expect("Page is not a dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(Object::as_array)
                .expect("Page has no MediaBox");
            let number = |o: &Object| {
                o.as_float()
                    .map(f64::from)
                    .or_else(|_| o.as_i64().map(|v| v as f64))
            };
            (
                number(&media_box[2]).expect("Bad MediaBox"),
                number(&media_box[3]).expect("Bad MediaBox"),
            )
        })
        .collect()
}

/// Page widths, rounded, in page order.
pub fn page_widths(bytes: &[u8]) -> Vec<i64> {
    page_sizes(bytes).into_iter().map(|(w, _)| w.round() as i64).collect()
}

/// Result of [`run_merge`].
pub struct MergeResult {
    pub outcome: RunOutcome,
    pub updates: Vec<RunState>,
    pub output: Option<Vec<u8>>,
    pub dir: TempDir,
}

/// Run one merge of `queue` into a fresh temporary directory.
pub async fn run_merge(queue: &FileQueue, options: MergeOptions) -> MergeResult {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let delivery = OutputDelivery::to_directory(dir.path(), "PdfBinder");
    let runner = MergeRunner::new(PipelineConfig::default()).expect("Default config is valid");

    let run = runner.prepare(queue, options).expect("Run could not be prepared");
    let mut updates = Vec::new();
    let outcome = run.execute(&delivery, |state| updates.push(state.clone())).await;

    let output = outcome
        .receipt
        .as_ref()
        .map(|receipt| std::fs::read(&receipt.path).expect("Receipt points at a missing file"));

    MergeResult {
        outcome,
        updates,
        output,
        dir,
    }
}

/// A delivery target that only counts calls.
#[derive(Debug, Clone, Default)]
pub struct CountingTarget {
    calls: Arc<AtomicUsize>,
}

impl CountingTarget {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DeliveryTarget for CountingTarget {
    fn label(&self) -> &str {
        "counting"
    }

    fn deliver<'a>(
        &'a self,
        file_name: &'a str,
        _data: &'a [u8],
    ) -> BoxFuture<'a, pdfbinder::Result<PathBuf>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from(file_name))
        })
    }
}

/// A delivery whose streaming and fallback targets share one counter.
pub fn counting_delivery() -> (OutputDelivery, CountingTarget) {
    let target = CountingTarget::default();
    let delivery = OutputDelivery::new(
        "PdfBinder",
        Some(Box::new(target.clone())),
        Box::new(target.clone()),
    );
    (delivery, target)
}
