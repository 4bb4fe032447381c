//! Integration tests for failing inputs and failing runs.

use pdfbinder::PdfBinderError;
use pdfbinder::config::{MergeOptions, PipelineConfig};
use pdfbinder::io::{DownloadTarget, OutputDelivery, StreamingFileTarget};
use pdfbinder::merge::MergeRunner;
use pdfbinder::queue::{FileQueue, IncomingFile};
use pdfbinder::status::RunStatus;
use tempfile::TempDir;

use crate::common::{
    corrupt_image, corrupt_pdf, pdf_file, png_file, queue_of, run_merge, page_widths,
};

#[tokio::test]
async fn test_one_corrupt_pdf_of_five_is_skipped() {
    let queue = queue_of(vec![
        pdf_file("1.pdf", &[100]),
        pdf_file("2.pdf", &[200]),
        corrupt_pdf("3.pdf"),
        pdf_file("4.pdf", &[400]),
        pdf_file("5.pdf", &[500]),
    ]);

    let result = run_merge(&queue, MergeOptions::default()).await;
    let state = &result.outcome.state;

    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.skipped_files, ["3.pdf"]);
    assert_eq!(
        state.message,
        "Merge completed, but 1 file(s) skipped due to errors."
    );
    assert_eq!(page_widths(&result.output.unwrap()), [100, 200, 400, 500]);
}

#[tokio::test]
async fn test_corrupt_image_is_skipped_during_staging() {
    let queue = queue_of(vec![corrupt_image("bad.png"), png_file("good.png", 30, 20)]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.outcome.is_success());
    assert_eq!(result.outcome.state.skipped_files, ["bad.png"]);
    assert_eq!(page_widths(&result.output.unwrap()), [30]);
}

#[tokio::test]
async fn test_all_invalid_images_never_start_the_executor() {
    let queue = queue_of(vec![corrupt_image("a.png"), corrupt_image("b.png")]);

    let result = run_merge(&queue, MergeOptions::default()).await;
    let outcome = &result.outcome;

    assert!(!outcome.executor_started);
    assert_eq!(outcome.state.status, RunStatus::Errored);
    assert!(matches!(
        outcome.error,
        Some(PdfBinderError::NoValidFiles { failed: 2 })
    ));
    assert!(outcome.state.message.starts_with("Error: "));
    assert!(outcome.receipt.is_none());
    assert_eq!(std::fs::read_dir(result.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_all_pdfs_corrupt_completes_empty() {
    let queue = queue_of(vec![corrupt_pdf("a.pdf"), corrupt_pdf("b.pdf")]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.outcome.executor_started);
    assert!(result.outcome.is_success());
    assert_eq!(result.outcome.page_count, 0);
    assert_eq!(result.outcome.state.skipped_files, ["a.pdf", "b.pdf"]);
}

#[test]
fn test_unsupported_batch_is_rejected() {
    let mut queue = FileQueue::new();
    let result = queue.add_files(vec![
        IncomingFile::new("notes.txt", "text/plain", b"hi".to_vec()),
        IncomingFile::new("data.bin", "application/octet-stream", vec![0, 1]),
    ]);

    assert!(matches!(
        result,
        Err(PdfBinderError::InvalidInput { rejected: 2 })
    ));
    assert!(queue.is_empty());
}

#[test]
fn test_empty_queue_cannot_start() {
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let result = runner.prepare(&FileQueue::new(), MergeOptions::default());

    assert!(matches!(result, Err(PdfBinderError::InvalidInput { .. })));
}

#[tokio::test]
async fn test_streaming_failure_falls_back() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let delivery = OutputDelivery::new(
        "PdfBinder",
        Some(Box::new(StreamingFileTarget::new(&missing))),
        Box::new(DownloadTarget::new(dir.path())),
    );

    let queue = queue_of(vec![pdf_file("a.pdf", &[100])]);
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let outcome = runner
        .prepare(&queue, MergeOptions::default())
        .unwrap()
        .execute(&delivery, |_| {})
        .await;

    let receipt = outcome.receipt.unwrap();
    assert_eq!(receipt.path.parent().unwrap(), dir.path());
    assert_eq!(page_widths(&std::fs::read(&receipt.path).unwrap()), [100]);
}

#[tokio::test]
async fn test_both_delivery_paths_failing_errors_the_run() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");
    let delivery = OutputDelivery::new(
        "PdfBinder",
        Some(Box::new(StreamingFileTarget::new(&missing))),
        Box::new(DownloadTarget::new(&missing)),
    );

    let queue = queue_of(vec![pdf_file("a.pdf", &[100])]);
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let outcome = runner
        .prepare(&queue, MergeOptions::default())
        .unwrap()
        .execute(&delivery, |_| {})
        .await;

    assert_eq!(outcome.state.status, RunStatus::Errored);
    assert!(matches!(outcome.error, Some(PdfBinderError::Delivery { .. })));
    assert_eq!(outcome.exit_code(), 5);
}
