//! Integration tests for successful merges.

use pdfbinder::config::{FitMode, MergeOptions, QualityTier};
use pdfbinder::io::DeliveryMethod;
use pdfbinder::status::{RunPhase, RunStatus};

use crate::common::{
    embedded_images, jpeg_file, page_sizes, page_widths, pdf_file, png_file, queue_of, run_merge,
    transparent_png_file,
};

#[tokio::test]
async fn test_merge_preserves_queue_order() {
    let queue = queue_of(vec![
        pdf_file("a.pdf", &[101, 102]),
        pdf_file("b.pdf", &[201]),
        pdf_file("c.pdf", &[301, 302, 303]),
    ]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.outcome.is_success(), "{:?}", result.outcome.error);
    assert_eq!(result.outcome.page_count, 6);
    assert_eq!(
        page_widths(&result.output.unwrap()),
        [101, 102, 201, 301, 302, 303]
    );
}

#[tokio::test]
async fn test_reorder_changes_output_order() {
    let mut queue = queue_of(vec![pdf_file("a.pdf", &[100]), pdf_file("b.pdf", &[200])]);
    let b = queue.get_at(1).unwrap().id;
    assert!(queue.reorder(b, 0));

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert_eq!(page_widths(&result.output.unwrap()), [200, 100]);
}

#[tokio::test]
async fn test_mixed_pdfs_and_images() {
    let queue = queue_of(vec![
        jpeg_file("cover.jpg", 640, 480),
        pdf_file("body.pdf", &[612, 613]),
        png_file("chart.png", 320, 200),
    ]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.outcome.is_success());
    assert_eq!(page_widths(&result.output.unwrap()), [640, 612, 613, 320]);
}

#[tokio::test]
async fn test_transparent_image_lands_on_white() {
    let queue = queue_of(vec![transparent_png_file("logo.png", 8, 8)]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.outcome.is_success());
    let output = result.output.unwrap();
    assert_eq!(page_widths(&output), [8]);

    let images = embedded_images(&output);
    assert_eq!(images.len(), 1);
    let decoded = image::load_from_memory(&images[0]).unwrap().to_rgb8();
    assert!(decoded.pixels().all(|p| p.0.iter().all(|&c| c >= 250)));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let queue = queue_of(vec![
        png_file("a.png", 50, 50),
        pdf_file("b.pdf", &[100]),
        png_file("c.png", 60, 40),
    ]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    let progress: Vec<f64> = result.updates.iter().map(|s| s.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{progress:?}");
    assert_eq!(*progress.last().unwrap(), 100.0);

    let first = result.updates.first().unwrap();
    assert_eq!(first.message, "Preparing files for processing...");
    assert_eq!(first.phase, Some(RunPhase::Staging));

    assert!(result.updates.iter().any(|s| s.message == "Saving final document..."));
    assert!(result.updates.iter().any(|s| s.phase == Some(RunPhase::Delivering)));

    let last = result.updates.last().unwrap();
    assert_eq!(last.status, RunStatus::Completed);
    assert_eq!(last.message, "Merge successful!");
}

#[tokio::test]
async fn test_staging_messages_name_files() {
    let queue = queue_of(vec![png_file("scan.png", 10, 10)]);

    let result = run_merge(&queue, MergeOptions::default()).await;

    assert!(result.updates.iter().any(|s| s.message == "Optimizing scan.png..."));
    assert!(result.updates.iter().any(|s| s.message == "Merging scan.png..."));
}

#[tokio::test]
async fn test_fit_width_scales_large_images() {
    let queue = queue_of(vec![jpeg_file("wide.jpg", 4000, 2000)]);

    let result = run_merge(&queue, MergeOptions::new(QualityTier::Maximum, FitMode::Width)).await;

    let sizes = page_sizes(&result.output.unwrap());
    let (width, height) = sizes[0];
    assert!(width <= 2480.0);
    assert!((width / height - 2.0).abs() < 0.01);
}

#[tokio::test]
async fn test_compressed_tier_caps_resolution() {
    let queue = queue_of(vec![png_file("big.png", 3000, 1500)]);

    let options = MergeOptions::new(QualityTier::Compressed, FitMode::Original);
    let result = run_merge(&queue, options).await;

    let (width, height) = page_sizes(&result.output.unwrap())[0];
    assert!(width <= 1200.0 && height <= 1200.0);
    assert!((width / height - 2.0).abs() < 0.01);
}

#[tokio::test]
async fn test_output_is_named_and_streamed() {
    let queue = queue_of(vec![pdf_file("a.pdf", &[100])]);

    let result = run_merge(&queue, MergeOptions::default()).await;
    let receipt = result.outcome.receipt.as_ref().unwrap();

    assert_eq!(receipt.method, DeliveryMethod::Streamed);
    assert!(receipt.file_name.starts_with("PdfBinder_Merged_"));
    assert!(receipt.file_name.ends_with(".pdf"));
    assert!(!receipt.file_name.contains(':'));
    assert_eq!(receipt.path.parent().unwrap(), result.dir.path());

    let leftovers: Vec<_> = std::fs::read_dir(result.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temporary files left behind: {leftovers:?}");
}

#[tokio::test]
async fn test_runner_is_reusable_after_a_run() {
    let queue = queue_of(vec![pdf_file("a.pdf", &[100])]);

    let first = run_merge(&queue, MergeOptions::default()).await;
    let second = run_merge(&queue, MergeOptions::default()).await;

    assert!(first.outcome.is_success());
    assert!(second.outcome.is_success());
}
