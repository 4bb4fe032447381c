//! Integration tests for cancelling runs.

use pdfbinder::config::{MergeOptions, PipelineConfig};
use pdfbinder::merge::{MergeRunner, RunOutcome};
use pdfbinder::queue::FileQueue;
use pdfbinder::status::{RunPhase, RunState, RunStatus};

use crate::common::{counting_delivery, pdf_file, png_file, queue_of};

fn mixed_queue() -> FileQueue {
    queue_of(vec![
        png_file("a.png", 40, 40),
        pdf_file("b.pdf", &[100, 101]),
        png_file("c.png", 20, 60),
        pdf_file("d.pdf", &[200]),
    ])
}

/// Run `queue`, cancelling as soon as `trigger` matches an update.
async fn run_cancelling_when<P>(queue: &FileQueue, trigger: P) -> (RunOutcome, usize)
where
    P: Fn(&RunState) -> bool,
{
    let (delivery, target) = counting_delivery();
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let run = runner.prepare(queue, MergeOptions::default()).unwrap();
    let token = run.cancel_token();

    let outcome = run
        .execute(&delivery, |state| {
            if trigger(state) {
                token.cancel();
            }
        })
        .await;

    assert!(!runner.is_running());
    (outcome, target.calls())
}

fn assert_cancelled(outcome: &RunOutcome, deliveries: usize) {
    assert_eq!(outcome.state.status, RunStatus::Cancelled);
    assert_eq!(outcome.state.message, "Operation cancelled by user");
    assert!(outcome.receipt.is_none());
    assert!(outcome.error.is_none());
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(deliveries, 0);
}

#[tokio::test]
async fn test_cancel_before_execute() {
    let queue = mixed_queue();
    let (delivery, target) = counting_delivery();
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let run = runner.prepare(&queue, MergeOptions::default()).unwrap();

    run.cancel_token().cancel();
    let outcome = run.execute(&delivery, |_| {}).await;

    assert_cancelled(&outcome, target.calls());
    assert!(!outcome.executor_started);
}

#[tokio::test]
async fn test_cancel_during_staging() {
    let queue = mixed_queue();
    let (outcome, deliveries) =
        run_cancelling_when(&queue, |s| s.message.starts_with("Optimizing")).await;

    assert_cancelled(&outcome, deliveries);
}

#[tokio::test]
async fn test_cancel_during_merge() {
    let queue = mixed_queue();
    let (outcome, deliveries) =
        run_cancelling_when(&queue, |s| s.phase == Some(RunPhase::Merging)).await;

    assert_cancelled(&outcome, deliveries);
    assert!(outcome.executor_started);
}

#[tokio::test]
async fn test_cancel_after_document_completed() {
    let queue = mixed_queue();
    let (outcome, deliveries) =
        run_cancelling_when(&queue, |s| s.phase == Some(RunPhase::Delivering)).await;

    assert_cancelled(&outcome, deliveries);
}

#[tokio::test]
async fn test_cancel_leaves_queue_untouched() {
    let queue = mixed_queue();
    let version = queue.version();
    let names: Vec<String> = queue.iter().map(|f| f.name.clone()).collect();

    let (outcome, _) = run_cancelling_when(&queue, |s| s.phase == Some(RunPhase::Merging)).await;

    assert_eq!(outcome.state.status, RunStatus::Cancelled);
    assert_eq!(queue.version(), version);
    assert_eq!(
        queue.iter().map(|f| f.name.clone()).collect::<Vec<_>>(),
        names
    );
}

#[tokio::test]
async fn test_cancel_is_idempotent_and_final() {
    let queue = mixed_queue();
    let mut updates = Vec::new();
    let (delivery, target) = counting_delivery();
    let runner = MergeRunner::new(PipelineConfig::default()).unwrap();
    let run = runner.prepare(&queue, MergeOptions::default()).unwrap();
    let token = run.cancel_token();

    let outcome = run
        .execute(&delivery, |state| {
            updates.push(state.status);
            if state.phase == Some(RunPhase::Merging) {
                token.cancel();
                token.cancel();
            }
        })
        .await;

    assert_cancelled(&outcome, target.calls());
    assert_eq!(updates.last(), Some(&RunStatus::Cancelled));
    assert_eq!(
        updates.iter().filter(|s| **s == RunStatus::Cancelled).count(),
        1
    );
}

#[tokio::test]
async fn test_uncancelled_run_delivers_once() {
    let queue = mixed_queue();
    let (outcome, deliveries) = run_cancelling_when(&queue, |_| false).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.page_count, 5);
    assert_eq!(deliveries, 1);
}
