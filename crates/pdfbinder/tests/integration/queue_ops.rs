//! Integration tests for queue editing ahead of a merge.

use pdfbinder::config::MergeOptions;
use pdfbinder::queue::FileKind;

use crate::common::{jpeg_file, pdf_file, queue_of, run_merge, page_widths};

#[tokio::test]
async fn test_removed_files_are_not_merged() {
    let mut queue = queue_of(vec![
        pdf_file("a.pdf", &[100]),
        pdf_file("b.pdf", &[200]),
        pdf_file("c.pdf", &[300]),
    ]);
    let b = queue.get_at(1).unwrap().id;

    assert_eq!(queue.remove(&[b]), 1);
    let orders: Vec<usize> = queue.iter().map(|f| f.display_order).collect();
    assert_eq!(orders, [0, 1]);

    let result = run_merge(&queue, MergeOptions::default()).await;
    assert_eq!(page_widths(&result.output.unwrap()), [100, 300]);
}

#[tokio::test]
async fn test_selection_does_not_affect_output() {
    let mut queue = queue_of(vec![pdf_file("a.pdf", &[100]), pdf_file("b.pdf", &[200])]);
    let a = queue.get_at(0).unwrap().id;
    queue.toggle_select(a, false);
    assert_eq!(queue.selected_count(), 1);

    let result = run_merge(&queue, MergeOptions::default()).await;
    assert_eq!(page_widths(&result.output.unwrap()), [100, 200]);
}

#[test]
fn test_remove_selected_then_reorder() {
    let mut queue = queue_of(vec![
        pdf_file("a.pdf", &[100]),
        jpeg_file("b.jpg", 10, 10),
        pdf_file("c.pdf", &[300]),
        pdf_file("d.pdf", &[400]),
    ]);
    let ids: Vec<_> = queue.iter().map(|f| f.id).collect();

    queue.toggle_select(ids[0], true);
    queue.toggle_select(ids[2], true);
    assert_eq!(queue.remove_selected(), 2);

    assert!(queue.reorder(ids[3], 0));
    assert!(!queue.reorder(ids[3], 0));
    assert!(!queue.reorder(ids[0], 0));

    let names: Vec<&str> = queue.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["d.pdf", "b.jpg"]);
    assert_eq!(queue.get(ids[1]).unwrap().kind, FileKind::Image);
}
