use bytes::Bytes;

use super::*;

#[test]
fn queue_claims_in_order() {
    let queue = WorkQueue::new(3);
    assert_eq!(queue.claim(), Some(0));
    assert_eq!(queue.claim(), Some(1));
    assert_eq!(queue.claim(), Some(2));
    assert_eq!(queue.claim(), None);
    assert!(queue.is_empty());
}

#[test]
fn queue_requeues_until_retry_cap() {
    let queue = WorkQueue::new(1);
    assert_eq!(queue.claim(), Some(0));

    // Default cap: three re-enqueues, then the piece is dropped.
    for _ in 0..3 {
        assert!(queue.put_back(0));
        assert_eq!(queue.claim(), Some(0));
    }
    assert!(!queue.put_back(0));
    assert!(queue.is_empty());
}

#[test]
fn queue_retry_budgets_are_per_piece() {
    let queue = WorkQueue::with_retry_limit(2, 1);
    assert_eq!(queue.claim(), Some(0));
    assert!(queue.put_back(0));
    assert!(!queue.put_back(0));

    // Piece 1 still has its own budget.
    assert_eq!(queue.claim(), Some(1));
    assert_eq!(queue.claim(), Some(0));
    assert!(queue.put_back(1));
}

#[test]
fn store_commits_each_piece_at_most_once() {
    let store = PieceStore::new(2);

    assert!(store.commit(0, Bytes::from_static(b"first")));
    assert!(!store.commit(0, Bytes::from_static(b"second")));
    assert!(store.contains(0));
    assert_eq!(store.len(), 1);

    // The original data wins.
    assert_eq!(store.assemble().as_ref(), b"first");
}

#[test]
fn store_reports_missing_indices_in_order() {
    let store = PieceStore::new(4);
    store.commit(2, Bytes::from_static(b"c"));

    assert!(!store.is_complete());
    assert_eq!(store.missing(), vec![0, 1, 3]);
}

#[test]
fn store_assembles_in_index_order() {
    let store = PieceStore::new(3);
    store.commit(2, Bytes::from_static(b"!"));
    store.commit(0, Bytes::from_static(b"hello "));
    store.commit(1, Bytes::from_static(b"world"));

    assert!(store.is_complete());
    assert_eq!(store.assemble().as_ref(), b"hello world!");
}
