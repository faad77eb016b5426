use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

const DEFAULT_RETRY_LIMIT: u32 = 3;

/// The shared queue of piece indices still to be downloaded.
///
/// Claiming is mutually exclusive across sessions, so no two sessions
/// work the same piece at the same time. A failed piece may be returned
/// with [`put_back`](WorkQueue::put_back); only re-enqueues count against
/// the retry budget, and once a piece exhausts it the index is dropped
/// permanently.
pub struct WorkQueue {
    inner: Mutex<State>,
    retry_limit: u32,
}

struct State {
    pending: VecDeque<u32>,
    retries: HashMap<u32, u32>,
}

impl WorkQueue {
    /// Creates a queue seeded with pieces `0..piece_count` in order.
    pub fn new(piece_count: u32) -> Self {
        Self::with_retry_limit(piece_count, DEFAULT_RETRY_LIMIT)
    }

    pub fn with_retry_limit(piece_count: u32, retry_limit: u32) -> Self {
        Self {
            inner: Mutex::new(State {
                pending: (0..piece_count).collect(),
                retries: HashMap::new(),
            }),
            retry_limit,
        }
    }

    /// Claims the next pending piece index.
    pub fn claim(&self) -> Option<u32> {
        self.inner.lock().pending.pop_front()
    }

    /// Returns a failed piece to the queue. Returns `false` when the
    /// piece has used up its retries and was dropped instead.
    pub fn put_back(&self, index: u32) -> bool {
        let mut state = self.inner.lock();
        let retries = state.retries.entry(index).or_default();
        if *retries >= self.retry_limit {
            return false;
        }
        *retries += 1;
        state.pending.push_back(index);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
