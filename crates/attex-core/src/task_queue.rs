//! Ordered work distribution for the download stage.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-free queue that hands out items in insertion order.
///
/// Workers call [`next()`](TaskQueue::next) to atomically claim the next
/// item. Claims follow manifest order even with many workers; only
/// completion may happen out of order.
pub struct TaskQueue<T> {
    items: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> TaskQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next item, or `None` when drained.
    pub fn next(&self) -> Option<&T> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.items.get(i)
    }

    /// Total items in the queue.
    pub fn total(&self) -> usize {
        self.items.len()
    }
}
