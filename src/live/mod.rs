//! Live news ingestion: event stream decoding, bounded newest-first buffers,
//! scoped subscriptions and the rotating ticker.

pub mod feed;
pub mod sse;
pub mod ticker;

pub use feed::{FeedSeeder, LiveFeed};
pub use sse::{SseDecoder, SseEvent};
pub use ticker::{Ticker, TickerDriver};

use std::collections::VecDeque;

/// Newest-first buffer that never holds more than `capacity` items.
///
/// `revision` increases on every change so readers can tell a new head apart
/// from an unchanged buffer.
#[derive(Debug, Clone)]
pub struct LiveBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    revision: u64,
}

impl<T> LiveBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            revision: 0,
        }
    }

    /// Prepend an item, evicting the oldest past capacity.
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        self.items.push_front(item);
        self.items.truncate(self.capacity);
        self.revision += 1;
    }

    /// Replace the contents with `items` (already newest-first).
    pub fn seed(&mut self, items: impl IntoIterator<Item = T>) {
        self.items = items.into_iter().take(self.capacity).collect();
        self.revision += 1;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> LiveBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut buffer = LiveBuffer::new(10);
        for i in 0..25 {
            buffer.push(i);
            assert!(buffer.len() <= 10);
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.get(0), Some(&24));
        assert_eq!(buffer.get(9), Some(&15));
        assert_eq!(buffer.revision(), 25);
    }

    #[test]
    fn test_seed_replaces_and_truncates() {
        let mut buffer = LiveBuffer::new(3);
        buffer.push("old");
        buffer.seed(vec!["a", "b", "c", "d"]);
        assert_eq!(buffer.to_vec(), vec!["a", "b", "c"]);
        assert_eq!(buffer.revision(), 2);
    }

    #[test]
    fn test_zero_capacity_stays_empty() {
        let mut buffer = LiveBuffer::new(0);
        buffer.push(1);
        assert!(buffer.is_empty());
    }
}
