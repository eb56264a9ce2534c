//! Ordered packet buffer behind the queue discipline.
//!
//! The store only keeps packets in arrival order and counts them. Capacity
//! is enforced by the admission controller, never by the store.

use std::collections::VecDeque;

/// Anything that can sit in a queue and report its size in bytes.
pub trait QueueItem {
    fn size(&self) -> usize;
}

/// Minimal packet used by the simulator and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    pub id: u64,
    /// Size on the wire, in bytes.
    pub size: usize,
}

impl Packet {
    pub fn new(id: u64, size: usize) -> Self {
        Self { id, size }
    }
}

impl QueueItem for Packet {
    fn size(&self) -> usize {
        self.size
    }
}

/// FIFO buffer contract used by [`KemyQueueDisc`](super::KemyQueueDisc).
pub trait PacketStore {
    type Item: QueueItem;

    fn push_back(&mut self, item: Self::Item);

    fn pop_front(&mut self) -> Option<Self::Item>;

    fn peek(&self) -> Option<&Self::Item>;

    fn packet_count(&self) -> usize;

    fn byte_count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.packet_count() == 0
    }
}

/// `VecDeque`-backed store with a running byte total.
#[derive(Debug, Clone)]
pub struct FifoStore<P = Packet> {
    items: VecDeque<P>,
    bytes: usize,
}

impl<P> Default for FifoStore<P> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            bytes: 0,
        }
    }
}

impl<P: QueueItem> FifoStore<P> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: QueueItem> PacketStore for FifoStore<P> {
    type Item = P;

    fn push_back(&mut self, item: P) {
        self.bytes += item.size();
        self.items.push_back(item);
    }

    fn pop_front(&mut self) -> Option<P> {
        let item = self.items.pop_front()?;
        self.bytes = self.bytes.saturating_sub(item.size());
        Some(item)
    }

    fn peek(&self) -> Option<&P> {
        self.items.front()
    }

    fn packet_count(&self) -> usize {
        self.items.len()
    }

    fn byte_count(&self) -> usize {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order_and_counts() {
        let mut store = FifoStore::new();
        assert!(store.is_empty());

        store.push_back(Packet::new(1, 100));
        store.push_back(Packet::new(2, 1500));
        assert_eq!(store.packet_count(), 2);
        assert_eq!(store.byte_count(), 1600);
        assert_eq!(store.peek().map(|p| p.id), Some(1));

        assert_eq!(store.pop_front(), Some(Packet::new(1, 100)));
        assert_eq!(store.byte_count(), 1500);
        assert_eq!(store.pop_front().map(|p| p.id), Some(2));
        assert_eq!(store.pop_front(), None);
        assert_eq!(store.byte_count(), 0);
    }
}
