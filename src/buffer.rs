//! FIFO of register writes issued while the charger is unreachable
//!
//! The queue is unbounded: every command issued during an outage is kept
//! until the next successful connect.

use crate::codec::PendingWrite;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct WriteBuffer {
    queue: VecDeque<PendingWrite>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&mut self, write: PendingWrite) {
        self.queue.push_back(write);
    }

    /// Hand entries to `sink` head first, returning how many it accepted
    ///
    /// An entry is removed only once the sink accepts it. When the sink
    /// refuses one (the link dropped mid-drain) draining stops and that entry
    /// and everything behind it stay queued.
    pub fn drain_into<F>(&mut self, mut sink: F) -> usize
    where
        F: FnMut(&PendingWrite) -> bool,
    {
        let mut sent = 0;
        while let Some(head) = self.queue.front() {
            if !sink(head) {
                break;
            }
            self.queue.pop_front();
            sent += 1;
        }
        sent
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued writes, head first
    pub fn iter(&self) -> impl Iterator<Item = &PendingWrite> {
        self.queue.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(writes: &[(u16, u32)]) -> WriteBuffer {
        let mut buffer = WriteBuffer::new();
        for &(r, v) in writes {
            buffer.enqueue(PendingWrite::new(r, v));
        }
        buffer
    }

    #[test]
    fn drains_in_insertion_order() {
        let mut buffer = buffer_of(&[(8198, 2), (8192, 150), (8198, 0)]);
        let mut seen = Vec::new();
        let sent = buffer.drain_into(|w| {
            seen.push((w.register, w.value));
            true
        });
        assert_eq!(sent, 3);
        assert_eq!(seen, vec![(8198, 2), (8192, 150), (8198, 0)]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn refused_entry_stays_at_head() {
        let mut buffer = buffer_of(&[(1, 1), (2, 2), (3, 3)]);
        let mut budget = 1;
        let sent = buffer.drain_into(|_| {
            if budget == 0 {
                return false;
            }
            budget -= 1;
            true
        });
        assert_eq!(sent, 1);
        let left: Vec<_> = buffer.iter().map(|w| w.register).collect();
        assert_eq!(left, vec![2, 3]);
    }

    #[test]
    fn duplicates_are_kept() {
        let mut buffer = buffer_of(&[(8198, 2), (8198, 2)]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.drain_into(|_| true), 2);
    }

    #[test]
    fn empty_drain_never_calls_sink() {
        let mut buffer = WriteBuffer::new();
        let sent = buffer.drain_into(|_| panic!("sink called on empty buffer"));
        assert_eq!(sent, 0);
    }
}
