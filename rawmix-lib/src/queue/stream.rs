//! Per-stream byte FIFO with end-of-stream and drop bookkeeping.

use std::collections::VecDeque;

use crate::error::MixError;

/// Buffered bytes for one registered stream.
///
/// The queue grows at the tail as payloads arrive and shrinks at the head as
/// the mix consumes them. `to_drop` is a debt of bytes whose time has already
/// been emitted (as silence or skipped output); incoming payloads pay the debt
/// off before anything reaches the buffer.
#[derive(Debug, Default, Clone)]
pub struct StreamQueue {
    pending: VecDeque<u8>,
    ended: bool,
    to_drop: usize,
}

impl StreamQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// `true` once end-of-stream has been marked.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// `true` when the stream has ended and its buffer is drained.
    pub fn is_finished(&self) -> bool {
        self.ended && self.pending.is_empty()
    }

    /// Bytes still owed before new payloads reach the buffer again.
    pub fn pending_drop(&self) -> usize {
        self.to_drop
    }

    pub fn mark_ended(&mut self) {
        self.ended = true;
    }

    /// Record `extra` bytes of already-emitted time to discard from future payloads.
    pub fn add_to_drop(&mut self, extra: usize) {
        self.to_drop += extra;
    }

    /// Append a payload, discarding the prefix still owed to `to_drop`.
    pub fn push(&mut self, payload: &[u8]) {
        let dropped = self.to_drop.min(payload.len());
        self.to_drop -= dropped;
        self.pending.extend(payload[dropped..].iter().copied());
    }

    /// Remove exactly `count` bytes from the front.
    pub fn extract(&mut self, count: usize) -> Result<Vec<u8>, MixError> {
        if self.pending.len() < count {
            return Err(MixError::InsufficientData {
                requested: count,
                available: self.pending.len(),
            });
        }
        Ok(self.pending.drain(0..count).collect())
    }

    /// Remove up to `count` bytes from the front.
    pub fn take_up_to(&mut self, count: usize) -> Vec<u8> {
        let take = count.min(self.pending.len());
        self.pending.drain(0..take).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pushes_then_extracts_in_order() {
        let mut queue = StreamQueue::new();
        queue.push(&[1, 2, 3]);
        queue.push(&[4, 5]);
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.extract(4).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(queue.extract(1).unwrap(), vec![5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn extract_reports_shortfall_without_consuming() {
        let mut queue = StreamQueue::new();
        queue.push(&[1, 2, 3]);
        assert_eq!(
            queue.extract(5),
            Err(MixError::InsufficientData {
                requested: 5,
                available: 3,
            })
        );
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn take_up_to_returns_what_is_there() {
        let mut queue = StreamQueue::new();
        queue.push(&[7, 8]);
        assert_eq!(queue.take_up_to(10), vec![7, 8]);
        assert!(queue.take_up_to(10).is_empty());
    }

    #[test]
    fn to_drop_consumes_payload_prefixes_across_pushes() {
        let mut queue = StreamQueue::new();
        queue.add_to_drop(5);
        queue.push(&[1, 2, 3]);
        assert!(queue.is_empty());
        assert_eq!(queue.pending_drop(), 2);
        queue.push(&[4, 5, 6, 7]);
        assert_eq!(queue.pending_drop(), 0);
        assert_eq!(queue.take_up_to(4), vec![6, 7]);

        // Once paid off, later payloads flow through untouched.
        queue.push(&[8]);
        assert_eq!(queue.take_up_to(1), vec![8]);
    }

    #[test]
    fn finished_requires_ended_and_drained() {
        let mut queue = StreamQueue::new();
        queue.push(&[1]);
        assert!(!queue.is_finished());
        queue.mark_ended();
        assert!(queue.is_ended());
        assert!(!queue.is_finished());
        queue.take_up_to(1);
        assert!(queue.is_finished());
    }
}
