use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::models::audio_models::AudioChunk;

/// Bounded FIFO between the capture thread and the session task.
///
/// Chunks captured before the connection opens, or while a send is in
/// progress, wait here. Overflow drops the oldest chunk so the stream stays
/// close to real time.
#[derive(Debug)]
pub struct OutboundQueue {
    inner: Mutex<QueueInner>,
    capacity: usize,
    notify: Notify,
}

#[derive(Debug, Default)]
struct QueueInner {
    chunks: VecDeque<AudioChunk>,
    dropped: u64,
}

impl OutboundQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(QueueInner {
                chunks: VecDeque::with_capacity(capacity),
                dropped: 0,
            }),
            capacity,
            notify: Notify::new(),
        }
    }

    /// Push a chunk and wake the consumer.
    ///
    /// Returns the chunk that was evicted to make room, if any.
    pub fn push(&self, chunk: AudioChunk) -> Option<AudioChunk> {
        let evicted = {
            let mut inner = self.inner.lock();
            let evicted = if inner.chunks.len() >= self.capacity {
                inner.dropped += 1;
                inner.chunks.pop_front()
            } else {
                None
            };
            inner.chunks.push_back(chunk);
            evicted
        };
        self.notify.notify_one();
        evicted
    }

    pub fn pop(&self) -> Option<AudioChunk> {
        self.inner.lock().chunks.pop_front()
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain(&self) -> Vec<AudioChunk> {
        self.inner.lock().chunks.drain(..).collect()
    }

    /// Future that resolves after the next `push`.
    ///
    /// A push that happened while nobody was waiting is remembered, so a
    /// consumer that checks the queue and then awaits this never misses one.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().chunks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total chunks evicted since creation.
    pub fn dropped_count(&self) -> u64 {
        self.inner.lock().dropped
    }

    pub fn clear(&self) {
        self.inner.lock().chunks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(sequence: u64) -> AudioChunk {
        AudioChunk {
            sequence,
            samples: vec![0.0; 4],
        }
    }

    #[test]
    fn fifo_order() {
        let queue = OutboundQueue::new(4);
        queue.push(chunk(0));
        queue.push(chunk(1));
        queue.push(chunk(2));

        assert_eq!(queue.len(), 3);
        let sequences: Vec<u64> = queue.drain().iter().map(|c| c.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = OutboundQueue::new(2);
        assert!(queue.push(chunk(0)).is_none());
        assert!(queue.push(chunk(1)).is_none());
        let evicted = queue.push(chunk(2)).unwrap();

        assert_eq!(evicted.sequence, 0);
        assert_eq!(queue.dropped_count(), 1);
        assert_eq!(queue.pop().unwrap().sequence, 1);
        assert_eq!(queue.pop().unwrap().sequence, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn zero_capacity_holds_one() {
        let queue = OutboundQueue::new(0);
        assert_eq!(queue.capacity(), 1);
        queue.push(chunk(0));
        queue.push(chunk(1));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().sequence, 1);
    }

    #[tokio::test]
    async fn push_wakes_waiter() {
        let queue = std::sync::Arc::new(OutboundQueue::new(4));
        let producer = queue.clone();
        let handle = tokio::spawn(async move {
            producer.push(chunk(7));
        });

        queue.notified().await;
        handle.await.unwrap();
        assert_eq!(queue.pop().unwrap().sequence, 7);
    }

    #[tokio::test]
    async fn push_before_wait_is_not_lost() {
        let queue = OutboundQueue::new(4);
        queue.push(chunk(1));
        // Permit stored by notify_one resolves immediately.
        queue.notified().await;
        queue.clear();
        assert!(queue.is_empty());
    }
}
