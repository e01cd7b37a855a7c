use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub body: Vec<u8>,
    pub retry_count: u32,
}

/// Opaque handle identifying a delivered batch, returned by `receive_batch`
/// and consumed by exactly one of `ack`/`nack`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(u64);

#[derive(Debug, Clone)]
pub struct ReceivedBatch {
    pub id: BatchId,
    pub messages: Vec<QueueMessage>,
}

/// Durable, at-least-once message channel. Redelivery after `nack` is at
/// the implementation's discretion (visibility timeout, immediate requeue,
/// etc.); batch-level ack/nack is all-or-nothing.
#[async_trait]
pub trait Queue: Send + Sync {
    async fn publish(&self, body: Vec<u8>) -> Result<()>;
    async fn publish_batch(&self, bodies: Vec<Vec<u8>>) -> Result<()>;
    /// Returns `None` when nothing is currently available.
    async fn receive_batch(&self, max_messages: usize) -> Result<Option<ReceivedBatch>>;
    async fn ack(&self, batch: BatchId) -> Result<()>;
    async fn nack(&self, batch: BatchId) -> Result<()>;
}

struct Envelope {
    body: Vec<u8>,
    retry_count: u32,
}

/// Reference implementation used for tests and the single-process profile.
/// Production profiles swap this for `CloudflareQueue` or `NatsJetStream`
/// behind the same trait; that wiring is outside the core's scope.
#[derive(Default)]
pub struct InMemoryQueue {
    ready: Mutex<VecDeque<Envelope>>,
    in_flight: Mutex<HashMap<u64, Vec<Envelope>>>,
    next_batch_id: AtomicU64,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn publish(&self, body: Vec<u8>) -> Result<()> {
        self.ready.lock().await.push_back(Envelope { body, retry_count: 0 });
        Ok(())
    }

    async fn publish_batch(&self, bodies: Vec<Vec<u8>>) -> Result<()> {
        let mut ready = self.ready.lock().await;
        for body in bodies {
            ready.push_back(Envelope { body, retry_count: 0 });
        }
        Ok(())
    }

    async fn receive_batch(&self, max_messages: usize) -> Result<Option<ReceivedBatch>> {
        let mut ready = self.ready.lock().await;
        if ready.is_empty() {
            return Ok(None);
        }

        let taken: Vec<Envelope> = (0..max_messages).filter_map(|_| ready.pop_front()).collect();
        let messages = taken.iter().map(|e| QueueMessage { body: e.body.clone(), retry_count: e.retry_count }).collect();

        let id = self.next_batch_id.fetch_add(1, Ordering::SeqCst);
        self.in_flight.lock().await.insert(id, taken);

        Ok(Some(ReceivedBatch { id: BatchId(id), messages }))
    }

    async fn ack(&self, batch: BatchId) -> Result<()> {
        self.in_flight.lock().await.remove(&batch.0);
        Ok(())
    }

    async fn nack(&self, batch: BatchId) -> Result<()> {
        if let Some(mut envelopes) = self.in_flight.lock().await.remove(&batch.0) {
            let mut ready = self.ready.lock().await;
            for envelope in &mut envelopes {
                envelope.retry_count += 1;
            }
            for envelope in envelopes {
                ready.push_back(envelope);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ack_removes_batch_from_in_flight() {
        let queue = InMemoryQueue::new();
        queue.publish(b"hello".to_vec()).await.unwrap();
        let batch = queue.receive_batch(10).await.unwrap().unwrap();
        queue.ack(batch.id).await.unwrap();
        assert!(queue.receive_batch(10).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn nack_redelivers_with_incremented_retry_count() {
        let queue = InMemoryQueue::new();
        queue.publish(b"hello".to_vec()).await.unwrap();
        let batch = queue.receive_batch(10).await.unwrap().unwrap();
        assert_eq!(batch.messages[0].retry_count, 0);
        queue.nack(batch.id).await.unwrap();

        let redelivered = queue.receive_batch(10).await.unwrap().unwrap();
        assert_eq!(redelivered.messages[0].retry_count, 1);
    }

    #[tokio::test]
    async fn publish_batch_enqueues_all_messages() {
        let queue = InMemoryQueue::new();
        queue.publish_batch(vec![b"a".to_vec(), b"b".to_vec()]).await.unwrap();
        let batch = queue.receive_batch(10).await.unwrap().unwrap();
        assert_eq!(batch.messages.len(), 2);
    }
}
