pub mod kv;
pub mod queue;

pub use kv::{InMemoryKv, KvListing, KvStore, ListDirection};
pub use queue::{BatchId, InMemoryQueue, Queue, QueueMessage, ReceivedBatch};
