//! Domain and business logic for a DP-1 feed operator service: resource
//! model and validation, Ed25519 signing, the KV and queue port
//! abstractions, the multi-index storage engine, and the write/queue
//! coordinators built on top of them. HTTP concerns live in `dp1-api`.

pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod models;
pub mod ports;
pub mod queue_consumer;
pub mod storage;
pub mod write_coordinator;

pub use config::Config;
pub use error::{Error, Result};
pub use queue_consumer::{BatchResult, QueueConsumer};
pub use storage::StorageEngine;
pub use write_coordinator::{WriteCoordinator, WriteOperation, WriteOperationMessage, WriteResult};
