use std::sync::Arc;

use dp1_core::{Config, QueueConsumer, StorageEngine, WriteCoordinator};

/// Shared application state handed to every handler via axum's `State`
/// extractor.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<StorageEngine>,
    pub coordinator: Arc<WriteCoordinator>,
    pub consumer: Arc<QueueConsumer>,
    pub config: Arc<Config>,
}
