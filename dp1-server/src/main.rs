mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dp1_api::{build_router, AppState};
use dp1_core::ports::{InMemoryKv, InMemoryQueue};
use dp1_core::{logging, Config, QueueConsumer, StorageEngine, WriteCoordinator};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    logging::init(&config.logging);

    info!(
        host = %config.server.host,
        port = config.server.port,
        min_dp_version = %config.dp_version.min_dp_version,
        "dp1-server starting"
    );

    if config.signing.ed25519_private_key.trim().is_empty() {
        warn!("no signing key configured; writes will fail at first signing attempt");
    } else {
        dp1_core::crypto::init_signing_key(&config.signing.ed25519_private_key)
            .context("failed to initialize signing key")?;
        info!("signing key initialized");
    }

    let kv = InMemoryKv::new();
    let queue = InMemoryQueue::new();

    let engine = Arc::new(StorageEngine::new(
        kv,
        config.resolver.self_hosted_domains.clone(),
        config.resolver.fetch_timeout_secs,
        config.dp_version.min_dp_version.clone(),
    ));
    let coordinator = Arc::new(WriteCoordinator::new(
        engine.clone(),
        queue.clone(),
        config.dp_version.min_dp_version.clone(),
    ));
    let consumer = Arc::new(QueueConsumer::new(engine.clone(), queue));

    let state = AppState {
        engine,
        coordinator,
        consumer: consumer.clone(),
        config: Arc::new(config.clone()),
    };

    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    let drain_handle = tokio::spawn(drain_queue_forever(
        consumer,
        cli.queue_batch_size,
        cli.queue_idle_millis,
    ));

    let server = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!(error = %err, "HTTP server exited with an error");
            }
        }
        _ = drain_handle => {
            error!("queue drain task exited unexpectedly");
        }
    }

    info!("dp1-server shutting down");
    Ok(())
}

/// Continuously pulls batches off the Queue Port and applies them to the
/// Storage Engine, independent of the HTTP `/queues/process-*` endpoints.
/// Sleeps between polls whenever the queue has nothing ready.
async fn drain_queue_forever(consumer: Arc<QueueConsumer>, batch_size: usize, idle_millis: u64) {
    loop {
        match consumer.process_batch(batch_size).await {
            Ok(Some(result)) => {
                if !result.all_succeeded() {
                    warn!(errors = ?result.errors, "queue drain batch had failures");
                }
            }
            Ok(None) => {
                tokio::time::sleep(std::time::Duration::from_millis(idle_millis)).await;
            }
            Err(err) => {
                error!(error = %err, "queue drain batch failed");
                tokio::time::sleep(std::time::Duration::from_millis(idle_millis)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
