use anyhow::{Context, Result};
use mimir_index::Store;
use mimir_runtime::{Config, Coordinator, EventBus, Subscription};
use std::io::Write;
use tokio_util::sync::CancellationToken;

pub fn handle(config: &Config, sse: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(serve(config, sse))
}

async fn serve(config: &Config, sse: bool) -> Result<()> {
    let store = Store::connect(&config.resolved_db_path()?)?;
    let bus = EventBus::new(config.subscriber_capacity);
    let cancel = CancellationToken::new();

    // Subscribe before the watcher starts so no notification is missed.
    let subscription = bus.subscribe();
    let coordinator = Coordinator::start(config, store, bus).await?;
    let consumer = tokio::spawn(consume(subscription, cancel.clone(), sse));

    tracing::info!(
        projects = coordinator.projects_discovered(),
        "Watching for changes, press Ctrl-C to stop"
    );
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    cancel.cancel();
    let _ = consumer.await;
    coordinator.shutdown().await;
    Ok(())
}

async fn consume(mut subscription: Subscription, cancel: CancellationToken, sse: bool) {
    while let Some(event) = subscription.next_until(&cancel).await {
        if sse {
            let mut stdout = std::io::stdout().lock();
            if stdout
                .write_all(event.to_sse().as_bytes())
                .and_then(|_| stdout.flush())
                .is_err()
            {
                break;
            }
        } else {
            tracing::info!(event = %event.event, data = %event.data, "Change notification");
        }
    }
}
