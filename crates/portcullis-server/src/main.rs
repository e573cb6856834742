use anyhow::Context;
use clap::Parser;
use portcullis_core::Gateway;
use portcullis_server::{logging, router, AppState, ServerArgs, StorageChoice};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    logging::init(args.log_format)?;

    let choice = StorageChoice::from_config(&args);
    let store = choice
        .build()
        .with_context(|| format!("failed to open storage backend {choice:?}"))?;
    let gateway = Arc::new(Gateway::new(store, args.gateway_options()));
    gateway
        .init()
        .await
        .context("storage schema initialisation failed")?;

    let limiters = Arc::new(args.rate_limiters());
    spawn_maintenance(gateway.clone(), limiters.clone());

    let state = AppState::new(gateway, limiters).with_trust_forwarded_for(args.trust_forwarded_for);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    tracing::info!(
        addr = %args.bind,
        token_ttl_secs = args.token_ttl_secs,
        single_use = args.single_use_tokens,
        "portcullis listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("portcullis stopped");
    Ok(())
}

/// Periodically drop expired tokens and elapsed rate-limit windows.
fn spawn_maintenance(gateway: Arc<Gateway>, limiters: Arc<portcullis_core::RateLimiters>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let tokens = gateway.purge_expired();
            let windows = limiters.sweep_at(Instant::now());
            if tokens > 0 || windows > 0 {
                tracing::debug!(tokens, windows, "expired state purged");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
