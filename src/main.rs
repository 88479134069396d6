//! Gateway binary entry point.

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use movies_gateway::{Gateway, GatewayConfig, router};

/// Interval between limiter state cleanup passes.
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movies_gateway=debug,tower_http=debug")),
        )
        .init();

    let config = GatewayConfig::load();
    info!(
        listen_addr = %config.listen_addr,
        upstream = %config.upstream_base_url,
        rate = config.rate_limit.rate,
        burst = config.rate_limit.burst,
        "starting movies gateway"
    );

    let gateway = Arc::new(Gateway::new(&config)?);
    let app = router(gateway.clone());

    // Keep per-client limiter state bounded over long uptimes
    tokio::spawn({
        let gateway = gateway.clone();
        async move {
            let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                gateway.cleanup_limiters();
            }
        }
    });

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gateway listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway shut down gracefully");
    Ok(())
}

/// Resolve when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("received terminate signal, starting graceful shutdown");
        },
    }
}
