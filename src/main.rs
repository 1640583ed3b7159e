use std::sync::Arc;

use miette::IntoDiagnostic;
use tokio::net::TcpListener;

use paperflow::server::{router, ServerConfig};
use paperflow::sessions::SessionManager;
use paperflow::telemetry;
use paperflow::transform::OpaqueTransformer;

#[tokio::main]
async fn main() -> miette::Result<()> {
    telemetry::init_tracing();

    let config = ServerConfig::from_env();
    let manager = SessionManager::new(Arc::new(OpaqueTransformer::new()));

    // Unfetched results expire; keep the registry from growing unbounded.
    let sweeper = Arc::clone(&manager);
    let result_ttl = config.result_ttl;
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(300));
        tick.tick().await;
        loop {
            tick.tick().await;
            sweeper.sweep_expired(result_ttl);
        }
    });

    let app = router(manager);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr).await.into_diagnostic()?;
    tracing::info!(%addr, "serving workflow API");
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
