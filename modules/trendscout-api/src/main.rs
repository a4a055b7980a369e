use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendscout::{MemoryQuotaGovernor, TrendDeps, TrendService};
use trendscout_api::{router, AppState};
use trendscout_common::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("trendscout=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env()?;
    config.log_redacted();

    let service = Arc::new(TrendService::new(TrendDeps::from_config(&config).await?));
    let state = Arc::new(AppState {
        service: service.clone(),
        quota: Arc::new(MemoryQuotaGovernor::default()),
        expose_internal_errors: config.expose_internal_errors,
    });
    let app = router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("Trendscout API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    service.drain_pending_writes().await;
    info!("Trendscout API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
