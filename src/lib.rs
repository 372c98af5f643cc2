pub mod commands;
pub mod services;
pub mod types;
#[cfg(test)]
pub mod test_utils;

use anyhow::Context;
use commands::AppState;
use services::config::AppConfig;
use services::server::{PollPolicy, ServiceController, SystemctlController};
use services::world::{SwapOrchestrator, SwapSettings, WorldStore};
use std::sync::Arc;

/// Load configuration, wire the services and serve HTTP until shutdown.
pub async fn run() -> anyhow::Result<()> {
    // A logger installed by an embedding binary wins
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    log::info!(
        "World: {} | backups: {} | temp: {} | service: {}",
        config.world_path.display(),
        config.backup_dir.display(),
        config.temp_path.display(),
        config.service_name
    );

    let store = WorldStore::new(&config.world_path, &config.backup_dir, &config.temp_path);
    store
        .ensure_dirs()
        .context("Failed to prepare backup and temp directories")?;

    let controller: Arc<dyn ServiceController> = Arc::new(SystemctlController::new(
        config.service_name.clone(),
        config.service_query_timeout,
        PollPolicy {
            deadline: config.service_timeout,
            ..PollPolicy::default()
        },
    ));
    let settings = SwapSettings {
        marker: config.world_marker.clone(),
        start_retries: config.service_start_retries,
    };
    let orchestrator = Arc::new(SwapOrchestrator::new(store, controller, settings));

    let addr = config.listen_addr();
    let app = commands::router(AppState {
        orchestrator,
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown requested, finishing in-flight requests");
}
