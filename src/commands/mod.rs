//! HTTP surface. Handlers only translate between requests and the
//! orchestrator; every decision lives in `services`.

pub mod import_cmds;
pub mod server_cmds;
pub mod system_cmds;
pub mod world_cmds;

use crate::services::config::AppConfig;
use crate::services::world::SwapOrchestrator;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Room for multipart boundaries and part headers on top of the archive.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SwapOrchestrator>,
    pub config: Arc<AppConfig>,
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(system_cmds::root_handler))
        .route("/health", get(system_cmds::health_handler))
        .route("/api/server/status", get(server_cmds::server_status))
        .route("/api/server/start", post(server_cmds::start_server))
        .route("/api/server/stop", post(server_cmds::stop_server))
        .route("/api/server/restart", post(server_cmds::restart_server))
        .route("/api/world/info", get(world_cmds::get_world_info))
        .route("/api/world/backups", get(world_cmds::list_backups))
        .route("/api/world/export", get(world_cmds::export_world))
        .route(
            "/api/world/import",
            post(import_cmds::import_world).layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
