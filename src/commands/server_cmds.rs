//! Manual control of the managed game server.
//!
//! Start and stop share the world lock with imports and exports; while one
//! of those runs they fail fast with `WORLD_BUSY`.

use super::AppState;
use crate::services::server::ServiceAction;
use crate::types::errors::CommandResult;
use crate::types::world::ActionResponse;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn server_status(State(state): State<AppState>) -> Json<Value> {
    let status = state.orchestrator.service_state().await;
    Json(json!({ "status": status }))
}

pub async fn start_server(State(state): State<AppState>) -> CommandResult<Json<ActionResponse>> {
    run_action(&state, ServiceAction::Start).await
}

pub async fn stop_server(State(state): State<AppState>) -> CommandResult<Json<ActionResponse>> {
    run_action(&state, ServiceAction::Stop).await
}

pub async fn restart_server(State(state): State<AppState>) -> CommandResult<Json<ActionResponse>> {
    run_action(&state, ServiceAction::Restart).await
}

async fn run_action(state: &AppState, action: ServiceAction) -> CommandResult<Json<ActionResponse>> {
    let message = state.orchestrator.control_service(action).await?;
    Ok(Json(ActionResponse::ok(message)))
}

#[cfg(test)]
#[path = "tests/server_cmds_tests.rs"]
mod tests;
