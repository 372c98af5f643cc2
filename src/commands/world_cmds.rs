//! Read-only world queries and the export download.

use super::AppState;
use crate::services::world::{BackupEntry, ExportedWorld};
use crate::types::errors::{CommandError, CommandResult, WorldError};
use crate::types::world::WorldInfo;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header;
use axum::response::Response;
use axum::Json;
use futures_util::{stream, Stream};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

const STREAM_CHUNK: usize = 64 * 1024;

pub async fn get_world_info(State(state): State<AppState>) -> CommandResult<Json<WorldInfo>> {
    let orchestrator = state.orchestrator.clone();
    let info = tokio::task::spawn_blocking(move || orchestrator.world_info()).await?;
    Ok(Json(info))
}

pub async fn list_backups(State(state): State<AppState>) -> CommandResult<Json<Vec<BackupEntry>>> {
    let orchestrator = state.orchestrator.clone();
    let backups = tokio::task::spawn_blocking(move || orchestrator.list_backups()).await??;
    Ok(Json(backups))
}

/// Stream the world as `world-backup-<date>.tar`.
///
/// The temporary archive is deleted once the stream finishes or the client
/// goes away.
pub async fn export_world(State(state): State<AppState>) -> CommandResult<Response> {
    let exported = state.orchestrator.export_world().await?;
    let file = File::open(&exported.archive.path)
        .await
        .map_err(|e| WorldError::fs("Failed to open archive", &exported.archive.path, e))?;

    log::info!(
        "Exporting world as {} ({} bytes)",
        exported.file_name,
        exported.archive.size
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-tar")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", exported.file_name),
        )
        .header(header::CONTENT_LENGTH, exported.archive.size)
        .body(Body::from_stream(archive_stream(file, exported)))
        .map_err(|e| CommandError::Internal(format!("Failed to build export response: {e}")))
}

/// Reads `file` in chunks, keeping `exported` (and so the temp file) alive
/// until the last chunk or an error.
fn archive_stream(
    file: File,
    exported: ExportedWorld,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some((file, exported)), |state| async move {
        let (mut file, exported) = state?;
        let mut buf = vec![0u8; STREAM_CHUNK];
        match file.read(&mut buf).await {
            Ok(0) => {
                log::debug!("Finished streaming {}", exported.file_name);
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((file, exported))))
            }
            Err(e) => {
                log::warn!("Export stream of {} failed: {e}", exported.file_name);
                Some((Err(e), None))
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/world_cmds_tests.rs"]
mod tests;
