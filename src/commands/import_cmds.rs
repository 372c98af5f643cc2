//! Upload boundary for world imports.

use super::AppState;
use crate::services::archive::has_archive_extension;
use crate::services::world::ImportOutcome;
use crate::types::errors::{CommandResult, WorldError};
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::path::Path;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// Multipart field carrying the archive.
pub const UPLOAD_FIELD: &str = "world";

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

pub async fn import_world(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> CommandResult<Json<ImportResponse>> {
    let limit = state.config.max_upload_bytes;
    let upload = receive_upload(&mut multipart, state.orchestrator.store().temp_dir(), limit).await?;

    let outcome = state.orchestrator.import_world(upload).await?;
    Ok(Json(ImportResponse {
        success: true,
        outcome,
    }))
}

/// Spool the `world` field to a temp file, enforcing the name and size rules.
async fn receive_upload(
    multipart: &mut Multipart,
    temp_dir: &Path,
    limit: u64,
) -> Result<TempPath, WorldError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, limit))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !has_archive_extension(&file_name) {
            return Err(WorldError::UploadRejected(format!(
                "Only .tar archives are accepted, got '{file_name}'"
            )));
        }
        log::info!("Receiving world upload '{file_name}'");
        return spool_field(field, temp_dir, limit).await;
    }

    Err(WorldError::UploadRejected(format!(
        "No '{UPLOAD_FIELD}' file in upload"
    )))
}

async fn spool_field(
    mut field: Field<'_>,
    temp_dir: &Path,
    limit: u64,
) -> Result<TempPath, WorldError> {
    tokio::fs::create_dir_all(temp_dir)
        .await
        .map_err(|e| WorldError::fs("Failed to create temp dir", temp_dir, e))?;
    let spooled = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".tar")
        .tempfile_in(temp_dir)
        .map_err(|e| WorldError::fs("Failed to create upload file in", temp_dir, e))?;
    // From here the TempPath removes the file on every early return
    let (file, path) = spooled.into_parts();
    let mut out = tokio::fs::File::from_std(file);

    let mut received: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(|e| upload_error(e, limit))? {
        received += chunk.len() as u64;
        if received > limit {
            return Err(WorldError::UploadTooLarge { limit });
        }
        out.write_all(&chunk)
            .await
            .map_err(|e| WorldError::fs("Failed to write upload", &path, e))?;
    }
    out.flush()
        .await
        .map_err(|e| WorldError::fs("Failed to write upload", &path, e))?;

    log::info!("Upload stored at {} ({received} bytes)", path.display());
    Ok(path)
}

fn upload_error(err: MultipartError, limit: u64) -> WorldError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        WorldError::UploadTooLarge { limit }
    } else {
        WorldError::UploadRejected(err.body_text())
    }
}
