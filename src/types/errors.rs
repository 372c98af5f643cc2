use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure taxonomy of the world pipeline.
///
/// Everything raised before the backup step leaves the world untouched and
/// may be retried. `SwapFailed` is the only variant produced after the
/// import has committed; it always names the backup to recover from.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),
    #[error("Failed to stop server: {0}")]
    ServiceStop(String),
    #[error("Failed to start server: {0}")]
    ServiceStart(String),
    #[error("Failed to create archive: {0}")]
    ArchiveCreation(String),
    #[error("Failed to extract archive: {0}")]
    ArchiveExtraction(String),
    #[error("World not found: {0}")]
    WorldNotFound(String),
    #[error("World is busy: {0}")]
    WorldBusy(String),
    #[error("Filesystem error: {0}")]
    Filesystem(String),
    #[error("Upload rejected: {0}")]
    UploadRejected(String),
    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: u64 },
    #[error("{reason}. Manual recovery required from backup: {}", display_backup(.backup))]
    SwapFailed {
        reason: String,
        backup: Option<PathBuf>,
    },
}

fn display_backup(backup: &Option<PathBuf>) -> String {
    match backup {
        Some(path) => path.display().to_string(),
        None => "none (no previous world existed)".to_string(),
    }
}

impl WorldError {
    /// Filesystem failure with the offending path attached.
    pub fn fs(action: &str, path: &Path, err: impl std::fmt::Display) -> Self {
        WorldError::Filesystem(format!("{action} '{}': {err}", path.display()))
    }

    /// Stable machine-readable category for callers.
    pub fn code(&self) -> &'static str {
        match self {
            WorldError::InvalidArchive(_) => "INVALID_ARCHIVE",
            WorldError::ServiceStop(_) => "SERVICE_STOP_FAILED",
            WorldError::ServiceStart(_) => "SERVICE_START_FAILED",
            WorldError::ArchiveCreation(_) => "ARCHIVE_CREATION_FAILED",
            WorldError::ArchiveExtraction(_) => "ARCHIVE_EXTRACTION_FAILED",
            WorldError::WorldNotFound(_) => "WORLD_NOT_FOUND",
            WorldError::WorldBusy(_) => "WORLD_BUSY",
            WorldError::Filesystem(_) => "FILESYSTEM_ERROR",
            WorldError::UploadRejected(_) | WorldError::UploadTooLarge { .. } => {
                "UPLOAD_REJECTED"
            }
            WorldError::SwapFailed { .. } => "SWAP_FAILED",
        }
    }

    /// True once the previous world has already been moved into the backup area.
    pub fn committed(&self) -> bool {
        matches!(self, WorldError::SwapFailed { .. })
    }

    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WorldError::InvalidArchive(_) | WorldError::UploadRejected(_) => {
                StatusCode::BAD_REQUEST
            }
            WorldError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            WorldError::WorldNotFound(_) => StatusCode::NOT_FOUND,
            WorldError::WorldBusy(_) => StatusCode::CONFLICT,
            WorldError::ServiceStop(_)
            | WorldError::ServiceStart(_)
            | WorldError::ArchiveCreation(_)
            | WorldError::ArchiveExtraction(_)
            | WorldError::Filesystem(_)
            | WorldError::SwapFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for CommandError {
    fn from(error: tokio::task::JoinError) -> Self {
        CommandError::Internal(error.to_string())
    }
}

impl CommandError {
    pub fn status(&self) -> StatusCode {
        match self {
            CommandError::World(e) => e.status(),
            CommandError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CommandError::World(e) => e.code(),
            CommandError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message shown to the caller. Internal details stay in the log.
    pub fn public_message(&self) -> String {
        match self {
            CommandError::World(e) => e.to_string(),
            CommandError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{} ({}): {self:?}", self.code(), status);
        } else {
            log::warn!("{} ({}): {self}", self.code(), status);
        }

        let body = serde_json::json!({
            "success": false,
            "code": self.code(),
            "message": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
#[path = "tests/errors_tests.rs"]
mod tests;
