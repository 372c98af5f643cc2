//! World swap pipeline.
//!
//! Import runs `Validating -> StoppingService -> BackingUp -> Swapping ->
//! StartingService`, falling into `Aborting` on any failure.
//!
//! Only validation and the service stop may fail cleanly: up to that point
//! the world and the backup area are untouched. Once the old world has
//! been moved into the backup area the import is committed. From then on
//! the outcome is either a completed swap or `WorldError::SwapFailed`,
//! which names the backup the operator must restore by hand. A committed
//! swap is never rolled back because the service failed to come back up.

use super::backup::{self, BackupEntry, BackupError};
use super::marker::{locate_world_root, DEFAULT_WORLD_MARKER, MARKER_SEARCH_DEPTH};
use super::staging::ImportScratch;
use super::store::{atomic_replace, WorldStore};
use crate::services::archive::{create_archive_file, extract_archive, ArchiveFile};
use crate::services::core::operation_lock::OperationLock;
use crate::services::server::{ServiceAction, ServiceController, ServiceState};
use crate::types::errors::WorldError;
use crate::types::world::WorldInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempPath;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SwapSettings {
    /// File whose presence marks a directory as a world root.
    pub marker: String,
    /// Extra `start()` attempts after a committed swap.
    pub start_retries: u32,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            marker: DEFAULT_WORLD_MARKER.to_string(),
            start_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPhase {
    Idle,
    Validating,
    StoppingService,
    BackingUp,
    Swapping,
    StartingService,
    Aborting,
}

impl std::fmt::Display for SwapPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SwapPhase::Idle => "idle",
            SwapPhase::Validating => "validating",
            SwapPhase::StoppingService => "stopping service",
            SwapPhase::BackingUp => "backing up",
            SwapPhase::Swapping => "swapping",
            SwapPhase::StartingService => "starting service",
            SwapPhase::Aborting => "aborting",
        };
        f.write_str(s)
    }
}

/// Result of a completed import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub message: String,
    pub backup: Option<BackupEntry>,
    pub service_restarted: bool,
    /// The world was swapped but the service did not come back up.
    pub degraded: bool,
}

/// A world archive ready to stream. Dropping it deletes the file.
#[derive(Debug)]
pub struct ExportedWorld {
    pub archive: ArchiveFile,
    pub file_name: String,
}

/// `world-backup-<YYYY-MM-DD>.tar`
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("world-backup-{}.tar", at.format("%Y-%m-%d"))
}

/// Logs phase transitions of one import.
struct ImportRun {
    id: String,
    phase: SwapPhase,
}

impl ImportRun {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: SwapPhase::Idle,
        }
    }

    fn enter(&mut self, phase: SwapPhase) {
        if self.phase != phase {
            log::info!("[import {}] {} -> {}", self.id, self.phase, phase);
            self.phase = phase;
        }
    }
}

fn join_error(context: &str, e: tokio::task::JoinError) -> WorldError {
    WorldError::Filesystem(format!("{context} task failed: {e}"))
}

pub struct SwapOrchestrator {
    store: WorldStore,
    controller: Arc<dyn ServiceController>,
    lock: OperationLock,
    settings: SwapSettings,
}

impl SwapOrchestrator {
    pub fn new(
        store: WorldStore,
        controller: Arc<dyn ServiceController>,
        settings: SwapSettings,
    ) -> Self {
        Self {
            store,
            controller,
            lock: OperationLock::new(),
            settings,
        }
    }

    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    /// True while an import, export or service action holds the world lock.
    pub fn is_busy(&self) -> bool {
        self.lock.is_locked()
    }

    /// Existence, name and size of the active world. Never touches the service.
    pub fn world_info(&self) -> WorldInfo {
        self.store.info()
    }

    pub fn list_backups(&self) -> Result<Vec<BackupEntry>, WorldError> {
        backup::list_backups(self.store.backup_dir())
    }

    /// Archive the active world into a temporary file.
    ///
    /// Fails fast with `WorldBusy` while another operation holds the lock.
    /// The lock covers archive creation only; the finished file is a
    /// snapshot and can be streamed without it.
    pub async fn export_world(&self) -> Result<ExportedWorld, WorldError> {
        let guard = self.lock.acquire_or_busy().await?;

        if !self.store.world_exists() {
            return Err(WorldError::WorldNotFound(format!(
                "No world at '{}'",
                self.store.world_path().display()
            )));
        }

        let world = self.store.world_path().to_path_buf();
        let scratch = self.store.temp_dir().to_path_buf();
        // The guard moves into the blocking task so the lock outlives a
        // dropped request until the tree has been fully read.
        let archive = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            create_archive_file(&world, &scratch)
        })
        .await
        .map_err(|e| WorldError::ArchiveCreation(format!("Archive task failed: {e}")))??;

        Ok(ExportedWorld {
            archive,
            file_name: export_file_name(Utc::now()),
        })
    }

    /// Replace the active world with the uploaded archive at `upload`.
    ///
    /// Queues behind any running operation. Dropping the returned future
    /// while queued abandons the import (and deletes the upload); once the
    /// lock is held the sequence runs to completion on its own task.
    pub async fn import_world(
        self: &Arc<Self>,
        upload: TempPath,
    ) -> Result<ImportOutcome, WorldError> {
        let guard = self.lock.acquire().await;

        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            this.run_import(upload).await
        })
        .await
        .map_err(|e| join_error("Import", e))?
    }

    async fn run_import(&self, upload: TempPath) -> Result<ImportOutcome, WorldError> {
        let mut run = ImportRun::new();
        log::info!(
            "[import {}] Importing '{}' into {}",
            run.id,
            upload.display(),
            self.store.world_path().display()
        );

        let scratch = ImportScratch::new(self.store.temp_dir(), upload)?;
        let result = self.import_steps(&mut run, &scratch).await;

        match &result {
            Ok(outcome) => log::info!("[import {}] {}", run.id, outcome.message),
            Err(e) if e.committed() => {
                run.enter(SwapPhase::Aborting);
                log::error!("[import {}] Import failed after commit: {e}", run.id);
            }
            Err(e) => {
                run.enter(SwapPhase::Aborting);
                log::warn!("[import {}] Import aborted, world unchanged: {e}", run.id);
            }
        }

        scratch.release();
        run.enter(SwapPhase::Idle);
        result
    }

    async fn import_steps(
        &self,
        run: &mut ImportRun,
        scratch: &ImportScratch,
    ) -> Result<ImportOutcome, WorldError> {
        run.enter(SwapPhase::Validating);
        let candidate = self.validate(scratch).await?;
        log::info!("[import {}] World root found at {}", run.id, candidate.display());

        run.enter(SwapPhase::StoppingService);
        let before = self.controller.state().await;
        let was_running = before.may_be_running();
        if was_running {
            log::info!(
                "[import {}] Service '{}' is {before}; stopping",
                run.id,
                self.controller.name()
            );
            self.controller.stop().await?;
        }

        run.enter(SwapPhase::BackingUp);
        let backup = match self.backup_world().await {
            Ok(entry) => entry,
            Err(BackupError::Untouched(e)) => {
                // Still abortable: put the service back the way it was
                run.enter(SwapPhase::Aborting);
                if was_running {
                    if let Err(start_err) = self.start_with_retries(run).await {
                        log::error!("[import {}] Failed to restart service: {start_err}", run.id);
                    }
                }
                return Err(e);
            }
            Err(BackupError::Partial { backup, error }) => {
                return Err(WorldError::SwapFailed {
                    reason: error.to_string(),
                    backup: Some(backup),
                });
            }
        };
        let backup_path = backup.as_ref().map(|b| PathBuf::from(&b.path));

        // Committed: no path below returns the old world to its place.
        run.enter(SwapPhase::Swapping);
        let target = self.store.world_path().to_path_buf();
        let source = candidate.clone();
        tokio::task::spawn_blocking(move || atomic_replace(&target, &source))
            .await
            .map_err(|e| join_error("Swap", e))
            .and_then(|r| r)
            .map_err(|e| WorldError::SwapFailed {
                reason: e.to_string(),
                backup: backup_path.clone(),
            })?;
        log::info!(
            "[import {}] Swapped {} into {}",
            run.id,
            candidate.display(),
            self.store.world_path().display()
        );

        let (service_restarted, degraded, message) = if was_running {
            run.enter(SwapPhase::StartingService);
            match self.start_with_retries(run).await {
                Ok(()) => (
                    true,
                    false,
                    "World imported successfully and server restarted".to_string(),
                ),
                Err(e) => (
                    false,
                    true,
                    format!("World imported, but service failed to restart: {e}"),
                ),
            }
        } else {
            (false, false, "World imported successfully".to_string())
        };

        Ok(ImportOutcome {
            message,
            backup,
            service_restarted,
            degraded,
        })
    }

    /// Extract the upload into staging and find the world root in it.
    async fn validate(&self, scratch: &ImportScratch) -> Result<PathBuf, WorldError> {
        let upload = scratch.upload_path().to_path_buf();
        let staging = scratch.staging_path().to_path_buf();
        let marker = self.settings.marker.clone();
        let world = self.store.world_path().to_path_buf();

        tokio::task::spawn_blocking(move || {
            // Refuse before the service is touched
            backup::check_world_slot(&world)?;

            let file = File::open(&upload).map_err(|e| {
                WorldError::ArchiveExtraction(format!("Failed to open uploaded archive: {e}"))
            })?;
            let extracted = extract_archive(BufReader::new(file), &staging)?;
            log::debug!(
                "Staged {} files ({} skipped) in {}",
                extracted.files_extracted,
                extracted.entries_skipped,
                staging.display()
            );

            locate_world_root(&staging, &marker, MARKER_SEARCH_DEPTH).ok_or_else(|| {
                WorldError::InvalidArchive(format!(
                    "No '{marker}' found in the archive; it does not contain a world"
                ))
            })
        })
        .await
        .map_err(|e| join_error("Extraction", e))?
    }

    async fn backup_world(&self) -> Result<Option<BackupEntry>, BackupError> {
        let world = self.store.world_path().to_path_buf();
        let backup_dir = self.store.backup_dir().to_path_buf();

        tokio::task::spawn_blocking(move || backup::create_backup(&world, &backup_dir, Utc::now()))
            .await
            .map_err(|e| BackupError::Untouched(join_error("Backup", e)))?
    }

    async fn start_with_retries(&self, run: &ImportRun) -> Result<(), WorldError> {
        let attempts = self.settings.start_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.controller.start().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!(
                        "[import {}] Start attempt {attempt}/{attempts} failed: {e}",
                        run.id
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| WorldError::ServiceStart("no start attempt made".to_string())))
    }

    pub async fn service_state(&self) -> ServiceState {
        self.controller.state().await
    }

    /// Start, stop or restart the service outside an import.
    ///
    /// Holds the world lock (fail fast) so it never interleaves with an
    /// import, and runs on its own task so a dropped request cannot leave a
    /// restart half done.
    pub async fn control_service(&self, action: ServiceAction) -> Result<String, WorldError> {
        let guard = self.lock.acquire_or_busy().await?;
        let controller = Arc::clone(&self.controller);

        tokio::spawn(async move {
            let _guard = guard;
            log::info!("Service action '{action}' on '{}'", controller.name());
            match action {
                ServiceAction::Start => controller.start().await?,
                ServiceAction::Stop => controller.stop().await?,
                ServiceAction::Restart => {
                    controller.stop().await?;
                    controller.start().await?;
                }
            }
            Ok::<_, WorldError>(action.done_message().to_string())
        })
        .await
        .map_err(|e| join_error("Service action", e))?
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
