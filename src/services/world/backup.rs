//! Backup area bookkeeping.
//!
//! A backup is the previous world directory renamed into the backup area
//! as `<world>_backup_<timestamp>`, with a `<name>.json` sidecar beside it.
//! Backups are never overwritten and never deleted here.

use crate::services::fs_utils::file_utils::MoveError;
use crate::services::fs_utils::{dir_size, move_dir_cross_device};
use crate::types::errors::WorldError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SIDECAR_EXT: &str = "json";

/// Metadata of one retained backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    /// Directory name inside the backup area
    pub name: String,
    /// Name of the world the backup was taken from
    pub original_name: String,
    pub original_path: String,
    /// RFC 3339 creation time
    pub created_at: String,
    pub size_bytes: u64,
    pub path: String,
}

/// Outcome of [`create_backup`] when the world could not be moved aside.
#[derive(Debug)]
pub enum BackupError {
    /// Nothing was moved; the world is where it was.
    Untouched(WorldError),
    /// The world was copied to `backup` but the original was only partly
    /// removed. The import can no longer be aborted cleanly.
    Partial { backup: PathBuf, error: WorldError },
}

/// `<sanitized world name>_backup_<YYYYmmdd_HHMMSS_mmm>`
pub fn backup_name(world_name: &str, at: DateTime<Utc>) -> String {
    let safe = sanitize_filename::sanitize(world_name);
    let safe = if safe.is_empty() { "world".to_string() } else { safe };
    format!("{safe}_backup_{}", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// First free `<base>`, `<base>_1`, `<base>_2`, ... inside `backup_dir`.
fn unique_backup_path(backup_dir: &Path, base: &str) -> PathBuf {
    let mut candidate = backup_dir.join(base);
    let mut counter = 1;
    while fs::symlink_metadata(&candidate).is_ok()
        || fs::symlink_metadata(sidecar_path(&candidate)).is_ok()
    {
        candidate = backup_dir.join(format!("{base}_{counter}"));
        counter += 1;
    }
    candidate
}

fn sidecar_path(backup_path: &Path) -> PathBuf {
    let mut name = backup_path.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXT);
    PathBuf::from(name)
}

/// Move the world at `world_path` into `backup_dir`.
///
/// Returns `Ok(None)` when nothing exists at `world_path`. Anything there
/// that is not a directory is refused, untouched. The size is measured
/// before the move so the entry records the original size.
pub fn create_backup(
    world_path: &Path,
    backup_dir: &Path,
    at: DateTime<Utc>,
) -> Result<Option<BackupEntry>, BackupError> {
    if !check_world_slot(world_path).map_err(BackupError::Untouched)? {
        return Ok(None);
    }

    fs::create_dir_all(backup_dir).map_err(|e| {
        BackupError::Untouched(WorldError::fs("Failed to create backup dir", backup_dir, e))
    })?;

    let original_name = world_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "world".to_string());
    let size_bytes = dir_size(world_path);
    let dest = unique_backup_path(backup_dir, &backup_name(&original_name, at));

    match move_dir_cross_device(world_path, &dest) {
        Ok(()) => {}
        // Already gone: nothing to back up
        Err(MoveError::Rename(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(None);
        }
        Err(MoveError::SourceNotRemoved(e)) => {
            return Err(BackupError::Partial {
                backup: dest.clone(),
                error: WorldError::fs("Backup copied but failed to remove", world_path, e),
            });
        }
        Err(e) => {
            return Err(BackupError::Untouched(WorldError::fs(
                "Failed to move world into backup area",
                world_path,
                e,
            )));
        }
    }

    let entry = BackupEntry {
        name: file_name_of(&dest),
        original_name,
        original_path: world_path.to_string_lossy().to_string(),
        created_at: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        size_bytes,
        path: dest.to_string_lossy().to_string(),
    };

    // The backup itself already exists; a missing sidecar only loses metadata
    if let Err(e) = write_sidecar(&dest, &entry) {
        log::warn!("Failed to write backup metadata for {}: {e}", entry.name);
    }

    log::info!(
        "Backed up '{}' ({} bytes) to {}",
        entry.original_name,
        entry.size_bytes,
        entry.path
    );
    Ok(Some(entry))
}

/// Whether a world directory occupies `world_path`.
///
/// `Ok(false)` when the path is free. A file, dangling link or other
/// non-directory entry is an error: it cannot be swapped out safely.
pub fn check_world_slot(world_path: &Path) -> Result<bool, WorldError> {
    match fs::symlink_metadata(world_path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(WorldError::fs("Failed to inspect", world_path, e)),
    }
    match fs::metadata(world_path) {
        Ok(meta) if meta.is_dir() => Ok(true),
        Ok(_) => Err(WorldError::fs(
            "Refusing to replace",
            world_path,
            "not a directory",
        )),
        Err(e) => Err(WorldError::fs("Failed to inspect", world_path, e)),
    }
}

fn write_sidecar(backup_path: &Path, entry: &BackupEntry) -> Result<(), String> {
    let json = serde_json::to_string_pretty(entry)
        .map_err(|e| format!("Failed to serialize metadata: {e}"))?;
    fs::write(sidecar_path(backup_path), json).map_err(|e| format!("Failed to write metadata: {e}"))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// List all backups, newest first.
///
/// Directories without a readable sidecar are listed from filesystem
/// metadata instead.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupEntry>, WorldError> {
    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WorldError::fs("Failed to read backup dir", backup_dir, e)),
    };

    let mut items = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let from_sidecar = fs::read_to_string(sidecar_path(&path))
            .ok()
            .and_then(|raw| serde_json::from_str::<BackupEntry>(&raw).ok());

        let item = match from_sidecar {
            Some(mut meta) => {
                // The directory may have been moved by an operator since
                meta.name = file_name_of(&path);
                meta.path = path.to_string_lossy().to_string();
                meta
            }
            None => entry_from_fs(&path),
        };
        items.push(item);
    }

    // RFC 3339 in UTC sorts lexicographically
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(items)
}

fn entry_from_fs(path: &Path) -> BackupEntry {
    let created: DateTime<Utc> = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);
    let name = file_name_of(path);
    let original_name = name
        .split_once("_backup_")
        .map(|(world, _)| world.to_string())
        .unwrap_or_else(|| name.clone());

    BackupEntry {
        original_name,
        original_path: String::new(),
        created_at: created.to_rfc3339_opts(SecondsFormat::Millis, true),
        size_bytes: dir_size(path),
        path: path.to_string_lossy().to_string(),
        name,
    }
}
