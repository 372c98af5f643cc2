//! On-disk locations of the world, its backups and the scratch area.

use crate::services::fs_utils::file_utils::{copy_dir_into, is_cross_device};
use crate::services::fs_utils::{dir_size, format_size, remove_dir_if_present};
use crate::types::errors::WorldError;
use crate::types::world::WorldInfo;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_WORLD_NAME: &str = "world";

#[derive(Debug, Clone)]
pub struct WorldStore {
    world_path: PathBuf,
    backup_dir: PathBuf,
    temp_dir: PathBuf,
}

impl WorldStore {
    pub fn new(
        world_path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            world_path: world_path.into(),
            backup_dir: backup_dir.into(),
            temp_dir: temp_dir.into(),
        }
    }

    pub fn world_path(&self) -> &Path {
        &self.world_path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Logical name of the world: the last component of its path.
    pub fn world_name(&self) -> String {
        self.world_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_WORLD_NAME.to_string())
    }

    pub fn world_exists(&self) -> bool {
        fs::metadata(&self.world_path)
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Read-only snapshot: existence, name and recursive size.
    pub fn info(&self) -> WorldInfo {
        let exists = self.world_exists();
        let size = if exists { dir_size(&self.world_path) } else { 0 };
        WorldInfo {
            exists,
            name: self.world_name(),
            size,
            size_formatted: format_size(size),
        }
    }

    /// Create the backup and scratch areas if missing.
    pub fn ensure_dirs(&self) -> Result<(), WorldError> {
        for dir in [&self.backup_dir, &self.temp_dir] {
            fs::create_dir_all(dir).map_err(|e| WorldError::fs("Failed to create", dir, e))?;
        }
        Ok(())
    }
}

/// Put `candidate` at `target` with a single rename.
///
/// `target` must not exist (or be an empty directory). When the two paths
/// are on different volumes the candidate is first copied to a hidden
/// sibling of `target` and that sibling is renamed, so the visible
/// replacement is still one metadata change.
pub fn atomic_replace(target: &Path, candidate: &Path) -> Result<(), WorldError> {
    match fs::rename(candidate, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            log::warn!(
                "Candidate '{}' is on another volume than '{}'; staging a local copy",
                candidate.display(),
                target.display()
            );
            let sibling = incoming_sibling(target)?;
            if let Err(copy_err) = copy_dir_into(candidate, &sibling) {
                discard(&sibling);
                return Err(WorldError::fs("Failed to copy candidate to", &sibling, copy_err));
            }
            fs::rename(&sibling, target).map_err(|rename_err| {
                discard(&sibling);
                WorldError::fs("Failed to rename into", target, rename_err)
            })
        }
        Err(e) => Err(WorldError::fs("Failed to rename into", target, e)),
    }
}

fn incoming_sibling(target: &Path) -> Result<PathBuf, WorldError> {
    let parent = target
        .parent()
        .ok_or_else(|| WorldError::fs("No parent directory for", target, "root path"))?;
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_WORLD_NAME.to_string());
    Ok(parent.join(format!(".{name}.incoming-{}", uuid::Uuid::new_v4())))
}

fn discard(path: &Path) {
    if let Err(e) = remove_dir_if_present(path) {
        log::warn!("Failed to remove '{}': {e}", path.display());
    }
}
