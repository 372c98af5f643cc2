use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// True when `err` is the "rename across filesystems" failure.
pub fn is_cross_device(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::CrossesDevices
}

/// Moves a directory with `fs::rename`, falling back to copy + remove when
/// source and destination sit on different volumes.
///
/// The fallback copies into `to` first and only removes `from` once the copy
/// is complete. A failed copy removes the partial destination and leaves
/// `from` intact. A failure while removing `from` is reported as
/// [`MoveError::SourceNotRemoved`]: the data already exists at `to` and the
/// caller decides how to treat the leftover.
pub fn move_dir_cross_device(from: &Path, to: &Path) -> Result<(), MoveError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            log::warn!(
                "fs::rename failed (cross-device): {}. Attempting copy fallback...",
                e
            );

            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(MoveError::Copy)?;
            }

            copy_dir_into(from, to).map_err(|copy_err| {
                if let Err(cleanup_err) = fs::remove_dir_all(to) {
                    if cleanup_err.kind() != io::ErrorKind::NotFound {
                        log::warn!(
                            "Failed to remove partial copy '{}': {cleanup_err}",
                            to.display()
                        );
                    }
                }
                MoveError::Copy(copy_err)
            })?;

            fs::remove_dir_all(from).map_err(MoveError::SourceNotRemoved)
        }
        Err(e) => Err(MoveError::Rename(e)),
    }
}

/// Copies the contents of `from` into a new directory `to`.
pub fn copy_dir_into(from: &Path, to: &Path) -> io::Result<()> {
    let mut options = fs_extra::dir::CopyOptions::new();
    options.content_only = true;
    options.overwrite = false;

    fs::create_dir(to)?;
    fs_extra::dir::copy(from, to, &options)
        .map(|_| ())
        .map_err(|err| io::Error::other(err.to_string()))
}

#[derive(Debug)]
pub enum MoveError {
    /// Plain rename failed for a reason other than crossing volumes.
    Rename(io::Error),
    /// Fallback copy failed; the source is untouched.
    Copy(io::Error),
    /// Data was copied but the source could not be fully removed.
    SourceNotRemoved(io::Error),
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveError::Rename(e) => write!(f, "rename failed: {e}"),
            MoveError::Copy(e) => write!(f, "cross-device copy failed: {e}"),
            MoveError::SourceNotRemoved(e) => {
                write!(f, "copied, but failed to remove source: {e}")
            }
        }
    }
}

/// Removes a directory tree. An already-missing path is not an error.
///
/// Returns whether anything was removed.
pub fn remove_dir_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Recursive sum of file sizes under `path`.
///
/// Unreadable entries are skipped, never failing the whole measurement.
/// Symlinks are not followed.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::debug!("Skipping unreadable entry while sizing: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Human-readable size, base 1024 (`0 B`, `512 B`, `1.5 KB`, `120.0 MB`).
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
