use super::types::ExtractionResult;
use crate::services::fs_utils::path_utils::{has_parent_segment, is_path_safe};
use crate::types::errors::WorldError;
use std::io::Read;
use std::path::Path;
use tar::EntryType;

/// Extract a tar stream into `dest_dir`, which must already exist.
///
/// Entries with absolute paths or `..` segments are skipped, as are links
/// and special files: the archive is an untrusted upload. On error, files
/// written so far stay in `dest_dir`; cleaning up is the caller's job.
pub fn extract_archive<R: Read>(reader: R, dest_dir: &Path) -> Result<ExtractionResult, WorldError> {
    if !dest_dir.is_dir() {
        return Err(WorldError::ArchiveExtraction(format!(
            "Destination '{}' is not a directory",
            dest_dir.display()
        )));
    }

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(false);
    archive.set_unpack_xattrs(false);

    let entries = archive
        .entries()
        .map_err(|e| WorldError::ArchiveExtraction(format!("Failed to read archive: {e}")))?;

    let mut result = ExtractionResult::default();
    for entry in entries {
        let mut entry = entry
            .map_err(|e| WorldError::ArchiveExtraction(format!("Corrupt archive entry: {e}")))?;

        let entry_path = entry
            .path()
            .map_err(|e| WorldError::ArchiveExtraction(format!("Invalid entry path: {e}")))?
            .into_owned();

        if !is_path_safe(&entry_path) || has_parent_segment(&entry_path) {
            log::warn!("Skipping unsafe archive entry: {}", entry_path.display());
            result.entries_skipped += 1;
            continue;
        }

        let entry_type = entry.header().entry_type();
        let is_dir = match entry_type {
            EntryType::Directory => true,
            EntryType::Regular | EntryType::Continuous => false,
            other => {
                log::warn!(
                    "Skipping unsupported archive entry {:?}: {}",
                    other,
                    entry_path.display()
                );
                result.entries_skipped += 1;
                continue;
            }
        };

        let unpacked = entry.unpack_in(dest_dir).map_err(|e| {
            WorldError::ArchiveExtraction(format!(
                "Failed to extract '{}': {e}",
                entry_path.display()
            ))
        })?;

        match (unpacked, is_dir) {
            (false, _) => result.entries_skipped += 1,
            (true, true) => result.dirs_created += 1,
            (true, false) => result.files_extracted += 1,
        }
    }

    log::debug!(
        "Extracted {} files, {} dirs into {} ({} skipped)",
        result.files_extracted,
        result.dirs_created,
        dest_dir.display(),
        result.entries_skipped
    );
    Ok(result)
}
