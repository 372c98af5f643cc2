use super::types::ArchiveFile;
use crate::types::errors::WorldError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `source_dir` as a tar stream rooted at its own basename.
///
/// Symlinks are stored as links, not followed. The source is only read.
pub fn create_archive<W: Write>(source_dir: &Path, writer: W) -> Result<W, WorldError> {
    let meta = fs::metadata(source_dir).map_err(|e| {
        WorldError::ArchiveCreation(format!(
            "Source directory '{}' is not readable: {e}",
            source_dir.display()
        ))
    })?;
    if !meta.is_dir() {
        return Err(WorldError::ArchiveCreation(format!(
            "Source '{}' is not a directory",
            source_dir.display()
        )));
    }

    let root_name = source_dir.file_name().ok_or_else(|| {
        WorldError::ArchiveCreation(format!(
            "Source '{}' has no directory name",
            source_dir.display()
        ))
    })?;

    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(root_name, source_dir)
        .map_err(|e| WorldError::ArchiveCreation(format!("Failed to archive world: {e}")))?;

    builder
        .into_inner()
        .map_err(|e| WorldError::ArchiveCreation(format!("Failed to finish archive: {e}")))
}

/// Archive `source_dir` into a temporary `.tar` inside `scratch_dir`.
///
/// The returned [`ArchiveFile`] owns the file; dropping it (after the
/// transfer, or on any error in between) deletes it.
pub fn create_archive_file(source_dir: &Path, scratch_dir: &Path) -> Result<ArchiveFile, WorldError> {
    fs::create_dir_all(scratch_dir)
        .map_err(|e| WorldError::fs("Failed to create scratch dir", scratch_dir, e))?;

    let temp = tempfile::Builder::new()
        .prefix("export-")
        .suffix(".tar")
        .tempfile_in(scratch_dir)
        .map_err(|e| WorldError::ArchiveCreation(format!("Failed to create temp archive: {e}")))?;
    let (file, path) = temp.into_parts();

    let writer = create_archive(source_dir, BufWriter::new(file))?;
    let file = writer
        .into_inner()
        .map_err(|e| WorldError::ArchiveCreation(format!("Failed to flush archive: {}", e.error())))?;
    let size = file
        .metadata()
        .map_err(|e| WorldError::ArchiveCreation(format!("Failed to stat archive: {e}")))?
        .len();

    log::info!(
        "Archived '{}' ({} bytes) to {}",
        source_dir.display(),
        size,
        path.display()
    );
    Ok(ArchiveFile { path, size })
}
