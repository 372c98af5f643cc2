use std::path::Path;
use tempfile::TempPath;

/// Only format accepted at the upload boundary.
pub const ARCHIVE_EXTENSION: &str = "tar";

/// Check an uploaded file name against [`ARCHIVE_EXTENSION`].
pub fn has_archive_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Result of an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub files_extracted: usize,
    pub dirs_created: usize,
    /// Entries refused for escaping the destination or for an unsupported type.
    pub entries_skipped: usize,
}

/// A finished archive on disk. The file is deleted when this is dropped.
#[derive(Debug)]
pub struct ArchiveFile {
    pub path: TempPath,
    pub size: u64,
}
