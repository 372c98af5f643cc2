//! Tar archive codec for world directories.
//!
//! Knows nothing about worlds: it turns a directory into a single-root tar
//! stream and unpacks a tar stream into an empty directory.

mod create;
mod extract;
mod types;

pub use create::{create_archive, create_archive_file};
pub use extract::extract_archive;
pub use types::{has_archive_extension, ArchiveFile, ExtractionResult, ARCHIVE_EXTENSION};

#[cfg(test)]
#[path = "tests/archive_tests.rs"]
mod tests;
