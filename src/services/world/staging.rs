use crate::types::errors::WorldError;
use std::io;
use std::path::Path;
use tempfile::{TempDir, TempPath};

/// Scratch artifacts of one import: the spooled upload and the staging
/// extraction directory.
///
/// Both are removed when this is released or dropped, whichever comes
/// first, on every exit path of the import.
pub struct ImportScratch {
    staging: Option<TempDir>,
    upload: Option<TempPath>,
}

impl ImportScratch {
    /// Take ownership of `upload` and create a fresh staging directory in
    /// `temp_dir`.
    pub fn new(temp_dir: &Path, upload: TempPath) -> Result<Self, WorldError> {
        // `upload` is dropped, and so deleted, if this fails
        std::fs::create_dir_all(temp_dir)
            .map_err(|e| WorldError::fs("Failed to create temp dir", temp_dir, e))?;
        let staging = tempfile::Builder::new()
            .prefix("staging-")
            .tempdir_in(temp_dir)
            .map_err(|e| WorldError::fs("Failed to create staging dir in", temp_dir, e))?;

        Ok(Self {
            staging: Some(staging),
            upload: Some(upload),
        })
    }

    pub fn staging_path(&self) -> &Path {
        self.staging
            .as_ref()
            .map(|d| d.path())
            .unwrap_or_else(|| Path::new(""))
    }

    pub fn upload_path(&self) -> &Path {
        self.upload
            .as_ref()
            .map(|p| &**p)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Remove everything now, logging anything that could not be removed.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(staging) = self.staging.take() {
            let path = staging.path().to_path_buf();
            // The staging root itself may have been renamed into place
            match staging.close() {
                Ok(()) => log::debug!("Removed staging dir {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove staging dir {}: {e}", path.display()),
            }
        }
        if let Some(upload) = self.upload.take() {
            let path = upload.to_path_buf();
            match upload.close() {
                Ok(()) => log::debug!("Removed uploaded archive {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove uploaded archive {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for ImportScratch {
    fn drop(&mut self) {
        self.release_inner();
    }
}
