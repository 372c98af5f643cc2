use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORLD_MARKER: &str = "level.dat";

/// How many directory levels below the staging root are searched.
pub const MARKER_SEARCH_DEPTH: usize = 3;

fn has_marker(dir: &Path, marker: &str) -> bool {
    fs::symlink_metadata(dir.join(marker))
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Sorted subdirectories of `dir`; symlinks are not followed.
fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
        Err(e) => {
            log::debug!("Cannot read '{}' during marker search: {e}", dir.display());
            Vec::new()
        }
    };
    dirs.sort();
    dirs
}

/// Find the world root inside an extracted archive.
///
/// Subdirectories are searched breadth-first down to `max_depth`; the
/// shallowest directory holding `marker` wins, ties going to the first
/// name in order. Only if no subdirectory qualifies does the staging root
/// itself count.
pub fn locate_world_root(staging: &Path, marker: &str, max_depth: usize) -> Option<PathBuf> {
    let mut queue: VecDeque<(PathBuf, usize)> =
        subdirs(staging).into_iter().map(|d| (d, 1)).collect();

    while let Some((dir, depth)) = queue.pop_front() {
        if has_marker(&dir, marker) {
            return Some(dir);
        }
        if depth < max_depth {
            queue.extend(subdirs(&dir).into_iter().map(|d| (d, depth + 1)));
        }
    }

    has_marker(staging, marker).then(|| staging.to_path_buf())
}
