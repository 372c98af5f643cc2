use std::path::{Component, Path};

/// Validates that the relative `target_path` stays _inside_ whatever base it
/// is later joined to.
/// Rejects absolute paths and `..` segments that climb above the base.
pub fn is_path_safe(target_path: &Path) -> bool {
    let mut depth: i32 = 0;
    for component in target_path.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::Normal(_) => {
                depth += 1;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }

    true
}

/// True if the path contains any `..` segment at all.
///
/// Archive entries are held to this stricter rule: even a `..` that would
/// stay inside the destination is refused.
pub fn has_parent_segment(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}
