use std::path::{Component, Path};

use crate::DepotError;

/// Validates that an uploaded file name stays inside the depot root.
///
/// Rejects empty names, absolute paths, parent-directory traversal and
/// platform prefix components. Plain subdirectory paths are allowed.
pub fn validate_relative_path(file_name: &str) -> Result<(), DepotError> {
    if file_name.is_empty() {
        return Err(DepotError::InvalidPath("empty file name".into()));
    }

    let path = Path::new(file_name);
    if path.is_absolute() {
        return Err(DepotError::InvalidPath(format!(
            "absolute path not allowed: {file_name}"
        )));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(DepotError::InvalidPath(format!(
                    "parent directory traversal not allowed: {file_name}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(DepotError::InvalidPath(format!(
                    "rooted path not allowed: {file_name}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
