//! Storage layer.
//!
//! Each subnet owns exactly one [`MemoryLog`]; a log's file is never shared
//! with another log.

mod memory_log;

pub use memory_log::MemoryLog;

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Temp file used for atomic replacement of `path`.
pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Resolves `path` to the form used to compare storage locations.
///
/// Relative paths are joined onto the working directory, `.` and `..` are
/// collapsed, and the parent directory is canonicalized when it exists.
pub(crate) fn storage_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };

    let mut collapsed = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                collapsed.pop();
            },
            other => collapsed.push(other),
        }
    }

    match (collapsed.parent(), collapsed.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map(|parent| parent.join(name))
            .unwrap_or(collapsed),
        _ => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/var/lib/octopus/model.ckpt")),
            PathBuf::from("/var/lib/octopus/model.ckpt.tmp")
        );
    }

    #[test]
    fn test_storage_key_collapses_dot_segments() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("memory").join("lexical_general.json");
        let detour = dir
            .path()
            .join("memory")
            .join(".")
            .join("sub")
            .join("..")
            .join("lexical_general.json");
        assert_eq!(storage_key(&plain), storage_key(&detour));
    }

    #[test]
    fn test_storage_key_canonicalizes_existing_parent() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("memory")).unwrap();
        let key = storage_key(&dir.path().join("memory").join("log.json"));
        let expected = std::fs::canonicalize(dir.path().join("memory"))
            .unwrap()
            .join("log.json");
        assert_eq!(key, expected);
    }

    #[test]
    fn test_storage_key_is_absolute() {
        assert!(storage_key(Path::new("memory/log.json")).is_absolute());
    }
}
