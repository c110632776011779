//! Helpers shared by test modules

use crate::paths::Paths;
use tempfile::TempDir;

/// Paths rooted inside `temp_dir`: config under `config/`, keys under `.ssh/`.
/// Nothing is created on disk.
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_dirs(
        temp_dir.path().join("config"),
        temp_dir.path().join(".ssh"),
    )
}
