//! Config file writes: atomic replace, owner-only permissions.

use std::fs;
use std::io;
use std::path::Path;

/// Write `content` to `path` atomically
///
/// The parent directory is created if needed. Content goes to a sibling temp
/// file which is then renamed over the target, so a crash never leaves a
/// half-written file behind.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    restrict_permissions(&temp_path)?;
    fs::rename(&temp_path, path)
}

/// Make a file readable and writable by its owner only (no-op off Unix)
pub fn restrict_permissions(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
