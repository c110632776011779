//! SSH key handling: path normalization, key discovery, keypair creation and
//! the `ssh` command line git is told to use.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use crate::error::{GitprofError, Result};
use crate::runner::{CommandRunner, describe};

/// Option appended when the user agreed to trust an unknown host key
pub const ACCEPT_NEW_HOST_OPTION: &str = "-o StrictHostKeyChecking=no";

/// Absolute, lexically normalized, forward-slash form of `path`.
///
/// `.` and `..` are resolved without touching the filesystem, so the result is
/// stable for paths that do not exist yet. On Windows the path is also
/// lower-cased, matching the case-insensitive filesystem.
pub fn normalize_path(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past the root
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    let normalized = out.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Resolve a key given either as an existing path or as a bare name inside `ssh_dir`
pub fn resolve_key_path(ssh_dir: &Path, name_or_path: &str) -> String {
    let candidate = Path::new(name_or_path);
    if candidate.exists() {
        normalize_path(candidate)
    } else {
        normalize_path(ssh_dir.join(name_or_path))
    }
}

/// The `ssh` invocation git should use for a key.
///
/// With `strict_host_key_checking` off, unknown host keys are accepted; only
/// used after the user explicitly agreed to it.
pub fn build_ssh_command(key_path: &str, strict_host_key_checking: bool) -> String {
    let key = normalize_path(key_path);
    let key = if key.contains(char::is_whitespace) {
        format!("\"{}\"", key)
    } else {
        key
    };

    let mut command = format!("ssh -i {}", key);
    if !strict_host_key_checking {
        command.push(' ');
        command.push_str(ACCEPT_NEW_HOST_OPTION);
    }
    command
}

/// Private keys in `dir` that have a `.pub` sibling, sorted by name
pub fn list_candidate_keys(dir: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let names: HashSet<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();

    let mut keys: Vec<String> = names
        .iter()
        .filter(|n| !n.ends_with(".pub") && names.contains(&format!("{}.pub", n)))
        .cloned()
        .collect();
    keys.sort();
    Ok(keys)
}

/// Generate an ed25519 keypair and return the normalized private-key path.
///
/// A bare `name` lands in `ssh_dir`. `ssh-keygen` runs attached to the terminal
/// so it can ask for a passphrase.
pub fn create_keypair(runner: &mut dyn CommandRunner, ssh_dir: &Path, name: &str) -> Result<String> {
    let target = if Path::new(name).is_absolute() {
        PathBuf::from(name)
    } else {
        ssh_dir.join(name)
    };
    let target = PathBuf::from(normalize_path(&target));

    if target.exists() {
        return Err(GitprofError::validation(format!(
            "SSH key '{}' already exists; choose another name.",
            target.display()
        )));
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut cmd = Command::new("ssh-keygen");
    cmd.args(["-t", "ed25519", "-a", "100", "-f"]).arg(&target);

    if !runner.interactive(&mut cmd)? {
        return Err(GitprofError::Subprocess {
            command: describe(&cmd),
            message: "ssh-keygen did not create the key".to_string(),
        });
    }

    Ok(normalize_path(&target))
}

/// Contents of the `.pub` file belonging to a private key
pub fn read_public_key(path: &str) -> Result<String> {
    let pub_path = if path.ends_with(".pub") {
        path.to_string()
    } else {
        format!("{}.pub", path)
    };

    fs::read_to_string(&pub_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            GitprofError::not_found(format!("Public key '{}' does not exist", pub_path))
        }
        _ => e.into(),
    })
}
