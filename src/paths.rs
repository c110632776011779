use anyhow::{Context, Result};
use directories::BaseDirs;
use std::path::PathBuf;

/// Overrides the config directory (used by tests and portable installs)
pub const CONFIG_DIR_ENV: &str = "GITPROF_CONFIG_DIR";
/// Overrides the SSH key directory
pub const SSH_DIR_ENV: &str = "GITPROF_SSH_DIR";

/// All computed paths used by gitprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// <config dir>/gitprof
    pub config_dir: PathBuf,
    /// <config dir>/gitprof/config.json
    pub config_file: PathBuf,
    /// ~/.ssh
    pub ssh_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Result<Self> {
        let base_dirs = BaseDirs::new().context("Failed to determine home directory")?;

        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => base_dirs.config_dir().join("gitprof"),
        };
        let ssh_dir = match std::env::var_os(SSH_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => base_dirs.home_dir().join(".ssh"),
        };

        Ok(Self::with_dirs(config_dir, ssh_dir))
    }

    /// Build paths rooted at explicit directories
    pub fn with_dirs(config_dir: PathBuf, ssh_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self {
            config_dir,
            config_file,
            ssh_dir,
        }
    }

    /// Ensure the config directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!("Failed to create config directory: {:?}", self.config_dir)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_with_dirs_config_file() {
        let paths = Paths::with_dirs(PathBuf::from("/tmp/cfg"), PathBuf::from("/tmp/ssh"));
        assert!(paths.config_file.ends_with("cfg/config.json"));
        assert_eq!(paths.ssh_dir, PathBuf::from("/tmp/ssh"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let cfg = temp_dir.path().join("cfg");
        let ssh = temp_dir.path().join("keys");

        // SAFETY: serialized with every other test touching these variables
        unsafe {
            std::env::set_var(CONFIG_DIR_ENV, &cfg);
            std::env::set_var(SSH_DIR_ENV, &ssh);
        }
        let paths = Paths::new().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_DIR_ENV);
            std::env::remove_var(SSH_DIR_ENV);
        }

        assert_eq!(paths.config_dir, cfg);
        assert_eq!(paths.config_file, cfg.join("config.json"));
        assert_eq!(paths.ssh_dir, ssh);
    }

    #[test]
    #[serial]
    fn test_default_locations() {
        let paths = Paths::new().unwrap();
        assert!(paths.config_file.ends_with("gitprof/config.json"));
        assert!(paths.ssh_dir.ends_with(".ssh"));
    }

    #[test]
    fn test_ensure_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let paths = Paths::with_dirs(temp_dir.path().join("a/b"), temp_dir.path().join("ssh"));
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
    }
}
