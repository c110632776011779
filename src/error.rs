//! Error types shared by the core modules.
//!
//! Command handlers wrap these in `anyhow` for context; `main` turns any of them
//! into a non-zero exit status.

use thiserror::Error;

pub type Result<T, E = GitprofError> = std::result::Result<T, E>;

/// Why an SSH-backed clone was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// ssh could not read the identity file
    #[error("SSH key '{key_path}' is not accessible")]
    MissingKey { key_path: String },

    /// The remote refused the key
    #[error("the remote rejected the SSH key for profile '{profile}'")]
    AuthRejected { profile: String },

    /// The remote host key is not in known_hosts and was not accepted
    #[error("host key verification failed")]
    UntrustedHost,
}

#[derive(Error, Debug)]
pub enum GitprofError {
    /// Bad or missing argument, duplicate profile name, malformed repo URL
    #[error("{0}")]
    Validation(String),

    /// Profile, key or config file absent
    #[error("{0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthFailure),

    /// Clone exited non-zero for a reason we could not classify
    #[error("clone failed (exit status {})", .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()))]
    CloneFailed { code: Option<i32> },

    /// A non-SSH external command failed
    #[error("`{command}` failed: {message}")]
    Subprocess { command: String, message: String },

    /// Interactive retries exceeded
    #[error("failed to get valid input after {attempts} attempt(s)")]
    InputExhausted { attempts: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GitprofError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
