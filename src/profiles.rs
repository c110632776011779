//! Core profile management logic.
//!
//! This module handles the "data model" of profiles:
//! - The `Profile` record (SSH key, committer identity, hosting service)
//! - `ProfileStore`, the in-memory list persisted to `config.json`
//! - Validating profile names
//! - The table of fields the `profile edit` flow walks through
//!
//! The store never persists on its own: callers mutate it and then call
//! [`ProfileStore::save`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{GitprofError, Result};
use crate::fs_utils::write_atomic;
use crate::paths::Paths;

/// A named Git identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(rename = "ssh_key")]
    pub ssh_key_path: String,
    #[serde(default)]
    pub git_name: Option<String>,
    #[serde(default)]
    pub git_email: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, ssh_key_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ssh_key_path: ssh_key_path.into(),
            git_name: None,
            git_email: None,
            service: None,
        }
    }

    /// Committer name and email, or a validation error naming what is missing
    pub fn identity(&self) -> Result<(&str, &str)> {
        match (self.git_name.as_deref(), self.git_email.as_deref()) {
            (Some(name), Some(email)) if !name.is_empty() && !email.is_empty() => {
                Ok((name, email))
            }
            _ => Err(GitprofError::validation(format!(
                "Git name and/or email are missing for profile '{}'.\nHint: Run 'gitprof profile edit {}' to set them.",
                self.name, self.name
            ))),
        }
    }
}

/// One editable profile field, read and written without reflection
pub struct EditableField {
    pub name: &'static str,
    pub get: fn(&Profile) -> Option<&str>,
    pub set: fn(&mut Profile, String),
    /// Whether an empty answer is acceptable
    pub optional: bool,
    /// Rejects typed answers that are not acceptable values
    pub validate: Option<fn(&str) -> bool>,
}

/// Loose committer email check, shared by profile creation and editing
pub fn looks_like_email(value: &str) -> bool {
    value.contains('@')
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// Fields prompted by `profile edit`, in prompt order. `name` is the identity and is not listed.
pub const EDITABLE_FIELDS: &[EditableField] = &[
    EditableField {
        name: "ssh_key",
        get: |p| Some(p.ssh_key_path.as_str()),
        set: |p, v| p.ssh_key_path = v,
        optional: false,
        validate: None,
    },
    EditableField {
        name: "git_name",
        get: |p| p.git_name.as_deref(),
        set: |p, v| p.git_name = non_empty(v),
        optional: false,
        validate: None,
    },
    EditableField {
        name: "git_email",
        get: |p| p.git_email.as_deref(),
        set: |p, v| p.git_email = non_empty(v),
        optional: false,
        validate: Some(looks_like_email),
    },
    EditableField {
        name: "service",
        get: |p| p.service.as_deref(),
        set: |p, v| p.service = non_empty(v),
        optional: true,
        validate: None,
    },
];

/// Validate profile name
///
/// Only allows alphanumeric characters, dots, underscores, and hyphens.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GitprofError::validation("Profile name cannot be empty"));
    }

    if name.chars().count() > 64 {
        return Err(GitprofError::validation(
            "Profile name cannot be longer than 64 characters",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(GitprofError::validation(format!(
            "Invalid profile name '{}'.\n\n Only alphanumeric characters, dots (.), hyphens (-), and underscores (_) are allowed.",
            name
        )));
    }

    Ok(())
}

#[derive(Serialize)]
struct ConfigDocument<'a> {
    profiles: &'a [Profile],
}

/// Persisted, ordered collection of profiles with unique names
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
    profiles: Vec<Profile>,
}

impl ProfileStore {
    /// Open the store backed by `paths.config_file` and load it
    pub fn open(paths: &Paths) -> Result<Self> {
        Self::open_at(&paths.config_file)
    }

    /// Open a store backed by an explicit file
    pub fn open_at(path: &Path) -> Result<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            profiles: Vec::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config file into memory.
    ///
    /// A missing file leaves the store empty. A file that is not a valid config
    /// document is logged and leaves the in-memory state untouched; individual
    /// malformed profile entries are skipped. Only read errors are returned.
    pub fn load(&mut self) -> Result<()> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "config file absent, starting empty");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match parse_document(&text) {
            Ok(profiles) => self.profiles = profiles,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to parse config file; keeping current profiles");
            }
        }
        Ok(())
    }

    /// Discard unsaved changes and re-read from disk
    pub fn reload(&mut self) -> Result<()> {
        self.profiles.clear();
        self.load()
    }

    /// Write every profile to the config file, replacing it
    pub fn save(&self) -> Result<()> {
        let doc = ConfigDocument {
            profiles: &self.profiles,
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser)?;
        buf.push(b'\n');

        write_atomic(&self.path, &buf)?;
        debug!(path = %self.path.display(), count = self.profiles.len(), "saved profiles");
        Ok(())
    }

    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get_profile(name).is_some()
    }

    /// Append a profile; fails without mutating when the name is taken
    pub fn add_profile(&mut self, profile: Profile) -> Result<()> {
        if self.contains(&profile.name) {
            return Err(GitprofError::validation(format!(
                "Cannot create profile '{}'; a profile with that name already exists.",
                profile.name
            )));
        }
        self.profiles.push(profile);
        Ok(())
    }

    /// Replace the stored profile with the same name. Returns false if none matched.
    pub fn set_profile(&mut self, profile: Profile) -> bool {
        match self.profiles.iter().position(|p| p.name == profile.name) {
            Some(idx) => {
                self.profiles[idx] = profile;
                true
            }
            None => false,
        }
    }

    /// Remove every profile called `name`, returning how many were removed
    pub fn delete_profile(&mut self, name: &str) -> usize {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.name != name);
        before - self.profiles.len()
    }

    pub fn get_profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn parse_document(text: &str) -> Result<Vec<Profile>> {
    let doc: Value = serde_json::from_str(text)?;
    let entries = match doc.get("profiles") {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) => return Ok(Vec::new()),
        _ => {
            return Err(GitprofError::validation(
                "config document has no 'profiles' list",
            ));
        }
    };

    let mut profiles: Vec<Profile> = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        match Profile::deserialize(entry) {
            Ok(profile) if profiles.iter().any(|p| p.name == profile.name) => {
                warn!(index = idx, name = %profile.name, "skipping duplicate profile entry")
            }
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!(index = idx, error = %e, "skipping bad profile entry"),
        }
    }
    Ok(profiles)
}
