//! Diagnostics for `gitprof doctor`.
//!
//! Checks, in order:
//! - the config directory and config file
//! - the external programs gitprof runs
//! - each profile's key, public key and committer identity
//!
//! Each check prints its findings; [`run_doctor`] reports whether any failed.

use std::env;
use std::path::Path;
use which::which;

use crate::paths::Paths;
use crate::profiles::ProfileStore;
use crate::ssh::normalize_path;
use crate::ui::Ui;

/// Programs gitprof shells out to; `required` ones are needed by every clone
const PROGRAMS: &[(&str, bool)] = &[("git", true), ("ssh", true), ("ssh-keygen", false)];

/// Run every check. Returns false if any reported an error.
pub fn run_doctor(paths: &Paths, ui: &Ui) -> bool {
    ui.section("gitprof doctor");
    ui.newline();

    let mut healthy = true;

    healthy &= check_step(ui, "Config", || {
        if paths.config_dir.is_dir() {
            ui.println(format!(
                "  {} Config directory exists: {}",
                ui.icon_ok(),
                paths.config_dir.display()
            ));
        } else {
            ui.println(format!(
                "  {} Config directory missing: {} (created on first save)",
                ui.icon_warn(),
                paths.config_dir.display()
            ));
        }

        if !paths.config_file.exists() {
            ui.println(format!(
                "  {} No config file yet (create a profile to start one)",
                ui.icon_info()
            ));
            return true;
        }

        let text = match std::fs::read_to_string(&paths.config_file) {
            Ok(text) => text,
            Err(e) => {
                ui.println(format!("  {} Config file unreadable: {}", ui.icon_err(), e));
                return false;
            }
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(doc) if doc.get("profiles").is_some_and(|p| p.is_array()) => {
                ui.println(format!(
                    "  {} Config file is valid: {}",
                    ui.icon_ok(),
                    paths.config_file.display()
                ));
                true
            }
            Ok(_) => {
                ui.println(format!(
                    "  {} Config file has no 'profiles' list",
                    ui.icon_err()
                ));
                false
            }
            Err(e) => {
                ui.println(format!("  {} Config file is not valid JSON: {}", ui.icon_err(), e));
                false
            }
        }
    });

    healthy &= check_step(ui, "Programs", || check_programs(ui, PROGRAMS));

    healthy &= check_step(ui, "Profiles", || {
        let store = match ProfileStore::open(paths) {
            Ok(store) => store,
            Err(e) => {
                ui.println(format!("  {} Failed to load profiles: {}", ui.icon_err(), e));
                return false;
            }
        };

        if store.is_empty() {
            ui.println(format!("  {} No profiles found", ui.icon_warn()));
            return true;
        }

        ui.println(format!("  Found {} profile(s):", store.get_profiles().len()));
        let mut all_valid = true;

        for profile in store.get_profiles() {
            let key = normalize_path(&profile.ssh_key_path);
            let mut problems = Vec::new();
            let mut warnings = Vec::new();

            if !Path::new(&key).is_file() {
                problems.push(format!("missing key {}", key));
            } else if !Path::new(&format!("{}.pub", key)).is_file() {
                warnings.push("no public key".to_string());
            }
            if profile.identity().is_err() {
                warnings.push("name/email not set".to_string());
            }

            if !problems.is_empty() {
                all_valid = false;
                problems.extend(warnings);
                ui.println(format!(
                    "    {} {} ({})",
                    ui.icon_err(),
                    profile.name,
                    problems.join(", ")
                ));
            } else if !warnings.is_empty() {
                ui.println(format!(
                    "    {} {} ({})",
                    ui.icon_warn(),
                    profile.name,
                    warnings.join(", ")
                ));
            } else {
                ui.println(format!("    {} {}", ui.icon_ok(), profile.name));
            }
        }
        all_valid
    });

    check_step(ui, "Environment", || {
        match env::var("EDITOR") {
            Ok(e) => ui.println(format!("  {} EDITOR set to: {}", ui.icon_ok(), e)),
            Err(_) => ui.println(format!(
                "  {} EDITOR not set (config edit uses the system default)",
                ui.icon_info()
            )),
        }
        true
    });

    healthy
}

fn check_programs(ui: &Ui, programs: &[(&str, bool)]) -> bool {
    let mut ok = true;
    for &(program, required) in programs {
        match which(program) {
            Ok(found) => ui.println(format!(
                "  {} {} found: {}",
                ui.icon_ok(),
                program,
                found.display()
            )),
            Err(_) if required => {
                ui.println(format!("  {} {} not found on PATH", ui.icon_err(), program));
                ok = false;
            }
            Err(_) => ui.println(format!(
                "  {} {} not found on PATH (needed to create keys)",
                ui.icon_warn(),
                program
            )),
        }
    }
    ok
}

fn check_step<F>(ui: &Ui, name: &str, check_fn: F) -> bool
where
    F: FnOnce() -> bool,
{
    ui.println(ui.bold(format!("Checking {}...", name)));
    let success = check_fn();
    if !success {
        ui.err(format!("{}: issues detected", name));
    }
    ui.newline();
    success
}
