//! Handlers for each CLI command.
//!
//! Every handler takes a [`Context`] bundling the resolved paths, the output
//! settings, the prompter, the subprocess runner and the committer lookup, so
//! whole flows run against scripted input in tests. Handlers return
//! `anyhow::Result`; typed [`GitprofError`]s pass through unchanged and can be
//! downcast by callers.

use anyhow::{Context as _, Result, bail};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::clone::{CloneOrchestrator, destination_from_url};
use crate::doctor::run_doctor;
use crate::error::GitprofError;
use crate::git_config;
use crate::launch::{open_in_editor, open_url};
use crate::lookup::CommitterLookup;
use crate::paths::Paths;
use crate::profiles::{
    EDITABLE_FIELDS, Profile, ProfileStore, looks_like_email, validate_profile_name,
};
use crate::prompt::{ChoicePrompt, Prompter, TextPrompt};
use crate::runner::CommandRunner;
use crate::services::{is_github, list_services, ssh_settings_url};
use crate::ssh::{create_keypair, list_candidate_keys, normalize_path, read_public_key, resolve_key_path};
use crate::ui::Ui;

const BAD_EMAIL: &str = "That doesn't look like an email address. Please try again.";

/// Column the service is aligned to in the profile menu
const MENU_NAME_WIDTH: usize = 35;

/// Everything a command needs from the outside world
pub struct Context<'a, R, W> {
    pub paths: &'a Paths,
    pub ui: &'a Ui,
    pub prompter: Prompter<R, W>,
    pub runner: &'a mut dyn CommandRunner,
    pub lookup: &'a dyn CommitterLookup,
    /// Where repositories are cloned and profiles applied
    pub work_dir: PathBuf,
    /// Pause before offering the SSH settings page after a rejected key
    pub pause: Duration,
}

impl<R: BufRead, W: Write> Context<'_, R, W> {
    /// Consume the context, returning the prompter's output
    pub fn into_output(self) -> W {
        self.prompter.into_output()
    }
}

fn missing_profile(name: &str) -> GitprofError {
    GitprofError::not_found(format!(
        "Profile '{}' does not exist.\nHint: Use 'gitprof profile ls' to see your profiles, or 'gitprof profile create {}' to add it.",
        name, name
    ))
}

/// Menu label: the name, padded, then the service in parentheses
fn menu_label(profile: &Profile) -> String {
    match profile.service.as_deref() {
        Some(service) if !service.is_empty() => {
            format!("{:<width$}({})", profile.name, service, width = MENU_NAME_WIDTH)
        }
        _ => profile.name.clone(),
    }
}

/// Resolve which profile to use.
///
/// A preset name is returned as is. Otherwise the stored profiles are offered
/// in a menu whose last entry creates a new profile in-process.
pub fn choose_profile_interactive<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    preset: Option<&str>,
    title: &str,
) -> Result<String> {
    if let Some(name) = preset {
        return Ok(name.to_string());
    }

    let mut store = ProfileStore::open(ctx.paths)?;
    let options: Vec<String> = store.get_profiles().iter().map(menu_label).collect();

    let selected = ctx.prompter.choose(
        &ChoicePrompt::new(title, options.clone()).with_fallback("create new profile", -1),
    )?;

    if !selected.is_fallback
        && let Some(idx) = options.iter().position(|o| *o == selected.value)
    {
        return Ok(store.get_profiles()[idx].name.clone());
    }

    let name = ctx.prompter.text(
        &TextPrompt::new("Enter a name for your new profile (e.g. 'github')")
            .with_validator(|n| validate_profile_name(n).is_ok())
            .with_failure_message(
                "Use a single word of letters, digits, '.', '-' or '_'. Please try again.",
            ),
    )?;
    profile_create(ctx, &name, None)?;

    store.reload()?;
    if !store.contains(&name) {
        return Err(missing_profile(&name).into());
    }
    Ok(name)
}

/// Name and email must both be set before a profile touches a repository
fn require_identity(profile: &Profile) -> Result<()> {
    profile.identity()?;
    Ok(())
}

/// `gitprof clone <repo> [--profile NAME]`
pub fn clone<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    repo: &str,
    profile: Option<&str>,
) -> Result<()> {
    let dest_name = destination_from_url(repo)?;
    let name = choose_profile_interactive(ctx, profile, "Choose a profile to clone with")?;

    ctx.ui.info(format!("Cloning '{}' with profile: {}", repo, name));

    let store = ProfileStore::open(ctx.paths)?;
    let mut profile = store
        .get_profile(&name)
        .cloned()
        .ok_or_else(|| missing_profile(&name))?;
    require_identity(&profile)?;

    let key = normalize_path(&profile.ssh_key_path);
    if !Path::new(&key).exists() {
        return Err(GitprofError::not_found(format!(
            "Can't find your SSH key at '{}'.\nHint: Point the profile at an existing key with 'gitprof profile edit {}'.",
            key, name
        ))
        .into());
    }
    profile.ssh_key_path = key;

    let dest = ctx.work_dir.join(&dest_name);
    let dest_arg = dest.to_string_lossy().into_owned();

    CloneOrchestrator::new(&mut *ctx.runner, &mut ctx.prompter)
        .with_pause(ctx.pause)
        .clone_repo(&profile, repo, &dest_arg)?;

    if !dest.is_dir() {
        return Err(GitprofError::not_found(format!(
            "Could not find your cloned repository at '{}'.\nHint: 'cd' into it and run 'gitprof profile apply --profile {}'.",
            dest.display(),
            name
        ))
        .into());
    }

    git_config::apply(&mut *ctx.runner, &mut ctx.prompter, &profile, &dest)?;

    ctx.ui.ok("Finished setting up your Git repository.");
    Ok(())
}

/// `gitprof profile create <name> [--username U]`
pub fn profile_create<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    name: &str,
    username: Option<&str>,
) -> Result<()> {
    validate_profile_name(name)?;

    let mut store = ProfileStore::open(ctx.paths)?;
    if store.contains(name) {
        return Err(GitprofError::validation(format!(
            "Profile '{}' already exists.\nHint: Edit it with 'gitprof profile edit {}' instead of creating a new one.",
            name, name
        ))
        .into());
    }

    ctx.ui.section(format!("Creating profile: {}", name));

    // SSH key
    let keys = list_candidate_keys(&ctx.paths.ssh_dir)?;
    let chosen = ctx.prompter.choose(
        &ChoicePrompt::new("Choose an SSH key", keys).with_fallback("create new key", 0),
    )?;

    let new_key = chosen.is_fallback;
    let key_path = if new_key {
        let key_name = ctx.prompter.text(
            &TextPrompt::new("Enter the name for your SSH key")
                .with_default(Some(name))
                .with_validator(|k| !k.contains(char::is_whitespace))
                .with_failure_message("Key names cannot contain spaces. Please try again."),
        )?;
        create_keypair(&mut *ctx.runner, &ctx.paths.ssh_dir, &key_name)?
    } else {
        resolve_key_path(&ctx.paths.ssh_dir, &chosen.value)
    };

    // Service
    let service = ctx
        .prompter
        .choose(
            &ChoicePrompt::new("Select the service this profile is for", list_services(&store))
                .enter_manually(0),
        )?
        .value;

    let mut profile = Profile::new(name, key_path);
    profile.service = Some(service.clone());

    let username = match username {
        Some(u) => Some(u.to_string()),
        None if is_github(&service) => {
            let answer = ctx.prompter.text(
                &TextPrompt::new(format!(
                    "What's your username for the service '{}'?\nThis is used to automatically find your committer name and email",
                    service
                ))
                .optional(),
            )?;
            Some(answer).filter(|a| !a.is_empty())
        }
        None => None,
    };

    if let Some(username) = username {
        let spinner = ctx
            .ui
            .spinner("Trying to find your Git committer name and email...");
        let found = ctx.lookup.find_committer(&username);
        spinner.finish_and_clear();

        match found {
            Ok(committer) if !committer.is_empty() => {
                profile.git_name = committer.name;
                profile.git_email = committer.email;
                ctx.prompter.say(
                    "Your name and email were found and are set as the defaults for the next questions.",
                )?;
            }
            Ok(_) => ctx.ui.warn(format!(
                "No commits found for '{}'. Enter your details below.",
                username
            )),
            Err(e) => {
                debug!(error = %e, "committer lookup failed");
                ctx.ui.warn(format!(
                    "Could not look up '{}': {}. Enter your details below.",
                    username, e
                ));
            }
        }
    }

    // Committer identity
    let git_name = ctx.prompter.text(
        &TextPrompt::new("Enter your Git committer name").with_default(profile.git_name.as_deref()),
    )?;
    let git_email = ctx.prompter.text(
        &TextPrompt::new("Enter your Git committer email")
            .with_default(profile.git_email.as_deref())
            .with_validator(looks_like_email)
            .with_failure_message(BAD_EMAIL),
    )?;
    profile.git_name = Some(git_name);
    profile.git_email = Some(git_email);

    if new_key {
        match read_public_key(&profile.ssh_key_path) {
            Ok(public_key) => {
                ctx.prompter.say("Your new SSH public key is:")?;
                ctx.prompter.say(public_key.trim_end())?;
            }
            Err(e) => ctx.ui.warn(format!("Could not read the new public key: {}", e)),
        }

        if let Some(url) = ssh_settings_url(&service) {
            let question = format!(
                "Would you like to open the settings on '{}' to add your SSH key?",
                service
            );
            if ctx.prompter.confirm(&question, true)?
                && let Err(e) = open_url(&mut *ctx.runner, url)
            {
                ctx.ui.warn(format!("Could not open a browser ({}). Visit {}", e, url));
            }
        }
    }

    ctx.paths.ensure_dirs()?;
    store.add_profile(profile)?;
    store.save()?;

    ctx.ui.ok(format!("Saved profile: {}", name));
    Ok(())
}

/// `gitprof profile apply [--profile NAME]` on the working directory's repository
pub fn profile_apply<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    profile: Option<&str>,
) -> Result<()> {
    let name = choose_profile_interactive(ctx, profile, "Choose a profile to apply")?;

    let store = ProfileStore::open(ctx.paths)?;
    let profile = store.get_profile(&name).ok_or_else(|| missing_profile(&name))?;
    require_identity(profile)?;

    let repo_dir = ctx.work_dir.clone();
    git_config::apply(&mut *ctx.runner, &mut ctx.prompter, profile, &repo_dir)?;

    ctx.ui.ok(format!("Applied profile '{}'", name));
    Ok(())
}

/// `gitprof profile rm <name>...`
///
/// Every name is processed; missing names fail the command afterwards.
pub fn profile_rm<R: BufRead, W: Write>(ctx: &mut Context<'_, R, W>, names: &[String]) -> Result<()> {
    if names.is_empty() {
        bail!("No profile names given.\nHint: gitprof profile rm <name>...");
    }

    let mut store = ProfileStore::open(ctx.paths)?;
    let mut removed = Vec::new();
    let mut missing = Vec::new();

    for name in names {
        ctx.prompter.say(format!("Deleting profile '{}'...", name))?;
        if store.delete_profile(name) > 0 {
            removed.push(name.as_str());
        } else {
            ctx.ui.warn(format!("Profile '{}' does not exist.", name));
            missing.push(name.as_str());
        }
    }

    if !removed.is_empty() {
        store.save()?;
        for name in &removed {
            ctx.ui.ok(format!("Deleted profile '{}'", name));
        }
    }

    if !missing.is_empty() {
        return Err(GitprofError::not_found(format!(
            "No such profile(s): {}",
            missing.join(", ")
        ))
        .into());
    }
    Ok(())
}

/// `gitprof profile ls [--quiet]`
pub fn profile_ls<R: BufRead, W: Write>(ctx: &mut Context<'_, R, W>, quiet: bool) -> Result<()> {
    let store = ProfileStore::open(ctx.paths)?;
    let ui = ctx.ui;

    if store.is_empty() {
        ui.warn("No profiles exist.");
        ui.println(format!("Create one with: {} profile create <name>", ui.bold("gitprof")));
        return Ok(());
    }

    if quiet {
        for name in store.profile_names() {
            ctx.prompter.say(name)?;
        }
        return Ok(());
    }

    let mut table = ui.table();
    table.set_header(vec![
        ui.header_cell("Profile"),
        ui.header_cell("Service"),
        ui.header_cell("Name"),
        ui.header_cell("Email"),
        ui.header_cell("SSH key"),
    ]);

    let none = ui.dim("-");
    for profile in store.get_profiles() {
        table.add_row(vec![
            ui.cell(&profile.name),
            ui.cell(profile.service.clone().unwrap_or_else(|| none.clone())),
            ui.cell(profile.git_name.clone().unwrap_or_else(|| none.clone())),
            ui.cell(profile.git_email.clone().unwrap_or_else(|| none.clone())),
            ui.key_cell(&normalize_path(&profile.ssh_key_path)),
        ]);
    }

    ctx.prompter.say(table.to_string())?;
    Ok(())
}

/// `gitprof profile edit <name> [--git-name N] [--git-email E]`
///
/// Presets replace the stored values before the prompts, so they show up as defaults.
pub fn profile_edit<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    name: &str,
    git_name: Option<&str>,
    git_email: Option<&str>,
) -> Result<()> {
    let mut store = ProfileStore::open(ctx.paths)?;
    let mut profile = store
        .get_profile(name)
        .cloned()
        .ok_or_else(|| missing_profile(name))?;

    if let Some(git_name) = git_name.filter(|n| !n.is_empty()) {
        profile.git_name = Some(git_name.to_string());
    }
    if let Some(git_email) = git_email.filter(|e| !e.is_empty()) {
        if !looks_like_email(git_email) {
            return Err(GitprofError::validation(format!(
                "'{}' is not a valid committer email.",
                git_email
            ))
            .into());
        }
        profile.git_email = Some(git_email.to_string());
    }

    ctx.ui.section(format!("Editing profile: {}", name));
    for field in EDITABLE_FIELDS {
        let mut prompt = TextPrompt::new(format!("Enter new value for '{}'", field.name))
            .with_default((field.get)(&profile));
        if field.optional {
            prompt = prompt.optional();
        }
        if let Some(valid) = field.validate {
            prompt = prompt.with_validator(valid).with_failure_message(BAD_EMAIL);
        }
        let value = ctx.prompter.text(&prompt)?;
        (field.set)(&mut profile, value);
    }

    profile.ssh_key_path = resolve_key_path(&ctx.paths.ssh_dir, &profile.ssh_key_path);

    if !store.set_profile(profile) {
        return Err(missing_profile(name).into());
    }
    store.save()?;

    ctx.ui.ok(format!("Updated profile '{}'", name));
    Ok(())
}

fn require_config_file(paths: &Paths) -> Result<()> {
    if !paths.config_file.exists() {
        return Err(GitprofError::not_found(format!(
            "Config file does not exist at '{}'.\nHint: Create a profile with 'gitprof profile create <name>'.",
            paths.config_file.display()
        ))
        .into());
    }
    Ok(())
}

/// `gitprof config edit [editor]`
pub fn config_edit<R: BufRead, W: Write>(
    ctx: &mut Context<'_, R, W>,
    editor: Option<&str>,
) -> Result<()> {
    require_config_file(ctx.paths)?;

    let config_file = ctx.paths.config_file.clone();
    open_in_editor(&mut *ctx.runner, &config_file, editor)?;

    ctx.ui.ok(format!("Opened {} in editor", config_file.display()));
    Ok(())
}

/// `gitprof config rm [--yes]`
pub fn config_rm<R: BufRead, W: Write>(ctx: &mut Context<'_, R, W>, yes: bool) -> Result<()> {
    require_config_file(ctx.paths)?;
    let paths = ctx.paths;
    let config_file = &paths.config_file;

    if !yes {
        let question = format!(
            "Delete '{}'? All profiles in it will be lost.",
            config_file.display()
        );
        if !ctx.prompter.confirm(&question, false)? {
            ctx.ui.info("Kept the config file.");
            return Ok(());
        }
    }

    fs::remove_file(config_file)
        .with_context(|| format!("Failed to delete {}", config_file.display()))?;

    ctx.ui.ok(format!("Deleted {}", config_file.display()));
    Ok(())
}

/// `gitprof doctor`
pub fn doctor(paths: &Paths, ui: &Ui) -> Result<()> {
    if !run_doctor(paths, ui) {
        bail!("Doctor found problems; see the report above.");
    }
    Ok(())
}
