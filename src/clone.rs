//! Profile-aware cloning.
//!
//! The clone runs with the profile's SSH command. A failed clone is classified
//! from its output and handled:
//! - missing key: reported, no retry
//! - key rejected: the public key is shown and the service's SSH settings page offered
//! - unknown host key: one retry with host key checking relaxed, if the user agrees
//! - anything else: reported as a plain clone failure

use std::io::{BufRead, Write};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{AuthFailure, GitprofError, Result};
use crate::launch::open_url;
use crate::profiles::Profile;
use crate::prompt::Prompter;
use crate::runner::{CommandOutput, CommandRunner};
use crate::services::ssh_settings_url;
use crate::ssh::{build_ssh_command, read_public_key};

/// Why a clone exited non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingKey,
    AuthRejected,
    UntrustedHost,
    Unclassified,
}

/// Classify clone output, checking causes in priority order
pub fn classify_failure(output: &str) -> FailureKind {
    if is_identity_not_accessible(output) {
        FailureKind::MissingKey
    } else if output.contains("Permission denied") {
        FailureKind::AuthRejected
    } else if output.contains("Host key verification failed") {
        FailureKind::UntrustedHost
    } else {
        FailureKind::Unclassified
    }
}

/// ssh prints `Warning: Identity file <path> not accessible: ...`
fn is_identity_not_accessible(output: &str) -> bool {
    output.lines().any(|line| {
        line.find("Identity file")
            .is_some_and(|start| line[start..].contains("not accessible"))
    })
}

/// Directory name git will clone `repo` into: last path segment without `.git`
pub fn destination_from_url(repo: &str) -> Result<String> {
    let invalid = || {
        GitprofError::validation(format!(
            "Can't work out a directory name from '{}'.\nHint: Expected a URL like 'git@host:org/repo.git' or 'https://host/org/repo.git'.",
            repo
        ))
    };

    let trimmed = repo.trim().trim_end_matches('/');
    let stem = trimmed.strip_suffix(".git").ok_or_else(invalid)?;
    let name = stem.rsplit(['/', ':']).next().ok_or_else(invalid)?;

    // A separator is required before the name
    if name.is_empty() || name.len() == stem.len() {
        return Err(invalid());
    }
    Ok(name.to_string())
}

/// `git -c core.sshCommand=<ssh> clone <repo> <dest>`
pub fn build_clone_command(ssh_command: &str, repo: &str, dest: &str) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-c")
        .arg(format!("core.sshCommand={}", ssh_command))
        .args(["clone", repo, dest]);
    cmd
}

/// Drives a clone and its failure remediation
pub struct CloneOrchestrator<'a, R, W> {
    runner: &'a mut dyn CommandRunner,
    prompter: &'a mut Prompter<R, W>,
    /// Pause before offering to open the SSH settings page
    pub pause: Duration,
}

impl<'a, R: BufRead, W: Write> CloneOrchestrator<'a, R, W> {
    pub fn new(runner: &'a mut dyn CommandRunner, prompter: &'a mut Prompter<R, W>) -> Self {
        Self {
            runner,
            prompter,
            pause: Duration::from_secs(2),
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Clone `repo` into `dest` with the profile's key. Returns once the clone succeeded.
    pub fn clone_repo(&mut self, profile: &Profile, repo: &str, dest: &str) -> Result<()> {
        let mut strict = true;

        loop {
            let output = self.execute(profile, repo, dest, strict)?;
            if output.success {
                info!(repo, dest, "clone finished");
                return Ok(());
            }

            let kind = classify_failure(&output.output);
            debug!(?kind, code = ?output.code, "clone failed");

            match kind {
                FailureKind::MissingKey => {
                    return Err(AuthFailure::MissingKey {
                        key_path: profile.ssh_key_path.clone(),
                    }
                    .into());
                }
                FailureKind::AuthRejected => {
                    self.remediate_rejected_key(profile)?;
                    return Err(AuthFailure::AuthRejected {
                        profile: profile.name.clone(),
                    }
                    .into());
                }
                FailureKind::UntrustedHost if strict => {
                    self.prompter.say("")?;
                    self.prompter
                        .say("The remote host's key is not in your known hosts.")?;
                    if self.prompter.confirm(
                        "Retry the clone and accept the host key?",
                        false,
                    )? {
                        strict = false;
                        continue;
                    }
                    return Err(AuthFailure::UntrustedHost.into());
                }
                FailureKind::UntrustedHost => return Err(AuthFailure::UntrustedHost.into()),
                FailureKind::Unclassified => {
                    return Err(GitprofError::CloneFailed { code: output.code });
                }
            }
        }
    }

    fn execute(
        &mut self,
        profile: &Profile,
        repo: &str,
        dest: &str,
        strict: bool,
    ) -> Result<CommandOutput> {
        let ssh_command = build_ssh_command(&profile.ssh_key_path, strict);
        let mut cmd = build_clone_command(&ssh_command, repo, dest);
        Ok(self.runner.capture(&mut cmd)?)
    }

    /// Show the public key and offer the service's SSH key page
    fn remediate_rejected_key(&mut self, profile: &Profile) -> Result<()> {
        self.prompter.say("")?;
        self.prompter.say(format!(
            "The remote rejected the SSH key for profile '{}'. It may not be added to your account yet.",
            profile.name
        ))?;

        match read_public_key(&profile.ssh_key_path) {
            Ok(key) => {
                self.prompter.say("Your public key is:")?;
                self.prompter.say(key.trim_end())?;
            }
            Err(e) => self.prompter.say(format!("Could not read the public key: {}", e))?,
        }

        if !self.pause.is_zero() {
            std::thread::sleep(self.pause);
        }

        let Some(service) = profile.service.as_deref() else {
            return Ok(());
        };
        let Some(url) = ssh_settings_url(service) else {
            return Ok(());
        };

        let question = format!(
            "Would you like to open the settings on '{}' to add your SSH key?",
            service
        );
        if self.prompter.confirm(&question, true)?
            && let Err(e) = open_url(&mut *self.runner, url)
        {
            self.prompter
                .say(format!("Could not open a browser ({}). Visit {}", e, url))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::normalize_path;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    const HOST_KEY_FAILED: &str = "No ED25519 host key is known for example.com and you have requested strict checking.\nHost key verification failed.\nfatal: Could not read from remote repository.\n";
    const DENIED: &str = "git@example.com: Permission denied (publickey).\nfatal: Could not read from remote repository.\n";

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn profile(key: &str, service: Option<&str>) -> Profile {
        Profile {
            name: "work".to_string(),
            ssh_key_path: key.to_string(),
            git_name: Some("Jane".to_string()),
            git_email: Some("jane@example.com".to_string()),
            service: service.map(str::to_string),
        }
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(
            classify_failure("Warning: Identity file /k/id not accessible: No such file or directory.\nPermission denied"),
            FailureKind::MissingKey
        );
        assert_eq!(
            classify_failure("Cloning...\nPermission denied (publickey).\nHost key verification failed."),
            FailureKind::AuthRejected
        );
        assert_eq!(classify_failure(HOST_KEY_FAILED), FailureKind::UntrustedHost);
        assert_eq!(
            classify_failure("fatal: repository 'x' does not exist"),
            FailureKind::Unclassified
        );
        assert_eq!(
            classify_failure("not accessible\nIdentity file"),
            FailureKind::Unclassified
        );
    }

    #[test]
    fn test_destination_from_url() {
        assert_eq!(
            destination_from_url("https://example.com/org/repo.git").unwrap(),
            "repo"
        );
        assert_eq!(destination_from_url("git@example.com:org/repo.git").unwrap(), "repo");
        assert_eq!(destination_from_url("git@example.com:repo.git").unwrap(), "repo");
        assert_eq!(
            destination_from_url("ssh://git@host/a/b/my.repo.git/").unwrap(),
            "my.repo"
        );

        for bad in ["https://example.com/org/repo", "repo.git", "https://x/.git", ""] {
            assert!(
                matches!(destination_from_url(bad), Err(GitprofError::Validation(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_build_clone_command() {
        let cmd = build_clone_command("ssh -i /k/id", "git@h:o/r.git", "r");
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec!["-c", "core.sshCommand=ssh -i /k/id", "clone", "git@h:o/r.git", "r"]
        );
    }

    #[test]
    fn test_success_first_try() {
        let mut runner = ScriptedRunner::new();
        let mut p = prompter("");

        CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", None), "git@h:o/r.git", "r")
            .unwrap();

        assert_eq!(runner.calls.len(), 1);
        assert_eq!(
            runner.calls[0].args[1],
            format!("core.sshCommand=ssh -i {}", normalize_path("/k/id"))
        );
    }

    #[test]
    fn test_untrusted_host_retry_accepted() {
        let mut runner = ScriptedRunner::new();
        runner
            .push_output(CommandOutput::failed(128, HOST_KEY_FAILED))
            .push_output(CommandOutput::ok(""));
        let mut p = prompter("y\n");

        CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", None), "git@h:o/r.git", "r")
            .unwrap();

        assert_eq!(runner.calls.len(), 2);
        assert!(!runner.calls[0].args[1].contains("StrictHostKeyChecking"));
        assert!(runner.calls[1].args[1].ends_with("-o StrictHostKeyChecking=no"));
    }

    #[test]
    fn test_untrusted_host_retry_declined() {
        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(128, HOST_KEY_FAILED));
        let mut p = prompter("n\n");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", None), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(err, GitprofError::Auth(AuthFailure::UntrustedHost)));
        assert_eq!(runner.calls.len(), 1);
    }

    #[test]
    fn test_untrusted_host_retries_only_once() {
        let mut runner = ScriptedRunner::new();
        runner
            .push_output(CommandOutput::failed(128, HOST_KEY_FAILED))
            .push_output(CommandOutput::failed(128, HOST_KEY_FAILED));
        let mut p = prompter("y\ny\ny\n");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", None), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(err, GitprofError::Auth(AuthFailure::UntrustedHost)));
        assert_eq!(runner.calls.len(), 2);
    }

    #[test]
    fn test_permission_denied_offers_settings_page() {
        let temp_dir = TempDir::new().unwrap();
        let key = temp_dir.path().join("id_work");
        fs::write(&key, "private").unwrap();
        fs::write(temp_dir.path().join("id_work.pub"), "ssh-ed25519 AAAAPUB jane\n").unwrap();

        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(128, DENIED));
        let mut p = prompter("\n");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .with_pause(Duration::ZERO)
            .clone_repo(
                &profile(key.to_str().unwrap(), Some("GitHub")),
                "git@github.com:o/r.git",
                "r",
            )
            .unwrap_err();

        assert!(matches!(
            err,
            GitprofError::Auth(AuthFailure::AuthRejected { .. })
        ));
        // clone, then browser
        assert_eq!(runner.calls.len(), 2);
        assert!(runner.calls[1].interactive);
        assert_eq!(
            runner.calls[1].args.last().unwrap(),
            "https://github.com/settings/keys"
        );

        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("ssh-ed25519 AAAAPUB jane"));
    }

    #[test]
    fn test_permission_denied_browser_declined_still_fails() {
        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(128, DENIED));
        let mut p = prompter("n\n");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .with_pause(Duration::ZERO)
            .clone_repo(&profile("/missing/id", Some("gitlab")), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(err, GitprofError::Auth(AuthFailure::AuthRejected { .. })));
        assert_eq!(runner.calls.len(), 1);
    }

    #[test]
    fn test_permission_denied_unknown_service_no_prompt() {
        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(128, DENIED));
        let mut p = prompter("");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .with_pause(Duration::ZERO)
            .clone_repo(&profile("/missing/id", Some("Self-hosted")), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(err, GitprofError::Auth(AuthFailure::AuthRejected { .. })));
        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(!out.contains("Would you like to open"));
    }

    #[test]
    fn test_missing_key() {
        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(
            128,
            "Warning: Identity file /k/id not accessible: No such file or directory.\ngit@h: Permission denied (publickey).\n",
        ));
        let mut p = prompter("");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", Some("GitHub")), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(
            err,
            GitprofError::Auth(AuthFailure::MissingKey { ref key_path }) if key_path == "/k/id"
        ));
    }

    #[test]
    fn test_unclassified() {
        let mut runner = ScriptedRunner::new();
        runner.push_output(CommandOutput::failed(
            128,
            "fatal: destination path 'r' already exists and is not an empty directory.\n",
        ));
        let mut p = prompter("");

        let err = CloneOrchestrator::new(&mut runner, &mut p)
            .clone_repo(&profile("/k/id", None), "git@h:o/r.git", "r")
            .unwrap_err();

        assert!(matches!(err, GitprofError::CloneFailed { code: Some(128) }));
    }
}
