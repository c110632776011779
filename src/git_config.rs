//! Applying a profile's identity to a repository's local git config.

use std::io::{BufRead, Write};
use std::path::Path;
use std::process::Command;

use crate::error::{GitprofError, Result};
use crate::profiles::Profile;
use crate::prompt::Prompter;
use crate::runner::{CommandRunner, describe};
use crate::ssh::build_ssh_command;

/// The `(key, value)` pairs written for a profile, in order
pub fn config_entries(profile: &Profile) -> Result<Vec<(&'static str, String)>> {
    let (name, email) = profile.identity()?;
    Ok(vec![
        ("user.name", name.to_string()),
        ("user.email", email.to_string()),
        ("core.sshCommand", build_ssh_command(&profile.ssh_key_path, true)),
    ])
}

/// Set user.name, user.email and core.sshCommand in `repo_dir`'s local config.
///
/// Stops at the first failing `git config` call; values already written stay.
pub fn apply<R: BufRead, W: Write>(
    runner: &mut dyn CommandRunner,
    prompter: &mut Prompter<R, W>,
    profile: &Profile,
    repo_dir: &Path,
) -> Result<()> {
    let entries = config_entries(profile)?;

    prompter.say(format!(
        "Setting local Git config values for '{}'...",
        repo_dir.display()
    ))?;

    for (key, value) in entries {
        prompter.say(format!("Setting {} to '{}'...", key, value))?;

        let mut cmd = Command::new("git");
        cmd.current_dir(repo_dir)
            .args(["config", "--local", key, value.as_str()]);

        let output = runner.capture(&mut cmd)?;
        if !output.success {
            return Err(GitprofError::Subprocess {
                command: describe(&cmd),
                message: output.output.trim().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::normalize_path;
    use std::io::Cursor;

    fn profile() -> Profile {
        Profile {
            name: "work".to_string(),
            ssh_key_path: "/keys/work".to_string(),
            git_name: Some("Jane Doe".to_string()),
            git_email: Some("jane@work.example".to_string()),
            service: None,
        }
    }

    fn prompter() -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(Vec::new()), Vec::new())
    }

    #[test]
    fn test_apply_sets_three_values() {
        let mut runner = ScriptedRunner::new();
        let mut p = prompter();

        apply(&mut runner, &mut p, &profile(), Path::new("/repos/r")).unwrap();

        assert_eq!(runner.calls.len(), 3);
        assert_eq!(
            runner.calls[0].args,
            vec!["config", "--local", "user.name", "Jane Doe"]
        );
        assert_eq!(
            runner.calls[1].args,
            vec!["config", "--local", "user.email", "jane@work.example"]
        );
        let ssh_command = format!("ssh -i {}", normalize_path("/keys/work"));
        assert_eq!(
            runner.calls[2].args,
            vec!["config", "--local", "core.sshCommand", ssh_command.as_str()]
        );
        assert!(runner
            .calls
            .iter()
            .all(|c| c.dir.as_deref() == Some(Path::new("/repos/r"))));

        let out = String::from_utf8(p.into_output()).unwrap();
        assert!(out.contains("Setting user.name to 'Jane Doe'..."));
    }

    #[test]
    fn test_apply_stops_on_failure() {
        let mut runner = ScriptedRunner::new();
        runner
            .push_output(CommandOutput::ok(""))
            .push_output(CommandOutput::failed(128, "fatal: not in a git directory\n"));
        let mut p = prompter();

        let err = apply(&mut runner, &mut p, &profile(), Path::new(".")).unwrap_err();

        match err {
            GitprofError::Subprocess { command, message } => {
                assert!(command.contains("user.email"));
                assert_eq!(message, "fatal: not in a git directory");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.calls.len(), 2);
    }

    #[test]
    fn test_apply_requires_identity() {
        let mut runner = ScriptedRunner::new();
        let mut p = prompter();
        let mut incomplete = profile();
        incomplete.git_name = None;

        let err = apply(&mut runner, &mut p, &incomplete, Path::new(".")).unwrap_err();
        assert!(matches!(err, GitprofError::Validation(_)));
        assert!(runner.calls.is_empty());
    }
}
