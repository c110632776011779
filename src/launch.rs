//! Opening files in an editor and URLs in a browser.

use std::path::Path;
use std::process::Command;

use crate::error::{GitprofError, Result};
use crate::runner::{CommandRunner, describe};

/// The platform's "open with default application" command
fn system_opener() -> Command {
    if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]);
        cmd
    } else {
        Command::new("xdg-open")
    }
}

fn run(runner: &mut dyn CommandRunner, cmd: &mut Command) -> Result<()> {
    if runner.interactive(cmd)? {
        Ok(())
    } else {
        Err(GitprofError::Subprocess {
            command: describe(cmd),
            message: "exited with non-zero status".to_string(),
        })
    }
}

/// Open `url` in the default browser
pub fn open_url(runner: &mut dyn CommandRunner, url: &str) -> Result<()> {
    let mut cmd = system_opener();
    cmd.arg(url);
    run(runner, &mut cmd)
}

/// Open `path` in `editor`, else `$EDITOR`, else the platform default
pub fn open_in_editor(runner: &mut dyn CommandRunner, path: &Path, editor: Option<&str>) -> Result<()> {
    let editor = editor
        .map(str::to_string)
        .or_else(|| std::env::var("EDITOR").ok())
        .filter(|e| !e.trim().is_empty());

    let mut cmd = match editor {
        Some(editor) => Command::new(editor),
        None if cfg!(target_os = "macos") => {
            let mut cmd = Command::new("open");
            cmd.arg("-t");
            cmd
        }
        None => system_opener(),
    };
    cmd.arg(path);
    run(runner, &mut cmd)
}
