//! Subprocess execution.
//!
//! Everything gitprof launches (git, ssh-keygen, editors, browsers) goes through a
//! [`CommandRunner`] so flows that react to command output can be driven by a
//! scripted runner in tests.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Exit status and captured output of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    /// stdout and stderr, concatenated
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    pub fn failed(code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            output: output.into(),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion and capture its output
    fn capture(&mut self, cmd: &mut Command) -> io::Result<CommandOutput>;

    /// Run attached to the terminal; returns whether it exited successfully
    fn interactive(&mut self, cmd: &mut Command) -> io::Result<bool>;
}

/// Render a command for messages and logs
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Runs real processes
///
/// `capture` echoes stderr to the terminal as it arrives (git reports clone
/// progress there) while keeping a copy for classification.
#[derive(Debug, Default)]
pub struct SystemRunner {
    /// Echo stderr while capturing
    pub stream: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self { stream: true }
    }
}

impl CommandRunner for SystemRunner {
    fn capture(&mut self, cmd: &mut Command) -> io::Result<CommandOutput> {
        debug!(command = %describe(cmd), "running");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drained off-thread so a child filling the stdout pipe cannot block stderr
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                out.read_to_end(&mut buf).map(|_| buf)
            })
        });

        let mut captured = Vec::new();
        if let Some(mut stderr) = child.stderr.take() {
            let mut buf = [0u8; 1024];
            let mut term = io::stderr();
            loop {
                let n = stderr.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                if self.stream {
                    term.write_all(&buf[..n])?;
                    term.flush()?;
                }
                captured.extend_from_slice(&buf[..n]);
            }
        }

        let stdout = match stdout_reader {
            Some(reader) => reader
                .join()
                .map_err(|_| io::Error::other("stdout reader panicked"))??,
            None => Vec::new(),
        };
        if self.stream && !stdout.is_empty() {
            io::stdout().write_all(&stdout)?;
        }

        let status = child.wait()?;
        let mut output = String::from_utf8_lossy(&stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&captured));

        debug!(code = ?status.code(), "finished");
        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            output,
        })
    }

    fn interactive(&mut self, cmd: &mut Command) -> io::Result<bool> {
        debug!(command = %describe(cmd), "running interactively");
        Ok(cmd.status()?.success())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("git");
        cmd.args(["config", "--local", "user.name", "Jane"]);
        assert_eq!(describe(&cmd), "git config --local user.name Jane");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_captures_both_streams() {
        let mut runner = SystemRunner { stream: false };
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err 1>&2; exit 3"]);

        let out = runner.capture(&mut cmd).unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert!(out.output.contains("out"));
        assert!(out.output.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_missing_program() {
        let mut runner = SystemRunner { stream: false };
        let mut cmd = Command::new("gitprof-definitely-not-a-program");
        assert!(runner.capture(&mut cmd).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_large_stdout_does_not_block() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut runner = SystemRunner { stream: false };
            let mut cmd = Command::new("sh");
            cmd.args(["-c", "head -c 200000 /dev/zero | tr '\\0' a; echo done 1>&2"]);
            let _ = tx.send(runner.capture(&mut cmd));
        });

        let out = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("capture did not finish")
            .unwrap();
        assert!(out.success);
        assert!(out.output.len() >= 200_000);
        assert!(out.output.starts_with("aaaa"));
        assert!(out.output.trim_end().ends_with("done"));
    }
}
