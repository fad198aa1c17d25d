//! External command execution
//!
//! [`CommandRunner`] is the seam between the driver and the real CLI.
//! [`ProcessRunner`] spawns the executable with piped stdio; tests swap in a
//! scripted runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::CliError;

/// Deadline used when a command does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One CLI invocation, without the executable name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliCommand {
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Piped to the child then closed; never placed on the command line
    pub stdin: Option<String>,
    pub timeout: Duration,
}

impl CliCommand {
    /// Create new command from its arguments
    #[must_use]
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            stdin: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append `--scope <scope>` when a scope is given
    #[must_use]
    pub fn scope(self, scope: Option<&str>) -> Self {
        match scope {
            Some(scope) => self.arg("--scope").arg(scope),
            None => self,
        }
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Subcommand words before the first flag, for logging
    #[must_use]
    pub fn verb(&self) -> String {
        self.args
            .iter()
            .take_while(|arg| !arg.starts_with('-'))
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Executes CLI commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion
    ///
    /// # Errors
    /// Returns a [`CliError`] classified as not found, timeout, non-zero exit
    /// or I/O error
    async fn run(&self, command: CliCommand) -> Result<CliOutput, CliError>;
}

/// Runs commands as child processes of the real executable
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: CliCommand) -> Result<CliOutput, CliError> {
        let verb = command.verb();
        let started = Instant::now();

        let mut process = Command::new(&self.program);
        process
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }

        let mut child = process.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::warn!(program = %self.program, "CLI executable not found");
                CliError::not_found()
            } else {
                tracing::warn!(program = %self.program, error = %err, "CLI spawn failed");
                CliError::io_error()
            }
        })?;

        let stdin = child.stdin.take();
        let mut stdout = child.stdout.take().ok_or_else(CliError::io_error)?;
        let mut stderr = child.stderr.take().ok_or_else(CliError::io_error)?;

        let stdout_task = tokio::spawn(async move {
            let mut out = Vec::new();
            let _ = stdout.read_to_end(&mut out).await;
            out
        });
        let stderr_task = tokio::spawn(async move {
            let mut out = Vec::new();
            let _ = stderr.read_to_end(&mut out).await;
            out
        });

        if let Some(mut pipe) = stdin {
            if let Some(text) = &command.stdin {
                let _ = pipe.write_all(text.as_bytes()).await;
            }
            // closing stdin lets prompts that read it return
            drop(pipe);
        }

        let status = match tokio::time::timeout(command.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                tracing::warn!(verb = %verb, error = %err, "CLI wait failed");
                return Err(CliError::io_error());
            }
            Err(_) => {
                let _ = child.kill().await;
                tracing::warn!(
                    verb = %verb,
                    timeout_ms = command.timeout.as_millis() as u64,
                    "CLI command timed out"
                );
                return Err(CliError::timeout());
            }
        };

        let stdout = String::from_utf8_lossy(&stdout_task.await.unwrap_or_default()).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_task.await.unwrap_or_default()).into_owned();

        tracing::debug!(
            verb = %verb,
            exit_code = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "CLI command finished"
        );

        match status.code() {
            Some(0) => Ok(CliOutput {
                stdout,
                stderr,
                exit_code: 0,
            }),
            code => Err(CliError::non_zero_exit(code, stdout, stderr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliErrorKind;

    #[test]
    fn builder_appends_scope_only_when_present() {
        let personal = CliCommand::new(["env", "ls"]).scope(None).arg("--no-color");
        assert_eq!(personal.args, vec!["env", "ls", "--no-color"]);

        let team = CliCommand::new(["env", "ls"]).scope(Some("acme"));
        assert_eq!(team.args, vec!["env", "ls", "--scope", "acme"]);
        assert_eq!(team.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn verb_stops_at_first_flag() {
        let command = CliCommand::new(["env", "add", "KEY", "production", "--force"]);
        assert_eq!(command.verb(), "env add");
        assert_eq!(CliCommand::new(["whoami", "--no-color"]).verb(), "whoami");
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let runner = ProcessRunner::new("envmatrix-definitely-missing-cli");
        let err = runner.run(CliCommand::new(["whoami"])).await.unwrap_err();
        assert_eq!(err.kind, CliErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_is_piped_and_closed() {
        let runner = ProcessRunner::new("cat");
        let output = runner
            .run(CliCommand::new(Vec::<String>::new()).stdin("secret-value\n"))
            .await
            .unwrap();
        assert_eq!(output.stdout, "secret-value\n");
        assert_eq!(output.exit_code, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_keeps_streams() {
        let runner = ProcessRunner::new("sh");
        let err = runner
            .run(CliCommand::new(["-c", "echo out; echo err >&2; exit 3"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, CliErrorKind::NonZeroExit);
        assert_eq!(err.exit_code, Some(3));
        assert_eq!(err.stdout.trim(), "out");
        assert_eq!(err.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn deadline_kills_child() {
        let runner = ProcessRunner::new("sh");
        let started = Instant::now();
        let err = runner
            .run(CliCommand::new(["-c", "sleep 5"]).timeout(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, CliErrorKind::Timeout);
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
