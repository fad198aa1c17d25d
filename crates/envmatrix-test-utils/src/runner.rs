//! Scripted stand-in for the platform CLI
//!
//! Responses are matched on argument prefixes; the longest matching prefix
//! wins. Unmatched commands succeed with empty output. `env pull` writes the
//! scripted dotenv content to the requested path, like the real CLI.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use envmatrix_driver::{CliCommand, CliError, CliOutput, CommandRunner};
use envmatrix_model::BuiltInEnvironment;
use parking_lot::Mutex;

type Response = Result<CliOutput, CliError>;

#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(Vec<String>, Response)>,
    pulls: HashMap<BuiltInEnvironment, String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<CliCommand>>,
    inside: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to commands starting with `prefix`
    pub fn on(mut self, prefix: &[&str], response: Response) -> Self {
        self.rules
            .push((prefix.iter().map(ToString::to_string).collect(), response));
        self
    }

    /// Succeed with `stdout`
    pub fn ok(self, prefix: &[&str], stdout: &str) -> Self {
        self.on(
            prefix,
            Ok(CliOutput {
                stdout: stdout.to_string(),
                ..CliOutput::default()
            }),
        )
    }

    pub fn fail(self, prefix: &[&str], error: CliError) -> Self {
        self.on(prefix, Err(error))
    }

    /// Dotenv content written by `env pull --environment <environment>`
    pub fn pull(mut self, environment: BuiltInEnvironment, content: &str) -> Self {
        self.pulls.insert(environment, content.to_string());
        self
    }

    /// Sleep inside every call, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<CliCommand> {
        self.calls.lock().clone()
    }

    /// Every call rendered as a space-joined argument line
    pub fn call_lines(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|command| command.args.join(" "))
            .collect()
    }

    /// Calls whose arguments start with `prefix`
    pub fn calls_to(&self, prefix: &[&str]) -> Vec<CliCommand> {
        self.calls
            .lock()
            .iter()
            .filter(|command| starts_with(&command.args, prefix))
            .cloned()
            .collect()
    }

    /// Highest number of calls observed running at once
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn respond(&self, command: &CliCommand) -> Response {
        self.rules
            .iter()
            .filter(|(prefix, _)| starts_with(&command.args, prefix.as_slice()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or_else(|| Ok(CliOutput::default()), |(_, response)| response.clone())
    }

    async fn write_pull(&self, command: &CliCommand) -> Result<(), CliError> {
        let Some(path) = command.args.get(2) else {
            return Ok(());
        };
        let environment = command
            .args
            .iter()
            .position(|arg| arg == "--environment")
            .and_then(|index| command.args.get(index + 1))
            .and_then(|name| BuiltInEnvironment::from_name(name));
        let content = environment
            .and_then(|environment| self.pulls.get(&environment))
            .cloned()
            .unwrap_or_default();
        tokio::fs::write(PathBuf::from(path), content)
            .await
            .map_err(|_| CliError::io_error())
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    prefix.len() <= args.len()
        && prefix
            .iter()
            .zip(args)
            .all(|(expected, actual)| expected.as_ref() == actual)
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: CliCommand) -> Result<CliOutput, CliError> {
        self.calls.lock().push(command.clone());
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut response = self.respond(&command);
        if response.is_ok() && starts_with(&command.args, &["env", "pull"]) {
            if let Err(err) = self.write_pull(&command).await {
                response = Err(err);
            }
        }

        self.inside.fetch_sub(1, Ordering::SeqCst);
        response
    }
}
