//! Platform CLI client
//!
//! Typed wrappers over individual CLI commands plus the snapshot loader.
//! Every command goes through the injected [`CommandRunner`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use envmatrix_model::{BuiltInEnvironment, ProjectSnapshot};
use serde::{Deserialize, Serialize};

use crate::config::DriverConfig;
use crate::error::{CliError, CliErrorKind, DriverError};
use crate::link::link_workspace;
use crate::parse::{
    parse_dotenv_file, parse_env_list_output, parse_project_list, parse_teams_output,
    parse_whoami_output, CliIdentity, EnvTopologyRow, ProjectSummary, TeamScope,
};
use crate::runner::{CliCommand, CliOutput, CommandRunner, ProcessRunner};
use crate::scope::{ResolvedScope, ScopeRef};
use crate::snapshot::{build_snapshot, PulledEnvironments};
use crate::workspace::WorkspaceManager;

/// Order in which built-in environments are pulled
pub const PULL_ORDER: [BuiltInEnvironment; 3] = [
    BuiltInEnvironment::Development,
    BuiltInEnvironment::Preview,
    BuiltInEnvironment::Production,
];

/// Login state of the local CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub identity: Option<CliIdentity>,
    pub message: String,
}

impl AuthStatus {
    /// Classify a `whoami` outcome
    #[must_use]
    pub fn from_whoami(result: Result<CliOutput, CliError>) -> Self {
        let failed = |message: &str| Self {
            authenticated: false,
            identity: None,
            message: message.to_string(),
        };
        match result {
            Ok(output) => match parse_whoami_output(&output.stdout) {
                Some(identity) => Self {
                    authenticated: true,
                    identity: Some(identity),
                    message: "CLI session is active.".to_string(),
                },
                None => failed("Unable to determine CLI login status. Run `vercel whoami` locally."),
            },
            Err(err) => match err.kind {
                CliErrorKind::NonZeroExit => failed("Not logged in. Run `vercel login` and refresh."),
                CliErrorKind::NotFound => {
                    failed("Vercel CLI is not installed. Install it, then run `vercel login`.")
                }
                CliErrorKind::Timeout | CliErrorKind::IoError => failed(
                    "Unable to read CLI auth status right now. Retry after running `vercel whoami`.",
                ),
            },
        }
    }
}

/// Name of the transient file `env pull` writes for one environment
#[must_use]
pub fn pulled_file_path(workspace: &Path, environment: BuiltInEnvironment) -> PathBuf {
    workspace.join(format!(".envmatrix.pull.{}.env", environment.as_str()))
}

/// CLI client bound to a runner, configuration and workspace manager
#[derive(Clone)]
pub struct PlatformCli {
    runner: Arc<dyn CommandRunner>,
    config: DriverConfig,
    workspaces: WorkspaceManager,
}

impl std::fmt::Debug for PlatformCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCli")
            .field("config", &self.config)
            .field("workspaces", &self.workspaces)
            .finish_non_exhaustive()
    }
}

impl PlatformCli {
    /// Client over the real executable and the process-wide workspace registry
    #[must_use]
    pub fn from_config(config: DriverConfig) -> Self {
        let runner = Arc::new(ProcessRunner::new(config.cli.clone()));
        Self::new(runner, config)
    }

    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, config: DriverConfig) -> Self {
        let workspaces = WorkspaceManager::from_config(&config);
        Self {
            runner,
            config,
            workspaces,
        }
    }

    /// Replace the workspace manager, e.g. with an isolated one
    #[must_use]
    pub fn with_workspaces(mut self, workspaces: WorkspaceManager) -> Self {
        self.workspaces = workspaces;
        self
    }

    #[inline]
    #[must_use]
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Probe `whoami`; never fails, the outcome is encoded in the status
    pub async fn auth_status(&self) -> AuthStatus {
        let command = CliCommand::new(["whoami", "--no-color"]).timeout(self.config.auth_timeout());
        let status = AuthStatus::from_whoami(self.runner.run(command).await);
        tracing::debug!(authenticated = status.authenticated, "auth probe finished");
        status
    }

    /// Teams of the logged-in user; "no teams found" is an empty list
    ///
    /// # Errors
    /// Returns any other CLI failure
    pub async fn list_teams(&self) -> Result<Vec<TeamScope>, CliError> {
        let command =
            CliCommand::new(["teams", "list", "--no-color"]).timeout(self.config.teams_timeout());
        match self.runner.run(command).await {
            Ok(output) => Ok(parse_teams_output(&output.stdout)),
            Err(err) if err.kind == CliErrorKind::NonZeroExit && mentions_no_teams(&err) => {
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Projects visible in `scope`, filtered by name
    ///
    /// # Errors
    /// Returns the CLI failure
    pub async fn list_projects(
        &self,
        scope: &str,
        search: &str,
    ) -> Result<Vec<ProjectSummary>, CliError> {
        let command = CliCommand::new(["project", "list", "--scope", scope, "--json", "--no-color"])
            .timeout(self.config.command_timeout());
        let output = self.runner.run(command).await?;
        Ok(parse_project_list(&output.stdout, search))
    }

    /// Turn a scope id into a `--scope` value and cache key
    ///
    /// # Errors
    /// Returns the CLI failure when a team id has to be looked up
    pub async fn resolve_scope(&self, scope_id: &str) -> Result<ResolvedScope, CliError> {
        let scope = ScopeRef::parse(scope_id);
        let teams = if scope.needs_team_lookup() {
            self.list_teams().await?
        } else {
            Vec::new()
        };
        Ok(scope.resolve(&teams))
    }

    /// Link a workspace to a project (cached per process)
    ///
    /// # Errors
    /// Returns the CLI failure
    pub async fn link(
        &self,
        workspace: &Path,
        project_id: &str,
        scope: Option<&str>,
    ) -> Result<(), CliError> {
        link_workspace(
            self.runner.as_ref(),
            self.workspaces.links(),
            workspace,
            project_id,
            scope,
            self.config.command_timeout(),
        )
        .await
    }

    /// Remote records as listed by `env ls`
    ///
    /// # Errors
    /// Returns the CLI failure
    pub async fn list_env_topology(
        &self,
        workspace: &Path,
        scope: Option<&str>,
    ) -> Result<Vec<EnvTopologyRow>, CliError> {
        let command = CliCommand::new(["env", "ls", "--no-color"])
            .scope(scope)
            .cwd(workspace)
            .timeout(self.config.command_timeout());
        let output = self.runner.run(command).await?;
        Ok(parse_env_list_output(&output.stdout))
    }

    /// Pull one environment into a private file inside the workspace
    ///
    /// # Errors
    /// Returns the CLI failure, or a workspace error if permissions cannot be set
    pub async fn pull_environment(
        &self,
        workspace: &Path,
        scope: Option<&str>,
        environment: BuiltInEnvironment,
    ) -> Result<PathBuf, DriverError> {
        let path = pulled_file_path(workspace, environment);
        let command = CliCommand::new(["env", "pull"])
            .arg(path.display().to_string())
            .arg("--environment")
            .arg(environment.as_str())
            .arg("--yes")
            .arg("--no-color")
            .scope(scope)
            .cwd(workspace)
            .timeout(self.config.mutation_timeout());
        self.runner.run(command).await?;
        restrict_permissions(&path).await?;
        Ok(path)
    }

    /// `env add KEY ENV`, value on stdin
    ///
    /// # Errors
    /// Returns the CLI failure
    pub async fn env_add(
        &self,
        workspace: &Path,
        scope: Option<&str>,
        key: &str,
        environment: BuiltInEnvironment,
        value: &str,
    ) -> Result<CliOutput, CliError> {
        let command = CliCommand::new(["env", "add", key, environment.as_str()])
            .scope(scope)
            .arg("--force")
            .arg("--no-color")
            .stdin(format!("{value}\n"))
            .cwd(workspace)
            .timeout(self.config.mutation_timeout());
        self.runner.run(command).await
    }

    /// `env rm KEY ENV -y`
    ///
    /// # Errors
    /// Returns the CLI failure
    pub async fn env_rm(
        &self,
        workspace: &Path,
        scope: Option<&str>,
        key: &str,
        environment: BuiltInEnvironment,
    ) -> Result<CliOutput, CliError> {
        let command = CliCommand::new(["env", "rm", key, environment.as_str()])
            .scope(scope)
            .arg("-y")
            .arg("--no-color")
            .cwd(workspace)
            .timeout(self.config.mutation_timeout());
        self.runner.run(command).await
    }

    /// Load the current remote state of a project
    ///
    /// Links the workspace, reads the topology (a failure there only loses
    /// target grouping), pulls every built-in environment, and deletes the
    /// pulled files before returning, whether or not loading succeeded.
    ///
    /// # Errors
    /// Returns error if scope resolution, linking, pulling or hashing fails
    pub async fn load_snapshot(
        &self,
        project_id: &str,
        scope_id: &str,
    ) -> Result<ProjectSnapshot, DriverError> {
        let scope = self.resolve_scope(scope_id).await?;
        let workspace = self.workspaces.ensure(project_id, &scope.cache_key).await?;

        let _guard = self.workspaces.locks().acquire(&workspace).await;
        self.link(&workspace, project_id, scope.scope_arg()).await?;

        let topology = match self.list_env_topology(&workspace, scope.scope_arg()).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(code = err.code(), "env topology unavailable, using per-environment records");
                Vec::new()
            }
        };

        let mut pulled_files = Vec::new();
        let pulled = self
            .pull_all(&workspace, scope.scope_arg(), &mut pulled_files)
            .await;
        for path in &pulled_files {
            remove_pulled_file(path).await;
        }
        let pulled = pulled?;

        let snapshot = build_snapshot(project_id, &pulled, &topology)?;
        tracing::info!(
            project_id,
            records = snapshot.records.len(),
            baseline_hash = %snapshot.baseline_hash,
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    async fn pull_all(
        &self,
        workspace: &Path,
        scope: Option<&str>,
        pulled_files: &mut Vec<PathBuf>,
    ) -> Result<PulledEnvironments, DriverError> {
        let mut pulled = PulledEnvironments::new();
        for environment in PULL_ORDER {
            // registered before the pull so a partial file is cleaned up too
            pulled_files.push(pulled_file_path(workspace, environment));
            let path = self.pull_environment(workspace, scope, environment).await?;
            let values = parse_dotenv_file(&path)
                .await
                .map_err(|e| DriverError::workspace(&path, e))?;
            pulled.insert(environment, values);
        }
        Ok(pulled)
    }
}

fn mentions_no_teams(err: &CliError) -> bool {
    let needle = "no teams found";
    err.stdout.to_lowercase().contains(needle) || err.stderr.to_lowercase().contains(needle)
}

async fn restrict_permissions(path: &Path) -> Result<(), DriverError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| DriverError::workspace(path, e))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

async fn remove_pulled_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove pulled env file");
        }
    }
}
