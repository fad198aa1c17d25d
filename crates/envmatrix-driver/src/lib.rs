//! envmatrix Driver
//!
//! Execution substrate for the platform CLI.
//!
//! # Core Concepts
//!
//! - [`CommandRunner`]: async seam over process execution; [`ProcessRunner`]
//!   spawns the real executable with piped stdio and a hard deadline
//! - [`CliError`]: `cli_not_found` / `cli_timeout` / `cli_non_zero_exit` /
//!   `cli_io_error`
//! - [`parse`]: best-effort parsers for human-readable CLI output
//! - [`WorkspaceManager`]: per-(scope, project) directories with a FIFO
//!   [`WorkspaceLocks`] lock and a TTL sweep
//! - [`PlatformCli`]: typed commands and [`PlatformCli::load_snapshot`]
//! - [`redact_sensitive_text`]: applied to every external message
//!
//! # Example
//!
//! ```rust,ignore
//! use envmatrix_driver::{DriverConfig, PlatformCli};
//!
//! let cli = PlatformCli::from_config(DriverConfig::default().with_env_overrides());
//! let snapshot = cli.load_snapshot("prj_123", "team:acme").await?;
//! println!("{} records, hash {}", snapshot.records.len(), snapshot.baseline_hash);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod client;
mod config;
mod error;
mod link;
mod lock;
pub mod parse;
mod redact;
mod reserved;
mod runner;
mod scope;
mod snapshot;
mod workspace;

pub use client::{pulled_file_path, AuthStatus, PlatformCli, PULL_ORDER};
pub use config::{DriverConfig, CLI_ENV_VAR, WORKSPACE_ROOT_ENV_VAR};
pub use error::{CliError, CliErrorKind, DriverError};
pub use link::{link_workspace, LinkCache};
pub use lock::{WorkspaceGuard, WorkspaceLocks};
pub use parse::{CliIdentity, EnvTopologyRow, ProjectSummary, TeamScope};
pub use redact::{is_secret_key, redact_sensitive_text, REDACTED};
pub use reserved::{
    filter_reserved_keys, is_reserved_runtime_key, RESERVED_RUNTIME_KEYS,
    RESERVED_RUNTIME_KEY_PREFIXES,
};
pub use runner::{CliCommand, CliOutput, CommandRunner, ProcessRunner, DEFAULT_TIMEOUT};
pub use scope::{ResolvedScope, ScopeRef};
pub use snapshot::{
    build_snapshot, cli_record_id, records_from_pulled, PulledEnvironments, CLI_RECORD_PREFIX,
};
pub use workspace::{
    sanitize_path_component, workspace_folder_name, WorkspaceManager, WorkspaceRegistry,
    MAX_COMPONENT_LEN,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use envmatrix_model::{normalize, BuiltInEnvironment};

    #[test]
    fn pulled_environments_normalize_into_shared_row() {
        let pulled = PulledEnvironments::from([
            (
                BuiltInEnvironment::Production,
                [("API_URL".to_string(), "https://x".to_string())].into(),
            ),
            (
                BuiltInEnvironment::Preview,
                [("API_URL".to_string(), "https://x".to_string())].into(),
            ),
        ]);
        let topology = vec![EnvTopologyRow {
            key: "API_URL".to_string(),
            target: vec![BuiltInEnvironment::Production, BuiltInEnvironment::Preview],
        }];

        let snapshot = build_snapshot("prj", &pulled, &topology).unwrap();
        let matrix = normalize(&snapshot);
        let row = matrix.row_by_key("API_URL").unwrap();
        assert_eq!(row.values.len(), 1);
        assert_eq!(row.active_assignments().count(), 2);
    }
}
