//! envmatrix command-line entry point
//!
//! JSON goes to stdout, logs go to stderr (`RUST_LOG` overrides the default
//! `info` filter).

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use envmatrix_driver::DriverConfig;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("envmatrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Edit environment variables as a key x environment matrix")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML driver configuration"),
        )
        .subcommand(Command::new("whoami").about("Show the CLI session status"))
        .subcommand(Command::new("teams").about("List teams of the logged-in user"))
        .subcommand(
            Command::new("projects")
                .about("List projects in a team scope")
                .arg(scope_arg())
                .arg(
                    Arg::new("search")
                        .long("search")
                        .default_value("")
                        .help("Case-insensitive name filter"),
                ),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Load the current remote state of a project")
                .arg(project_arg())
                .arg(scope_arg())
                .arg(
                    Arg::new("matrix")
                        .long("matrix")
                        .action(ArgAction::SetTrue)
                        .help("Print the normalized matrix instead of raw records"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Plan operations between a snapshot and an edited matrix")
                .arg(file_arg("baseline", "Snapshot JSON the draft was edited from"))
                .arg(file_arg("draft", "Edited matrix JSON")),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply planned operations if the remote baseline is unchanged")
                .arg(project_arg())
                .arg(scope_arg())
                .arg(
                    Arg::new("baseline-hash")
                        .long("baseline-hash")
                        .required(true)
                        .help("Baseline hash the operations were planned against"),
                )
                .arg(file_arg("operations", "Operations JSON array"))
                .arg(
                    Arg::new("text")
                        .long("text")
                        .action(ArgAction::SetTrue)
                        .help("Print a plain-text report instead of JSON"),
                ),
        )
}

fn project_arg() -> Arg {
    Arg::new("project")
        .long("project")
        .required(true)
        .help("Project id or name")
}

fn scope_arg() -> Arg {
    Arg::new("scope")
        .long("scope")
        .required(true)
        .help("Scope id: user:<name>, team:<slug> or a team id")
}

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<DriverConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(DriverConfig::default().with_env_overrides()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logging();
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    commands::run(config, &matches).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn apply_requires_baseline_hash() {
        let err = cli()
            .try_get_matches_from([
                "envmatrix",
                "apply",
                "--project",
                "prj",
                "--scope",
                "team:acme",
                "--operations",
                "ops.json",
            ])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn config_is_global() {
        let matches = cli()
            .try_get_matches_from(["envmatrix", "whoami", "--config", "envmatrix.toml"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("config"),
            Some(&PathBuf::from("envmatrix.toml"))
        );
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("envmatrix.toml");
        std::fs::write(&path, "cli = \"vercel-canary\"\ncommand_timeout_secs = 5\n").unwrap();
        let matches = cli()
            .try_get_matches_from(["envmatrix", "teams", "--config", path.to_str().unwrap()])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.command_timeout_secs, 5);
    }
}
