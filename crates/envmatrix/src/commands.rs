//! Subcommand handlers

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::ArgMatches;
use envmatrix_apply::{ApplyPipeline, ApplyRequest};
use envmatrix_driver::{DriverConfig, PlatformCli};
use envmatrix_model::{normalize, Matrix, ProjectSnapshot};
use envmatrix_plan::{plan_operations, Operation, PlanSummary};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Serialize)]
struct PlanOutput {
    baseline_hash: String,
    summary: PlanSummary,
    operations: Vec<Operation>,
}

pub(crate) async fn run(config: DriverConfig, matches: &ArgMatches) -> anyhow::Result<ExitCode> {
    let cli = PlatformCli::from_config(config);

    match matches.subcommand() {
        Some(("whoami", _)) => {
            let status = cli.auth_status().await;
            print_json(&status)?;
            Ok(exit_code(status.authenticated))
        }
        Some(("teams", _)) => {
            let teams = cli.list_teams().await.context("failed to list teams")?;
            print_json(&teams)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("projects", args)) => {
            let scope = required(args, "scope")?;
            let search = args.get_one::<String>("search").map_or("", String::as_str);
            let projects = cli
                .list_projects(scope, search)
                .await
                .context("failed to list projects")?;
            print_json(&projects)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("snapshot", args)) => {
            let snapshot = cli
                .load_snapshot(required(args, "project")?, required(args, "scope")?)
                .await
                .context("failed to load snapshot")?;
            if args.get_flag("matrix") {
                print_json(&normalize(&snapshot))?;
            } else {
                print_json(&snapshot)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("plan", args)) => {
            let baseline: ProjectSnapshot = read_json(required_path(args, "baseline")?)?;
            let draft: Matrix = read_json(required_path(args, "draft")?)?;
            let output = plan(&baseline, &draft)?;
            print_json(&output)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("apply", args)) => {
            let operations: Vec<Operation> = read_json(required_path(args, "operations")?)?;
            let request = ApplyRequest::new(
                required(args, "project")?,
                required(args, "scope")?,
                required(args, "baseline-hash")?,
                operations,
            );
            let pipeline = ApplyPipeline::new(cli);
            let report = match pipeline.apply(&request).await {
                Ok(report) => report,
                Err(err) => {
                    tracing::error!(code = err.code(), "apply rejected");
                    return Err(err).context("apply failed");
                }
            };
            if args.get_flag("text") {
                println!("{report}");
            } else {
                print_json(&report)?;
            }
            Ok(exit_code(report.is_success()))
        }
        Some((other, _)) => bail!("unknown subcommand {other}"),
        None => bail!("no subcommand given"),
    }
}

fn plan(baseline: &ProjectSnapshot, draft: &Matrix) -> anyhow::Result<PlanOutput> {
    if !baseline.verify() {
        bail!("baseline snapshot hash does not match its content");
    }
    if draft.project_id != baseline.project_id {
        bail!(
            "draft belongs to {} but baseline to {}",
            draft.project_id,
            baseline.project_id
        );
    }
    let operations = plan_operations(&normalize(baseline), draft);
    Ok(PlanOutput {
        baseline_hash: baseline.baseline_hash.to_string(),
        summary: PlanSummary::of(&operations),
        operations,
    })
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("--{name} is required"))
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    args.get_one::<std::path::PathBuf>(name)
        .map(std::path::PathBuf::as_path)
        .with_context(|| format!("--{name} is required"))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envmatrix_model::{
        built_in_columns, BuiltInEnvironment, Capabilities, EnvironmentId, RawEnvRecord,
    };
    use envmatrix_plan::OperationKind;
    use pretty_assertions::assert_eq;

    fn baseline() -> ProjectSnapshot {
        ProjectSnapshot::new(
            "prj",
            built_in_columns(),
            vec![RawEnvRecord::new("env_1", "API_URL", "https://x")
                .with_targets([BuiltInEnvironment::Production])],
            Capabilities::cli(),
        )
        .unwrap()
    }

    #[test]
    fn plan_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = baseline();
        let mut draft = normalize(&snapshot);
        draft
            .set_assignment(
                "row:API_URL",
                &EnvironmentId::BuiltIn(BuiltInEnvironment::Preview),
                Some("value-1"),
            )
            .unwrap();

        let baseline_path = dir.path().join("baseline.json");
        let draft_path = dir.path().join("draft.json");
        std::fs::write(&baseline_path, serde_json::to_string(&snapshot).unwrap()).unwrap();
        std::fs::write(&draft_path, serde_json::to_string(&draft).unwrap()).unwrap();

        let baseline: ProjectSnapshot = read_json(&baseline_path).unwrap();
        let draft: Matrix = read_json(&draft_path).unwrap();
        let output = plan(&baseline, &draft).unwrap();

        assert_eq!(output.baseline_hash, snapshot.baseline_hash.to_string());
        let kinds: Vec<OperationKind> = output.operations.iter().map(|op| op.kind).collect();
        assert_eq!(kinds, vec![OperationKind::CreateEnv, OperationKind::DeleteEnv]);
        assert_eq!(output.summary.total(), 2);
    }

    #[test]
    fn unchanged_draft_plans_nothing() {
        let snapshot = baseline();
        let output = plan(&snapshot, &normalize(&snapshot)).unwrap();
        assert!(output.operations.is_empty());
        assert!(output.summary.is_empty());
    }

    #[test]
    fn mismatched_project_is_rejected() {
        let snapshot = baseline();
        let mut draft = normalize(&snapshot);
        draft.project_id = "other".to_string();
        assert!(plan(&snapshot, &draft).is_err());
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = read_json::<Matrix>(Path::new("/nonexistent/draft.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/draft.json"));
    }
}
