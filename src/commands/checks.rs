use crate::cli::{CheckKind, Cli};
use crate::domain::models::{CheckOptions, CheckReport, RunReport, ServerConnection};
use crate::services::api::{ApiError, HttpApi, MetadataApi};
use crate::services::duplicates::{check_containers, check_global_ids, ContainerShape};
use crate::services::expressions::check_expressions;
use crate::services::output::{print_check, print_run};
use tracing::{debug, error, info, warn};

pub fn handle_checks(cli: &Cli) -> anyhow::Result<RunReport> {
    let connection = ServerConnection::new(&cli.server_url, &cli.username, &cli.password);
    let options = CheckOptions {
        verbose: cli.verbose,
        dry_run: cli.dry_run,
        fix: false,
    };
    let api = HttpApi::new(connection.clone(), cli.timeout_ms)?;
    let run = run_checks(
        &api,
        &connection,
        &options,
        &cli.selected_checks(),
        cli.fail_fast,
        |report| print_check(cli.json, report),
    )?;
    print_run(cli.json, &run)?;
    Ok(run)
}

fn run_check(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    options: &CheckOptions,
    check: CheckKind,
) -> Result<CheckReport, ApiError> {
    match ContainerShape::for_check(check) {
        Some(shape) => check_containers(api, connection, options, shape),
        None if check == CheckKind::Uids => check_global_ids(api, connection, options),
        None => check_expressions(api, connection, options),
    }
}

/// Runs `checks` in order. A network failure ends only its own check unless
/// `fail_fast` is set, in which case the remaining checks are skipped.
pub fn run_checks(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    options: &CheckOptions,
    checks: &[CheckKind],
    fail_fast: bool,
    mut on_report: impl FnMut(&CheckReport) -> anyhow::Result<()>,
) -> anyhow::Result<RunReport> {
    let mut run = RunReport {
        server: connection.base_url.clone(),
        dry_run: options.dry_run,
        checks: Vec::new(),
        aborted: false,
    };
    debug!(
        verbose = options.verbose,
        dry_run = options.dry_run,
        "checking {}",
        run.server
    );
    if options.fix {
        warn!("Automatic fixes are not available; findings are only reported");
    }
    for check in checks {
        let report = if run.aborted {
            CheckReport::skipped(*check, "skipped after a network failure")
        } else {
            info!("Running {} check", check.as_str());
            match run_check(api, connection, options, *check) {
                Ok(report) => report,
                Err(e) => {
                    error!("{} check aborted: {}", check.as_str(), e);
                    run.aborted = fail_fast;
                    CheckReport::failed(*check, e.to_string())
                }
            }
        };
        on_report(&report)?;
        run.checks.push(report);
    }
    Ok(run)
}
