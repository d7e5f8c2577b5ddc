use crate::cli::CheckKind;
use crate::domain::models::{CheckReport, CheckStatus, ExpressionKind, JsonOut, RunReport};
use serde::Serialize;

const FOLLOW_UP_HINT: &str = "Probably you want to execute the following call to get more information";

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> Vec<String>,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        for line in row(&data) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Human names for containers and children of a duplicate check.
fn wording(check: CheckKind) -> (&'static str, &'static str) {
    match check {
        CheckKind::Uids => ("metadata", "IDs"),
        CheckKind::CategoryOptions => ("categories", "categoryOptions"),
        CheckKind::DataSetElements => ("dataSets", "dataElements"),
        CheckKind::SectionElements => ("sections", "dataElements"),
        CheckKind::Expressions => ("program rules", "expressions"),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn check_lines(report: &CheckReport) -> Vec<String> {
    let (containers, children) = wording(report.check);
    let mut lines = Vec::new();
    match report.status {
        CheckStatus::Ok => lines.push(match report.check {
            CheckKind::Uids => "No ID duplicates were found!".to_string(),
            CheckKind::Expressions => "All program rule expressions are valid!".to_string(),
            _ => format!("Did not find duplicated {} in {}!", children, containers),
        }),
        CheckStatus::Findings => match report.check {
            CheckKind::Expressions => {
                for f in &report.expression_failures {
                    let what = match f.kind {
                        ExpressionKind::Condition => "condition",
                        ExpressionKind::Action => "action data",
                    };
                    lines.push(format!(
                        "ERROR: Program rule {} is not valid: {}",
                        what, f.expression
                    ));
                    lines.push(format!("  Reason: {}", f.reason));
                    lines.push(format!("  Edit it here: {}", f.edit_link));
                }
            }
            CheckKind::Uids => {
                lines.push("ERROR: The following duplicates were found. Please verify!".to_string());
                lines.push(format!("Duplicated IDs: {}", report.duplicate_ids.join(",")));
            }
            _ => {
                lines.push(format!(
                    "ERROR: The following {} contain duplicates. Please verify!",
                    containers
                ));
                let ids: Vec<&str> = report
                    .findings
                    .iter()
                    .map(|f| f.container_id.as_str())
                    .collect();
                lines.push(format!("{}: {}", capitalize(containers), ids.join(",")));
                for f in &report.findings {
                    lines.push(format!("  {}: {}", f.container_id, f.duplicates.join(",")));
                }
            }
        },
        CheckStatus::Partial => lines.push(match report.check {
            CheckKind::Uids => {
                "WARNING: Some metadata records were skipped, no ID duplicates among the rest"
                    .to_string()
            }
            CheckKind::Expressions => {
                "WARNING: Some program rule expressions could not be validated, the others are valid"
                    .to_string()
            }
            _ => format!(
                "WARNING: Some {} were skipped, no duplicated {} among the rest",
                containers, children
            ),
        }),
        CheckStatus::Error if report.check == CheckKind::Expressions => lines.push(format!(
            "ERROR: Could not validate program rule expressions: {}",
            report.error.as_deref().unwrap_or("unknown error")
        )),
        CheckStatus::Error => lines.push(format!(
            "ERROR: Could not check {} for duplicated {}: {}",
            containers,
            children,
            report.error.as_deref().unwrap_or("unknown error")
        )),
        CheckStatus::Failed => lines.push(format!(
            "ERROR: {} check aborted: {}",
            report.check.as_str(),
            report.error.as_deref().unwrap_or("unknown error")
        )),
        CheckStatus::Skipped => {
            lines.push(format!("{} check skipped", report.check.as_str()));
        }
    }
    if let Some(q) = &report.follow_up {
        lines.push(FOLLOW_UP_HINT.to_string());
        lines.push(q.clone());
    }
    if report.malformed_records > 0 {
        lines.push(format!(
            "The received metadata is not OK: {} record(s) skipped",
            report.malformed_records
        ));
    }
    lines.extend(report.notes.iter().cloned());
    lines
}

/// Text mode streams each check as it finishes; JSON mode waits for the run.
pub fn print_check(json: bool, report: &CheckReport) -> anyhow::Result<()> {
    if !json {
        for line in check_lines(report) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Closing lines of a text run; empty when every check was clean.
pub fn run_summary(run: &RunReport) -> Vec<String> {
    if run.aborted {
        return vec!["Run aborted after a network failure; remaining checks skipped".to_string()];
    }
    let flagged = run.checks.iter().filter(|c| c.has_findings()).count();
    let incomplete = run
        .checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Partial | CheckStatus::Error))
        .count();
    let mut lines = Vec::new();
    if flagged > 0 {
        lines.push(format!("{} of {} checks reported findings", flagged, run.checks.len()));
    }
    if incomplete > 0 {
        lines.push(format!(
            "{} of {} checks could not inspect everything",
            incomplete,
            run.checks.len()
        ));
    }
    lines
}

pub fn print_run(json: bool, run: &RunReport) -> anyhow::Result<()> {
    print_one(json, run, |r| run_summary(r))
}
