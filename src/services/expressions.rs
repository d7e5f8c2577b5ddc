//! Program rule expression validation against the server's own parser.

use crate::cli::CheckKind;
use crate::domain::constants::{
    ACTION_DATA_VALIDATION_PATH, CONDITION_VALIDATION_PATH, EXPRESSION_OK, PROGRAMS_PATH,
    PROGRAM_RULES_PATH, PROGRAM_RULE_ACTIONS_PATH, PROGRAM_RULE_EDIT_PATH, SYSTEM_INFO_PATH,
};
use crate::domain::models::{
    CheckOptions, CheckReport, Collection, ExpressionFailure, ExpressionKind, ServerConnection,
};
use crate::services::api::{ApiError, MetadataApi};
use crate::services::duplicates::{identified_records, log_malformed, RecordError};
use crate::services::query::{append_param, ApiQuery};
use crate::services::version::ServerVersion;
use serde_json::Value;
use tracing::{debug, error, info, warn};

pub(crate) fn programs_query() -> ApiQuery {
    ApiQuery::new(PROGRAMS_PATH).fields("id")
}

pub(crate) fn rules_query(program_id: &str) -> ApiQuery {
    ApiQuery::new(PROGRAM_RULES_PATH)
        .fields("id,condition")
        .filter(format!("program.id:eq:{}", program_id))
}

pub(crate) fn actions_query(program_id: &str) -> ApiQuery {
    ApiQuery::new(PROGRAM_RULE_ACTIONS_PATH)
        .fields("id,data,programRule[id]")
        .filter(format!("programRule.program.id:eq:{}", program_id))
        .filter("data:!null")
}

pub(crate) fn system_info_query() -> ApiQuery {
    ApiQuery::new(SYSTEM_INFO_PATH).fields("version")
}

pub fn edit_link(connection: &ServerConnection, rule_id: &str) -> String {
    format!(
        "{}/{}/{}",
        connection.base_url, PROGRAM_RULE_EDIT_PATH, rule_id
    )
}

fn str_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
}

#[derive(thiserror::Error, Debug)]
enum ProgramError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Records of `collection` that carry an id. The rest are logged and counted.
fn records_with_id<'a>(
    metadata: &'a Collection,
    collection: &str,
    report: &mut CheckReport,
) -> Result<Vec<(usize, &'a str, &'a Value)>, RecordError> {
    let identified = identified_records(metadata, collection)?;
    log_malformed(&identified.malformed);
    report.malformed_records += identified.malformed.len();
    Ok(identified.records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionPass {
    Enabled,
    Unsupported,
    /// The version could not be read, so the actions stay unchecked.
    Unknown,
}

/// Decides whether the action-data pass runs, from one `system/info` read.
fn action_pass(api: &dyn MetadataApi, report: &mut CheckReport) -> Result<ActionPass, ApiError> {
    let info = match api.get(&system_info_query()) {
        Ok(info) => info,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => {
            warn!("Could not read the server version: {}", e);
            report
                .notes
                .push("Program rule action validation skipped: server version unknown".to_string());
            return Ok(ActionPass::Unknown);
        }
    };
    let raw = info.get("version").and_then(Value::as_str).unwrap_or("");
    match ServerVersion::parse(raw) {
        Ok(v) if v.supports_action_validation() => Ok(ActionPass::Enabled),
        Ok(v) => {
            info!(
                "Server version {}.{} has no action data validator, skipping program rule actions",
                v.major, v.minor
            );
            report.notes.push(format!(
                "Program rule action validation skipped on server version {}",
                raw
            ));
            Ok(ActionPass::Unsupported)
        }
        Err(e) => {
            warn!("{}", e);
            report
                .notes
                .push("Program rule action validation skipped: server version unknown".to_string());
            Ok(ActionPass::Unknown)
        }
    }
}

struct Submission<'a> {
    program_id: &'a str,
    rule_id: &'a str,
    action_id: Option<&'a str>,
    kind: ExpressionKind,
    expression: &'a str,
}

/// POSTs one expression. Returns `false` when the validator gave no verdict.
fn submit(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    endpoint: &str,
    s: Submission<'_>,
    report: &mut CheckReport,
) -> Result<bool, ApiError> {
    let path = append_param(endpoint, &format!("programId={}", s.program_id));
    let result = match api.post(&path, s.expression) {
        Ok(r) => r,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => {
            error!("Could not validate expression of rule {}: {}", s.rule_id, e);
            report
                .notes
                .push(format!("Rule {} could not be validated: {}", s.rule_id, e));
            return Ok(false);
        }
    };
    if result.status == EXPRESSION_OK {
        debug!("Rule {} expression is valid: {}", s.rule_id, s.expression);
        return Ok(true);
    }
    report.expression_failures.push(ExpressionFailure {
        program_id: s.program_id.to_string(),
        rule_id: s.rule_id.to_string(),
        kind: s.kind,
        action_id: s.action_id.map(str::to_string),
        expression: s.expression.to_string(),
        reason: result.reason(),
        edit_link: edit_link(connection, s.rule_id),
    });
    Ok(true)
}

/// Validates one program; the count is the expressions left without a verdict.
fn validate_program(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    program_id: &str,
    action_pass: bool,
    report: &mut CheckReport,
) -> Result<usize, ProgramError> {
    let mut unjudged = 0;
    let rules = api.get(&rules_query(program_id))?;
    for (_, rule_id, rule) in records_with_id(&rules, "programRules", report)? {
        let Some(condition) = str_at(rule, &["condition"]).filter(|c| !c.trim().is_empty())
        else {
            debug!("Rule {} has no condition, skipping", rule_id);
            continue;
        };
        let judged = submit(
            api,
            connection,
            CONDITION_VALIDATION_PATH,
            Submission {
                program_id,
                rule_id,
                action_id: None,
                kind: ExpressionKind::Condition,
                expression: condition,
            },
            report,
        )?;
        unjudged += usize::from(!judged);
    }

    if !action_pass {
        return Ok(unjudged);
    }
    let actions = api.get(&actions_query(program_id))?;
    for (index, action_id, action) in records_with_id(&actions, "programRuleActions", report)? {
        let Some(data) = str_at(action, &["data"]).filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        let Some(rule_id) = str_at(action, &["programRule", "id"]) else {
            log_malformed(&[RecordError::MissingField {
                collection: "programRuleActions".to_string(),
                index,
                field: "programRule.id".to_string(),
            }]);
            report.malformed_records += 1;
            continue;
        };
        let judged = submit(
            api,
            connection,
            ACTION_DATA_VALIDATION_PATH,
            Submission {
                program_id,
                rule_id,
                action_id: Some(action_id),
                kind: ExpressionKind::Action,
                expression: data,
            },
            report,
        )?;
        unjudged += usize::from(!judged);
    }
    Ok(unjudged)
}

/// Validates every program rule condition, and on newer servers every action
/// data expression. A program whose reads fail is reported and skipped, and
/// the check then ends `partial` rather than `ok`.
pub fn check_expressions(
    api: &dyn MetadataApi,
    connection: &ServerConnection,
    _options: &CheckOptions,
) -> Result<CheckReport, ApiError> {
    let mut report = CheckReport::new(CheckKind::Expressions);
    let programs = match api.get(&programs_query()) {
        Ok(p) => p,
        Err(e) if e.is_transport() => return Err(e),
        Err(e) => return Ok(CheckReport::errored(CheckKind::Expressions, e.to_string())),
    };
    let pass = action_pass(api, &mut report)?;

    let program_ids: Vec<String> = match records_with_id(&programs, "programs", &mut report) {
        Ok(records) => records.into_iter().map(|(_, id, _)| id.to_string()).collect(),
        Err(e) => {
            warn!("The received metadata is not OK: {}", e);
            return Ok(CheckReport::errored(CheckKind::Expressions, e.to_string()));
        }
    };
    let mut incomplete = pass == ActionPass::Unknown;
    for program_id in &program_ids {
        let with_actions = pass == ActionPass::Enabled;
        match validate_program(api, connection, program_id, with_actions, &mut report) {
            Ok(0) => debug!("Program {} inspected", program_id),
            Ok(unjudged) => {
                debug!(
                    "Program {} inspected, {} expression(s) without a verdict",
                    program_id, unjudged
                );
                incomplete = true;
            }
            Err(ProgramError::Api(e)) if e.is_transport() => return Err(e),
            Err(e) => {
                error!("Program {} could not be validated: {}", program_id, e);
                report
                    .notes
                    .push(format!("Program {} could not be validated: {}", program_id, e));
                incomplete = true;
            }
        }
    }

    report.settle(incomplete);
    Ok(report)
}
