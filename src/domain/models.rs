use crate::cli::CheckKind;
use serde::{Deserialize, Serialize};

/// Decoded JSON object returned by a GET: collection name -> records.
pub type Collection = serde_json::Map<String, serde_json::Value>;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

/// Where and as whom to talk to the server. Fixed for the whole run.
#[derive(Debug, Clone)]
pub struct ServerConnection {
    pub base_url: String,
    pub api_url: String,
    pub username: String,
    pub password: String,
}

impl ServerConnection {
    pub fn new(server_url: &str, username: &str, password: &str) -> Self {
        let base_url = server_url.trim_end_matches('/').to_string();
        let api_url = format!("{}/api", base_url);
        Self {
            base_url,
            api_url,
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Per-run switches threaded into every check.
///
/// `dry_run` and `fix` are accepted but no check mutates server state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    pub verbose: bool,
    pub dry_run: bool,
    pub fix: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFinding {
    pub container_id: String,
    pub duplicates: Vec<String>,
}

/// Body returned by the expression description endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpressionCheckResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ExpressionCheckResult {
    pub fn reason(&self) -> String {
        self.description
            .clone()
            .or_else(|| self.message.clone())
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| format!("validator returned status {}", self.status))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionKind {
    Condition,
    Action,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpressionFailure {
    pub program_id: String,
    pub rule_id: String,
    pub kind: ExpressionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    pub expression: String,
    pub reason: String,
    pub edit_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Findings,
    /// Nothing wrong among what was inspected, but some of it was skipped.
    Partial,
    /// The server answered, but not with something usable.
    Error,
    /// The server could not be reached.
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub check: CheckKind,
    pub status: CheckStatus,
    pub findings: Vec<DuplicateFinding>,
    pub duplicate_ids: Vec<String>,
    pub expression_failures: Vec<ExpressionFailure>,
    pub follow_up: Option<String>,
    pub malformed_records: usize,
    pub notes: Vec<String>,
    pub error: Option<String>,
}

impl CheckReport {
    pub fn new(check: CheckKind) -> Self {
        Self {
            check,
            status: CheckStatus::Ok,
            findings: Vec::new(),
            duplicate_ids: Vec::new(),
            expression_failures: Vec::new(),
            follow_up: None,
            malformed_records: 0,
            notes: Vec::new(),
            error: None,
        }
    }

    pub fn failed(check: CheckKind, error: String) -> Self {
        let mut report = Self::new(check);
        report.status = CheckStatus::Failed;
        report.error = Some(error);
        report
    }

    pub fn errored(check: CheckKind, error: String) -> Self {
        let mut report = Self::new(check);
        report.status = CheckStatus::Error;
        report.error = Some(error);
        report
    }

    pub fn skipped(check: CheckKind, note: &str) -> Self {
        let mut report = Self::new(check);
        report.status = CheckStatus::Skipped;
        report.notes.push(note.to_string());
        report
    }

    /// Final status of a check that ran to the end. `incomplete` marks work
    /// that was skipped; malformed records count as skipped too.
    pub fn settle(&mut self, incomplete: bool) {
        self.status = if self.has_findings() {
            CheckStatus::Findings
        } else if incomplete || self.malformed_records > 0 {
            CheckStatus::Partial
        } else {
            CheckStatus::Ok
        };
    }

    pub fn has_findings(&self) -> bool {
        !self.findings.is_empty()
            || !self.duplicate_ids.is_empty()
            || !self.expression_failures.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub server: String,
    pub dry_run: bool,
    pub checks: Vec<CheckReport>,
    pub aborted: bool,
}

impl RunReport {
    pub fn transport_failed(&self) -> bool {
        self.aborted || self.checks.iter().any(|c| c.status == CheckStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::{CheckReport, CheckStatus, ExpressionCheckResult, ServerConnection};
    use crate::cli::CheckKind;

    #[test]
    fn connection_trims_trailing_slash_before_api_suffix() {
        let c = ServerConnection::new("https://dhis.example.org/", "admin", "district");
        assert_eq!(c.base_url, "https://dhis.example.org");
        assert_eq!(c.api_url, "https://dhis.example.org/api");
    }

    #[test]
    fn settle_only_reports_ok_when_nothing_was_skipped() {
        let mut report = CheckReport::new(CheckKind::Expressions);
        report.settle(false);
        assert_eq!(report.status, CheckStatus::Ok);

        report.settle(true);
        assert_eq!(report.status, CheckStatus::Partial);

        let mut report = CheckReport::new(CheckKind::Uids);
        report.malformed_records = 2;
        report.settle(false);
        assert_eq!(report.status, CheckStatus::Partial);

        report.duplicate_ids.push("x".to_string());
        report.settle(true);
        assert_eq!(report.status, CheckStatus::Findings);
    }

    #[test]
    fn reason_prefers_description_then_message() {
        let r: ExpressionCheckResult = serde_json::from_str(
            r#"{"status":"ERROR","message":"Expression is not valid","description":"Unknown variable"}"#,
        )
        .unwrap();
        assert_eq!(r.reason(), "Unknown variable");

        let r: ExpressionCheckResult =
            serde_json::from_str(r#"{"status":"ERROR","message":"Expression is not valid"}"#)
                .unwrap();
        assert_eq!(r.reason(), "Expression is not valid");

        let r: ExpressionCheckResult = serde_json::from_str(r#"{"status":"ERROR"}"#).unwrap();
        assert_eq!(r.reason(), "validator returned status ERROR");
    }
}
