use clap::{Parser, ValueEnum};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "metahealth",
    version,
    about = "Metadata health checks for DHIS2 servers"
)]
pub struct Cli {
    #[arg(
        short = 's',
        long = "server_url",
        help = "DHIS2 HTTP(s) server address without the API part"
    )]
    pub server_url: String,
    #[arg(short = 'u', long = "username", help = "DHIS2 username")]
    pub username: String,
    #[arg(short = 'p', long = "password", help = "DHIS2 password")]
    pub password: String,
    #[arg(
        short = 'n',
        long = "dry_run",
        help = "If enabled no write actions will be performed"
    )]
    pub dry_run: bool,
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Be verbose while executing the tasks"
    )]
    pub verbose: bool,
    #[arg(long, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long = "fail_fast",
        help = "Abort the whole run on the first network failure"
    )]
    pub fail_fast: bool,
    #[arg(long = "timeout_ms", help = "Per-request timeout in milliseconds")]
    pub timeout_ms: Option<u64>,
    #[arg(
        long = "check",
        value_enum,
        help = "Run only the named check (repeatable); defaults to all"
    )]
    pub checks: Vec<CheckKind>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    Uids,
    CategoryOptions,
    DataSetElements,
    SectionElements,
    Expressions,
}

impl CheckKind {
    pub const ALL: [CheckKind; 5] = [
        CheckKind::Uids,
        CheckKind::CategoryOptions,
        CheckKind::DataSetElements,
        CheckKind::SectionElements,
        CheckKind::Expressions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CheckKind::Uids => "uids",
            CheckKind::CategoryOptions => "category-options",
            CheckKind::DataSetElements => "data-set-elements",
            CheckKind::SectionElements => "section-elements",
            CheckKind::Expressions => "expressions",
        }
    }
}

impl Cli {
    /// Selected checks in canonical run order, each at most once.
    pub fn selected_checks(&self) -> Vec<CheckKind> {
        if self.checks.is_empty() {
            return CheckKind::ALL.to_vec();
        }
        CheckKind::ALL
            .into_iter()
            .filter(|k| self.checks.contains(k))
            .collect()
    }
}
