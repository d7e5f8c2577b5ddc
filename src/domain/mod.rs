//! Shared data model layer (structs/constants only).
//!
//! ## Files
//! - `models.rs` — connection context, findings, check/run reports.
//! - `constants.rs` — endpoint paths, paging directive, version gate.
//!
//! Domain types are data-only: no network side effects live here.
//! Changes to report structs affect `--json` output and
//! `docs/contracts/report.schema.json`; keep them in sync.

pub mod constants;
pub mod models;
