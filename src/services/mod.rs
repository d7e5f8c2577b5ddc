//! Service layer containing the checks and their side-effect helpers.
//!
//! ## Service map
//! - `api.rs` — authenticated GET/POST against the server, status mapping.
//! - `query.rs` — request paths: fields, filters, paging directive, follow-up query.
//! - `duplicates.rs` — generic duplicate detector and its collection shapes.
//! - `version.rs` — server version parsing and the action validation gate.
//! - `expressions.rs` — program rule condition/action expression validation.
//! - `output.rs` — JSON/text report rendering.
//!
//! ## Conventions
//! - Checks only read from the server; validation POSTs never mutate it.
//! - Network failures are returned, never turned into a process exit here.
//! - Keep command handlers thin; delegate to services.

pub mod api;
pub mod duplicates;
pub mod expressions;
pub mod output;
pub mod query;
pub mod version;
