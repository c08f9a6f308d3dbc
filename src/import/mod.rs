//! The roadmap import and reconciliation engine.
//!
//! Pipeline: raw pasted text -> [`parser::parse`] -> `Vec<ParsedMission>` ->
//! [`diff::diff`] against the project's stored missions -> `Vec<MissionDiff>`
//! (reviewed by the user) -> [`apply::apply`] -> store mutations +
//! `ApplyResult` -> [`report::generate_report`] -> [`report::record`].
//!
//! Parsing, diffing and report rendering are pure functions over in-memory
//! values; only the apply coordinator and the audit recorder touch a store,
//! and they do so strictly sequentially so store order matches the order the
//! user reviewed. Two imports running concurrently against the same project
//! may race at the store level; that is a known limitation of this
//! single-operator tool, not something the engine detects.

pub mod apply;
pub mod diff;
pub mod duration;
pub mod parser;
pub mod report;

pub use apply::{MissionPatch, MissionStore, NewMission, apply};
pub use diff::{diff, find_match, normalize_title, summarize};
pub use parser::parse;
pub use report::{AuditStore, Report, ReportContext, generate_report, record};
