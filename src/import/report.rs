//! Import report rendering and the append-only audit trail.
//!
//! After a successful apply the engine writes down what happened: a stable
//! title, a human-readable body, and one flattened record per diff entry.
//! The resulting `ImportHistoryEntry` is pure append; it is never updated or
//! deleted and is read back unmodified by the history surface.

use chrono::{DateTime, Utc};

use crate::Result;
use crate::models::{
    ChangeDetails, ChangeRecord, DiffKind, DiffSummary, ImportHistoryEntry, MissionDiff,
};
use crate::storage::generate_id;

/// Everything the report needs about a completed apply.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub project_name: &'a str,
    pub applied_at: DateTime<Utc>,
    pub actor: &'a str,
    pub summary: DiffSummary,
    pub diffs: &'a [MissionDiff],
}

/// A rendered import report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Stable, human-scannable title (project name + date)
    pub title: String,

    /// Body: counts, then every non-identical change with before/after values
    pub content: String,
}

/// The audit persistence capability the engine consumes.
///
/// Append-only by contract: entries are inserted once and never mutated.
pub trait AuditStore {
    fn insert_import_history(&mut self, entry: &ImportHistoryEntry) -> Result<()>;

    /// Read path used by the history-viewing surface.
    fn list_import_history(&self, project_id: &str) -> Result<Vec<ImportHistoryEntry>>;
}

/// Render a value for display in before/after listings.
fn render_value(value: Option<&str>) -> String {
    match value {
        None => "(none)".to_string(),
        Some("") => "(empty)".to_string(),
        Some(v) => format!("\"{}\"", v),
    }
}

/// Render the changed fields of an update, one side at a time.
fn render_side(diff: &MissionDiff, old_side: bool) -> String {
    let mut parts = Vec::new();
    if let Some(changes) = &diff.changes {
        if let Some(c) = &changes.description {
            let v = if old_side { &c.old } else { &c.new };
            parts.push(format!("description: {}", render_value(v.as_deref())));
        }
        if let Some(c) = &changes.estimated_duration {
            let v = if old_side { &c.old } else { &c.new };
            parts.push(format!("duration: {}", render_value(v.as_deref())));
        }
    }
    parts.join(", ")
}

/// Render the report for a completed apply.
///
/// The title combines project name and date in a stable format so history
/// entries sort and scan well. The body lists every non-identical change.
pub fn generate_report(ctx: &ReportContext<'_>) -> Report {
    let title = format!(
        "Roadmap import - {} - {}",
        ctx.project_name,
        ctx.applied_at.format("%Y-%m-%d")
    );

    let mut lines = Vec::new();
    lines.push(format!(
        "Roadmap import for '{}' on {} by {}",
        ctx.project_name,
        ctx.applied_at.format("%Y-%m-%d %H:%M"),
        ctx.actor
    ));
    lines.push(format!(
        "{} created, {} updated, {} unchanged ({} total)",
        ctx.summary.to_create,
        ctx.summary.to_update,
        ctx.summary.identical,
        ctx.summary.total()
    ));

    for diff in ctx.diffs {
        match diff.kind {
            DiffKind::Identical => {}
            DiffKind::Create => {
                let duration = diff
                    .parsed
                    .estimated_duration
                    .as_deref()
                    .map(|d| format!(" [{}]", d))
                    .unwrap_or_default();
                lines.push(format!("+ {}{}", diff.parsed.title, duration));
            }
            DiffKind::Update => {
                lines.push(format!("~ {}", diff.parsed.title));
                lines.push(format!("    before: {}", render_side(diff, true)));
                lines.push(format!("    after:  {}", render_side(diff, false)));
            }
        }
    }

    Report {
        title,
        content: lines.join("\n"),
    }
}

/// Flatten a diff entry into its display-oriented history record.
fn change_record(diff: &MissionDiff) -> ChangeRecord {
    let details = match diff.kind {
        DiffKind::Update => Some(ChangeDetails {
            before: render_side(diff, true),
            after: render_side(diff, false),
        }),
        _ => None,
    };
    ChangeRecord {
        kind: diff.kind,
        mission_title: diff.parsed.title.clone(),
        details,
    }
}

/// Append the report as a new, immutable history entry.
///
/// The counts invariant holds by construction: the entry's counts are the
/// partition sizes of the diff list it was built from.
pub fn record(
    store: &mut dyn AuditStore,
    project_id: &str,
    report: &Report,
    actor: &str,
    summary: DiffSummary,
    diffs: &[MissionDiff],
    applied_at: DateTime<Utc>,
) -> Result<ImportHistoryEntry> {
    let entry = ImportHistoryEntry {
        id: generate_id("jh", &format!("{}{}", project_id, report.title)),
        project_id: project_id.to_string(),
        title: report.title.clone(),
        summary: report.content.clone(),
        actor: actor.to_string(),
        created_count: summary.to_create,
        updated_count: summary.to_update,
        identical_count: summary.identical,
        total_count: summary.total(),
        changes: diffs.iter().map(change_record).collect(),
        created_at: applied_at,
    };

    store.insert_import_history(&entry)?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::{diff, summarize};
    use crate::models::{Mission, ParsedMission};

    fn sample_diffs() -> Vec<MissionDiff> {
        let mut existing_changed =
            Mission::new("jn-0001".into(), "jp-0001".into(), "Setup".into());
        existing_changed.description = Some("old body".to_string());
        existing_changed.estimated_duration = Some("1h".to_string());

        let mut existing_same = Mission::new("jn-0002".into(), "jp-0001".into(), "Keep".into());
        existing_same.description = Some("same".to_string());

        let parsed = vec![
            ParsedMission {
                title: "Setup".to_string(),
                description: "new body".to_string(),
                estimated_duration: Some("2h".to_string()),
            },
            ParsedMission {
                title: "Keep".to_string(),
                description: "same".to_string(),
                estimated_duration: None,
            },
            ParsedMission {
                title: "Launch".to_string(),
                description: String::new(),
                estimated_duration: Some("1j".to_string()),
            },
        ];
        diff(&parsed, &[existing_changed, existing_same])
    }

    #[test]
    fn test_report_title_is_stable() {
        let diffs = sample_diffs();
        let at = "2026-03-01T10:30:00Z".parse().unwrap();
        let ctx = ReportContext {
            project_name: "Site vitrine",
            applied_at: at,
            actor: "marie",
            summary: summarize(&diffs),
            diffs: &diffs,
        };
        let report = generate_report(&ctx);
        assert_eq!(report.title, "Roadmap import - Site vitrine - 2026-03-01");
    }

    #[test]
    fn test_report_lists_non_identical_changes_only() {
        let diffs = sample_diffs();
        let ctx = ReportContext {
            project_name: "Site vitrine",
            applied_at: Utc::now(),
            actor: "marie",
            summary: summarize(&diffs),
            diffs: &diffs,
        };
        let report = generate_report(&ctx);

        assert!(report.content.contains("1 created, 1 updated, 1 unchanged (3 total)"));
        assert!(report.content.contains("+ Launch [1j]"));
        assert!(report.content.contains("~ Setup"));
        assert!(report.content.contains("description: \"old body\""));
        assert!(report.content.contains("duration: \"2h\""));
        // The identical entry produces no change line.
        assert!(!report.content.contains("Keep"));
    }

    /// In-memory audit store for recorder tests.
    #[derive(Default)]
    struct MemAudit {
        entries: Vec<ImportHistoryEntry>,
    }

    impl AuditStore for MemAudit {
        fn insert_import_history(&mut self, entry: &ImportHistoryEntry) -> Result<()> {
            self.entries.push(entry.clone());
            Ok(())
        }

        fn list_import_history(&self, project_id: &str) -> Result<Vec<ImportHistoryEntry>> {
            Ok(self
                .entries
                .iter()
                .filter(|e| e.project_id == project_id)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn test_record_counts_invariant() {
        let diffs = sample_diffs();
        let summary = summarize(&diffs);
        let report = Report {
            title: "Roadmap import - Site vitrine - 2026-03-01".to_string(),
            content: "body".to_string(),
        };

        let mut audit = MemAudit::default();
        let entry = record(
            &mut audit,
            "jp-0001",
            &report,
            "marie",
            summary,
            &diffs,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(
            entry.created_count + entry.updated_count + entry.identical_count,
            entry.total_count
        );
        assert_eq!(entry.total_count, entry.changes.len());
        assert_eq!(entry.total_count, diffs.len());
        assert!(entry.id.starts_with("jh-"));

        // Round-trips unmodified through the store.
        let listed = audit.list_import_history("jp-0001").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, entry.title);
        assert_eq!(listed[0].changes, entry.changes);
    }

    #[test]
    fn test_change_records_detail_updates_only() {
        let diffs = sample_diffs();
        let records: Vec<ChangeRecord> = diffs.iter().map(change_record).collect();

        let update = records.iter().find(|r| r.kind == DiffKind::Update).unwrap();
        let details = update.details.as_ref().unwrap();
        assert!(details.before.contains("description: \"old body\""));
        assert!(details.after.contains("description: \"new body\""));

        for r in records.iter().filter(|r| r.kind != DiffKind::Update) {
            assert!(r.details.is_none());
        }
    }
}
