//! Reconciliation of parsed missions against the store.
//!
//! Pure functions of two lists: the parser's output and the missions
//! currently persisted for the project. Each parsed mission is classified as
//! create, update or identical; updates carry only the fields that actually
//! differ so the user can review exactly what an apply would touch.
//!
//! Identity is title text, not an ID: within one project a parsed mission
//! matches the existing mission whose case-insensitive,
//! whitespace-normalized title is equal. Titles are the only stable
//! human-meaningful handle available from pasted text.

use crate::models::{
    DiffKind, DiffSummary, FieldChange, Mission, MissionChanges, MissionDiff, ParsedMission,
};

/// Normalize a title for matching: trim, collapse internal whitespace,
/// lowercase.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Find the existing mission a parsed title refers to.
///
/// First match by store order wins. Duplicate normalized titles in the store
/// are inherently ambiguous; that ambiguity lives here and nowhere else, so a
/// stronger identity scheme can replace this single function later.
pub fn find_match<'a>(title: &str, existing: &'a [Mission]) -> Option<&'a Mission> {
    let wanted = normalize_title(title);
    existing.iter().find(|m| normalize_title(&m.title) == wanted)
}

/// Empty string and absent are the same "no value" for durations only.
fn duration_value(v: Option<&str>) -> Option<&str> {
    match v {
        None | Some("") => None,
        other => other,
    }
}

/// Classify every parsed mission against the existing missions.
///
/// One output entry per parsed mission, input order preserved. Description is
/// compared by exact string equality (a missing description and an empty one
/// are different values); duration treats `None` and `""` as equal.
pub fn diff(parsed: &[ParsedMission], existing: &[Mission]) -> Vec<MissionDiff> {
    parsed
        .iter()
        .map(|pm| match find_match(&pm.title, existing) {
            None => MissionDiff {
                kind: DiffKind::Create,
                parsed: pm.clone(),
                existing_id: None,
                changes: None,
            },
            Some(m) => {
                let changes = field_changes(pm, m);
                if changes.is_empty() {
                    MissionDiff {
                        kind: DiffKind::Identical,
                        parsed: pm.clone(),
                        existing_id: Some(m.id.clone()),
                        changes: None,
                    }
                } else {
                    MissionDiff {
                        kind: DiffKind::Update,
                        parsed: pm.clone(),
                        existing_id: Some(m.id.clone()),
                        changes: Some(changes),
                    }
                }
            }
        })
        .collect()
}

/// Field-by-field comparison of a parsed mission against its match.
fn field_changes(parsed: &ParsedMission, existing: &Mission) -> MissionChanges {
    let mut changes = MissionChanges::default();

    if existing.description.as_deref() != Some(parsed.description.as_str()) {
        changes.description = Some(FieldChange {
            old: existing.description.clone(),
            new: Some(parsed.description.clone()),
        });
    }

    if duration_value(existing.estimated_duration.as_deref())
        != duration_value(parsed.estimated_duration.as_deref())
    {
        changes.estimated_duration = Some(FieldChange {
            old: existing.estimated_duration.clone(),
            new: parsed.estimated_duration.clone(),
        });
    }

    changes
}

/// Count diff entries by kind.
pub fn summarize(diffs: &[MissionDiff]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for d in diffs {
        match d.kind {
            DiffKind::Create => summary.to_create += 1,
            DiffKind::Update => summary.to_update += 1,
            DiffKind::Identical => summary.identical += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission(id: &str, title: &str, desc: Option<&str>, dur: Option<&str>) -> Mission {
        let mut m = Mission::new(id.to_string(), "jp-0001".to_string(), title.to_string());
        m.description = desc.map(String::from);
        m.estimated_duration = dur.map(String::from);
        m
    }

    fn parsed(title: &str, desc: &str, dur: Option<&str>) -> ParsedMission {
        ParsedMission {
            title: title.to_string(),
            description: desc.to_string(),
            estimated_duration: dur.map(String::from),
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Mise  en Ligne "), "mise en ligne");
        assert_eq!(normalize_title("SETUP"), "setup");
    }

    #[test]
    fn test_no_match_is_create() {
        let diffs = diff(&[parsed("New thing", "", None)], &[]);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, DiffKind::Create);
        assert!(diffs[0].existing_id.is_none());
        assert!(diffs[0].changes.is_none());
    }

    #[test]
    fn test_identical_when_all_fields_equal() {
        let existing = [mission("jn-0001", "Setup", Some("body"), Some("1h"))];
        let diffs = diff(&[parsed("setup", "body", Some("1h"))], &existing);
        assert_eq!(diffs[0].kind, DiffKind::Identical);
        assert_eq!(diffs[0].existing_id.as_deref(), Some("jn-0001"));
    }

    #[test]
    fn test_update_only_carries_changed_fields() {
        let existing = [mission("jn-0001", "Setup", Some("old"), Some("1h"))];
        let diffs = diff(&[parsed("Setup", "new", Some("1h"))], &existing);
        assert_eq!(diffs[0].kind, DiffKind::Update);
        let changes = diffs[0].changes.as_ref().unwrap();
        let desc = changes.description.as_ref().unwrap();
        assert_eq!(desc.old.as_deref(), Some("old"));
        assert_eq!(desc.new.as_deref(), Some("new"));
        // Duration unchanged, so it must be absent from changes.
        assert!(changes.estimated_duration.is_none());
    }

    #[test]
    fn test_empty_duration_equals_absent_duration() {
        let existing = [mission("jn-0001", "Setup", Some("body"), Some(""))];
        let diffs = diff(&[parsed("Setup", "body", None)], &existing);
        assert_eq!(diffs[0].kind, DiffKind::Identical);
    }

    #[test]
    fn test_empty_description_differs_from_absent() {
        // The no-value equivalence applies to durations only.
        let existing = [mission("jn-0001", "Setup", None, None)];
        let diffs = diff(&[parsed("Setup", "", None)], &existing);
        assert_eq!(diffs[0].kind, DiffKind::Update);
        let desc = diffs[0].changes.as_ref().unwrap().description.as_ref().unwrap();
        assert_eq!(desc.old, None);
        assert_eq!(desc.new.as_deref(), Some(""));
    }

    #[test]
    fn test_duplicate_titles_first_match_by_store_order_wins() {
        let existing = [
            mission("jn-0001", "Setup", Some("first"), None),
            mission("jn-0002", "setup", Some("second"), None),
        ];
        let diffs = diff(&[parsed("SETUP", "first", None)], &existing);
        assert_eq!(diffs[0].existing_id.as_deref(), Some("jn-0001"));
        assert_eq!(diffs[0].kind, DiffKind::Identical);
    }

    #[test]
    fn test_order_preserved_and_partition_complete() {
        let existing = [
            mission("jn-0001", "Keep", Some("same"), None),
            mission("jn-0002", "Change", Some("old"), None),
        ];
        let parsed_list = [
            parsed("Brand new", "", None),
            parsed("Change", "new", None),
            parsed("Keep", "same", None),
        ];
        let diffs = diff(&parsed_list, &existing);
        assert_eq!(diffs.len(), 3);
        assert_eq!(diffs[0].kind, DiffKind::Create);
        assert_eq!(diffs[1].kind, DiffKind::Update);
        assert_eq!(diffs[2].kind, DiffKind::Identical);

        let summary = summarize(&diffs);
        assert_eq!(summary.to_create, 1);
        assert_eq!(summary.to_update, 1);
        assert_eq!(summary.identical, 1);
        assert_eq!(summary.total(), diffs.len());
    }

    #[test]
    fn test_rediff_is_byte_identical() {
        let existing = [mission("jn-0001", "Setup", Some("old"), Some("1h"))];
        let parsed_list = [parsed("Setup", "new", Some("2h")), parsed("Other", "", None)];
        let first = diff(&parsed_list, &existing);
        let second = diff(&parsed_list, &existing);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
