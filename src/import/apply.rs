//! Bulk apply of an accepted diff list against the mission store.
//!
//! The coordinator is an explicit sequential reducer over the diff entries:
//! identical entries cost nothing, creates and updates each issue exactly one
//! store call, in review order, so the store's insertion order matches what
//! the user confirmed. The first failing call aborts the whole apply with
//! partial accounting; writes that already succeeded stay written (the store
//! offers no multi-row transaction, so there is no rollback).

use crate::models::{ApplyResult, DiffKind, Mission, MissionDiff, MissionStatus, ParsedMission};
use crate::{Error, Result};

/// Fields of a mission to create, seeded from a parsed mission plus the
/// import defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMission {
    pub title: String,
    pub description: Option<String>,
    pub estimated_duration: Option<String>,
    pub status: MissionStatus,
    pub focus: bool,
    pub accumulated_minutes: u32,
}

impl NewMission {
    /// Seed a new mission from a parsed one. Import defaults: status pending,
    /// not focused, no accumulated time; the store appends the position.
    pub fn from_parsed(parsed: &ParsedMission) -> Self {
        Self {
            title: parsed.title.clone(),
            description: Some(parsed.description.clone()),
            estimated_duration: parsed.estimated_duration.clone(),
            status: MissionStatus::Pending,
            focus: false,
            accumulated_minutes: 0,
        }
    }
}

/// A partial update carrying only the fields an apply should touch.
///
/// The outer `Option` is field presence: `None` means "leave the stored value
/// alone". For the duration the inner value may itself be `None` to clear the
/// estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionPatch {
    pub description: Option<String>,
    pub estimated_duration: Option<Option<String>>,
}

impl MissionPatch {
    /// Build a patch from the changed fields of an update diff entry.
    pub fn from_diff(diff: &MissionDiff) -> Self {
        let mut patch = Self::default();
        if let Some(changes) = &diff.changes {
            if let Some(c) = &changes.description {
                patch.description = c.new.clone();
            }
            if let Some(c) = &changes.estimated_duration {
                patch.estimated_duration = Some(c.new.clone());
            }
        }
        patch
    }
}

/// The mission persistence capability the engine consumes.
///
/// Owned elsewhere; [`crate::storage::Storage`] is the default
/// implementation, tests use in-memory recorders.
pub trait MissionStore {
    /// All missions of a project, in store order.
    fn list_by_project(&self, project_id: &str) -> Result<Vec<Mission>>;

    /// Create a mission, appending it at the end of the project.
    fn create_mission(&mut self, project_id: &str, new: NewMission) -> Result<Mission>;

    /// Apply a partial update to an existing mission.
    fn update_mission(&mut self, id: &str, patch: MissionPatch) -> Result<()>;
}

/// Execute an accepted diff list against the store.
///
/// Identical entries are skipped without a store call. A failure on any call
/// aborts the apply and surfaces as [`Error::ApplyAborted`] with the counts
/// completed so far, so the caller can report "N of M" instead of an opaque
/// error. A diff list must not be reapplied after a failure; store state has
/// changed underneath it and a fresh diff is required.
pub fn apply(
    store: &mut dyn MissionStore,
    project_id: &str,
    diffs: &[MissionDiff],
) -> Result<ApplyResult> {
    let total = diffs.iter().filter(|d| d.kind != DiffKind::Identical).count();
    let mut result = ApplyResult::default();

    for diff in diffs {
        let outcome = match diff.kind {
            DiffKind::Identical => continue,
            DiffKind::Create => store
                .create_mission(project_id, NewMission::from_parsed(&diff.parsed))
                .map(|_| ()),
            DiffKind::Update => diff
                .existing_id
                .as_deref()
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "update diff for '{}' has no existing mission id",
                        diff.parsed.title
                    ))
                })
                .and_then(|id| store.update_mission(id, MissionPatch::from_diff(diff))),
        };

        if let Err(source) = outcome {
            return Err(Error::ApplyAborted {
                title: diff.parsed.title.clone(),
                created: result.created,
                updated: result.updated,
                total,
                source: Box::new(source),
            });
        }

        match diff.kind {
            DiffKind::Create => result.created += 1,
            DiffKind::Update => result.updated += 1,
            DiffKind::Identical => unreachable!(),
        }
    }

    Ok(result)
}
