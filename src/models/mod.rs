//! Data models for Jalon entities.
//!
//! This module defines the core data structures:
//! - `Project` - A named scope that missions and import history belong to
//! - `Mission` - A persisted unit of work with description and duration estimate
//! - `ParsedMission` - An ephemeral mission extracted from pasted roadmap text
//! - `MissionDiff` - The classified comparison of one parsed mission against
//!   the store (create / update / identical)
//! - `ImportHistoryEntry` - The permanent, append-only record of a completed
//!   import apply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mission status in the workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MissionStatus::Pending => "pending",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// A named scope for missions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (e.g., "jp-a1b2")
    pub id: String,

    /// Project name
    pub name: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a new project with the given ID and name.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            created_at: Utc::now(),
        }
    }
}

/// A persisted unit of work belonging to a project.
///
/// The import engine only ever reads or writes `title`, `description` and
/// `estimated_duration`; the remaining fields are owned by the store and
/// the rest of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    /// Unique identifier (e.g., "jn-a1b2")
    pub id: String,

    /// Owning project ID
    pub project_id: String,

    /// Mission title
    pub title: String,

    /// Detailed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Coarse time estimate as a compact token (e.g., "3h", "2j", "45min")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,

    /// Current status
    #[serde(default)]
    pub status: MissionStatus,

    /// Ordering position within the project (append order)
    #[serde(default)]
    pub position: u32,

    /// Whether the mission is pinned as the current focus
    #[serde(default)]
    pub focus: bool,

    /// Time already spent, in minutes
    #[serde(default)]
    pub accumulated_minutes: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Mission {
    /// Create a new mission with the given ID, project and title.
    pub fn new(id: String, project_id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            project_id,
            title,
            description: None,
            estimated_duration: None,
            status: MissionStatus::default(),
            position: 0,
            focus: false,
            accumulated_minutes: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A mission extracted from pasted roadmap text.
///
/// Ephemeral: produced by the parser, consumed by the diff engine, never
/// persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMission {
    /// Cleaned heading or line text
    pub title: String,

    /// Cleaned multi-line body text (empty when the source had none)
    pub description: String,

    /// Normalized duration token, if one was found in the body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<String>,
}

/// Classification of one parsed mission against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Create,
    Update,
    Identical,
}

/// Old and new value of a single changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// The fields of an existing mission that an update would touch.
///
/// Only fields that actually differ are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<FieldChange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<FieldChange>,
}

impl MissionChanges {
    /// True when no compared field differs.
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.estimated_duration.is_none()
    }
}

/// One entry of the reconciliation result, shown to the user before commit.
///
/// Constructed fresh on every analysis pass and consumed once by the bulk
/// apply; only its effects and the resulting `ImportHistoryEntry` are durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionDiff {
    /// How this parsed mission relates to the store
    pub kind: DiffKind,

    /// The parsed mission this entry was computed from
    pub parsed: ParsedMission,

    /// Matched mission ID (set for update/identical, absent for create)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<String>,

    /// Per-field change detail (update only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<MissionChanges>,
}

/// Counts of a diff list by kind.
///
/// Always equals the partition sizes of the diff list it was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub to_create: usize,
    pub to_update: usize,
    pub identical: usize,
}

impl DiffSummary {
    /// Total number of diff entries summarized.
    pub fn total(&self) -> usize {
        self.to_create + self.to_update + self.identical
    }
}

/// Counts of store calls executed by a completed bulk apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub created: usize,
    pub updated: usize,
}

/// Before/after rendering of an applied change, for history display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetails {
    pub before: String,
    pub after: String,
}

/// A flattened, display-oriented echo of one `MissionDiff` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Diff classification this record echoes
    pub kind: DiffKind,

    /// Title of the mission concerned
    pub mission_title: String,

    /// Rendered before/after values (updates only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ChangeDetails>,
}

/// The permanent record of a completed import apply.
///
/// Written once via the audit store and never mutated. Invariant:
/// `created_count + updated_count + identical_count == total_count
/// == changes.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHistoryEntry {
    /// Unique identifier (e.g., "jh-a1b2")
    pub id: String,

    /// Project the import ran against
    pub project_id: String,

    /// Stable, human-scannable report title (project name + date)
    pub title: String,

    /// Rendered report body
    pub summary: String,

    /// Who ran the import
    pub actor: String,

    pub created_count: usize,
    pub updated_count: usize,
    pub identical_count: usize,
    pub total_count: usize,

    /// One record per diff entry, in review order
    pub changes: Vec<ChangeRecord>,

    /// When the apply completed
    pub created_at: DateTime<Utc>,
}
