//! Command implementations for the Jalon CLI.
//!
//! This module contains the business logic for each CLI command. Every
//! command returns a result type implementing [`CommandResult`] so the binary
//! can emit either JSON (default) or human-readable text.

use serde::Serialize;
use std::path::Path;

use crate::import::report::AuditStore;
use crate::import::{self, MissionStore, Report, ReportContext, generate_report, record};
use crate::models::{
    ApplyResult, DiffKind, DiffSummary, ImportHistoryEntry, Mission, MissionDiff, MissionStatus,
    Project,
};
use crate::storage::Storage;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult: Serialize {
    /// Serialize to JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub initialized: bool,
    pub path: String,
}

impl CommandResult for InitResult {
    fn to_human(&self) -> String {
        if self.initialized {
            format!("Initialized jalon storage at {}", self.path)
        } else {
            format!("Already initialized at {}", self.path)
        }
    }
}

/// Initialize storage for the repository.
pub fn system_init(repo_path: &Path) -> Result<InitResult> {
    let already = Storage::exists(repo_path)?;
    let storage = Storage::init(repo_path)?;
    Ok(InitResult {
        initialized: !already,
        path: storage.root.display().to_string(),
    })
}

// === Projects ===

#[derive(Debug, Serialize)]
pub struct ProjectCreated {
    pub project: Project,
}

impl CommandResult for ProjectCreated {
    fn to_human(&self) -> String {
        format!("Created project {} \"{}\"", self.project.id, self.project.name)
    }
}

pub fn project_create(repo_path: &Path, name: &str) -> Result<ProjectCreated> {
    let mut storage = Storage::open(repo_path)?;
    let project = storage.create_project(name)?;
    Ok(ProjectCreated { project })
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
}

impl CommandResult for ProjectList {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects".to_string();
        }
        self.projects
            .iter()
            .map(|p| format!("{}  {}", p.id, p.name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn project_list(repo_path: &Path) -> Result<ProjectList> {
    let storage = Storage::open(repo_path)?;
    Ok(ProjectList {
        projects: storage.list_projects()?,
    })
}

// === Missions ===

#[derive(Debug, Serialize)]
pub struct MissionCreated {
    pub mission: Mission,
}

impl CommandResult for MissionCreated {
    fn to_human(&self) -> String {
        format!("Created mission {} \"{}\"", self.mission.id, self.mission.title)
    }
}

pub fn mission_create(
    repo_path: &Path,
    project_ref: &str,
    title: &str,
    description: Option<String>,
    estimated_duration: Option<String>,
) -> Result<MissionCreated> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("mission title cannot be empty".to_string()));
    }

    let mut storage = Storage::open(repo_path)?;
    let project = storage.find_project(project_ref)?;
    let mission = storage.create_mission(
        &project.id,
        import::NewMission {
            title: title.to_string(),
            description,
            estimated_duration,
            status: MissionStatus::Pending,
            focus: false,
            accumulated_minutes: 0,
        },
    )?;
    Ok(MissionCreated { mission })
}

fn render_mission_line(m: &Mission) -> String {
    let duration = m
        .estimated_duration
        .as_deref()
        .map(|d| format!(" [{}]", d))
        .unwrap_or_default();
    format!("{}  {}  {}{}", m.id, m.status, m.title, duration)
}

#[derive(Debug, Serialize)]
pub struct MissionList {
    pub project_id: String,
    pub missions: Vec<Mission>,
}

impl CommandResult for MissionList {
    fn to_human(&self) -> String {
        if self.missions.is_empty() {
            return "No missions".to_string();
        }
        self.missions
            .iter()
            .map(render_mission_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn mission_list(repo_path: &Path, project_ref: &str) -> Result<MissionList> {
    let storage = Storage::open(repo_path)?;
    let project = storage.find_project(project_ref)?;
    Ok(MissionList {
        missions: storage.list_missions(&project.id)?,
        project_id: project.id,
    })
}

#[derive(Debug, Serialize)]
pub struct MissionShow {
    pub mission: Mission,
}

impl CommandResult for MissionShow {
    fn to_human(&self) -> String {
        let m = &self.mission;
        let mut out = vec![render_mission_line(m)];
        if let Some(desc) = m.description.as_deref().filter(|d| !d.is_empty()) {
            out.push(desc.to_string());
        }
        out.join("\n")
    }
}

pub fn mission_show(repo_path: &Path, id: &str) -> Result<MissionShow> {
    crate::storage::validate_id(id, "jn")?;
    let storage = Storage::open(repo_path)?;
    Ok(MissionShow {
        mission: storage.get_mission(id)?,
    })
}

// === Import ===

/// Render a diff list the way the confirmation dialog shows it.
fn render_diffs(diffs: &[MissionDiff]) -> String {
    let mut lines = Vec::new();
    for d in diffs {
        match d.kind {
            DiffKind::Create => lines.push(format!("+ {}", d.parsed.title)),
            DiffKind::Identical => lines.push(format!("= {}", d.parsed.title)),
            DiffKind::Update => {
                lines.push(format!("~ {}", d.parsed.title));
                if let Some(changes) = &d.changes {
                    if let Some(c) = &changes.description {
                        lines.push(format!(
                            "    description: {:?} -> {:?}",
                            c.old.as_deref().unwrap_or(""),
                            c.new.as_deref().unwrap_or("")
                        ));
                    }
                    if let Some(c) = &changes.estimated_duration {
                        lines.push(format!(
                            "    duration: {} -> {}",
                            c.old.as_deref().unwrap_or("(none)"),
                            c.new.as_deref().unwrap_or("(none)")
                        ));
                    }
                }
            }
        }
    }
    lines.join("\n")
}

#[derive(Debug, Serialize)]
pub struct ImportPreview {
    pub project_id: String,
    pub project_name: String,
    pub summary: DiffSummary,
    pub diffs: Vec<MissionDiff>,
}

impl CommandResult for ImportPreview {
    fn to_human(&self) -> String {
        format!(
            "{} to create, {} to update, {} identical\n{}",
            self.summary.to_create,
            self.summary.to_update,
            self.summary.identical,
            render_diffs(&self.diffs)
        )
    }
}

/// Parse pasted roadmap text and diff it against the project's missions,
/// without touching the store.
pub fn import_preview(repo_path: &Path, project_ref: &str, text: &str) -> Result<ImportPreview> {
    let storage = Storage::open(repo_path)?;
    let project = storage.find_project(project_ref)?;

    let parsed = import::parse(text);
    let existing = storage.list_by_project(&project.id)?;
    let diffs = import::diff(&parsed, &existing);
    let summary = import::summarize(&diffs);

    Ok(ImportPreview {
        project_id: project.id,
        project_name: project.name,
        summary,
        diffs,
    })
}

#[derive(Debug, Serialize)]
pub struct ImportApplied {
    pub project_id: String,
    pub result: ApplyResult,
    pub summary: DiffSummary,
    pub history_recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl CommandResult for ImportApplied {
    fn to_human(&self) -> String {
        let mut out = format!(
            "Applied import: {} created, {} updated, {} skipped",
            self.result.created, self.result.updated, self.summary.identical
        );
        if let Some(warning) = &self.warning {
            out.push_str(&format!("\nWarning: {}", warning));
        }
        out
    }
}

/// Parse, diff and apply in one pass, then record the import history.
///
/// A store failure mid-apply surfaces as [`Error::ApplyAborted`] with partial
/// accounting; the diff is stale at that point and must be recomputed before
/// retrying. A failure to persist the history entry never fails a completed
/// apply; it degrades to a warning on the result.
pub fn import_apply(
    repo_path: &Path,
    project_ref: &str,
    text: &str,
    actor: &str,
) -> Result<ImportApplied> {
    let mut storage = Storage::open(repo_path)?;
    let project = storage.find_project(project_ref)?;

    let parsed = import::parse(text);
    let existing = storage.list_by_project(&project.id)?;
    let diffs = import::diff(&parsed, &existing);
    let summary = import::summarize(&diffs);

    let result = import::apply(&mut storage, &project.id, &diffs)?;

    let applied_at = chrono::Utc::now();
    let report: Report = generate_report(&ReportContext {
        project_name: &project.name,
        applied_at,
        actor,
        summary,
        diffs: &diffs,
    });

    let (history_recorded, history_id, warning) = match record(
        &mut storage,
        &project.id,
        &report,
        actor,
        summary,
        &diffs,
        applied_at,
    ) {
        Ok(entry) => (true, Some(entry.id), None),
        Err(e) => (
            false,
            None,
            Some(format!("import succeeded, history record failed: {}", e)),
        ),
    };

    Ok(ImportApplied {
        project_id: project.id,
        result,
        summary,
        history_recorded,
        history_id,
        warning,
    })
}

// === Import history ===

#[derive(Debug, Serialize)]
pub struct HistoryList {
    pub project_id: String,
    pub entries: Vec<ImportHistoryEntry>,
}

impl CommandResult for HistoryList {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No imports recorded".to_string();
        }
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{}  {}  ({} created, {} updated, {} unchanged)",
                    e.id, e.title, e.created_count, e.updated_count, e.identical_count
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn history_list(repo_path: &Path, project_ref: &str) -> Result<HistoryList> {
    let storage = Storage::open(repo_path)?;
    let project = storage.find_project(project_ref)?;
    Ok(HistoryList {
        entries: storage.list_import_history(&project.id)?,
        project_id: project.id,
    })
}

#[derive(Debug, Serialize)]
pub struct HistoryShow {
    pub entry: ImportHistoryEntry,
}

impl CommandResult for HistoryShow {
    fn to_human(&self) -> String {
        format!("{}\n\n{}", self.entry.title, self.entry.summary)
    }
}

pub fn history_show(repo_path: &Path, id: &str) -> Result<HistoryShow> {
    crate::storage::validate_id(id, "jh")?;
    let storage = Storage::open(repo_path)?;
    Ok(HistoryShow {
        entry: storage.get_import_history(id)?,
    })
}
