//! Storage layer for Jalon data.
//!
//! This module is the default implementation of the engine's two collaborator
//! capabilities, [`MissionStore`] and [`AuditStore`]. Data lives outside the
//! repository at `<data_dir>/jalon/<repo-hash>/`:
//!
//! - JSONL files for append-only data (`projects.jsonl`, `missions.jsonl`,
//!   `import-history.jsonl`) - the latest line per ID wins
//! - SQLite (`cache.db`) for indexed queries and ordering
//!
//! Import history is append-only at both levels: entries are inserted once
//! and never rewritten.

use crate::import::{AuditStore, MissionPatch, MissionStore, NewMission};
use crate::models::{ImportHistoryEntry, Mission, Project};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, params};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Storage manager for a single repository.
#[derive(Debug)]
pub struct Storage {
    /// Root directory for this repository's data
    pub root: PathBuf,
    /// SQLite connection for indexed queries
    conn: Connection,
}

impl Storage {
    /// Open or create storage for the given repository path.
    pub fn open(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::open_at(root)
    }

    /// Open storage rooted under an explicit data directory (DI for tests).
    pub fn open_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_under(repo_path, data_dir);
        Self::open_at(root)
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        if !root.exists() {
            return Err(Error::NotInitialized);
        }

        let conn = Connection::open(root.join("cache.db"))?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Initialize storage for a new repository.
    pub fn init(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::init_at(root)
    }

    /// Initialize storage under an explicit data directory (DI for tests).
    pub fn init_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_under(repo_path, data_dir);
        Self::init_at(root)
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;

        for file in ["projects.jsonl", "missions.jsonl", "import-history.jsonl"] {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        let conn = Connection::open(root.join("cache.db"))?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Check if storage exists for the given repository.
    pub fn exists(repo_path: &Path) -> Result<bool> {
        let root = get_storage_dir(repo_path)?;
        Ok(root.exists() && root.join("cache.db").exists())
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS missions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                estimated_duration TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                position INTEGER NOT NULL DEFAULT 0,
                focus INTEGER NOT NULL DEFAULT 0,
                accumulated_minutes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_missions_project ON missions(project_id);
            CREATE INDEX IF NOT EXISTS idx_missions_status ON missions(status);

            CREATE TABLE IF NOT EXISTS import_history (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_import_history_project
                ON import_history(project_id);

            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Append a serializable record to a JSONL file.
    fn append_jsonl<T: serde::Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let path = self.root.join(file);
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        let json = serde_json::to_string(record)?;
        writeln!(f, "{}", json)?;
        Ok(())
    }

    /// Read the latest JSONL record matching a predicate on the parsed value.
    fn latest_jsonl<T, F>(&self, file: &str, mut matches: F) -> Result<Option<T>>
    where
        T: serde::de::DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let path = self.root.join(file);
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut latest = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(record) = serde_json::from_str::<T>(&line) {
                if matches(&record) {
                    latest = Some(record);
                }
            }
        }
        Ok(latest)
    }

    // === Project Operations ===

    /// Create a new project.
    pub fn create_project(&mut self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("project name cannot be empty".to_string()));
        }

        let project = Project::new(generate_id("jp", name), name.to_string());

        self.append_jsonl("projects.jsonl", &project)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![project.id, project.name, project.created_at.to_rfc3339()],
        )?;

        Ok(project)
    }

    /// Get a project by ID.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.latest_jsonl("projects.jsonl", |p: &Project| p.id == id)?
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
    }

    /// Find a project by ID or exact name.
    pub fn find_project(&self, reference: &str) -> Result<Project> {
        if let Ok(project) = self.get_project(reference) {
            return Ok(project);
        }
        self.list_projects()?
            .into_iter()
            .find(|p| p.name == reference)
            .ok_or_else(|| Error::NotFound(format!("Project not found: {}", reference)))
    }

    /// List all projects, oldest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM projects ORDER BY created_at ASC, id ASC")?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut projects = Vec::new();
        for id in ids {
            if let Ok(project) = self.get_project(&id) {
                projects.push(project);
            }
        }
        Ok(projects)
    }

    // === Mission Operations ===

    /// Cache a mission in SQLite for fast querying.
    fn cache_mission(&self, mission: &Mission) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO missions
            (id, project_id, title, description, estimated_duration, status,
             position, focus, accumulated_minutes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                mission.id,
                mission.project_id,
                mission.title,
                mission.description,
                mission.estimated_duration,
                mission.status.to_string(),
                mission.position,
                mission.focus as i64,
                mission.accumulated_minutes,
                mission.created_at.to_rfc3339(),
                mission.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Persist a mission (new or updated version) to JSONL and the cache.
    fn write_mission(&mut self, mission: &Mission) -> Result<()> {
        self.append_jsonl("missions.jsonl", mission)?;
        self.cache_mission(mission)
    }

    /// Get a mission by ID.
    pub fn get_mission(&self, id: &str) -> Result<Mission> {
        self.latest_jsonl("missions.jsonl", |m: &Mission| m.id == id)?
            .ok_or_else(|| Error::NotFound(format!("Mission not found: {}", id)))
    }

    /// List all missions of a project in store order (position, then age).
    pub fn list_missions(&self, project_id: &str) -> Result<Vec<Mission>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM missions WHERE project_id = ?1
             ORDER BY position ASC, created_at ASC, id ASC",
        )?;
        let ids: Vec<String> = stmt
            .query_map([project_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut missions = Vec::new();
        for id in ids {
            if let Ok(mission) = self.get_mission(&id) {
                missions.push(mission);
            }
        }
        Ok(missions)
    }

    /// Next append position within a project.
    fn next_position(&self, project_id: &str) -> Result<u32> {
        let max: Option<u32> = self.conn.query_row(
            "SELECT MAX(position) FROM missions WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    // === Import History Operations ===

    /// Get an import history entry by ID.
    pub fn get_import_history(&self, id: &str) -> Result<ImportHistoryEntry> {
        self.latest_jsonl("import-history.jsonl", |e: &ImportHistoryEntry| e.id == id)?
            .ok_or_else(|| Error::NotFound(format!("Import history entry not found: {}", id)))
    }

    // === Configuration ===

    /// Get a configuration value.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Set a configuration value.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl MissionStore for Storage {
    fn list_by_project(&self, project_id: &str) -> Result<Vec<Mission>> {
        self.list_missions(project_id)
    }

    fn create_mission(&mut self, project_id: &str, new: NewMission) -> Result<Mission> {
        // Reject creates against a project that does not exist.
        self.get_project(project_id)?;

        let now = Utc::now();
        let mission = Mission {
            id: generate_id("jn", &new.title),
            project_id: project_id.to_string(),
            title: new.title,
            description: new.description,
            estimated_duration: new.estimated_duration,
            status: new.status,
            position: self.next_position(project_id)?,
            focus: new.focus,
            accumulated_minutes: new.accumulated_minutes,
            created_at: now,
            updated_at: now,
        };

        self.write_mission(&mission)?;
        Ok(mission)
    }

    fn update_mission(&mut self, id: &str, patch: MissionPatch) -> Result<()> {
        let mut mission = self.get_mission(id)?;

        if let Some(description) = patch.description {
            mission.description = Some(description);
        }
        if let Some(estimated_duration) = patch.estimated_duration {
            mission.estimated_duration = estimated_duration;
        }
        mission.updated_at = Utc::now();

        self.write_mission(&mission)
    }
}

impl AuditStore for Storage {
    fn insert_import_history(&mut self, entry: &ImportHistoryEntry) -> Result<()> {
        self.append_jsonl("import-history.jsonl", entry)?;
        self.conn.execute(
            "INSERT INTO import_history (id, project_id, title, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.id,
                entry.project_id,
                entry.title,
                entry.created_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn list_import_history(&self, project_id: &str) -> Result<Vec<ImportHistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM import_history WHERE project_id = ?1
             ORDER BY created_at DESC, id ASC",
        )?;
        let ids: Vec<String> = stmt
            .query_map([project_id], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut entries = Vec::new();
        for id in ids {
            if let Ok(entry) = self.get_import_history(&id) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

/// Get the storage directory for a repository.
///
/// `JN_DATA_DIR` overrides the base data directory (used by integration
/// tests); otherwise the platform data dir is used. The repository path is
/// hashed so unrelated checkouts never share state.
fn get_storage_dir(repo_path: &Path) -> Result<PathBuf> {
    let base = match std::env::var_os("JN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?,
    };
    Ok(storage_dir_under(repo_path, &base))
}

/// Storage directory for a repository under an explicit base directory.
fn storage_dir_under(repo_path: &Path, base: &Path) -> PathBuf {
    let canonical = repo_path
        .canonicalize()
        .unwrap_or_else(|_| repo_path.to_path_buf());

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash_hex = format!("{:x}", hasher.finalize());

    base.join("jalon").join(&hash_hex[..12])
}

/// Find the git repository root containing `start`, if any.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.canonicalize().ok()?;
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Project prefix: "jp"
/// - Mission prefix: "jn"
/// - Import history prefix: "jh"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    let Some(suffix) = id.strip_prefix(prefix).and_then(|s| s.strip_prefix('-')) else {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    };

    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiffKind, MissionStatus};
    use crate::test_utils::TestEnv;

    fn new_mission(title: &str, description: Option<&str>, duration: Option<&str>) -> NewMission {
        NewMission {
            title: title.to_string(),
            description: description.map(String::from),
            estimated_duration: duration.map(String::from),
            status: MissionStatus::Pending,
            focus: false,
            accumulated_minutes: 0,
        }
    }

    #[test]
    fn test_init_creates_files() {
        let env = TestEnv::new();
        let storage = env.init_storage();
        for file in ["projects.jsonl", "missions.jsonl", "import-history.jsonl", "cache.db"] {
            assert!(storage.root.join(file).exists(), "missing {file}");
        }
    }

    #[test]
    fn test_open_uninitialized_fails() {
        let env = TestEnv::new();
        let err = Storage::open_with_data_dir(env.path(), env.data_path()).unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }

    #[test]
    fn test_project_create_and_find() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("Site vitrine").unwrap();
        assert!(project.id.starts_with("jp-"));

        assert_eq!(storage.find_project(&project.id).unwrap().name, "Site vitrine");
        assert_eq!(storage.find_project("Site vitrine").unwrap().id, project.id);
        assert!(storage.find_project("nope").is_err());
    }

    #[test]
    fn test_empty_project_name_rejected() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        assert!(matches!(
            storage.create_project("   "),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_mission_create_appends_position() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("P").unwrap();

        let a = storage
            .create_mission(&project.id, new_mission("A", None, None))
            .unwrap();
        let b = storage
            .create_mission(&project.id, new_mission("B", Some("body"), Some("2h")))
            .unwrap();

        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(b.description.as_deref(), Some("body"));

        let listed = storage.list_missions(&project.id).unwrap();
        let titles: Vec<&str> = listed.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[test]
    fn test_mission_create_requires_project() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let err = storage
            .create_mission("jp-dead", new_mission("A", None, None))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_mission_patch_updates_only_present_fields() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("P").unwrap();
        let mission = storage
            .create_mission(&project.id, new_mission("A", Some("old"), Some("1h")))
            .unwrap();

        storage
            .update_mission(
                &mission.id,
                MissionPatch {
                    description: Some("new".to_string()),
                    estimated_duration: None,
                },
            )
            .unwrap();

        let updated = storage.get_mission(&mission.id).unwrap();
        assert_eq!(updated.description.as_deref(), Some("new"));
        // Untouched field keeps its stored value.
        assert_eq!(updated.estimated_duration.as_deref(), Some("1h"));
        assert!(updated.updated_at >= mission.updated_at);

        // Clearing the estimate goes through the inner Option.
        storage
            .update_mission(
                &mission.id,
                MissionPatch {
                    description: None,
                    estimated_duration: Some(None),
                },
            )
            .unwrap();
        let cleared = storage.get_mission(&mission.id).unwrap();
        assert_eq!(cleared.estimated_duration, None);
        assert_eq!(cleared.description.as_deref(), Some("new"));
    }

    #[test]
    fn test_missions_survive_reopen() {
        let env = TestEnv::new();
        let project_id = {
            let mut storage = env.init_storage();
            let project = storage.create_project("P").unwrap();
            storage
                .create_mission(&project.id, new_mission("A", None, None))
                .unwrap();
            project.id
        };

        let storage = env.open_storage();
        let missions = storage.list_missions(&project_id).unwrap();
        assert_eq!(missions.len(), 1);
        assert_eq!(missions[0].title, "A");
    }

    #[test]
    fn test_import_history_round_trip() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        let project = storage.create_project("P").unwrap();

        let entry = ImportHistoryEntry {
            id: generate_id("jh", "seed"),
            project_id: project.id.clone(),
            title: "Roadmap import - P - 2026-03-01".to_string(),
            summary: "1 created".to_string(),
            actor: "marie".to_string(),
            created_count: 1,
            updated_count: 0,
            identical_count: 0,
            total_count: 1,
            changes: vec![crate::models::ChangeRecord {
                kind: DiffKind::Create,
                mission_title: "A".to_string(),
                details: None,
            }],
            created_at: Utc::now(),
        };

        storage.insert_import_history(&entry).unwrap();
        let listed = storage.list_import_history(&project.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, entry.id);
        assert_eq!(listed[0].changes.len(), 1);

        let fetched = storage.get_import_history(&entry.id).unwrap();
        assert_eq!(fetched.summary, "1 created");
    }

    #[test]
    fn test_config_round_trip() {
        let env = TestEnv::new();
        let mut storage = env.init_storage();
        assert_eq!(storage.get_config("command_log_enabled").unwrap(), None);
        storage.set_config("command_log_enabled", "false").unwrap();
        assert_eq!(
            storage.get_config("command_log_enabled").unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_generate_and_validate_id() {
        let id = generate_id("jn", "Setup");
        assert!(validate_id(&id, "jn").is_ok());
        assert!(validate_id("jn-12", "jn").is_err());
        assert!(validate_id("jp-abcd", "jn").is_err());
        assert!(validate_id("jn-wxyz", "jn").is_err());
    }
}
