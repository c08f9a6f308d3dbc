//! Best-effort logging of CLI invocations.
//!
//! Every `jn` command is appended as one JSONL line to a log file so an
//! import gone wrong can be reconstructed after the fact. Logging must never
//! break a command: every failure here degrades to a warning on stderr.
//!
//! Pasted roadmap text can be large and personal, so string arguments are
//! truncated hard before they reach the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// String arguments longer than this are truncated before logging.
const MAX_ARG_LEN: usize = 120;

/// One logged CLI invocation.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandLogEntry {
    /// When the command ran
    pub timestamp: DateTime<Utc>,

    /// Repository path the command was executed against
    pub repo_path: String,

    /// Command name (e.g., "import apply")
    pub command: String,

    /// Truncated command arguments
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who ran the command
    pub user: String,
}

/// Append one invocation to the command log.
///
/// Disabled when `JN_COMMAND_LOG` is set to `off`, `false` or `0`. The log
/// path defaults to `<data_dir>/jalon/command.log`, honoring the same
/// `JN_DATA_DIR` override as storage; `JN_COMMAND_LOG_PATH` overrides the
/// full path.
pub fn log_command(
    repo_path: &Path,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if !enabled() {
        return;
    }

    let Some(log_path) = log_path() else {
        return;
    };

    let entry = CommandLogEntry {
        timestamp: Utc::now(),
        repo_path: repo_path.to_string_lossy().to_string(),
        command: command.to_string(),
        args: truncate_args(&args),
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_entry(&log_path, &entry) {
        eprintln!("Warning: failed to write command log: {}", e);
    }
}

fn enabled() -> bool {
    match std::env::var("JN_COMMAND_LOG") {
        Ok(v) => !matches!(v.to_lowercase().as_str(), "off" | "false" | "0"),
        Err(_) => true,
    }
}

fn log_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("JN_COMMAND_LOG_PATH") {
        return Some(PathBuf::from(path));
    }
    // Same base directory resolution as storage, so a redirected data dir
    // never leaks log lines into the real one.
    let base = match std::env::var_os("JN_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()?,
    };
    Some(base.join("jalon").join("command.log"))
}

fn write_entry(path: &Path, entry: &CommandLogEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)
}

/// Truncate every string in the argument tree. Roadmap bodies never belong
/// in the log in full.
fn truncate_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_args(v)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(truncate_args).collect())
        }
        serde_json::Value::String(s) => {
            if s.chars().count() > MAX_ARG_LEN {
                let head: String = s.chars().take(MAX_ARG_LEN).collect();
                serde_json::Value::String(format!("{}... ({} chars)", head, s.chars().count()))
            } else {
                args.clone()
            }
        }
        _ => args.clone(),
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
