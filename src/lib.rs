//! Jalon - a roadmap import and reconciliation library for project missions.
//!
//! This library provides the core functionality for the `jn` CLI tool:
//! parsing pasted roadmap text into missions, diffing the parse result
//! against the missions already stored for a project, applying the
//! accepted diff, and keeping an append-only import history.

pub mod cli;
pub mod command_log;
pub mod commands;
pub mod import;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::storage::Storage;

    /// Test environment with isolated storage using dependency injection.
    ///
    /// Storage-layer and engine tests use `TestEnv::new()` + `init_storage()`
    /// so nothing touches the real data directory. Integration tests drive the
    /// binary with a per-subprocess `JN_DATA_DIR` instead.
    pub struct TestEnv {
        /// Simulated repository directory
        pub repo_dir: TempDir,
        /// Isolated data storage directory
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with isolated directories.
        pub fn new() -> Self {
            Self {
                repo_dir: TempDir::new().unwrap(),
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the simulated repository.
        pub fn path(&self) -> &Path {
            self.repo_dir.path()
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize storage for this test environment.
        pub fn init_storage(&self) -> Storage {
            Storage::init_with_data_dir(self.path(), self.data_path()).unwrap()
        }

        /// Open storage for this test environment.
        pub fn open_storage(&self) -> Storage {
            Storage::open_with_data_dir(self.path(), self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Jalon operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Not initialized: run `jn system init` first")]
    NotInitialized,

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A store call failed partway through a bulk apply. Writes that already
    /// succeeded are not rolled back; the counts say how far the apply got.
    #[error(
        "apply aborted at '{title}' after {created} created and {updated} updated \
         of {total} planned operations: {source}"
    )]
    ApplyAborted {
        title: String,
        created: usize,
        updated: usize,
        total: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Jalon operations.
pub type Result<T> = std::result::Result<T, Error>;
