//! Shared helpers for CLI integration tests.
//!
//! Each test gets its own repo directory and data directory; the binary is
//! pointed at them via the working directory and the `JN_DATA_DIR` env var so
//! tests never touch real user data. The command log is disabled for the same
//! reason.

use assert_cmd::Command;
use tempfile::TempDir;

pub struct CliEnv {
    pub repo: TempDir,
    pub data: TempDir,
}

impl CliEnv {
    /// Fresh, uninitialized environment.
    pub fn new() -> Self {
        Self {
            repo: TempDir::new().unwrap(),
            data: TempDir::new().unwrap(),
        }
    }

    /// Fresh environment with `jn system init` already run.
    pub fn initialized() -> Self {
        let env = Self::new();
        env.jn().args(["system", "init"]).assert().success();
        env
    }

    /// A `jn` command wired to this environment.
    pub fn jn(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_jn"));
        cmd.current_dir(self.repo.path())
            .env("JN_DATA_DIR", self.data.path())
            .env("JN_COMMAND_LOG", "off")
            .env_remove("JN_REPO");
        cmd
    }

    /// Initialize, create a project, and return its ID.
    pub fn with_project(name: &str) -> (Self, String) {
        let env = Self::initialized();
        let output = env
            .jn()
            .args(["project", "create", name])
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let id = json["project"]["id"].as_str().unwrap().to_string();
        (env, id)
    }
}
