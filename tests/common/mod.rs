//! Common test utilities for session-cleaner integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never touch the
//! user's real `~/.openclaw` tree or crontab.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// The example store: one main session, one cron job, two finished runs.
pub const REFERENCE_STORE: &str = r#"{
  "agent:main:main": {"sessionId": "m", "updatedAt": 1700000000000},
  "agent:main:cron:J1": {"sessionId": "j", "updatedAt": 1700000000000},
  "agent:main:cron:J1:run:a": {"sessionId": "a", "updatedAt": 1700000000000},
  "agent:main:cron:J1:run:b": {"sessionId": "b"}
}"#;

/// A test environment with an isolated data root and task table.
///
/// `OPENCLAW_HOME` points at a temp directory and the task table is a plain
/// file inside it (`SESSION_CLEANER_CRONTAB_FILE`), set per-command so tests
/// can run in parallel.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    /// Create a new test environment with no store.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment holding `contents` as the session store.
    pub fn with_store(contents: &str) -> Self {
        let env = Self::new();
        env.write_store(contents);
        env
    }

    /// Get a Command for the session-cleaner binary with isolated paths.
    pub fn cleaner(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_session-cleaner"));
        cmd.current_dir(self.root.path());
        cmd.env("OPENCLAW_HOME", self.root.path());
        cmd.env("SESSION_CLEANER_CRONTAB_FILE", self.crontab_path());
        cmd.env_remove("OPENCLAW_SESSIONS_PATH");
        cmd.env_remove("OPENCLAW_BACKUP_DIR");
        cmd.env_remove("CLEANUP_FREQUENCY");
        cmd.env_remove("SESSION_CLEANER_ACTION_LOG");
        cmd.env_remove("SESSION_CLEANER_LOG_FILE");
        cmd
    }

    pub fn store_path(&self) -> PathBuf {
        self.root
            .path()
            .join("agents")
            .join("main")
            .join("sessions")
            .join("sessions.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.store_path().parent().unwrap().join("backups")
    }

    pub fn crontab_path(&self) -> PathBuf {
        self.root.path().join("crontab")
    }

    pub fn action_log_path(&self) -> PathBuf {
        self.root
            .path()
            .join("logs")
            .join("session-cleaner-actions.jsonl")
    }

    pub fn write_store(&self, contents: &str) {
        let path = self.store_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read_store(&self) -> String {
        fs::read_to_string(self.store_path()).unwrap()
    }

    pub fn store_keys(&self) -> Vec<String> {
        let value: serde_json::Value = serde_json::from_str(&self.read_store()).unwrap();
        value.as_object().unwrap().keys().cloned().collect()
    }

    /// Backup files, sorted by name.
    pub fn backups(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = match fs::read_dir(self.backup_dir()) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }

    pub fn crontab_lines(&self) -> Vec<String> {
        read_lines(&self.crontab_path())
    }
}

/// Make `dir` read-only. Returns false if that does not stop writes (as when
/// running as root); callers then skip their checks.
#[cfg(unix)]
pub fn make_read_only(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).unwrap();
    let canary = dir.join(".canary");
    if fs::write(&canary, "").is_ok() {
        fs::remove_file(&canary).unwrap();
        make_writable(dir);
        return false;
    }
    true
}

#[cfg(unix)]
pub fn make_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
