//! Run history for Session Cleaner commands.
//!
//! Every invocation appends one JSON line to the action log. Writing the log
//! never fails a command; problems are reported as warnings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Represents a single action log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "cleanup", "setup", "status")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Append an entry to the action log at `log_path`.
///
/// `None` means the action log is disabled. Errors are reported on stderr
/// and otherwise ignored.
pub fn log_action(
    log_path: Option<&Path>,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let Some(log_path) = log_path else {
        return;
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args,
        success,
        error,
        duration_ms,
        user: get_current_user(),
    };

    if let Err(e) = write_log_entry(log_path, &entry) {
        tracing::warn!(path = %log_path.display(), "failed to write action log: {}", e);
    }
}

/// Find the most recent entry for `command`. A missing log has none.
///
/// Lines that fail to parse are skipped.
pub fn last_action(
    log_path: &Path,
    command: &str,
) -> Result<Option<ActionLog>, Box<dyn std::error::Error>> {
    let text = match fs::read_to_string(log_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(text
        .lines()
        .rev()
        .filter_map(|line| serde_json::from_str::<ActionLog>(line).ok())
        .find(|entry| entry.command == command))
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    // Create parent directories if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Get the current user's username.
fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
