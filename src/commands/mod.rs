//! Command implementations for the Session Cleaner CLI.
//!
//! Each command returns a result type implementing [`Output`], so `main` can
//! render it either as JSON or as a human-readable report:
//! - `cleanup` - remove orphaned run sessions (or preview with a dry run)
//! - `setup` - install the scheduled cleanup line
//! - `remove` - remove the scheduled cleanup line
//! - `status` - scheduler state plus store counts

use crate::action_log::{self, ActionLog};
use crate::classify::{self, SessionEntry};
use crate::config::CleanerConfig;
use crate::scheduler::{self, EntrySpec, Frequency, TaskTable};
use crate::store::{self, BackupInfo};
use crate::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Number of orphan keys listed in a dry-run preview.
pub const PREVIEW_LIMIT: usize = 10;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json_of<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === Cleanup ===

/// One orphan in a dry-run preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub key: String,
    pub age_minutes: i64,
}

impl From<&SessionEntry> for PreviewEntry {
    fn from(entry: &SessionEntry) -> Self {
        Self {
            key: entry.key.clone(),
            age_minutes: entry.age_minutes(),
        }
    }
}

/// Result of `--cleanup` / `--dry-run`.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResult {
    pub store_path: PathBuf,
    pub dry_run: bool,
    pub total_sessions: usize,
    pub cron_sessions: usize,
    pub orphans_found: usize,
    /// Entries removed, or that would be removed on a dry run
    pub removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// First orphans, dry run only
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<PreviewEntry>,
    /// Orphans not shown in the preview
    #[serde(skip_serializing_if = "is_zero")]
    pub more: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl Output for CleanupResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Session store: {}", self.store_path.display());
        let _ = writeln!(out, "  Total sessions: {}", self.total_sessions);
        let _ = writeln!(out, "  Cron sessions: {}", self.cron_sessions);
        let _ = writeln!(out, "  Orphaned run sessions: {}", self.orphans_found);
        out.push('\n');

        if self.orphans_found == 0 {
            out.push_str("Nothing to clean.");
            return out;
        }

        if self.dry_run {
            let _ = writeln!(
                out,
                "[dry run] Would remove {} orphaned session(s):",
                self.removed
            );
            for entry in &self.preview {
                let _ = writeln!(out, "  - {} ({} min old)", entry.key, entry.age_minutes);
            }
            if self.more > 0 {
                let _ = writeln!(out, "  ... +{} more", self.more);
            }
            out.push_str("No changes made.");
        } else {
            if let Some(backup) = &self.backup_path {
                let _ = writeln!(out, "Backup: {}", backup.display());
            }
            let _ = write!(out, "Removed {} orphaned session(s).", self.removed);
        }
        out
    }
}

/// Remove orphaned run sessions from the store.
///
/// With `dry_run` nothing is written and no backup is taken. When there are
/// no orphans the store is left untouched. Otherwise the store file is backed
/// up first and a failed backup aborts before any write.
pub fn cleanup(config: &CleanerConfig, dry_run: bool, now_ms: i64) -> Result<CleanupResult> {
    let store_path = config.store_path();
    let mut session_store = store::load(store_path)?;
    let classification = classify::classify(&session_store, now_ms);

    let mut result = CleanupResult {
        store_path: store_path.to_path_buf(),
        dry_run,
        total_sessions: classification.total,
        cron_sessions: classification.cron_sessions.len(),
        orphans_found: classification.orphans.len(),
        removed: 0,
        backup_path: None,
        preview: Vec::new(),
        more: 0,
    };

    if classification.orphans.is_empty() {
        tracing::info!("no orphaned sessions found");
        return Ok(result);
    }

    if dry_run {
        result.removed = classification.orphans.len();
        result.preview = classification
            .orphans
            .iter()
            .take(PREVIEW_LIMIT)
            .map(PreviewEntry::from)
            .collect();
        result.more = classification.orphans.len().saturating_sub(PREVIEW_LIMIT);
        return Ok(result);
    }

    let backup = store::create_backup(store_path, config.backup_dir(), now_ms)?;

    let before = session_store.len();
    session_store.remove_keys(classification.orphan_keys());
    store::write(store_path, &session_store)?;

    result.removed = before - session_store.len();
    result.backup_path = Some(backup);
    tracing::info!(removed = result.removed, "cleaned session store");
    Ok(result)
}

// === Setup ===

/// Result of `--setup`. Failure to update the table is not an error; the
/// result carries instructions for adding the line by hand instead.
#[derive(Debug, Clone, Serialize)]
pub struct SetupResult {
    pub installed: bool,
    pub frequency: Frequency,
    pub schedule: String,
    pub line: String,
    pub table: String,
    /// Previously installed lines that were replaced
    pub replaced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Output for SetupResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        if self.installed {
            let verb = if self.replaced > 0 {
                "Updated"
            } else {
                "Installed"
            };
            let _ = writeln!(
                out,
                "{} scheduled cleanup every {} in {}",
                verb, self.frequency, self.table
            );
            let _ = write!(out, "  {}", self.line);
        } else {
            let _ = writeln!(
                out,
                "Warning: could not update {}: {}",
                self.table,
                self.error.as_deref().unwrap_or("unknown error")
            );
            out.push('\n');
            out.push_str("To schedule the cleanup manually, run `crontab -e` and add:\n");
            let _ = writeln!(out, "  Schedule: {} (every {})", self.schedule, self.frequency);
            let _ = write!(out, "  Line:     {}", self.line);
        }
        out
    }
}

/// Build the table line for this installation.
///
/// The job runs `exe` from its own directory. Store and backup locations
/// that were not left at their defaults are passed explicitly, since cron
/// jobs do not inherit the operator's environment.
pub fn entry_spec(config: &CleanerConfig, frequency: Frequency, exe: &Path) -> EntrySpec {
    let working_dir = exe
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut invocation = vec![exe.to_string_lossy().into_owned()];
    if !config.store_path.is_default() {
        invocation.push("--store".to_string());
        invocation.push(config.store_path().to_string_lossy().into_owned());
    }
    if !config.backup_dir.is_default() {
        invocation.push("--backup-dir".to_string());
        invocation.push(config.backup_dir().to_string_lossy().into_owned());
    }

    EntrySpec {
        frequency,
        working_dir,
        invocation,
        log_path: config.log_path().to_path_buf(),
    }
}

/// Install (or replace) the scheduled cleanup line.
pub fn setup(
    config: &CleanerConfig,
    table: &mut dyn TaskTable,
    frequency: Frequency,
    exe: &Path,
) -> SetupResult {
    let spec = entry_spec(config, frequency, exe);

    // The job appends to the log; make sure its directory exists
    if let Some(parent) = config.log_path().parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(dir = %parent.display(), "could not create log directory: {}", e);
        }
    }

    match scheduler::install(table, &spec) {
        Ok(outcome) => SetupResult {
            installed: true,
            frequency,
            schedule: frequency.cron_expression().to_string(),
            line: outcome.line,
            table: table.describe(),
            replaced: outcome.replaced,
            error: None,
        },
        Err(e) => {
            tracing::warn!("failed to install schedule line: {}", e);
            SetupResult {
                installed: false,
                frequency,
                schedule: frequency.cron_expression().to_string(),
                line: spec.line(),
                table: table.describe(),
                replaced: 0,
                error: Some(e.to_string()),
            }
        }
    }
}

// === Remove ===

/// Result of `--remove`.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResult {
    pub removed: usize,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Output for RemoveResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        if let Some(warning) = &self.warning {
            let _ = writeln!(out, "Warning: {}", warning);
        }
        if self.removed > 0 {
            let _ = write!(out, "Removed scheduled cleanup from {}", self.table);
        } else {
            out.push_str("No scheduled cleanup found; nothing to remove.");
        }
        out
    }
}

/// Remove the scheduled cleanup line.
///
/// An unreadable table is reported as a warning: it cannot hold our line.
/// A failed rewrite is also reported as a warning with the line left in place.
pub fn remove(table: &mut dyn TaskTable) -> RemoveResult {
    match scheduler::remove(table) {
        Ok(removed) => RemoveResult {
            removed,
            table: table.describe(),
            warning: None,
        },
        Err(e) => {
            tracing::warn!("failed to remove schedule line: {}", e);
            let warning = match &e {
                Error::SchedulerWrite(_) => format!(
                    "{}; remove the line ending in '{}' with `crontab -e`",
                    e,
                    scheduler::MARKER
                ),
                _ => e.to_string(),
            };
            RemoveResult {
                removed: 0,
                table: table.describe(),
                warning: Some(warning),
            }
        }
    }
}

// === Status ===

/// Scheduler half of the status report.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Store half of the status report.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sessions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_sessions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphans: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of `--status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub scheduler: SchedulerStatus,
    pub store: StoreStatus,
    pub backup_dir: PathBuf,
    pub backups: Vec<BackupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cleanup: Option<ActionLog>,
    pub config: CleanerConfig,
}

impl Output for StatusResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();

        out.push_str("Scheduled cleanup: ");
        match (&self.scheduler.line, &self.scheduler.error) {
            (Some(line), _) => {
                let _ = writeln!(out, "active ({})", self.scheduler.table);
                let _ = writeln!(out, "  {}", line);
            }
            (None, Some(error)) => {
                let _ = writeln!(out, "unknown");
                let _ = writeln!(out, "  Could not read {}: {}", self.scheduler.table, error);
            }
            (None, None) => {
                let _ = writeln!(out, "inactive");
                out.push_str("  Run with --setup [30m|1h|2h|6h|12h|24h] to enable.\n");
            }
        }
        out.push('\n');

        let _ = writeln!(out, "Session store: {}", self.store.path.display());
        match &self.store.error {
            Some(error) => {
                let _ = writeln!(out, "  Unavailable: {}", error);
            }
            None => {
                let _ = writeln!(
                    out,
                    "  Total sessions: {}",
                    self.store.total_sessions.unwrap_or(0)
                );
                let _ = writeln!(
                    out,
                    "  Cron sessions: {}",
                    self.store.cron_sessions.unwrap_or(0)
                );
                let _ = writeln!(
                    out,
                    "  Orphaned run sessions: {}",
                    self.store.orphans.unwrap_or(0)
                );
            }
        }

        let _ = write!(
            out,
            "\nBackups: {} in {}",
            self.backups.len(),
            self.backup_dir.display()
        );
        if let Some(latest) = self.backups.last() {
            let _ = write!(
                out,
                "\n  Latest: {} ({} bytes)",
                latest.path.display(),
                latest.size_bytes
            );
        }

        if let Some(last) = &self.last_cleanup {
            let outcome = if last.success { "ok" } else { "failed" };
            let _ = write!(
                out,
                "\nLast cleanup: {} ({})",
                last.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                outcome
            );
        }

        let config = &self.config;
        let _ = write!(
            out,
            "\n\nConfiguration:\n  store: {} [{}]\n  backups: {} [{}]\n  frequency: {} [{}]\n  min age: {} min [{}] (not applied)\n  job log: {} [{}]",
            config.store_path().display(),
            config.store_path.source,
            config.backup_dir().display(),
            config.backup_dir.source,
            config.frequency(),
            config.frequency.source,
            config.min_age_minutes.value,
            config.min_age_minutes.source,
            config.log_path().display(),
            config.log_path.source,
        );
        out
    }
}

/// Collect scheduler state and store counts. Read-only.
pub fn status(config: &CleanerConfig, table: &dyn TaskTable, now_ms: i64) -> StatusResult {
    let scheduler = match scheduler::query(table) {
        Ok(line) => SchedulerStatus {
            active: line.is_some(),
            line,
            table: table.describe(),
            error: None,
        },
        Err(e) => SchedulerStatus {
            active: false,
            line: None,
            table: table.describe(),
            error: Some(e.to_string()),
        },
    };

    let store_path = config.store_path();
    let store = match store::load(store_path) {
        Ok(session_store) => {
            let classification = classify::classify(&session_store, now_ms);
            StoreStatus {
                path: store_path.to_path_buf(),
                total_sessions: Some(classification.total),
                cron_sessions: Some(classification.cron_sessions.len()),
                orphans: Some(classification.orphans.len()),
                error: None,
            }
        }
        Err(e) => StoreStatus {
            path: store_path.to_path_buf(),
            total_sessions: None,
            cron_sessions: None,
            orphans: None,
            error: Some(e.to_string()),
        },
    };

    let backups = store::list_backups(config.backup_dir()).unwrap_or_else(|e| {
        tracing::warn!("could not list backups: {}", e);
        Vec::new()
    });

    let last_cleanup = config
        .action_log_path()
        .and_then(|path| match action_log::last_action(path, "cleanup") {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("could not read action log: {}", e);
                None
            }
        });

    StatusResult {
        scheduler,
        store,
        backup_dir: config.backup_dir().to_path_buf(),
        backups,
        last_cleanup,
        config: config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigOverrides, resolve_config};
    use crate::scheduler::MemoryTable;
    use std::fs;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000_000;

    const REFERENCE_STORE: &str = r#"{
  "agent:main:main": {"sessionId": "m", "updatedAt": 1699999000000},
  "agent:main:cron:J1": {"sessionId": "j", "updatedAt": 1699999000000},
  "agent:main:cron:J1:run:a": {"sessionId": "a", "updatedAt": 1699999400000},
  "agent:main:cron:J1:run:b": {"sessionId": "b", "updatedAt": 1699999700000}
}"#;

    struct Env {
        dir: TempDir,
        config: CleanerConfig,
    }

    impl Env {
        fn new(store: Option<&str>) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            let config = resolve_config(
                ConfigOverrides::default(),
                |var| (var == "OPENCLAW_HOME").then(|| root.to_string_lossy().into_owned()),
                None,
            )
            .unwrap();
            if let Some(contents) = store {
                let path = config.store_path();
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
            Self { dir, config }
        }

        fn store_text(&self) -> String {
            fs::read_to_string(self.config.store_path()).unwrap()
        }

        fn backup_count(&self) -> usize {
            store::list_backups(self.config.backup_dir()).unwrap().len()
        }
    }

    #[test]
    fn test_cleanup_reference_store() {
        let env = Env::new(Some(REFERENCE_STORE));

        let result = cleanup(&env.config, false, NOW).unwrap();

        assert_eq!(result.total_sessions, 4);
        assert_eq!(result.cron_sessions, 3);
        assert_eq!(result.orphans_found, 2);
        assert_eq!(result.removed, 2);

        let after = store::load(env.config.store_path()).unwrap();
        let keys: Vec<&str> = after.keys().collect();
        assert_eq!(keys, vec!["agent:main:main", "agent:main:cron:J1"]);
    }

    #[test]
    fn test_cleanup_backup_matches_previous_store() {
        let env = Env::new(Some(REFERENCE_STORE));

        let result = cleanup(&env.config, false, NOW).unwrap();

        let backup = result.backup_path.unwrap();
        assert_eq!(
            backup,
            env.config.backup_dir().join(format!("sessions-{}.json", NOW))
        );
        assert_eq!(fs::read_to_string(backup).unwrap(), REFERENCE_STORE);
    }

    #[test]
    fn test_cleanup_twice_removes_nothing_second_time() {
        let env = Env::new(Some(REFERENCE_STORE));
        cleanup(&env.config, false, NOW).unwrap();
        let written = env.store_text();

        let second = cleanup(&env.config, false, NOW + 1).unwrap();

        assert_eq!(second.removed, 0);
        assert_eq!(second.orphans_found, 0);
        assert!(second.backup_path.is_none());
        assert_eq!(env.backup_count(), 1);
        assert_eq!(env.store_text(), written);
        assert!(second.to_human().contains("Nothing to clean."));
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let env = Env::new(Some(REFERENCE_STORE));

        let result = cleanup(&env.config, true, NOW).unwrap();

        assert_eq!(result.removed, 2);
        assert_eq!(env.store_text(), REFERENCE_STORE);
        assert_eq!(env.backup_count(), 0);
        assert_eq!(result.preview.len(), 2);
        // run:a updated 600s before NOW
        assert_eq!(result.preview[0].age_minutes, 10);
        assert_eq!(result.more, 0);
    }

    #[test]
    fn test_dry_run_preview_truncates() {
        let mut entries = Vec::new();
        for i in 0..13 {
            entries.push(format!(r#""agent:a:cron:j:run:{}": {{"updatedAt": {}}}"#, i, NOW));
        }
        let env = Env::new(Some(&format!("{{{}}}", entries.join(","))));

        let result = cleanup(&env.config, true, NOW).unwrap();

        assert_eq!(result.preview.len(), PREVIEW_LIMIT);
        assert_eq!(result.more, 3);
        assert_eq!(result.preview[0].key, "agent:a:cron:j:run:0");
        assert!(result.to_human().contains("+3 more"));
    }

    #[test]
    fn test_cleanup_missing_store() {
        let env = Env::new(None);
        let err = cleanup(&env.config, false, NOW).unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[test]
    fn test_cleanup_malformed_store() {
        let env = Env::new(Some("{\"a\": "));
        let err = cleanup(&env.config, false, NOW).unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert_eq!(env.backup_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_failure_leaves_store_untouched() {
        let mut env = Env::new(Some(REFERENCE_STORE));
        // A regular file where the backup directory should be
        let blocker = env.dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();
        env.config.backup_dir.value = blocker.join("backups");

        let err = cleanup(&env.config, false, NOW).unwrap_err();

        assert_eq!(err.kind(), "BackupFailure");
        assert_eq!(env.store_text(), REFERENCE_STORE);
    }

    /// Make `dir` read-only. Returns false if that does not stop writes
    /// (as when running as root), in which case the caller skips its checks.
    #[cfg(unix)]
    fn make_read_only(dir: &std::path::Path) -> bool {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).unwrap();
        let canary = dir.join(".canary");
        if fs::write(&canary, "").is_ok() {
            fs::remove_file(&canary).unwrap();
            fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
            return false;
        }
        true
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_after_backup_keeps_store() {
        use std::os::unix::fs::PermissionsExt;

        let mut env = Env::new(Some(REFERENCE_STORE));
        env.config.backup_dir.value = env.dir.path().join("elsewhere");
        let sessions_dir = env.config.store_path().parent().unwrap().to_path_buf();
        if !make_read_only(&sessions_dir) {
            return;
        }

        let err = cleanup(&env.config, false, NOW).unwrap_err();
        fs::set_permissions(&sessions_dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(err.kind(), "WriteFailure");
        assert_eq!(env.store_text(), REFERENCE_STORE);
        let backups = store::list_backups(env.config.backup_dir()).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), REFERENCE_STORE);
    }

    #[test]
    fn test_entry_spec_passes_non_default_paths() {
        let mut env = Env::new(None);
        let exe = Path::new("/opt/sc/session-cleaner");

        let spec = entry_spec(&env.config, Frequency::Hourly, exe);
        assert_eq!(spec.invocation, vec!["/opt/sc/session-cleaner"]);
        assert_eq!(spec.working_dir, PathBuf::from("/opt/sc"));

        env.config.store_path = crate::config::Resolved::new(
            PathBuf::from("/data/s.json"),
            crate::config::ValueSource::CliFlag,
        );
        let spec = entry_spec(&env.config, Frequency::Hourly, exe);
        assert_eq!(
            spec.invocation,
            vec!["/opt/sc/session-cleaner", "--store", "/data/s.json"]
        );
    }

    #[test]
    fn test_setup_then_status() {
        let env = Env::new(Some(REFERENCE_STORE));
        let mut table = MemoryTable::new();
        let exe = Path::new("/opt/sc/session-cleaner");

        let result = setup(&env.config, &mut table, Frequency::SixHours, exe);
        assert!(result.installed);
        assert!(result.line.contains("0 */6 * * *"));
        assert!(result.line.ends_with(scheduler::MARKER));
        assert!(env.config.log_path().parent().unwrap().is_dir());

        let report = status(&env.config, &table, NOW);
        assert!(report.scheduler.active);
        assert_eq!(report.scheduler.line.as_deref(), Some(result.line.as_str()));
        assert_eq!(report.store.orphans, Some(2));
        assert_eq!(report.store.cron_sessions, Some(3));

        let human = report.to_human();
        assert!(human.contains("Scheduled cleanup: active"));
        assert!(human.contains(&result.line));
    }

    #[test]
    fn test_setup_twice_keeps_one_line() {
        let env = Env::new(None);
        let mut table = MemoryTable::with_lines(["5 4 * * * other"]);
        let exe = Path::new("/opt/sc/session-cleaner");

        setup(&env.config, &mut table, Frequency::Hourly, exe);
        let second = setup(&env.config, &mut table, Frequency::Daily, exe);

        assert_eq!(second.replaced, 1);
        let owned: Vec<&String> = table.lines.iter().filter(|l| scheduler::identify(l)).collect();
        assert_eq!(owned.len(), 1);
        assert!(owned[0].starts_with("0 0 * * *"));
        assert_eq!(table.lines[0], "5 4 * * * other");
    }

    #[test]
    fn test_setup_write_failure_gives_manual_instructions() {
        let env = Env::new(None);
        let mut table = MemoryTable::new();
        table.fail_writes = true;

        let result = setup(
            &env.config,
            &mut table,
            Frequency::TwoHours,
            Path::new("/opt/sc/session-cleaner"),
        );

        assert!(!result.installed);
        assert_eq!(result.schedule, "0 */2 * * *");
        let human = result.to_human();
        assert!(human.contains("crontab -e"));
        assert!(human.contains(&result.line));
        assert!(human.contains("0 */2 * * *"));
    }

    #[test]
    fn test_remove_results() {
        let mut empty = MemoryTable::new();
        let result = remove(&mut empty);
        assert_eq!(result.removed, 0);
        assert!(result.warning.is_none());

        let mut unreadable = MemoryTable::new();
        unreadable.fail_reads = true;
        let result = remove(&mut unreadable);
        assert_eq!(result.removed, 0);
        assert!(result.warning.is_some());

        let mut table = MemoryTable::with_lines([format!("0 * * * * x {}", scheduler::MARKER)]);
        let result = remove(&mut table);
        assert_eq!(result.removed, 1);
        assert!(table.lines.is_empty());
    }

    #[test]
    fn test_status_without_store_or_schedule() {
        let env = Env::new(None);
        let table = MemoryTable::new();

        let report = status(&env.config, &table, NOW);

        assert!(!report.scheduler.active);
        assert!(report.store.error.is_some());
        assert!(report.backups.is_empty());
        let human = report.to_human();
        assert!(human.contains("Scheduled cleanup: inactive"));
        assert!(human.contains("Unavailable"));
    }

    #[test]
    fn test_cleanup_json_output() {
        let env = Env::new(Some(REFERENCE_STORE));
        let json = cleanup(&env.config, true, NOW).unwrap().to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["removed"], 2);
        assert!(value.get("backup_path").is_none());
    }
}
