//! Timestamped store backups.
//!
//! Backups are byte-exact copies named `sessions-<epochMillis>.json`. They are
//! created once and never deleted by this tool.

use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const BACKUP_PREFIX: &str = "sessions-";
const BACKUP_SUFFIX: &str = ".json";

/// An existing backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Path a backup taken at `now_ms` would get, before collision handling.
pub fn backup_path_for(backup_dir: &Path, now_ms: i64) -> PathBuf {
    backup_dir.join(format!("{}{}{}", BACKUP_PREFIX, now_ms, BACKUP_SUFFIX))
}

/// Copy `store_path` into `backup_dir`, creating the directory if needed.
///
/// If a backup for the same millisecond already exists a `-<n>` suffix is
/// appended; an existing backup is never overwritten.
pub fn create_backup(store_path: &Path, backup_dir: &Path, now_ms: i64) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir).map_err(|source| Error::Backup {
        path: backup_dir.to_path_buf(),
        source,
    })?;

    let mut target = backup_path_for(backup_dir, now_ms);
    let mut n = 1;
    while target.exists() {
        target = backup_dir.join(format!("{}{}-{}{}", BACKUP_PREFIX, now_ms, n, BACKUP_SUFFIX));
        n += 1;
    }

    fs::copy(store_path, &target).map_err(|source| Error::Backup {
        path: target.clone(),
        source,
    })?;

    tracing::info!(backup = %target.display(), "backed up session store");
    Ok(target)
}

/// List backups in `backup_dir`, oldest first. A missing directory has none.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupInfo>> {
    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with(BACKUP_PREFIX) && name.ends_with(BACKUP_SUFFIX)) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            backups.push(BackupInfo {
                path: entry.path(),
                size_bytes: metadata.len(),
            });
        }
    }

    backups.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(backups)
}
