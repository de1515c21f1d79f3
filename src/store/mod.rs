//! Session store persistence.
//!
//! The session store is a single JSON object mapping session keys to session
//! records. Keys are colon-delimited, e.g. `agent:main:cron:<jobId>:run:<runId>`.
//! Only a handful of record fields are interpreted; everything else is carried
//! through untouched when the store is written back.
//!
//! - [`load`] reads and parses the store file
//! - [`write`] persists a store (temp file + rename in the same directory)
//! - [`backup`] copies the store file aside before any mutation

pub mod backup;

pub use backup::{BackupInfo, backup_path_for, create_backup, list_backups};

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// The parsed session store, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStore {
    entries: Map<String, Value>,
}

/// The interpreted fields of one session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// `sessionId`, empty when absent
    pub session_id: String,
    /// `updatedAt` in epoch milliseconds, 0 when absent
    pub updated_at: i64,
    /// `label`, falls back to the session key
    pub label: String,
}

impl SessionRecord {
    /// Read the interpreted fields from a raw record value.
    ///
    /// Records that are not objects, or fields of the wrong type, read as
    /// their defaults.
    pub fn from_value(key: &str, value: &Value) -> Self {
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let updated_at = value
            .get("updatedAt")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0);
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();

        Self {
            session_id,
            updated_at,
            label,
        }
    }
}

impl SessionStore {
    /// Create a store from an already-parsed JSON object.
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    /// Parse store contents. `path` is only used for error reporting.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(Error::Parse {
                path: path.to_path_buf(),
                source: serde::de::Error::custom(format!(
                    "expected a JSON object at the top level, found {}",
                    json_type_name(&other)
                )),
            }),
        }
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over keys in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over entries in file order with their interpreted records.
    pub fn records(&self) -> impl Iterator<Item = (&str, SessionRecord)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), SessionRecord::from_value(key, value)))
    }

    /// Remove every listed key. Returns how many entries were removed.
    pub fn remove_keys<'a, I>(&mut self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let doomed: std::collections::HashSet<&str> = keys.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|key, _| !doomed.contains(key.as_str()));
        before - self.entries.len()
    }

    /// Serialize as pretty-printed JSON (2-space indent) with a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        Ok(json)
    }
}

/// Load the session store from `path`.
///
/// A missing file is [`Error::NotFound`]; malformed contents are [`Error::Parse`].
pub fn load(path: &Path) -> Result<SessionStore> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::NotFound {
                path: path.to_path_buf(),
                source,
            }
        } else {
            Error::Io(source)
        }
    })?;

    let store = SessionStore::parse(path, &bytes)?;
    tracing::debug!(path = %path.display(), entries = store.len(), "loaded session store");
    Ok(store)
}

/// Write the store to `path`, replacing the previous contents.
///
/// The document is written to a temporary file beside `path` and renamed over
/// it, so a failed write leaves the previous store in place.
pub fn write(path: &Path, store: &SessionStore) -> Result<()> {
    let json = store.to_pretty_json()?;
    let write_err = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".sessions-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::debug!(path = %path.display(), entries = store.len(), "wrote session store");
    Ok(())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
