//! Precedence resolution for cleaner settings.
//!
//! [`resolve_config`] is pure: the environment and home directory are passed
//! in, so resolution can be tested without touching the process environment.
//! [`resolve_from_env`] wires it to the real environment.

use crate::scheduler::{Frequency, TableKind};
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Root directory of the OpenClaw data tree.
pub const OPENCLAW_HOME_ENV: &str = "OPENCLAW_HOME";
/// Session store path override.
pub const SESSIONS_PATH_ENV: &str = "OPENCLAW_SESSIONS_PATH";
/// Backup directory override.
pub const BACKUP_DIR_ENV: &str = "OPENCLAW_BACKUP_DIR";
/// Default schedule frequency token.
pub const FREQUENCY_ENV: &str = "CLEANUP_FREQUENCY";
/// Minimum orphan age in minutes (accepted, not applied).
pub const MIN_AGE_ENV: &str = "CLEANUP_MIN_AGE";
/// File the scheduled job appends its output to.
pub const LOG_FILE_ENV: &str = "SESSION_CLEANER_LOG_FILE";
/// JSONL run history path, or `off` to disable.
pub const ACTION_LOG_ENV: &str = "SESSION_CLEANER_ACTION_LOG";
/// Use a plain file as the task table instead of the host crontab.
pub const CRONTAB_FILE_ENV: &str = "SESSION_CLEANER_CRONTAB_FILE";

pub const DEFAULT_MIN_AGE_MINUTES: u64 = 60;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    /// Whether the value was left at its built-in default.
    pub fn is_default(&self) -> bool {
        self.source == ValueSource::Default
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct CleanerConfig {
    pub data_root: Resolved<PathBuf>,
    pub store_path: Resolved<PathBuf>,
    pub backup_dir: Resolved<PathBuf>,
    pub frequency: Resolved<Frequency>,
    /// Reserved: orphans are removed regardless of age
    pub min_age_minutes: Resolved<u64>,
    pub log_path: Resolved<PathBuf>,
    /// `None` when the action log is disabled
    pub action_log: Resolved<Option<PathBuf>>,
    #[serde(serialize_with = "serialize_display")]
    pub table: Resolved<TableKind>,
}

fn serialize_display<S: serde::Serializer>(
    table: &Resolved<TableKind>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    Resolved::new(table.value.to_string(), table.source.clone()).serialize(serializer)
}

impl CleanerConfig {
    pub fn store_path(&self) -> &Path {
        &self.store_path.value
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir.value
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path.value
    }

    pub fn action_log_path(&self) -> Option<&Path> {
        self.action_log.value.as_deref()
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency.value
    }
}

/// Resolve a path setting: CLI flag > env var > default.
fn resolve_path<E>(
    flag: Option<PathBuf>,
    env: &E,
    var: &str,
    default: PathBuf,
    home: Option<&Path>,
) -> Resolved<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(path) = flag {
        return Resolved::new(path, ValueSource::CliFlag);
    }
    match env_value(env, var) {
        Some(value) => Resolved::new(
            expand_home(Path::new(&value), home),
            ValueSource::EnvVar(var.to_string()),
        ),
        None => Resolved::new(default, ValueSource::Default),
    }
}

/// Read a variable, treating empty values as unset.
fn env_value<E>(env: &E, var: &str) -> Option<String>
where
    E: Fn(&str) -> Option<String>,
{
    env(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Expand a leading `~` using `home` (or the real home directory).
fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        let home = home.map(Path::to_path_buf).or_else(dirs::home_dir);
        if let Some(home) = home {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Resolve the configuration.
///
/// `env` looks up environment variables; `home` is the user's home
/// directory, needed only when `OPENCLAW_HOME` is unset.
pub fn resolve_config<E>(
    overrides: ConfigOverrides,
    env: E,
    home: Option<PathBuf>,
) -> Result<CleanerConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let data_root = match env_value(&env, OPENCLAW_HOME_ENV) {
        Some(root) => Resolved::new(
            expand_home(Path::new(&root), home.as_deref()),
            ValueSource::EnvVar(OPENCLAW_HOME_ENV.to_string()),
        ),
        None => {
            let home = home.as_deref().ok_or_else(|| {
                Error::Config(format!(
                    "could not determine home directory; set {}",
                    OPENCLAW_HOME_ENV
                ))
            })?;
            Resolved::new(home.join(".openclaw"), ValueSource::Default)
        }
    };
    let root = data_root.value.clone();

    let store_path = resolve_path(
        overrides.store_path,
        &env,
        SESSIONS_PATH_ENV,
        root.join("agents").join("main").join("sessions").join("sessions.json"),
        home.as_deref(),
    );

    let default_backup_dir = store_path
        .value
        .parent()
        .map(|p| p.join("backups"))
        .unwrap_or_else(|| PathBuf::from("backups"));
    let backup_dir = resolve_path(
        overrides.backup_dir,
        &env,
        BACKUP_DIR_ENV,
        default_backup_dir,
        home.as_deref(),
    );

    let frequency = match env_value(&env, FREQUENCY_ENV) {
        Some(token) => Resolved::new(
            Frequency::from_token_or_default(&token),
            ValueSource::EnvVar(FREQUENCY_ENV.to_string()),
        ),
        None => Resolved::new(Frequency::default(), ValueSource::Default),
    };

    let min_age_minutes = match env_value(&env, MIN_AGE_ENV) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(minutes) => Resolved::new(minutes, ValueSource::EnvVar(MIN_AGE_ENV.to_string())),
            Err(_) => {
                tracing::warn!(
                    value = %raw,
                    "{} is not a whole number of minutes, using {}",
                    MIN_AGE_ENV,
                    DEFAULT_MIN_AGE_MINUTES
                );
                Resolved::new(DEFAULT_MIN_AGE_MINUTES, ValueSource::Default)
            }
        },
        None => Resolved::new(DEFAULT_MIN_AGE_MINUTES, ValueSource::Default),
    };

    let log_path = resolve_path(
        None,
        &env,
        LOG_FILE_ENV,
        root.join("logs").join("session-cleaner.log"),
        home.as_deref(),
    );

    let action_log = match env_value(&env, ACTION_LOG_ENV) {
        Some(value) if is_disabled(&value) => {
            Resolved::new(None, ValueSource::EnvVar(ACTION_LOG_ENV.to_string()))
        }
        Some(value) => Resolved::new(
            Some(expand_home(Path::new(&value), home.as_deref())),
            ValueSource::EnvVar(ACTION_LOG_ENV.to_string()),
        ),
        None => Resolved::new(
            Some(root.join("logs").join("session-cleaner-actions.jsonl")),
            ValueSource::Default,
        ),
    };

    let table = match env_value(&env, CRONTAB_FILE_ENV) {
        Some(path) => Resolved::new(
            TableKind::File(expand_home(Path::new(&path), home.as_deref())),
            ValueSource::EnvVar(CRONTAB_FILE_ENV.to_string()),
        ),
        None => Resolved::new(TableKind::Crontab, ValueSource::Default),
    };

    Ok(CleanerConfig {
        data_root,
        store_path,
        backup_dir,
        frequency,
        min_age_minutes,
        log_path,
        action_log,
        table,
    })
}

/// Resolve the configuration from the process environment.
pub fn resolve_from_env(overrides: ConfigOverrides) -> Result<CleanerConfig> {
    resolve_config(overrides, |var| std::env::var(var).ok(), dirs::home_dir())
}

fn is_disabled(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "off" | "false" | "0" | "no" | "none"
    )
}
