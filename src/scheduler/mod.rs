//! Management of the cleaner's own periodic task entry.
//!
//! The cleaner owns at most one line in the task table, recognised by the
//! trailing [`MARKER`] comment. Installing always removes any existing owned
//! line first, so repeated installs never produce duplicates.

pub mod table;

pub use table::{CrontabTable, FileTable, MemoryTable, TableKind, TaskTable};

use crate::Result;
use serde::Serialize;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Trailing comment identifying lines owned by this tool.
pub const MARKER: &str = "# OpenClaw Session Cleaner";

/// Whether a table line belongs to this tool.
pub fn identify(line: &str) -> bool {
    line.contains(MARKER)
}

/// How often the cleanup runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Frequency {
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[default]
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    Daily,
}

impl Frequency {
    /// Every supported frequency, shortest first.
    pub const ALL: [Frequency; 6] = [
        Frequency::ThirtyMinutes,
        Frequency::Hourly,
        Frequency::TwoHours,
        Frequency::SixHours,
        Frequency::TwelveHours,
        Frequency::Daily,
    ];

    /// Parse a frequency token such as `6h`.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == token.trim())
    }

    /// Parse a token, falling back to hourly for anything unrecognised.
    pub fn from_token_or_default(token: &str) -> Self {
        Self::parse(token).unwrap_or_else(|| {
            tracing::warn!(token, "unrecognised frequency, using 1h");
            Frequency::Hourly
        })
    }

    /// The token form (`30m`, `1h`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::ThirtyMinutes => "30m",
            Frequency::Hourly => "1h",
            Frequency::TwoHours => "2h",
            Frequency::SixHours => "6h",
            Frequency::TwelveHours => "12h",
            Frequency::Daily => "24h",
        }
    }

    /// The five-field cron schedule expression.
    pub fn cron_expression(&self) -> &'static str {
        match self {
            Frequency::ThirtyMinutes => "*/30 * * * *",
            Frequency::Hourly => "0 * * * *",
            Frequency::TwoHours => "0 */2 * * *",
            Frequency::SixHours => "0 */6 * * *",
            Frequency::TwelveHours => "0 */12 * * *",
            Frequency::Daily => "0 0 * * *",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything needed to render the schedule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySpec {
    pub frequency: Frequency,
    /// Directory the job `cd`s into
    pub working_dir: PathBuf,
    /// Program plus any extra arguments placed before `--cleanup`
    pub invocation: Vec<String>,
    /// File that receives the job's stdout and stderr
    pub log_path: PathBuf,
}

impl EntrySpec {
    /// Render the full table line, marker included.
    pub fn line(&self) -> String {
        let invocation: Vec<Cow<'_, str>> =
            self.invocation.iter().map(|arg| shell_quote(arg)).collect();
        format!(
            "{} cd {} && {} --cleanup >> {} 2>&1 {}",
            self.frequency.cron_expression(),
            shell_quote_path(&self.working_dir),
            invocation.join(" "),
            shell_quote_path(&self.log_path),
            MARKER
        )
    }
}

/// Quote a word for `/bin/sh` if it contains anything beyond a safe set.
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:@%+=,~".contains(c));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r"'\''")))
    }
}

fn shell_quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy()).into_owned()
}

/// Outcome of installing the schedule line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallOutcome {
    pub line: String,
    pub frequency: Frequency,
    /// Previously owned lines that were replaced
    pub replaced: usize,
}

/// Install the schedule line, replacing any line this tool already owns.
pub fn install(table: &mut dyn TaskTable, spec: &EntrySpec) -> Result<InstallOutcome> {
    let current = table.read()?;
    let before = current.len();
    let mut lines: Vec<String> = current.into_iter().filter(|l| !identify(l)).collect();
    let replaced = before - lines.len();

    let line = spec.line();
    lines.push(line.clone());
    table.write(&lines)?;

    tracing::info!(table = %table.describe(), replaced, "installed schedule line");
    Ok(InstallOutcome {
        line,
        frequency: spec.frequency,
        replaced,
    })
}

/// Remove every line this tool owns. Returns how many were removed.
///
/// The table is only rewritten when something was removed.
pub fn remove(table: &mut dyn TaskTable) -> Result<usize> {
    let current = table.read()?;
    let before = current.len();
    let lines: Vec<String> = current.into_iter().filter(|l| !identify(l)).collect();
    let removed = before - lines.len();

    if removed > 0 {
        table.write(&lines)?;
        tracing::info!(table = %table.describe(), removed, "removed schedule line");
    }
    Ok(removed)
}

/// Return the owned line, if any.
pub fn query(table: &dyn TaskTable) -> Result<Option<String>> {
    Ok(table.read()?.into_iter().find(|l| identify(l)))
}
