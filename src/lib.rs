//! Session Cleaner - prunes orphaned cron run sessions from an OpenClaw session store.
//!
//! This library provides the core functionality for the `session-cleaner` CLI,
//! including store loading, orphan classification, backups, and management of
//! the tool's own entry in the host's crontab.

pub mod action_log;
pub mod classify;
pub mod cli;
pub mod commands;
pub mod config;
pub mod scheduler;
pub mod store;

use std::path::PathBuf;

/// Library-level error type for Session Cleaner operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Session store not found at {}: {source}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session store at {} is not valid JSON: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to back up session store to {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write session store {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read task table: {0}")]
    SchedulerRead(String),

    #[error("Could not write task table: {0}")]
    SchedulerWrite(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable name of the failure kind, used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::Parse { .. } => "ParseError",
            Error::Backup { .. } => "BackupFailure",
            Error::Write { .. } => "WriteFailure",
            Error::SchedulerRead(_) => "SchedulerReadFailure",
            Error::SchedulerWrite(_) => "SchedulerWriteFailure",
            Error::Config(_) => "ConfigError",
            Error::Io(_) => "IoError",
            Error::Json(_) => "JsonError",
        }
    }
}

/// Result type alias for Session Cleaner operations.
pub type Result<T> = std::result::Result<T, Error>;
