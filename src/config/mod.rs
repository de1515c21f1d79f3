//! Configuration for Session Cleaner.
//!
//! Configuration is resolved once at startup into a [`CleanerConfig`] and
//! passed to every command. Nothing below `main` reads the environment.
//!
//! ## Settings
//!
//! | Setting | Environment variable | Default |
//! |---|---|---|
//! | data root | `OPENCLAW_HOME` | `~/.openclaw` |
//! | store path | `OPENCLAW_SESSIONS_PATH` | `<root>/agents/main/sessions/sessions.json` |
//! | backup dir | `OPENCLAW_BACKUP_DIR` | `<store dir>/backups` |
//! | frequency | `CLEANUP_FREQUENCY` | `1h` |
//! | min age (minutes) | `CLEANUP_MIN_AGE` | `60` (reserved, not applied) |
//! | job log | `SESSION_CLEANER_LOG_FILE` | `<root>/logs/session-cleaner.log` |
//! | action log | `SESSION_CLEANER_ACTION_LOG` | `<root>/logs/session-cleaner-actions.jsonl` |
//! | task table | `SESSION_CLEANER_CRONTAB_FILE` | host `crontab` |
//!
//! ## Precedence
//!
//! CLI flag > environment variable > built-in default
//!
//! Use the [`resolver`] module for resolution.

pub mod resolver;

pub use resolver::{
    ACTION_LOG_ENV, BACKUP_DIR_ENV, CRONTAB_FILE_ENV, CleanerConfig, ConfigOverrides,
    DEFAULT_MIN_AGE_MINUTES, FREQUENCY_ENV, LOG_FILE_ENV, MIN_AGE_ENV, OPENCLAW_HOME_ENV,
    Resolved, SESSIONS_PATH_ENV, ValueSource, resolve_config, resolve_from_env,
};
