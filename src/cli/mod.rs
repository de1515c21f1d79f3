//! CLI argument definitions for Session Cleaner.

use crate::config::ConfigOverrides;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Version string shown by `--version`.
pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SC_GIT_COMMIT"),
    ", built ",
    env!("SC_BUILD_TIMESTAMP"),
    ")"
);

/// Session Cleaner - prunes orphaned cron run sessions from the OpenClaw session store.
///
/// Exactly one action runs per invocation; if several are given, the first wins.
#[derive(Parser, Debug)]
#[command(name = "session-cleaner", args_override_self = true)]
#[command(version = VERSION, about = "Prune orphaned cron run sessions from the OpenClaw session store", long_about = None)]
pub struct Cli {
    /// Remove orphaned run sessions (backs up the store first)
    #[arg(long)]
    pub cleanup: bool,

    /// Show what --cleanup would remove without changing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Schedule --cleanup in crontab (30m, 1h, 2h, 6h, 12h, 24h)
    #[arg(long, value_name = "FREQ", num_args = 0..=1)]
    pub setup: Option<Option<String>>,

    /// Remove the scheduled cleanup from crontab
    #[arg(long)]
    pub remove: bool,

    /// Show schedule state and session counts
    #[arg(long)]
    pub status: bool,

    /// Output JSON instead of a human-readable report
    #[arg(long)]
    pub json: bool,

    /// Session store path (default: ~/.openclaw/agents/main/sessions/sessions.json).
    /// Can also be set via OPENCLAW_SESSIONS_PATH.
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Backup directory (default: `backups` beside the store).
    /// Can also be set via OPENCLAW_BACKUP_DIR.
    #[arg(long = "backup-dir", value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,
}

/// The action selected on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Cleanup,
    DryRun,
    /// Frequency token if one was given
    Setup(Option<String>),
    Remove,
    Status,
}

impl Action {
    /// Name used in the action log.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Help => "help",
            Action::Cleanup => "cleanup",
            Action::DryRun => "dry-run",
            Action::Setup(_) => "setup",
            Action::Remove => "remove",
            Action::Status => "status",
        }
    }
}

/// A parsed command line.
#[derive(Debug)]
pub struct Invocation {
    pub action: Action,
    pub json: bool,
    pub overrides: ConfigOverrides,
}

/// Parse arguments (including the program name).
///
/// Unknown arguments are ignored as long as an action flag is present, so
/// `--cleanup --verbose` still cleans up. Returns clap's error for `--help`,
/// `--version` and for input that names no action or that clap rejects for
/// another reason; the caller decides how to present those.
pub fn parse_from<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let words: Vec<&str> = args.iter().skip(1).filter_map(|a| a.to_str()).collect();

    let cli = match Cli::try_parse_from(args.iter().cloned()) {
        Ok(cli) => cli,
        Err(e) if e.kind() == ErrorKind::UnknownArgument => {
            let action = first_action(&words);
            if action == Action::Help {
                return Err(e);
            }
            tracing::warn!("ignoring unrecognised arguments: {}", e.render().to_string().trim());
            return Ok(Invocation {
                action,
                json: words.contains(&"--json"),
                overrides: ConfigOverrides {
                    store_path: option_value(&words, "--store").map(PathBuf::from),
                    backup_dir: option_value(&words, "--backup-dir").map(PathBuf::from),
                },
            });
        }
        Err(e) => return Err(e),
    };

    Ok(Invocation {
        action: first_action(&words),
        json: cli.json,
        overrides: ConfigOverrides {
            store_path: cli.store,
            backup_dir: cli.backup_dir,
        },
    })
}

/// Split `--name=value` into its parts.
fn split_flag(word: &str) -> (&str, Option<&str>) {
    match word.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (word, None),
    }
}

/// Pick the action flag that appears first on the command line.
///
/// The `--setup` token is taken from that same occurrence, either inline
/// (`--setup=6h`) or as the following word when it is not itself a flag.
fn first_action(words: &[&str]) -> Action {
    for (i, word) in words.iter().enumerate() {
        let action = match split_flag(word) {
            ("--cleanup", _) => Action::Cleanup,
            ("--dry-run", _) => Action::DryRun,
            ("--setup", Some(token)) => Action::Setup(Some(token.to_string())),
            ("--setup", None) => Action::Setup(
                words
                    .get(i + 1)
                    .filter(|next| !next.starts_with('-'))
                    .map(|next| next.to_string()),
            ),
            ("--remove", _) => Action::Remove,
            ("--status", _) => Action::Status,
            _ => continue,
        };
        return action;
    }
    Action::Help
}

/// Value of a `--name VALUE` or `--name=VALUE` option, first occurrence.
fn option_value(words: &[&str], name: &str) -> Option<String> {
    words.iter().enumerate().find_map(|(i, word)| match split_flag(word) {
        (flag, Some(value)) if flag == name => Some(value.to_string()),
        (flag, None) if flag == name => words
            .get(i + 1)
            .filter(|next| !next.starts_with("--"))
            .map(|next| next.to_string()),
        _ => None,
    })
}

/// Rendered usage text.
pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}
