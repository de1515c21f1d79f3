//! Session Cleaner CLI - prunes orphaned cron run sessions from the OpenClaw session store.

use clap::error::ErrorKind;
use session_cleaner::action_log;
use session_cleaner::cli::{self, Action, Invocation};
use session_cleaner::commands::{self, Output};
use session_cleaner::config::{self, CleanerConfig};
use session_cleaner::scheduler::Frequency;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostic log filter.
const LOG_FILTER_ENV: &str = "SESSION_CLEANER_LOG";

fn main() {
    init_tracing();

    let invocation = match cli::parse_from(env::args_os()) {
        Ok(invocation) => invocation,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return;
        }
        Err(e) => {
            // Unrecognised input shows usage rather than failing
            tracing::debug!("argument error: {}", e);
            println!("{}", cli::help_text());
            return;
        }
    };

    if invocation.action == Action::Help {
        println!("{}", cli::help_text());
        return;
    }

    let Invocation {
        action,
        json,
        overrides,
    } = invocation;

    let config = match config::resolve_from_env(overrides) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, json),
    };

    let args_json = serialize_action(&action);
    let start = Instant::now();

    let result = run_command(&action, &config, json);

    let duration = start.elapsed().as_millis() as u64;
    // A dry run leaves no trace on disk
    if action != Action::DryRun {
        let (success, error) = match &result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        action_log::log_action(
            config.action_log_path(),
            action.name(),
            args_json,
            success,
            error,
            duration,
        );
    }

    if let Err(e) = result {
        exit_with_error(&e, json);
    }
}

/// Install the stderr diagnostic logger. Defaults to warnings only.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(
    action: &Action,
    config: &CleanerConfig,
    json: bool,
) -> Result<(), session_cleaner::Error> {
    let now_ms = chrono::Utc::now().timestamp_millis();

    match action {
        Action::Help => println!("{}", cli::help_text()),

        Action::Cleanup => {
            let result = commands::cleanup(config, false, now_ms)?;
            output(&result, json);
        }

        Action::DryRun => {
            let result = commands::cleanup(config, true, now_ms)?;
            output(&result, json);
        }

        Action::Setup(token) => {
            let frequency = token
                .as_deref()
                .map(Frequency::from_token_or_default)
                .unwrap_or_else(|| config.frequency());
            let exe = env::current_exe().unwrap_or_else(|e| {
                tracing::warn!("could not resolve own executable path: {}", e);
                PathBuf::from("session-cleaner")
            });
            let mut table = config.table.value.open();
            let result = commands::setup(config, table.as_mut(), frequency, &exe);
            output(&result, json);
        }

        Action::Remove => {
            let mut table = config.table.value.open();
            let result = commands::remove(table.as_mut());
            output(&result, json);
        }

        Action::Status => {
            let table = config.table.value.open();
            let result = commands::status(config, table.as_ref(), now_ms);
            output(&result, json);
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, json: bool) {
    if json {
        println!("{}", result.to_json());
    } else {
        println!("{}", result.to_human());
    }
}

fn exit_with_error(e: &session_cleaner::Error, json: bool) -> ! {
    if json {
        let err = serde_json::json!({"error": e.to_string(), "kind": e.kind()});
        eprintln!("{}", err);
    } else {
        eprintln!("Error: {}", e);
    }
    process::exit(1);
}

/// Arguments recorded in the action log.
fn serialize_action(action: &Action) -> serde_json::Value {
    match action {
        Action::Cleanup => serde_json::json!({"dry_run": false}),
        Action::Setup(token) => serde_json::json!({"frequency": token}),
        _ => serde_json::json!({}),
    }
}
