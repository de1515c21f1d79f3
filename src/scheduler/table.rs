//! Task table trait and implementations.
//!
//! This module provides the places the cleaner's schedule line can live:
//! - `CrontabTable` - the host user's crontab, via the `crontab` command (default)
//! - `FileTable` - a plain file holding crontab-formatted lines
//! - `MemoryTable` - an in-memory table for tests

use crate::{Error, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long a `crontab` invocation may run before it is killed.
const CRONTAB_TIMEOUT: Duration = Duration::from_secs(10);

/// Trait for periodic task tables that hold the schedule line.
///
/// A table is read and written whole; callers filter lines themselves.
pub trait TaskTable {
    /// Read every line of the table. An absent table reads as empty.
    fn read(&self) -> Result<Vec<String>>;

    /// Replace the whole table with `lines`.
    fn write(&mut self, lines: &[String]) -> Result<()>;

    /// Describe where the table lives (for display purposes).
    fn describe(&self) -> String;
}

/// Available task table types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    /// The host user's crontab
    Crontab,
    /// A plain file at the given path
    File(PathBuf),
}

impl TableKind {
    /// Open the table this kind refers to.
    pub fn open(&self) -> Box<dyn TaskTable> {
        match self {
            TableKind::Crontab => Box::new(CrontabTable::new()),
            TableKind::File(path) => Box::new(FileTable::new(path)),
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Crontab => write!(f, "crontab"),
            TableKind::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

fn to_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn to_text(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Task table backed by the host `crontab` command.
#[derive(Debug, Clone)]
pub struct CrontabTable {
    program: String,
}

impl CrontabTable {
    /// Use the `crontab` found on `PATH`.
    pub fn new() -> Self {
        Self::with_program("crontab")
    }

    /// Use a specific crontab executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the crontab program with a timeout, optionally feeding stdin.
    ///
    /// stdin is fed and stdout/stderr are drained on helper threads, so a
    /// table larger than a pipe buffer cannot stall the child.
    ///
    /// Returns `(success, stdout, stderr)`.
    fn run(&self, args: &[&str], input: Option<&str>) -> io::Result<(bool, String, String)> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let feeder = match (input, child.stdin.take()) {
            (Some(text), Some(mut stdin)) => {
                let text = text.to_string();
                // stdin drops at the end of the thread so crontab sees EOF
                Some(thread::spawn(move || stdin.write_all(text.as_bytes())))
            }
            _ => None,
        };
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(CRONTAB_TIMEOUT)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("{} timed out after {:?}", self.program, CRONTAB_TIMEOUT),
                ));
            }
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if let Some(feeder) = feeder {
            let fed = feeder
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            match fed {
                Ok(()) => {}
                // A failing crontab may exit before reading its input; stderr says why
                Err(e) if !status.success() => {
                    tracing::debug!("{} closed stdin early: {}", self.program, e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok((status.success(), stdout, stderr))
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<String>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn collect(reader: Option<JoinHandle<io::Result<String>>>) -> io::Result<String> {
    match reader {
        Some(handle) => handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("output reader panicked"))),
        None => Ok(String::new()),
    }
}

impl Default for CrontabTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskTable for CrontabTable {
    fn read(&self) -> Result<Vec<String>> {
        let (ok, stdout, stderr) = self
            .run(&["-l"], None)
            .map_err(|e| Error::SchedulerRead(format!("failed to run {}: {}", self.program, e)))?;

        if ok {
            return Ok(to_lines(&stdout));
        }
        // `crontab -l` exits non-zero when the user has no table yet
        if stderr.to_lowercase().contains("no crontab for") {
            tracing::debug!("no crontab installed for current user");
            return Ok(Vec::new());
        }
        Err(Error::SchedulerRead(stderr.trim().to_string()))
    }

    fn write(&mut self, lines: &[String]) -> Result<()> {
        let (ok, _, stderr) = self
            .run(&["-"], Some(&to_text(lines)))
            .map_err(|e| Error::SchedulerWrite(format!("failed to run {}: {}", self.program, e)))?;

        if ok {
            Ok(())
        } else {
            Err(Error::SchedulerWrite(stderr.trim().to_string()))
        }
    }

    fn describe(&self) -> String {
        format!("{} (current user)", self.program)
    }
}

/// Task table stored in a plain file.
#[derive(Debug, Clone)]
pub struct FileTable {
    path: PathBuf,
}

impl FileTable {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskTable for FileTable {
    fn read(&self) -> Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(to_lines(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::SchedulerRead(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write(&mut self, lines: &[String]) -> Result<()> {
        let write_err = |e: io::Error| Error::SchedulerWrite(format!("{}: {}", self.path.display(), e));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        fs::write(&self.path, to_text(lines)).map_err(write_err)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory task table. Reads and writes can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    pub lines: Vec<String>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: usize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl TaskTable for MemoryTable {
    fn read(&self) -> Result<Vec<String>> {
        if self.fail_reads {
            return Err(Error::SchedulerRead("permission denied".to_string()));
        }
        Ok(self.lines.clone())
    }

    fn write(&mut self, lines: &[String]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::SchedulerWrite("permission denied".to_string()));
        }
        self.lines = lines.to_vec();
        self.writes += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
