//! Stamps the binary with where and when it came from.
//!
//! `SC_GIT_COMMIT` and `SC_BUILD_TIMESTAMP` end up in the `--version` string,
//! so a report pasted from a cron log can be tied to a build.

use std::process::Command;

fn main() {
    // New commit or checkout
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    println!("cargo:rustc-env=SC_BUILD_TIMESTAMP={}", timestamp);

    let commit = get_git_commit().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=SC_GIT_COMMIT={}", commit);
}

/// Short hash of HEAD, if this is a git checkout with git on `PATH`.
fn get_git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !hash.is_empty()).then_some(hash)
}
