//! Build script for jobsh-repl.
//!
//! Stamps the binary with its source revision, build date, and target triple
//! for `jobsh --version`. `SOURCE_DATE_EPOCH` pins the date for reproducible
//! builds.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};

fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|rev| !rev.is_empty())
}

fn build_date() -> String {
    let pinned = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    pinned.unwrap_or_else(Utc::now).format("%Y-%m-%d").to_string()
}

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    // Source tarballs have no .git to watch.
    let git_dir = Path::new("../../.git");
    if git_dir.exists() {
        println!("cargo:rerun-if-changed={}", git_dir.join("HEAD").display());
        println!("cargo:rerun-if-changed={}", git_dir.join("index").display());
    }

    let revision = git_revision().unwrap_or_else(|| "unknown".to_string());
    let target = std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=JOBSH_GIT_HASH={revision}");
    println!("cargo:rustc-env=JOBSH_BUILD_DATE={}", build_date());
    println!("cargo:rustc-env=JOBSH_BUILD_TARGET={target}");
}
