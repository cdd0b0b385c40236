// Shared helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Whether a `python3` interpreter is on PATH
pub fn python_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Path to a file under tests/fixtures
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copy a fixture into `dir` so artifacts land in the temp directory
pub fn stage_fixture(dir: &TempDir, name: &str) -> PathBuf {
    let dest = dir.path().join(name);
    fs::copy(fixture(name), &dest).unwrap();
    dest
}

/// Write `source` to `dir/name`
pub fn write_source(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

/// Check that `path` compiles under python3
pub fn py_compiles(path: &Path) -> bool {
    Command::new("python3")
        .arg("-m")
        .arg("py_compile")
        .arg(path)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
