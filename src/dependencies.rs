//! Presence check for third-party Python analysis tools

use crate::error::{ProbeError, Result};
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use tracing::{debug, error};

/// Tools probed by `--dependency-check`
pub const REQUIRED_TOOLS: &[&str] = &["bandit", "flake8", "pylint", "pyre-check"];

/// Names from `tools` that are neither runnable nor importable
pub fn missing_tools(tools: &[&str], interpreter: &str) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| !tool_available(tool, interpreter))
        .map(|tool| tool.to_string())
        .collect()
}

/// Fail with `DependenciesMissing` unless every required tool is present
pub fn check_dependencies(interpreter: &str) -> Result<()> {
    let missing = missing_tools(REQUIRED_TOOLS, interpreter);
    if missing.is_empty() {
        return Ok(());
    }
    error!("Missing dependencies: {}", missing.join(", "));
    Err(ProbeError::DependenciesMissing(missing))
}

fn tool_available(tool: &str, interpreter: &str) -> bool {
    let status = Command::new(tool)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => true,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found on PATH", tool);
            false
        }
        // Some tools do not answer --version cleanly; fall back to an import
        _ => importable(tool, interpreter),
    }
}

fn importable(tool: &str, interpreter: &str) -> bool {
    let module = tool.replace('-', "_");
    Command::new(interpreter)
        .arg("-c")
        .arg(format!("import {}", module))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
