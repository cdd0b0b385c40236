//! Error taxonomy for instrumentation and execution
//!
//! Every variant is terminal for the current invocation. Nothing is retried.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by the instrumenter, the harness and config validation
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    ReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {detail}", path.display())]
    ParseFailure { path: PathBuf, detail: String },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailure {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Iteration {iteration} failed ({reason}); stderr: {stderr}")]
    ExecutionFailure {
        iteration: u32,
        reason: String,
        stderr: String,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Missing dependencies: {}", .0.join(", "))]
    DependenciesMissing(Vec<String>),
}

impl ProbeError {
    /// Build an `ExecutionFailure` from a child's exit status
    pub fn from_status(iteration: u32, status: ExitStatus, stderr: &[u8]) -> Self {
        let reason = match status.code() {
            Some(code) => format!("exit code {}", code),
            None => format!("terminated by signal ({})", status),
        };
        ProbeError::ExecutionFailure {
            iteration,
            reason,
            stderr: String::from_utf8_lossy(stderr).trim_end().to_string(),
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, ProbeError>;
