//! Execution harness: repeated, sequential runs of the instrumented artifact
//!
//! Every iteration spawns `<interpreter> <artifact>` as its own process and
//! blocks until it exits. Runs never overlap: concurrent runs would compete
//! for CPU and cache and pollute the timings being collected.
//!
//! Stdout of each successful run is appended verbatim to the log. Stderr is
//! kept aside for error reporting. The first failing run aborts the loop and
//! its output is discarded, so after a failure at run `k` the log holds the
//! `k - 1` completed runs.

use crate::error::{ProbeError, Result};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default interpreter used to execute artifacts
pub const DEFAULT_INTERPRETER: &str = "python3";

/// How often a child under a timeout is polled for exit
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Time a child gets to exit after SIGTERM before it is killed
const TERM_GRACE: Duration = Duration::from_millis(500);

/// Settings for one harness run
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Program that executes the artifact (`python3` by default)
    pub interpreter: String,
    pub iterations: u32,
    /// Per-iteration limit; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl HarnessConfig {
    pub fn new(iterations: u32) -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            iterations,
            timeout: None,
        }
    }
}

/// Outcome of a successful harness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub log_path: PathBuf,
    pub iterations: u32,
    pub bytes_written: u64,
}

/// Run `artifact` `config.iterations` times, collecting stdout into `output`
pub fn run_analysis(artifact: &Path, output: &Path, config: &HarnessConfig) -> Result<RunReport> {
    if config.iterations == 0 {
        return Err(ProbeError::ConfigInvalid(
            "Number of iterations must be greater than 0".to_string(),
        ));
    }
    if !artifact.exists() {
        error!("Instrumented file not found: {}", artifact.display());
        return Err(ProbeError::InputNotFound(artifact.to_path_buf()));
    }

    let mut log = File::create(output).map_err(|source| {
        error!("Error opening output file {}: {}", output.display(), source);
        ProbeError::WriteFailure {
            path: output.to_path_buf(),
            source,
        }
    })?;

    let mut bytes_written = 0u64;
    for iteration in 1..=config.iterations {
        info!("Running iteration {}/{}", iteration, config.iterations);

        let stdout = match run_once(artifact, iteration, config) {
            Ok(stdout) => stdout,
            Err(e) => {
                error!("Error during execution: {}", e);
                return Err(e);
            }
        };

        let written = log.write_all(&stdout).and_then(|()| log.flush());
        if let Err(source) = written {
            error!("Error writing to output file {}: {}", output.display(), source);
            drop(log);
            if let Err(e) = fs::remove_file(output) {
                warn!("Could not remove partial log {}: {}", output.display(), e);
            }
            return Err(ProbeError::WriteFailure {
                path: output.to_path_buf(),
                source,
            });
        }
        bytes_written += stdout.len() as u64;
    }

    info!("Analysis completed. Results written to {}", output.display());
    Ok(RunReport {
        log_path: output.to_path_buf(),
        iterations: config.iterations,
        bytes_written,
    })
}

fn command(artifact: &Path, config: &HarnessConfig) -> Command {
    let mut command = Command::new(&config.interpreter);
    command.arg(artifact).stdin(Stdio::null());
    command
}

/// Execute one iteration and return its stdout
fn run_once(artifact: &Path, iteration: u32, config: &HarnessConfig) -> Result<Vec<u8>> {
    let spawn_failure = |source| ProbeError::SpawnFailure {
        program: config.interpreter.clone(),
        source,
    };

    let Some(timeout) = config.timeout else {
        let output = command(artifact, config)
            .output()
            .map_err(spawn_failure)?;
        return finish(iteration, output.status, output.stdout, &output.stderr);
    };

    // Under a timeout the child writes into anonymous temp files, so polling
    // for exit can never stall on a full pipe
    let capture_failure = |source| ProbeError::WriteFailure {
        path: std::env::temp_dir(),
        source,
    };
    let mut stdout_file = tempfile::tempfile().map_err(capture_failure)?;
    let mut stderr_file = tempfile::tempfile().map_err(capture_failure)?;

    let mut child = command(artifact, config)
        .stdout(Stdio::from(
            stdout_file.try_clone().map_err(capture_failure)?,
        ))
        .stderr(Stdio::from(
            stderr_file.try_clone().map_err(capture_failure)?,
        ))
        .spawn()
        .map_err(spawn_failure)?;

    let status = wait_with_deadline(&mut child, Instant::now() + timeout, iteration)?;
    let stdout = read_capture(&mut stdout_file).map_err(capture_failure)?;
    let stderr = read_capture(&mut stderr_file).map_err(capture_failure)?;

    match status {
        Some(status) => finish(iteration, status, stdout, &stderr),
        None => Err(ProbeError::ExecutionFailure {
            iteration,
            reason: format!("timed out after {:.3}s", timeout.as_secs_f64()),
            stderr: String::from_utf8_lossy(&stderr).trim_end().to_string(),
        }),
    }
}

fn finish(iteration: u32, status: ExitStatus, stdout: Vec<u8>, stderr: &[u8]) -> Result<Vec<u8>> {
    if status.success() {
        debug!(iteration, bytes = stdout.len(), "Iteration finished");
        Ok(stdout)
    } else {
        Err(ProbeError::from_status(iteration, status, stderr))
    }
}

fn read_capture(file: &mut File) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Wait for `child` until `deadline`; `None` means it had to be terminated
fn wait_with_deadline(
    child: &mut Child,
    deadline: Instant,
    iteration: u32,
) -> Result<Option<ExitStatus>> {
    let wait_failure = |e: std::io::Error| ProbeError::ExecutionFailure {
        iteration,
        reason: format!("wait failed: {}", e),
        stderr: String::new(),
    };

    loop {
        if let Some(status) = child.try_wait().map_err(wait_failure)? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    warn!("Iteration {} exceeded its timeout, terminating", iteration);
    // Graceful timeout: SIGTERM, short grace period, then SIGKILL
    match i32::try_from(child.id()) {
        Ok(pid) => {
            if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                debug!("SIGTERM to {} failed: {}", pid, e);
            }
        }
        Err(_) => debug!("Child pid {} out of range for signals", child.id()),
    }

    let grace_deadline = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_deadline {
        if child.try_wait().map_err(wait_failure)?.is_some() {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }

    // Already-exited children make kill() fail; the wait below still reaps
    let _ = child.kill();
    child.wait().map_err(wait_failure)?;
    Ok(None)
}
