//! Integration tests for the execution harness, using `sh` scripts as artifacts

mod utils;

use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use timeprobe::harness::{run_analysis, HarnessConfig};
use timeprobe::instrument::Instrumenter;
use timeprobe::ProbeError;
use utils::{stage_fixture, write_source};

fn sh(iterations: u32) -> HarnessConfig {
    HarnessConfig {
        interpreter: "sh".to_string(),
        ..HarnessConfig::new(iterations)
    }
}

#[test]
fn test_observations_concatenated_in_iteration_order() {
    let dir = TempDir::new().unwrap();
    let counter = dir.path().join("n");
    let artifact = write_source(
        &dir,
        "counter.sh",
        &format!(
            "n=$(cat '{c}' 2>/dev/null || echo 0)\nn=$((n + 1))\necho $n > '{c}'\necho \"Function f took: $n\"\n",
            c = counter.display()
        ),
    );
    let log = dir.path().join("timing.log");

    let report = run_analysis(&artifact, &log, &sh(4)).unwrap();
    assert_eq!(report.log_path, log);
    assert_eq!(
        fs::read_to_string(&log).unwrap(),
        "Function f took: 1\nFunction f took: 2\nFunction f took: 3\nFunction f took: 4\n"
    );
}

#[test]
fn test_output_without_trailing_newline_is_not_framed() {
    let dir = TempDir::new().unwrap();
    let artifact = write_source(&dir, "raw.sh", "printf ab\n");
    let log = dir.path().join("timing.log");

    run_analysis(&artifact, &log, &sh(3)).unwrap();
    assert_eq!(fs::read_to_string(&log).unwrap(), "ababab");
}

#[test]
fn test_signal_death_is_execution_failure() {
    let dir = TempDir::new().unwrap();
    let artifact = write_source(&dir, "killed.sh", "echo partial\nkill -9 $$\n");
    let log = dir.path().join("timing.log");

    let err = run_analysis(&artifact, &log, &sh(2)).unwrap_err();
    match err {
        ProbeError::ExecutionFailure {
            iteration, reason, ..
        } => {
            assert_eq!(iteration, 1);
            assert!(reason.contains("signal"), "reason: {}", reason);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fs::read_to_string(&log).unwrap(), "");
}

#[test]
fn test_unwritable_log_is_write_failure() {
    let dir = TempDir::new().unwrap();
    let artifact = write_source(&dir, "ok.sh", "echo hi\n");
    let log = dir.path().join("missing-dir").join("timing.log");

    let err = run_analysis(&artifact, &log, &sh(1)).unwrap_err();
    assert!(matches!(err, ProbeError::WriteFailure { .. }));
}

#[test]
fn test_timeout_applies_per_iteration() {
    let dir = TempDir::new().unwrap();
    let artifact = write_source(&dir, "brief.sh", "sleep 0.1\necho done\n");
    let log = dir.path().join("timing.log");
    let config = HarnessConfig {
        timeout: Some(Duration::from_secs(2)),
        ..sh(3)
    };

    let report = run_analysis(&artifact, &log, &config).unwrap();
    assert_eq!(report.iterations, 3);
    assert_eq!(fs::read_to_string(&log).unwrap().lines().count(), 3);
}

#[test]
fn test_instrumented_python_collected() {
    if !utils::python_available() {
        eprintln!("python3 not found on PATH, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "compare.py");
    let artifact = Instrumenter::default().instrument_file(&target).unwrap();
    let log = dir.path().join("timing.log");

    run_analysis(&artifact.path, &log, &HarnessConfig::new(2)).unwrap();

    let text = fs::read_to_string(&log).unwrap();
    // __init__, check, normalize, naive_compare, constant_compare, describe per run
    assert_eq!(text.lines().count(), 12);
    assert_eq!(text.matches("Function Vault.check.<locals>.normalize took:").count(), 2);
}
