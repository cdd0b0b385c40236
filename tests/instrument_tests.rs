//! Integration tests for file-level instrumentation

mod utils;

use std::fs;
use std::process::Command;
use tempfile::TempDir;
use timeprobe::instrument::{Instrumenter, ProbePlacement};
use timeprobe::syntax::{function_qualnames, SourceUnit};
use timeprobe::ProbeError;
use utils::{py_compiles, stage_fixture, write_source};

#[test]
fn test_artifact_written_next_to_original() {
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "add.py");

    let artifact = Instrumenter::default().instrument_file(&target).unwrap();
    assert_eq!(artifact.path, dir.path().join("add_instrumented.py"));
    assert_eq!(artifact.functions, vec!["add"]);

    let text = fs::read_to_string(&artifact.path).unwrap();
    assert!(text.starts_with("import time as _tprobe_time\n"));
    assert!(text.contains("print('Function add took:', _tprobe_duration)"));

    // The original is untouched
    assert_eq!(
        fs::read_to_string(&target).unwrap(),
        fs::read_to_string(utils::fixture("add.py")).unwrap()
    );
}

#[test]
fn test_existing_artifact_overwritten() {
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "add.py");
    fs::write(dir.path().join("add_instrumented.py"), "stale = True\n").unwrap();

    let artifact = Instrumenter::default().instrument_file(&target).unwrap();
    let text = fs::read_to_string(artifact.path).unwrap();
    assert!(!text.contains("stale"));
}

#[test]
fn test_missing_target_leaves_no_artifact() {
    let dir = TempDir::new().unwrap();
    let err = Instrumenter::default()
        .instrument_file(&dir.path().join("ghost.py"))
        .unwrap_err();
    assert!(matches!(err, ProbeError::InputNotFound(_)));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_parse_failure_leaves_no_artifact() {
    let dir = TempDir::new().unwrap();
    let target = write_source(&dir, "bad.py", "def oops(\n    return 1\n");

    let err = Instrumenter::default().instrument_file(&target).unwrap_err();
    match err {
        ProbeError::ParseFailure { path, detail } => {
            assert_eq!(path, target);
            assert!(detail.contains("line"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!dir.path().join("bad_instrumented.py").exists());
}

#[test]
fn test_python2_statements_leave_no_artifact() {
    let dir = TempDir::new().unwrap();
    let target = write_source(
        &dir,
        "legacy.py",
        "def f():\n    print \"secret\"\n\nexec \"f()\"\n",
    );

    let err = Instrumenter::default().instrument_file(&target).unwrap_err();
    match err {
        ProbeError::ParseFailure { detail, .. } => {
            assert!(detail.starts_with("line 2, column 5"), "detail: {}", detail);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!dir.path().join("legacy_instrumented.py").exists());
}

#[test]
fn test_every_function_probed_in_realistic_module() {
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "compare.py");

    let artifact = Instrumenter::default().instrument_file(&target).unwrap();
    assert_eq!(
        artifact.functions,
        vec![
            "naive_compare",
            "constant_compare",
            "Vault.__init__",
            "Vault.check",
            "Vault.check.<locals>.normalize",
            "Vault.describe",
            "fetch",
        ]
    );

    let text = fs::read_to_string(&artifact.path).unwrap();
    for name in &artifact.functions {
        let emission = format!("print('Function {} took:', _tprobe_duration)", name);
        assert_eq!(text.matches(&emission).count(), 1, "probe for {}", name);
    }

    // Module docstring and the __future__ import stay ahead of the time import
    let doc = text.find("\"\"\"Secret comparison").unwrap();
    let future = text.find("from __future__ import annotations").unwrap();
    let import = text.find("import time as _tprobe_time").unwrap();
    assert!(doc < future && future < import);

    let reparsed = SourceUnit::parse(&text).unwrap();
    assert_eq!(function_qualnames(reparsed.module()), artifact.functions);
}

#[test]
fn test_enclosing_artifact_reparses() {
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "compare.py");

    let artifact = Instrumenter::new(ProbePlacement::Enclosing)
        .instrument_file(&target)
        .unwrap();
    let text = fs::read_to_string(&artifact.path).unwrap();
    assert_eq!(text.matches("finally:").count(), artifact.functions.len());
    assert!(SourceUnit::parse(&text).is_ok());
}

#[test]
fn test_artifact_compiles_under_python() {
    if !utils::python_available() {
        eprintln!("python3 not found on PATH, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    for fixture in ["add.py", "compare.py"] {
        let target = stage_fixture(&dir, fixture);
        for placement in [ProbePlacement::Prologue, ProbePlacement::Enclosing] {
            let artifact = Instrumenter::new(placement).instrument_file(&target).unwrap();
            assert!(py_compiles(&artifact.path), "{} ({:?})", fixture, placement);
        }
    }
}

#[test]
fn test_instrumented_add_reports_once_per_call() {
    if !utils::python_available() {
        eprintln!("python3 not found on PATH, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let target = stage_fixture(&dir, "add.py");
    let artifact = Instrumenter::default().instrument_file(&target).unwrap();

    let output = Command::new("python3").arg(&artifact.path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Function add took: "));
}

#[test]
fn test_enclosing_measures_every_exit_path() {
    if !utils::python_available() {
        eprintln!("python3 not found on PATH, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let target = write_source(
        &dir,
        "paths.py",
        "def pick(flag):\n    if flag:\n        return 1\n    raise ValueError('no')\n\n\
         pick(True)\ntry:\n    pick(False)\nexcept ValueError:\n    pass\n",
    );
    let artifact = Instrumenter::new(ProbePlacement::Enclosing)
        .instrument_file(&target)
        .unwrap();

    let output = Command::new("python3").arg(&artifact.path).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.matches("Function pick took:").count(), 2);
}

#[test]
fn test_shadowed_print_does_not_break_functions() {
    if !utils::python_available() {
        eprintln!("python3 not found on PATH, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let target = write_source(
        &dir,
        "shadow.py",
        "def f(print=None):\n    return 1\n\n\
         def g():\n    print = str\n    return print(2)\n\n\
         assert f() == 1\nassert g() == '2'\n",
    );

    for placement in [ProbePlacement::Prologue, ProbePlacement::Enclosing] {
        let artifact = Instrumenter::new(placement).instrument_file(&target).unwrap();
        let output = Command::new("python3").arg(&artifact.path).output().unwrap();
        assert!(
            output.status.success(),
            "{:?}: {}",
            placement,
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8(output.stdout).unwrap();
        assert_eq!(stdout.matches("Function f took:").count(), 1);
        assert_eq!(stdout.matches("Function g took:").count(), 1);
    }
}
