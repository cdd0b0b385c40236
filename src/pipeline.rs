//! End-to-end analysis: validate, check tools, instrument, execute, summarize

use crate::config::AnalysisConfig;
use crate::dependencies::check_dependencies;
use crate::error::{ProbeError, Result};
use crate::harness::{run_analysis, RunReport};
use crate::instrument::{InstrumentedArtifact, Instrumenter};
use crate::summary::TimingSummary;
use tracing::{error, info};

/// Everything a completed analysis produced
#[derive(Debug)]
pub struct PipelineOutcome {
    pub artifact: InstrumentedArtifact,
    pub report: RunReport,
    /// Present when `config.summary` is set
    pub summary: Option<TimingSummary>,
}

/// Run one analysis described by `config`
///
/// Configuration is validated before any file is read or written. Every
/// failure is terminal; nothing is retried.
pub fn run_pipeline(config: &AnalysisConfig) -> Result<PipelineOutcome> {
    config.validate()?;

    if !config.target.exists() {
        error!("Target file not found: {}", config.target.display());
        return Err(ProbeError::InputNotFound(config.target.clone()));
    }

    if config.dependency_check {
        check_dependencies(&config.interpreter)?;
        info!("All dependencies are installed");
    }

    info!("Starting timing analysis for {}", config.target.display());
    info!("Number of iterations: {}", config.iterations);
    info!("Threshold for timing differences: {}", config.threshold);
    info!("Output file: {}", config.output.display());

    let artifact = Instrumenter::new(config.placement).instrument_file(&config.target)?;
    info!(
        "Instrumented {} function(s) in {}",
        artifact.functions.len(),
        artifact.path.display()
    );

    let report = run_analysis(&artifact.path, &config.output, &config.harness())?;

    let summary = if config.summary {
        Some(TimingSummary::from_log(&report.log_path)?)
    } else {
        None
    };

    Ok(PipelineOutcome {
        artifact,
        report,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_target_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut config = AnalysisConfig::new(dir.path().join("absent.py"));
        config.output = dir.path().join("out.log");

        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, ProbeError::InputNotFound(_)));
        assert!(!config.output.exists());
        assert!(!dir.path().join("absent_instrumented.py").exists());
    }

    #[test]
    fn test_invalid_config_rejected_before_io() {
        let dir = TempDir::new().unwrap();
        let mut config = AnalysisConfig::new(dir.path().join("absent.py"));
        config.output = dir.path().join("out.log");
        config.iterations = 0;

        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigInvalid(_)));
    }

    #[test]
    fn test_parse_failure_stops_before_harness() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("broken.py");
        fs::write(&target, "def broken(:\n    pass\n").unwrap();
        let mut config = AnalysisConfig::new(&target);
        config.output = dir.path().join("out.log");

        let err = run_pipeline(&config).unwrap_err();
        assert!(matches!(err, ProbeError::ParseFailure { .. }));
        assert!(!config.output.exists());
        assert!(!dir.path().join("broken_instrumented.py").exists());
    }

    #[test]
    fn test_runs_artifact_with_configured_interpreter() {
        // `true` accepts the artifact path and exits 0 without output
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("plain.py");
        fs::write(&target, "x = 1\n").unwrap();
        let mut config = AnalysisConfig::new(&target);
        config.output = dir.path().join("out.log");
        config.interpreter = "true".to_string();
        config.iterations = 2;
        config.summary = true;

        let outcome = run_pipeline(&config).unwrap();
        assert_eq!(outcome.report.iterations, 2);
        assert!(outcome.artifact.functions.is_empty());
        assert!(outcome.artifact.path.exists());
        assert!(outcome.summary.unwrap().is_empty());
    }
}
