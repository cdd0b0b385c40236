//! Analysis configuration
//!
//! Values resolve in order: command-line flag, TOML config file, built-in
//! default. Numeric flags given on the command line are validated before the
//! config file or any other file is touched.
//!
//! # Example
//! ```
//! use timeprobe::config::FileConfig;
//!
//! let file = FileConfig::from_toml_str("iterations = 25\nplacement = \"enclosing\"\n").unwrap();
//! assert_eq!(file.iterations, Some(25));
//! ```

use crate::cli::{Cli, OutputFormat};
use crate::error::{ProbeError, Result};
use crate::harness::{HarnessConfig, DEFAULT_INTERPRETER};
use crate::instrument::ProbePlacement;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ITERATIONS: u32 = 100;
pub const DEFAULT_THRESHOLD: f64 = 0.05;
pub const DEFAULT_OUTPUT: &str = "timing_analysis.log";

/// Settings accepted in a TOML config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub iterations: Option<i64>,
    pub threshold: Option<f64>,
    pub output: Option<PathBuf>,
    pub dependency_check: Option<bool>,
    pub placement: Option<ProbePlacement>,
    pub interpreter: Option<String>,
    pub timeout_secs: Option<f64>,
    pub summary: Option<bool>,
    pub format: Option<OutputFormat>,
}

impl FileConfig {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProbeError::InputNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path).map_err(|source| ProbeError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|e| {
            ProbeError::ConfigInvalid(format!("{}: {}", path.display(), e.message()))
        })
    }
}

/// Fully resolved and validated settings for one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub target: PathBuf,
    pub iterations: u32,
    /// Accepted and validated; no computation in the pipeline consumes it
    pub threshold: f64,
    pub output: PathBuf,
    pub dependency_check: bool,
    pub placement: ProbePlacement,
    pub interpreter: String,
    pub timeout: Option<Duration>,
    pub summary: bool,
    pub format: OutputFormat,
}

impl AnalysisConfig {
    /// Defaults for `target`
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            output: PathBuf::from(DEFAULT_OUTPUT),
            dependency_check: false,
            placement: ProbePlacement::default(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            timeout: None,
            summary: false,
            format: OutputFormat::default(),
        }
    }

    /// Resolve command-line flags, loading `--config` if given
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if let Some(iterations) = cli.iterations {
            validate_iterations(iterations)?;
        }
        if let Some(threshold) = cli.threshold {
            validate_threshold(threshold)?;
        }
        if let Some(timeout) = cli.timeout {
            validate_timeout(timeout)?;
        }

        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merge flags over file values over defaults, then validate
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let defaults = Self::new(&cli.target_file);

        let iterations = match cli.iterations.or(file.iterations) {
            Some(n) => validate_iterations(n)?,
            None => defaults.iterations,
        };
        let threshold = validate_threshold(
            cli.threshold
                .or(file.threshold)
                .unwrap_or(defaults.threshold),
        )?;
        let timeout = cli
            .timeout
            .or(file.timeout_secs)
            .map(validate_timeout)
            .transpose()?;

        let interpreter = cli
            .interpreter
            .clone()
            .or(file.interpreter)
            .unwrap_or(defaults.interpreter);

        let config = Self {
            target: defaults.target,
            iterations,
            threshold,
            output: cli.output.clone().or(file.output).unwrap_or(defaults.output),
            dependency_check: cli.dependency_check || file.dependency_check.unwrap_or(false),
            placement: cli.placement.or(file.placement).unwrap_or(defaults.placement),
            interpreter,
            timeout,
            summary: cli.summary || file.summary.unwrap_or(false),
            format: cli.format.or(file.format).unwrap_or(defaults.format),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants every analysis relies on
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ProbeError::ConfigInvalid(
                "Number of iterations must be greater than 0".to_string(),
            ));
        }
        validate_threshold(self.threshold)?;
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(ProbeError::ConfigInvalid(
                    "Timeout must be greater than 0 seconds".to_string(),
                ));
            }
        }
        if self.interpreter.trim().is_empty() {
            return Err(ProbeError::ConfigInvalid(
                "Interpreter must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Harness settings derived from this configuration
    pub fn harness(&self) -> HarnessConfig {
        HarnessConfig {
            interpreter: self.interpreter.clone(),
            iterations: self.iterations,
            timeout: self.timeout,
        }
    }
}

/// Iteration count must be a positive 32-bit value
pub fn validate_iterations(iterations: i64) -> Result<u32> {
    if iterations <= 0 {
        return Err(ProbeError::ConfigInvalid(
            "Number of iterations must be greater than 0".to_string(),
        ));
    }
    u32::try_from(iterations).map_err(|_| {
        ProbeError::ConfigInvalid(format!(
            "Number of iterations must be at most {}",
            u32::MAX
        ))
    })
}

/// Threshold is a fraction in [0, 1]
pub fn validate_threshold(threshold: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(ProbeError::ConfigInvalid(
            "Threshold must be between 0 and 1".to_string(),
        ))
    }
}

/// Timeout is a positive, finite number of seconds
pub fn validate_timeout(secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(ProbeError::ConfigInvalid(
            "Timeout must be greater than 0 seconds".to_string(),
        ));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ProbeError::ConfigInvalid(format!("Invalid timeout {}: {}", secs, e)))
}
