//! CLI argument parsing for timeprobe

use crate::instrument::ProbePlacement;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for the timing summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table on stderr (default)
    #[default]
    Text,
    /// JSON on stdout for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "timeprobe")]
#[command(version)]
#[command(
    about = "Identifies potential timing attack vulnerabilities by analyzing the execution time of code blocks",
    long_about = None
)]
pub struct Cli {
    /// The Python file to analyze
    #[arg(value_name = "TARGET_FILE")]
    pub target_file: PathBuf,

    /// Number of iterations to run for timing analysis (default: 100)
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub iterations: Option<i64>,

    /// Threshold for timing difference, as a fraction in [0, 1] (default: 0.05)
    #[arg(long, value_name = "FRACTION", allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Output file for timing results (default: timing_analysis.log)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Check that bandit, flake8, pylint and pyre-check are installed
    #[arg(long = "dependency-check", alias = "dependency_check")]
    pub dependency_check: bool,

    /// Where probes go inside each function (default: prologue)
    #[arg(long, value_enum, value_name = "MODE")]
    pub placement: Option<ProbePlacement>,

    /// Interpreter used to run the instrumented file (default: python3)
    #[arg(long, value_name = "CMD")]
    pub interpreter: Option<String>,

    /// Per-iteration timeout in seconds (default: none)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// TOML configuration file; command-line flags take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a per-function timing summary after the run
    #[arg(long)]
    pub summary: bool,

    /// Summary format (default: text)
    #[arg(long = "format", value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Enable trace-level logging
    #[arg(long)]
    pub debug: bool,
}
