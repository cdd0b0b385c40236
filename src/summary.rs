//! Per-function timing summary over a finished log
//!
//! Aggregates the `Function <name> took: <seconds>` observations the probes
//! print into call counts and total/mean/min/max durations. The summary is
//! descriptive only: it does not test significance or flag anything.

use crate::error::{ProbeError, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn observation_re() -> &'static Regex {
    static OBSERVATION_RE: OnceLock<Regex> = OnceLock::new();
    OBSERVATION_RE.get_or_init(|| {
        Regex::new(r"^Function (?P<name>\S+) took: (?P<secs>\S+)\s*$")
            .expect("observation regex should compile")
    })
}

/// Statistics for a single function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionTiming {
    /// Number of observations
    pub calls: u64,
    /// Sum of all durations (seconds)
    pub total_secs: f64,
    pub min_secs: f64,
    pub max_secs: f64,
}

impl FunctionTiming {
    pub fn mean_secs(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.total_secs / self.calls as f64
        }
    }
}

/// Aggregated observations keyed by function qualname
#[derive(Debug, Default)]
pub struct TimingSummary {
    functions: BTreeMap<String, FunctionTiming>,
    /// Lines that were not probe observations (program output, noise)
    unparsed_lines: u64,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    function: &'a str,
    calls: u64,
    total_secs: f64,
    mean_secs: f64,
    min_secs: f64,
    max_secs: f64,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    functions: Vec<JsonRow<'a>>,
    unparsed_lines: u64,
}

impl TimingSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation
    pub fn record(&mut self, function: &str, secs: f64) {
        let entry = self
            .functions
            .entry(function.to_string())
            .or_insert_with(|| FunctionTiming {
                calls: 0,
                total_secs: 0.0,
                min_secs: f64::INFINITY,
                max_secs: f64::NEG_INFINITY,
            });
        entry.calls += 1;
        entry.total_secs += secs;
        entry.min_secs = entry.min_secs.min(secs);
        entry.max_secs = entry.max_secs.max(secs);
    }

    /// Parse every line of a log's contents
    pub fn from_log_text(text: &str) -> Self {
        let mut summary = Self::new();
        for line in text.lines() {
            let parsed = observation_re().captures(line).and_then(|caps| {
                let secs = caps["secs"].parse::<f64>().ok()?;
                Some((caps["name"].to_string(), secs))
            });
            match parsed {
                Some((name, secs)) => summary.record(&name, secs),
                None => summary.unparsed_lines += 1,
            }
        }
        summary
    }

    /// Read and parse a log file
    pub fn from_log(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ProbeError::ReadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_log_text(&text))
    }

    pub fn get(&self, function: &str) -> Option<&FunctionTiming> {
        self.functions.get(function)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn unparsed_lines(&self) -> u64 {
        self.unparsed_lines
    }

    /// Functions sorted by total time (descending), ties by name
    fn sorted(&self) -> Vec<(&String, &FunctionTiming)> {
        let mut sorted: Vec<_> = self.functions.iter().collect();
        sorted.sort_by(|a, b| b.1.total_secs.total_cmp(&a.1.total_secs).then(a.0.cmp(b.0)));
        sorted
    }

    /// Print function timing summary to stderr
    pub fn print_summary(&self) {
        if self.functions.is_empty() {
            eprintln!("\nNo timing observations collected.");
            return;
        }

        eprintln!("\n╔════════════════════════════════════════════════════════════════════════════════════════════╗");
        eprintln!("║  Function Timing Summary (sorted by total time)                                           ║");
        eprintln!("╚════════════════════════════════════════════════════════════════════════════════════════════╝");
        eprintln!();
        eprintln!(
            "{:<50} {:>8} {:>12} {:>12} {:>12}",
            "Function", "Calls", "Total", "Mean", "Max"
        );
        eprintln!("{}", "─".repeat(98));

        for (function, timing) in self.sorted() {
            eprintln!(
                "{:<50} {:>8} {:>11.6}s {:>11.6}s {:>11.6}s",
                function,
                timing.calls,
                timing.total_secs,
                timing.mean_secs(),
                timing.max_secs
            );
        }

        eprintln!("{}", "─".repeat(98));
        if self.unparsed_lines > 0 {
            eprintln!("{} non-observation line(s) ignored", self.unparsed_lines);
        }
    }

    /// Render as pretty JSON, sorted like the text summary
    pub fn to_json(&self) -> serde_json::Result<String> {
        let rows = self
            .sorted()
            .into_iter()
            .map(|(function, t)| JsonRow {
                function,
                calls: t.calls,
                total_secs: t.total_secs,
                mean_secs: t.mean_secs(),
                min_secs: t.min_secs,
                max_secs: t.max_secs,
            })
            .collect();
        serde_json::to_string_pretty(&JsonSummary {
            functions: rows,
            unparsed_lines: self.unparsed_lines,
        })
    }
}
