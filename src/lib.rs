//! Timeprobe - timing side-channel probe for Python sources
//!
//! This library instruments every function of a Python file with
//! wall-clock timing probes, runs the instrumented artifact repeatedly as
//! isolated child processes, and collects the printed observations into a
//! log for offline analysis.

pub mod cli;
pub mod config;
pub mod dependencies;
pub mod error;
pub mod harness;
pub mod instrument;
pub mod pipeline;
pub mod summary;
pub mod syntax;

pub use error::{ProbeError, Result};
