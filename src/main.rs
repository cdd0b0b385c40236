use anyhow::{Context, Result};
use clap::Parser;
use timeprobe::cli::{Cli, OutputFormat};
use timeprobe::config::AnalysisConfig;
use timeprobe::pipeline::{run_pipeline, PipelineOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber; `RUST_LOG` overrides the default level
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the per-function summary in the requested format
fn print_summary(outcome: &PipelineOutcome, format: OutputFormat) -> Result<()> {
    let Some(summary) = &outcome.summary else {
        return Ok(());
    };
    match format {
        OutputFormat::Text => summary.print_summary(),
        OutputFormat::Json => {
            let json = summary.to_json().context("Failed to render JSON summary")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = AnalysisConfig::from_cli(&args).context("Invalid configuration")?;
    let outcome = run_pipeline(&config)
        .with_context(|| format!("Timing analysis of {} failed", config.target.display()))?;

    info!(
        "Collected {} iteration(s), {} bytes, in {}",
        outcome.report.iterations,
        outcome.report.bytes_written,
        outcome.report.log_path.display()
    );
    print_summary(&outcome, config.format)?;

    Ok(())
}
