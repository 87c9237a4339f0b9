//! Display utilities and output formatting for the carburantes CLI.

use anyhow::Result;
use carburantes_lib::prelude::*;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

/// Output format for the per-date tables.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Json,
    Ndjson,
    Parquet,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => Self::Csv,
            Format::Json => Self::Json,
            Format::Ndjson => Self::Ndjson,
            Format::Parquet => Self::Parquet,
        }
    }
}

/// Rough time one date takes at the default pacing.
pub(crate) const SECONDS_PER_DAY_ESTIMATE: u64 = 30;

/// Formats a duration given in seconds as `1h 02m`, `3m 20s` or `45s`.
pub(crate) fn human_duration(seconds: u64) -> String {
    let (hours, minutes, secs) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Progress bar with one tick per finished date.
pub(crate) fn date_progress(total: u64, quiet: bool, message: String) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days ({percent}%) {msg}")?
            .progress_chars("=>-"),
    );
    pb.set_message(message);
    Ok(pb)
}

/// Print the totals of a finished run.
pub(crate) fn print_summary(summary: &RunSummary) {
    println!();
    println!("Requested: {} days", summary.requested);
    println!("  success:    {}", summary.success);
    println!("  no data:    {}", summary.no_data);
    println!("  json error: {}", summary.json_error);
    for (code, count) in &summary.http_error {
        println!("  http {code}:   {count}");
    }
    println!("  error:      {}", summary.error);
    println!(
        "Stations written: {} ({:.1} KiB)",
        summary.total_rows,
        summary.total_bytes as f64 / 1024.0
    );

    if summary.failures() > 0 {
        println!("\nFailed dates:");
        for outcome in summary.failed() {
            println!(
                "  {} {:<10} {}",
                outcome.date,
                outcome.status.label(),
                outcome.error.as_deref().unwrap_or_default()
            );
        }
    }

    if !summary.is_complete() {
        println!(
            "\nInterrupted: {} dates were not processed",
            summary.missing.len()
        );
    }
}
