//! Download command implementation.
//!
//! This module runs the per-date pipeline over a date range and writes one
//! pruned table per date into the run directory.

use crate::display::{
    Format, SECONDS_PER_DAY_ESTIMATE, date_progress, human_duration, print_summary,
};
use anyhow::{Context, Result, bail};
use carburantes_lib::prelude::*;
use carburantes_lib::url::BASE_URL;
use chrono::Local;
use clap::Args;
use futures::StreamExt;
use inquire::Confirm;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Ranges longer than this ask for confirmation.
const CONFIRM_ABOVE_DAYS: usize = 31;

/// Arguments of the `download` command.
#[derive(Args)]
pub(crate) struct DownloadArgs {
    /// Dates to fetch: `dd-mm-yyyy` or `desde dd-mm-yyyy hasta dd-mm-yyyy`
    #[arg(conflicts_with_all = ["start", "end"])]
    dates: Option<String>,

    /// Start date (dd-mm-yyyy). Defaults to 30 days before today.
    #[arg(short, long)]
    start: Option<String>,

    /// End date (dd-mm-yyyy). Defaults to today.
    #[arg(short, long)]
    end: Option<String>,

    /// Fuel types to keep, comma separated (see `carburantes fuels`).
    /// Without this, --basic or --no-fuels the basic preset is kept.
    #[arg(long, value_delimiter = ',')]
    fuels: Vec<String>,

    /// Keep the basic fuel preset, in addition to any --fuels
    #[arg(long)]
    basic: bool,

    /// Keep no price column at all
    #[arg(long, conflicts_with_all = ["fuels", "basic"])]
    no_fuels: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: Format,

    /// Root directory; tables go to carburantes_<start>_<end> inside it
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Also write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Historical snapshot endpoint
    #[arg(long, default_value = BASE_URL)]
    base_url: String,

    /// Maximum requests in flight overall
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Maximum requests in flight per host
    #[arg(long, default_value_t = 2)]
    per_target: usize,

    /// Total HTTP attempts per date, first try included
    #[arg(long, default_value_t = 4)]
    max_attempts: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Delay between requests in seconds
    #[arg(long, default_value_t = 3.0)]
    delay: f64,

    /// Random spread applied to the delay, as a fraction of it
    #[arg(long, default_value_t = 0.5)]
    jitter: f64,

    /// Lower bound of the adaptive delay in seconds
    #[arg(long, default_value_t = 1.0)]
    min_delay: f64,

    /// Upper bound of the adaptive delay in seconds
    #[arg(long, default_value_t = 8.0)]
    max_delay: f64,

    /// Average number of requests the throttle aims to keep in flight
    #[arg(long, default_value_t = 1.5)]
    target_concurrency: f64,

    /// Drop columns whose fraction of empty cells exceeds this
    #[arg(long, default_value_t = 0.8)]
    empty_threshold: f64,

    /// Drop columns whose most common value exceeds this fraction
    #[arg(long, default_value_t = 0.9)]
    constant_threshold: f64,

    /// Skip the confirmation prompt for long ranges
    #[arg(long)]
    yes: bool,
}

impl DownloadArgs {
    fn range(&self) -> Result<DateRange> {
        let today = Local::now().date_naive();
        let range = match &self.dates {
            Some(expr) => expr
                .parse::<DateRange>()
                .with_context(|| format!("Invalid date expression: {expr}"))?,
            None => DateRange::parse_bounds(self.start.as_deref(), self.end.as_deref(), today)
                .context("Invalid date bounds")?,
        };
        Ok(range)
    }

    fn selection(&self) -> FuelSelection {
        if self.no_fuels {
            return FuelSelection::default();
        }
        let explicit = FuelSelection::new(&self.fuels);
        if self.basic || explicit.is_empty() {
            explicit.union(&FuelSelection::basic())
        } else {
            explicit
        }
    }

    fn client_config(&self) -> Result<ClientConfig> {
        let throttle = ThrottleConfig::default()
            .with_base_delay(seconds(self.delay, "--delay")?)
            .with_bounds(
                seconds(self.min_delay, "--min-delay")?,
                seconds(self.max_delay, "--max-delay")?,
            )
            .with_jitter(self.jitter)
            .with_target_concurrency(self.target_concurrency);

        let mut config = ClientConfig::default()
            .with_base_url(self.base_url.as_str())
            .with_concurrency(self.concurrency, self.per_target)
            .with_max_attempts(self.max_attempts)
            .with_throttle(throttle);
        config.timeout = Duration::from_secs(self.timeout);

        config.validate().context("Invalid download settings")?;
        Ok(config)
    }

    fn pruner(&self) -> Result<ColumnPruner> {
        for (flag, value) in [
            ("--empty-threshold", self.empty_threshold),
            ("--constant-threshold", self.constant_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{flag} must be between 0 and 1, got {value}");
            }
        }
        let rules =
            PruneRules::default().with_thresholds(self.empty_threshold, self.constant_threshold);
        Ok(ColumnPruner::new(rules))
    }
}

fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{flag} must be a non-negative number of seconds"))
}

/// Download, prune and write every date of the requested range.
pub(crate) async fn download(args: DownloadArgs, quiet: bool) -> Result<()> {
    let range = args.range()?;
    let selection = args.selection();
    let config = args.client_config()?;
    let pruner = args.pruner()?;

    let days = range.total_days();
    if days > CONFIRM_ABOVE_DAYS && !args.yes {
        let estimate = human_duration(days as u64 * SECONDS_PER_DAY_ESTIMATE);
        let proceed = Confirm::new(&format!(
            "{days} days requested, this may take about {estimate}. Continue?"
        ))
        .with_default(false)
        .prompt()
        .context("Confirmation prompt failed (use --yes to skip it)")?;
        if !proceed {
            println!("Download cancelled.");
            return Ok(());
        }
    }

    let writer = FileTableWriter::for_range(&args.output_dir, &range, args.format.into());
    std::fs::create_dir_all(writer.dir())
        .with_context(|| format!("Cannot create output directory {}", writer.dir().display()))?;
    let out_dir = writer.dir().to_path_buf();

    info!(
        range = %range,
        days,
        fuels = ?selection.names(),
        output = %out_dir.display(),
        "Starting download"
    );

    let transport = HttpTransport::new(&config).context("Failed to build HTTP client")?;
    let pipeline = Arc::new(
        Pipeline::new(FetchScheduler::new(transport, config), Arc::new(writer))
            .with_pruner(pruner)
            .with_selection(selection),
    );

    // First Ctrl-C stops dispatching, a second one abandons dates in flight.
    tokio::spawn({
        let pipeline = Arc::clone(&pipeline);
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Interrupt received, finishing dates in flight (Ctrl-C again to abandon them)");
            pipeline.shutdown().request_shutdown();
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Abandoning dates in flight");
                pipeline.abandon();
            }
        }
    });

    let progress = date_progress(days as u64, quiet, range.to_string())?;
    let mut outcomes = Vec::with_capacity(days);
    let mut stream = std::pin::pin!(pipeline.outcome_stream(range));
    while let Some(outcome) = stream.next().await {
        progress.set_message(format!("{} {}", outcome.date, outcome.status.label()));
        progress.inc(1);
        outcomes.push(outcome);
    }
    progress.finish_and_clear();

    let summary = RunSummary::from_outcomes(&range, &outcomes);
    if !quiet {
        print_summary(&summary);
        println!("Output written to: {}", out_dir.display());
    }

    if let Some(path) = &args.summary {
        let file = File::create(path)
            .with_context(|| format!("Cannot create summary file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .context("Failed to write run summary")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        args: DownloadArgs,
    }

    fn parse(argv: &[&str]) -> Result<DownloadArgs, clap::Error> {
        Cli::try_parse_from(std::iter::once("download").chain(argv.iter().copied()))
            .map(|cli| cli.args)
    }

    #[test]
    fn test_selection_defaults_to_basic_preset() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.selection(), FuelSelection::basic());
    }

    #[test]
    fn test_explicit_fuels_replace_preset() {
        let args = parse(&["--fuels", "Gasoleo A,Biodiesel"]).unwrap();
        let selection = args.selection();
        assert_eq!(selection.len(), 2);
        assert!(selection.contains("biodiesel"));
        assert!(!selection.contains("Gasolina 95 E5"));
    }

    #[test]
    fn test_basic_adds_to_explicit_fuels() {
        let args = parse(&["--fuels", "Biodiesel", "--basic"]).unwrap();
        let selection = args.selection();
        assert!(selection.contains("Biodiesel"));
        assert!(selection.contains("Gasoleo A"));
    }

    #[test]
    fn test_no_fuels_selects_nothing() {
        let args = parse(&["--no-fuels"]).unwrap();
        assert!(args.selection().is_empty());
        assert!(parse(&["--no-fuels", "--fuels", "Gasoleo A"]).is_err());
        assert!(parse(&["--no-fuels", "--basic"]).is_err());
    }
}
