//! carburantes CLI - Historical Spanish fuel price downloader.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::download::DownloadArgs;

#[derive(Parser)]
#[command(name = "carburantes")]
#[command(about = "Historical Spanish fuel price downloader", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output and informational logs)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and prune daily station price snapshots
    Download(Box<DownloadArgs>),

    /// List the fuel types that can be selected
    Fuels {
        /// Show only the basic preset
        #[arg(long)]
        basic: bool,
    },
}

/// Installs the log subscriber. `RUST_LOG` takes precedence over the flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "carburantes=warn",
        (false, 0) => "carburantes=info",
        (false, 1) => "carburantes=debug",
        (false, _) => "carburantes=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Download(args) => commands::download::download(*args, cli.quiet).await,
        Commands::Fuels { basic } => commands::fuels::list_fuels(basic),
    }
}
