//! Mapping of per-date results to outcomes.

use std::sync::Arc;

use carburantes_fetch::{FetchFailure, ParseFailure};
use carburantes_format::{FormatError, TableWriter};
use carburantes_prune::PruneError;
use carburantes_types::{DateKey, Outcome, StationTable, truncate_diagnostic};
use thiserror::Error;
use tracing::{error, info, warn};

/// Characters of diagnostic text kept in log lines.
const LOG_DETAIL_CHARS: usize = 100;

/// Why a date did not produce a written table.
#[derive(Error, Debug)]
pub enum DateFailure {
    /// No final response was obtained.
    #[error(transparent)]
    Fetch(#[from] FetchFailure),

    /// The final response was not a usable station list.
    #[error(transparent)]
    Parse(#[from] ParseFailure),

    /// Pruning failed.
    #[error(transparent)]
    Prune(#[from] PruneError),

    /// The table could not be written.
    #[error("Write failed: {0}")]
    Write(#[from] FormatError),

    /// Anything else, such as a panicked worker.
    #[error("{0}")]
    Unexpected(String),
}

/// Turns each date's result into its [`Outcome`], handing finished tables
/// to the [`TableWriter`].
#[derive(Clone)]
pub struct ResultReporter {
    writer: Arc<dyn TableWriter>,
}

impl std::fmt::Debug for ResultReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultReporter").finish_non_exhaustive()
    }
}

impl ResultReporter {
    /// Creates a reporter writing through `writer`.
    #[must_use]
    pub fn new(writer: Arc<dyn TableWriter>) -> Self {
        Self { writer }
    }

    /// Writes a reduced table and reports its size. The table is consumed;
    /// nothing of its content outlives this call.
    pub fn report_table(&self, table: StationTable, attempts: u32) -> Outcome {
        let date = table.date();
        let rows = table.row_count();
        match self.writer.write(&table) {
            Ok(written) => {
                let outcome = Outcome::success(date, rows, written.name, written.size_bytes, attempts);
                info!(
                    date = %date,
                    rows,
                    size_kib = outcome.size_kib().unwrap_or_default(),
                    output = outcome.output.as_deref().unwrap_or_default(),
                    "Saved"
                );
                outcome
            }
            Err(e) => self.report_failure(date, &DateFailure::Write(e), attempts),
        }
    }

    /// Maps a failure to its terminal outcome and logs it.
    pub fn report_failure(&self, date: DateKey, failure: &DateFailure, attempts: u32) -> Outcome {
        let outcome = match failure {
            DateFailure::Fetch(FetchFailure::RetriesExhausted {
                status,
                body_excerpt,
                ..
            }) => Outcome::http_error(date, *status, body_excerpt, attempts),
            DateFailure::Parse(ParseFailure::Http { status, detail }) => {
                Outcome::http_error(date, *status, detail, attempts)
            }
            DateFailure::Parse(ParseFailure::Decode(detail)) => {
                Outcome::json_error(date, detail, attempts)
            }
            DateFailure::Parse(ParseFailure::Empty) => Outcome::no_data(date, attempts),
            other => Outcome::error(date, &other.to_string(), attempts),
        };

        let detail = truncate_diagnostic(&failure.to_string(), LOG_DETAIL_CHARS);
        if outcome.status.is_failure() {
            error!(date = %date, status = %outcome.status, attempts, "{detail}");
        } else {
            warn!(date = %date, attempts, "No data");
        }
        outcome
    }
}
