//! The per-date pipeline and its bounded worker pool.

use std::sync::Arc;

use carburantes_fetch::{FetchScheduler, Transport, parse_response};
use carburantes_format::TableWriter;
use carburantes_fuels::FuelSelection;
use carburantes_prune::{ColumnPruner, PruneReport};
use carburantes_types::{DateKey, DateRange, Outcome};
use chrono::Local;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use tracing::{info, warn};

use crate::reporter::{DateFailure, ResultReporter};
use crate::shutdown::{SharedShutdown, ShutdownCoordinator};

/// Runs fetch, parse, prune and report for each date of a range.
///
/// Up to `workers` dates are processed concurrently. Each date yields
/// exactly one [`Outcome`]; a failing date never affects the others.
#[derive(Debug)]
pub struct Pipeline<T> {
    scheduler: Arc<FetchScheduler<T>>,
    pruner: Arc<ColumnPruner>,
    selection: Arc<FuelSelection>,
    reporter: ResultReporter,
    shutdown: SharedShutdown,
    workers: usize,
}

impl<T: Transport> Pipeline<T> {
    /// Creates a pipeline with the default pruning rules, an empty fuel
    /// selection and one worker per global concurrency slot.
    #[must_use]
    pub fn new(scheduler: FetchScheduler<T>, writer: Arc<dyn TableWriter>) -> Self {
        let workers = scheduler.config().global_concurrency.max(1);
        Self {
            scheduler: Arc::new(scheduler),
            pruner: Arc::new(ColumnPruner::default()),
            selection: Arc::new(FuelSelection::default()),
            reporter: ResultReporter::new(writer),
            shutdown: ShutdownCoordinator::shared(),
            workers,
        }
    }

    /// Sets the pruner.
    #[must_use]
    pub fn with_pruner(mut self, pruner: ColumnPruner) -> Self {
        self.pruner = Arc::new(pruner);
        self
    }

    /// Sets the fuel types to keep.
    #[must_use]
    pub fn with_selection(mut self, selection: FuelSelection) -> Self {
        self.selection = Arc::new(selection);
        self
    }

    /// Shares a shutdown coordinator with the pipeline.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FetchScheduler<T> {
        &self.scheduler
    }

    /// Returns the shutdown coordinator.
    #[must_use]
    pub const fn shutdown(&self) -> &SharedShutdown {
        &self.shutdown
    }

    /// Streams one outcome per date, in completion order.
    ///
    /// Dates are dispatched in ascending order. Once shutdown is requested
    /// no further date is dispatched; dates already in flight still yield
    /// their outcome.
    pub fn outcome_stream(&self, range: DateRange) -> impl Stream<Item = Outcome> + '_ {
        let shutdown = Arc::clone(&self.shutdown);
        stream::iter(range.dates())
            .take_while(move |_| future::ready(!shutdown.is_shutdown_requested()))
            .map(move |date| self.process_date(date))
            .buffer_unordered(self.workers)
    }

    /// Gives up on dates still waiting for a dispatch slot or a retry.
    ///
    /// Also requests shutdown so no further date is dispatched. HTTP calls
    /// already in flight complete; every abandoned date still yields an
    /// `error` outcome.
    pub fn abandon(&self) {
        self.shutdown.request_shutdown();
        self.scheduler.close();
    }

    /// Runs the whole range and collects the outcomes.
    pub async fn run_all(&self, range: DateRange) -> Vec<Outcome> {
        self.outcome_stream(range).collect().await
    }

    async fn process_date(&self, date: DateKey) -> Outcome {
        let response = match self.scheduler.fetch(date).await {
            Ok(response) => response,
            Err(failure) => {
                let attempts = failure.attempts();
                return self
                    .reporter
                    .report_failure(date, &DateFailure::Fetch(failure), attempts);
            }
        };
        let attempts = response.attempts;

        // Decoding, pruning and writing are CPU and disk bound.
        let pruner = Arc::clone(&self.pruner);
        let selection = Arc::clone(&self.selection);
        let reporter = self.reporter.clone();
        let worker = tokio::task::spawn_blocking(move || {
            let table =
                match parse_response(date, response.status, &response.body, Local::now()) {
                    Ok(table) => table,
                    Err(e) => return reporter.report_failure(date, &DateFailure::Parse(e), attempts),
                };
            drop(response);
            match pruner.prune(table, &selection) {
                Ok((table, report)) => {
                    log_prune_report(date, &report, &selection);
                    reporter.report_table(table, attempts)
                }
                Err(e) => reporter.report_failure(date, &DateFailure::Prune(e), attempts),
            }
        });

        match worker.await {
            Ok(outcome) => outcome,
            Err(e) => self.reporter.report_failure(
                date,
                &DateFailure::Unexpected(format!("worker failed: {e}")),
                attempts,
            ),
        }
    }
}

fn log_prune_report(date: DateKey, report: &PruneReport, selection: &FuelSelection) {
    info!(
        date = %date,
        fuels_available = report.fuels_available,
        unselected_dropped = report.unselected_dropped,
        dropped = report.dropped_count(),
        preserved = ?report.preserved_fuels,
        "Columns pruned"
    );
    if report.preserved_fuels.is_empty() && !selection.is_empty() {
        warn!(date = %date, selected = ?selection.names(), "No selected fuel column found");
    }
}
