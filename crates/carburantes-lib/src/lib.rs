//! Library for downloading and reducing historical Spanish fuel price
//! snapshots.
//!
//! This is a facade crate that re-exports functionality from the carburantes
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use carburantes_lib::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let transport = HttpTransport::new(&config)?;
//!     let range: DateRange = "desde 01-01-2024 hasta 07-01-2024".parse()?;
//!
//!     let writer = FileTableWriter::for_range(Path::new("downloads"), &range, OutputFormat::Csv);
//!     let pipeline = Pipeline::new(FetchScheduler::new(transport, config), Arc::new(writer))
//!         .with_selection(FuelSelection::from_list("Gasoleo A, Gasolina 95 E5"));
//!
//!     let outcomes = pipeline.run_all(range).await;
//!     let summary = RunSummary::from_outcomes(&range, &outcomes);
//!     println!("{} of {} days saved", summary.success, summary.requested);
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use carburantes_types::*;

// Re-export the fuel catalog
pub use carburantes_fuels::{FuelCatalog, FuelSelection, FuelType, normalize_fuel_name};

// Re-export fetch functionality
#[cfg(feature = "fetch")]
pub use carburantes_fetch::{
    ClientConfig, ConfigError, FetchFailure, FetchScheduler, FetchedResponse, HttpTransport,
    ParseFailure, RawResponse, ThrottleConfig, ThrottleController, Transport, TransportError,
    parse_response, url,
};

// Re-export pruning
#[cfg(feature = "prune")]
pub use carburantes_prune::{ColumnPruner, PruneError, PruneReport, PruneRules};

// Re-export formatters
#[cfg(feature = "format")]
pub use carburantes_format::{
    CsvFormatter, FileTableWriter, FormatError, JsonFormatter, OutputFormat, TableFormatter,
    TableWriter, WrittenTable,
};

#[cfg(all(feature = "format", feature = "parquet"))]
pub use carburantes_format::ParquetFormatter;

// Re-export the pipeline
#[cfg(feature = "pipeline")]
pub use carburantes_pipeline::{
    DateFailure, Pipeline, ResultReporter, RunSummary, SharedShutdown, ShutdownCoordinator,
};

/// Prelude module for convenient imports.
///
/// ```
/// use carburantes_lib::prelude::*;
/// ```
pub mod prelude {
    pub use carburantes_types::{
        DateKey, DateRange, DateRangeError, Outcome, OutcomeStatus, StationTable,
    };

    pub use carburantes_fuels::{FuelCatalog, FuelSelection};

    #[cfg(feature = "fetch")]
    pub use carburantes_fetch::{ClientConfig, FetchScheduler, HttpTransport, ThrottleConfig};

    #[cfg(feature = "prune")]
    pub use carburantes_prune::{ColumnPruner, PruneRules};

    #[cfg(feature = "format")]
    pub use carburantes_format::{FileTableWriter, OutputFormat, TableWriter};

    #[cfg(feature = "pipeline")]
    pub use carburantes_pipeline::{Pipeline, RunSummary, ShutdownCoordinator};
}
