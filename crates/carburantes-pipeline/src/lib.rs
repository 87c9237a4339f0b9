//! Per-date pipeline for the carburantes fuel price downloader.
//!
//! - [`Pipeline`] - Bounded worker pool running fetch, parse, prune and report
//! - [`ResultReporter`] - Maps each date's result to its [`Outcome`]
//! - [`ShutdownCoordinator`] - Stops dispatching new dates on request
//! - [`RunSummary`] - Merges outcomes once the run is over
//!
//! [`Outcome`]: carburantes_types::Outcome

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod pipeline;
mod reporter;
mod shutdown;
mod summary;

pub use pipeline::Pipeline;
pub use reporter::{DateFailure, ResultReporter};
pub use shutdown::{SharedShutdown, ShutdownCoordinator};
pub use summary::RunSummary;
