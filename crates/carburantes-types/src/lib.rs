//! Core types for the carburantes fuel price downloader.
//!
//! This crate provides the fundamental data structures used throughout carburantes:
//!
//! - [`DateKey`] - A calendar date in its canonical `dd-mm-yyyy` form
//! - [`DateRange`] - Inclusive range of dates, one fetch unit per day
//! - [`StationTable`] - The station listing of a single date
//! - [`Outcome`] - The terminal result recorded for each date

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod date_range;
mod error;
mod outcome;
mod table;

pub use date_range::{DateIterator, DateKey, DateRange};
pub use error::DateRangeError;
pub use outcome::{MAX_DIAGNOSTIC_CHARS, Outcome, OutcomeStatus, truncate_diagnostic};
pub use table::{Cell, Column, QUERY_DATE_COLUMN, RETRIEVED_AT_COLUMN, StationTable, TableError};
