//! Output formatters for the carburantes fuel price downloader.
//!
//! This crate provides formatters for writing reduced station tables
//! to various output formats:
//!
//! - [`CsvFormatter`] - CSV format
//! - [`JsonFormatter`] - JSON array or NDJSON format
//! - `ParquetFormatter` - Apache Parquet columnar format
//!
//! [`FileTableWriter`] is the [`TableWriter`] used by the CLI: one file per
//! date inside the run directory.

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod delimited;
mod formatter;
mod json;
mod writer;

#[cfg(feature = "parquet")]
mod parquet;

pub use delimited::CsvFormatter;
pub use formatter::{FormatError, OutputFormat, TableFormatter};
pub use json::{JsonFormatter, JsonStyle};
pub use writer::{FileTableWriter, TableWriter, WrittenTable, artifact_name, run_dir_name};

#[cfg(feature = "parquet")]
pub use crate::parquet::ParquetFormatter;
