//! Throttled HTTP fetching and response parsing for carburantes.
//!
//! This crate provides the fetch side of the per-date pipeline:
//!
//! - [`url::snapshot_url`] - Builds the API URL for a date
//! - [`ThrottleController`] - Adaptive inter-request delay shared by all fetches
//! - [`FetchScheduler`] - Rate-gated, capped, retrying request dispatch
//! - [`HttpTransport`] - `reqwest` implementation of [`Transport`]
//! - [`parse_response`] - Decodes a response into a station table

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod parse;
mod scheduler;
mod throttle;
pub mod url;

pub use client::{
    ClientConfig, ConfigError, HttpTransport, RawResponse, Transport, TransportError,
    TransportErrorKind,
};
pub use parse::{LIST_FIELD, ParseFailure, parse_response};
pub use scheduler::{FetchFailure, FetchRequest, FetchScheduler, FetchedResponse, RequestState};
pub use throttle::{ThrottleConfig, ThrottleController};
