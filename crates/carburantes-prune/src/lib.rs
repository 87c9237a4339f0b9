//! Column pruning for carburantes station tables.
//!
//! [`ColumnPruner::prune`] turns a raw per-date [`StationTable`] into the
//! output schema and reports, for every input column, whether it was kept
//! and why.
//!
//! # Example
//!
//! ```
//! use carburantes_fuels::FuelSelection;
//! use carburantes_prune::{ColumnPruner, PruneRules};
//! use carburantes_types::{DateKey, StationTable};
//!
//! let date = DateKey::parse("01-01-2024").unwrap();
//! let table = StationTable::new(date, chrono::Local::now(), 0);
//! let pruner = ColumnPruner::new(PruneRules::default());
//! let (table, report) = pruner
//!     .prune(table, &FuelSelection::from_list("Gasoleo A"))
//!     .unwrap();
//! assert_eq!(report.dropped_count(), 0);
//! assert!(table.is_empty());
//! ```
//!
//! [`StationTable`]: carburantes_types::StationTable

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/carburantes/carburantes/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod decision;
mod pruner;
mod rules;

pub use decision::{DropReason, KeepReason, PruneDecision, PruneReport, Verdict};
pub use pruner::{ColumnPruner, PruneError, matches_fuel};
pub use rules::{
    FUEL_PRICE_PREFIX, FUNDAMENTAL_COLUMNS, PLACEHOLDER, PruneRules, format_postal_code,
    is_coordinate_column, normalize_coordinate,
};
