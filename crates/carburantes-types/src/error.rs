//! Error types for carburantes.

use chrono::NaiveDate;
use thiserror::Error;

/// Error for invalid date ranges and date expressions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    /// Start date is after end date.
    #[error("Invalid date range: {start} > {end}")]
    InvalidRange {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },

    /// A date is not a valid `dd-mm-yyyy` calendar date.
    #[error("Invalid date '{0}': expected dd-mm-yyyy")]
    InvalidDate(String),

    /// The expression is neither a single date nor a `desde .. hasta ..` range.
    #[error("Invalid date expression '{0}': use dd-mm-yyyy or \"desde dd-mm-yyyy hasta dd-mm-yyyy\"")]
    InvalidExpression(String),
}
