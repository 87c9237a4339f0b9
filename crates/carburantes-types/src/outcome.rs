//! Per-date terminal outcomes.

use serde::{Deserialize, Serialize};

use crate::DateKey;

/// Maximum number of characters of diagnostic text kept in an [`Outcome`].
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Truncates a diagnostic message to at most `max_chars` characters.
#[must_use]
pub fn truncate_diagnostic(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// Terminal status of one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutcomeStatus {
    /// The snapshot was fetched, reduced and written.
    Success,
    /// The API answered with an empty station list.
    NoData,
    /// The body was not the expected JSON envelope.
    JsonError,
    /// The API answered with a non-200 status (after retries, if transient).
    HttpError(u16),
    /// Any other failure.
    Error,
}

impl OutcomeStatus {
    /// Returns the status label (`success`, `no_data`, `json_error`,
    /// `http_<code>` or `error`).
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Success => "success".to_string(),
            Self::NoData => "no_data".to_string(),
            Self::JsonError => "json_error".to_string(),
            Self::HttpError(code) => format!("http_{code}"),
            Self::Error => "error".to_string(),
        }
    }

    /// Returns true for statuses that represent a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::JsonError | Self::HttpError(_) | Self::Error)
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl std::str::FromStr for OutcomeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "no_data" => Ok(Self::NoData),
            "json_error" => Ok(Self::JsonError),
            "error" => Ok(Self::Error),
            other => other
                .strip_prefix("http_")
                .and_then(|code| code.parse().ok())
                .map(Self::HttpError)
                .ok_or_else(|| format!("unknown outcome status: {other}")),
        }
    }
}

impl From<OutcomeStatus> for String {
    fn from(status: OutcomeStatus) -> Self {
        status.label()
    }
}

impl TryFrom<String> for OutcomeStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

/// The terminal record produced for exactly one date of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// The date this outcome belongs to.
    pub date: DateKey,
    /// Terminal status.
    pub status: OutcomeStatus,
    /// Number of stations written (zero unless successful).
    pub rows: usize,
    /// Identifier of the written artifact, on success.
    pub output: Option<String>,
    /// Size in bytes of the written artifact, on success.
    pub size_bytes: Option<u64>,
    /// Truncated diagnostic, on failure.
    pub error: Option<String>,
    /// Number of HTTP attempts made for this date.
    pub attempts: u32,
}

impl Outcome {
    fn base(date: DateKey, status: OutcomeStatus, attempts: u32) -> Self {
        Self {
            date,
            status,
            rows: 0,
            output: None,
            size_bytes: None,
            error: None,
            attempts,
        }
    }

    fn with_error(mut self, detail: &str) -> Self {
        self.error = Some(truncate_diagnostic(detail, MAX_DIAGNOSTIC_CHARS));
        self
    }

    /// A successfully written table.
    #[must_use]
    pub fn success(date: DateKey, rows: usize, output: String, size_bytes: u64, attempts: u32) -> Self {
        Self {
            rows,
            output: Some(output),
            size_bytes: Some(size_bytes),
            ..Self::base(date, OutcomeStatus::Success, attempts)
        }
    }

    /// A well-formed but empty response.
    #[must_use]
    pub fn no_data(date: DateKey, attempts: u32) -> Self {
        Self::base(date, OutcomeStatus::NoData, attempts)
    }

    /// A body that could not be decoded.
    #[must_use]
    pub fn json_error(date: DateKey, detail: &str, attempts: u32) -> Self {
        Self::base(date, OutcomeStatus::JsonError, attempts).with_error(detail)
    }

    /// A terminal non-200 response.
    #[must_use]
    pub fn http_error(date: DateKey, status: u16, detail: &str, attempts: u32) -> Self {
        Self::base(date, OutcomeStatus::HttpError(status), attempts).with_error(detail)
    }

    /// Any other terminal failure.
    #[must_use]
    pub fn error(date: DateKey, detail: &str, attempts: u32) -> Self {
        Self::base(date, OutcomeStatus::Error, attempts).with_error(detail)
    }

    /// Returns true if the date was written successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }

    /// Returns the artifact size in KiB rounded to one decimal.
    #[must_use]
    pub fn size_kib(&self) -> Option<f64> {
        self.size_bytes
            .map(|b| (b as f64 / 1024.0 * 10.0).round() / 10.0)
    }
}
