//! Decoding of snapshot responses into station tables.

use carburantes_types::{DateKey, MAX_DIAGNOSTIC_CHARS, StationTable, truncate_diagnostic};
use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use thiserror::Error;

/// Envelope field holding the station list.
pub const LIST_FIELD: &str = "ListaEESSPrecio";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Why a response did not yield a station table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// The final status was not 200.
    #[error("HTTP {status}: {detail}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        detail: String,
    },

    /// The body is not the expected JSON envelope.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The envelope has no stations.
    #[error("Empty station list")]
    Empty,
}

/// Decodes one date's response.
///
/// The body must be a JSON object whose [`LIST_FIELD`] is an array of
/// objects. A missing, `null` or empty list is [`ParseFailure::Empty`].
/// On success the table carries the query date and retrieval timestamp
/// columns.
///
/// # Errors
///
/// Returns a [`ParseFailure`] classifying the response.
pub fn parse_response(
    date: DateKey,
    status: u16,
    body: &[u8],
    retrieved_at: DateTime<Local>,
) -> Result<StationTable, ParseFailure> {
    if status != 200 {
        return Err(ParseFailure::Http {
            status,
            detail: body_detail(body),
        });
    }

    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let envelope: Value = serde_json::from_slice(body).map_err(|e| decode(&e.to_string()))?;
    let Value::Object(mut envelope) = envelope else {
        return Err(decode("body is not a JSON object"));
    };

    let records = match envelope.remove(LIST_FIELD) {
        None | Some(Value::Null) => return Err(ParseFailure::Empty),
        Some(Value::Array(items)) if items.is_empty() => return Err(ParseFailure::Empty),
        Some(Value::Array(items)) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(decode(&format!(
                    "{LIST_FIELD}[{i}] is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<Map<String, Value>>, _>>()?,
        Some(other) => {
            return Err(decode(&format!("{LIST_FIELD} is not an array: {other}")));
        }
    };

    let mut table = StationTable::from_records(date, retrieved_at, &records);
    table.stamp_metadata();
    Ok(table)
}

fn decode(message: &str) -> ParseFailure {
    ParseFailure::Decode(truncate_diagnostic(message, MAX_DIAGNOSTIC_CHARS))
}

fn body_detail(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        "empty body".to_string()
    } else {
        truncate_diagnostic(text, MAX_DIAGNOSTIC_CHARS)
    }
}
