//! After-the-fact aggregation of a run's outcomes.

use std::collections::{BTreeMap, HashSet};

use carburantes_types::{DateKey, DateRange, Outcome, OutcomeStatus};
use serde::Serialize;

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// First requested date.
    pub start: Option<DateKey>,
    /// Last requested date.
    pub end: Option<DateKey>,
    /// Number of dates requested.
    pub requested: usize,
    /// Dates written successfully.
    pub success: usize,
    /// Dates without stations.
    pub no_data: usize,
    /// Dates whose body could not be decoded.
    pub json_error: usize,
    /// Dates with a terminal HTTP error, by status code.
    pub http_error: BTreeMap<u16, usize>,
    /// Dates failing for any other reason.
    pub error: usize,
    /// Stations written across all dates.
    pub total_rows: usize,
    /// Bytes written across all dates.
    pub total_bytes: u64,
    /// Requested dates that never got an outcome (run shut down early).
    pub missing: Vec<DateKey>,
    /// Every outcome, ordered by date.
    pub outcomes: Vec<Outcome>,
}

impl RunSummary {
    /// Merges the outcomes of a run over `range`.
    #[must_use]
    pub fn from_outcomes(range: &DateRange, outcomes: &[Outcome]) -> Self {
        let mut summary = Self {
            start: Some(range.start_key()),
            end: Some(range.end_key()),
            requested: range.total_days(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Success => summary.success += 1,
                OutcomeStatus::NoData => summary.no_data += 1,
                OutcomeStatus::JsonError => summary.json_error += 1,
                OutcomeStatus::HttpError(code) => {
                    *summary.http_error.entry(code).or_default() += 1;
                }
                OutcomeStatus::Error => summary.error += 1,
            }
            summary.total_rows += outcome.rows;
            summary.total_bytes += outcome.size_bytes.unwrap_or(0);
        }

        let seen: HashSet<DateKey> = outcomes.iter().map(|o| o.date).collect();
        summary.missing = range.dates().filter(|d| !seen.contains(d)).collect();

        summary.outcomes = outcomes.to_vec();
        summary.outcomes.sort_by_key(|o| o.date);
        summary
    }

    /// Returns the number of dates that received an outcome.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns the number of failed dates (no-data is not a failure).
    #[must_use]
    pub fn failures(&self) -> usize {
        self.json_error + self.error + self.http_error.values().sum::<usize>()
    }

    /// Returns true if every requested date got an outcome.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Returns the failed outcomes, ordered by date.
    pub fn failed(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| o.status.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_outcomes() {
        let outcomes = vec![
            Outcome::http_error(key("03-01-2024"), 404, "Not Found", 1),
            Outcome::success(key("01-01-2024"), 10, "a.csv".into(), 1000, 1),
            Outcome::success(key("02-01-2024"), 12, "b.csv".into(), 1200, 2),
            Outcome::no_data(key("04-01-2024"), 1),
        ];
        let summary = RunSummary::from_outcomes(&range(), &outcomes);

        assert_eq!(summary.requested, 5);
        assert_eq!(summary.success, 2);
        assert_eq!(summary.no_data, 1);
        assert_eq!(summary.http_error.get(&404), Some(&1));
        assert_eq!(summary.total_rows, 22);
        assert_eq!(summary.total_bytes, 2200);
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.missing, [key("05-01-2024")]);
        assert!(!summary.is_complete());
        assert_eq!(summary.outcomes[0].date, key("01-01-2024"));
        assert_eq!(summary.failed().count(), 1);
    }

    #[test]
    fn test_serializes_http_errors_by_code() {
        let outcomes = vec![Outcome::http_error(key("01-01-2024"), 503, "busy", 4)];
        let summary = RunSummary::from_outcomes(&range(), &outcomes);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["http_error"]["503"], 1);
        assert_eq!(json["start"], "01-01-2024");
        assert_eq!(json["missing"].as_array().unwrap().len(), 4);
    }
}
