//! Date keys and inclusive date ranges.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::DateRangeError;

/// Canonical text format of a [`DateKey`].
const DATE_FORMAT: &str = "%d-%m-%Y";

/// Number of days covered by the default range, counted back from today.
pub(crate) const DEFAULT_TRAILING_DAYS: u64 = 30;

/// A calendar date identifying one daily snapshot.
///
/// The canonical text form is `dd-mm-yyyy`, which is also the path segment
/// the upstream API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses a strict `dd-mm-yyyy` date.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::InvalidDate`] if the text is not exactly
    /// two-digit day, two-digit month and four-digit year separated by dashes,
    /// or if it names a day that does not exist.
    pub fn parse(s: &str) -> Result<Self, DateRangeError> {
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[2] == b'-'
            && bytes[5] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
        if !shape_ok {
            return Err(DateRangeError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateRangeError::InvalidDate(s.to_string()))
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.0
    }

    /// Returns the key with dashes replaced by underscores (`dd_mm_yyyy`),
    /// suitable for file names.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.0.format("%d_%m_%Y").to_string()
    }

    /// Returns the date as `yyyymmdd`.
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Returns the following calendar day, if representable.
    #[must_use]
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl std::fmt::Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl std::str::FromStr for DateKey {
    type Err = DateRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim())
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of calendar dates.
///
/// Each date in the range is one fetch unit. Iteration is chronological and
/// can be restarted any number of times via [`DateRange::dates`]. The start
/// never comes after the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range, validating that start <= end.
    ///
    /// # Errors
    ///
    /// Returns an error if start > end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a date range for a single day.
    #[must_use]
    pub const fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Creates the range ending on `today` and starting `days` days earlier.
    #[must_use]
    pub fn trailing_days(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        Self { start, end: today }
    }

    /// Builds a range from optional `dd-mm-yyyy` bounds.
    ///
    /// A missing start defaults to 30 days before `today`; a missing end
    /// defaults to `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if either bound fails to parse or start > end.
    pub fn parse_bounds(
        start: Option<&str>,
        end: Option<&str>,
        today: NaiveDate,
    ) -> Result<Self, DateRangeError> {
        let default = Self::trailing_days(today, DEFAULT_TRAILING_DAYS);
        let start = match start {
            Some(s) => DateKey::parse(s.trim())?.date(),
            None => default.start,
        };
        let end = match end {
            Some(s) => DateKey::parse(s.trim())?.date(),
            None => default.end,
        };
        Self::new(start, end)
    }

    /// Returns an iterator over every date in the range, in ascending order.
    pub fn dates(&self) -> DateIterator {
        DateIterator {
            current: Some(self.start),
            end: self.end,
        }
    }

    /// Returns the first date (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the last date (inclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Returns the total number of days in the range.
    #[must_use]
    pub fn total_days(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    /// Returns true if the range contains the given date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns the first date of the range as a key.
    #[must_use]
    pub const fn start_key(&self) -> DateKey {
        DateKey(self.start)
    }

    /// Returns the last date of the range as a key.
    #[must_use]
    pub const fn end_key(&self) -> DateKey {
        DateKey(self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_key(), self.end_key())
    }
}

impl std::str::FromStr for DateRange {
    type Err = DateRangeError;

    /// Parses `dd-mm-yyyy` or `desde dd-mm-yyyy hasta dd-mm-yyyy`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let words: Vec<&str> = input.split_whitespace().collect();

        match words.as_slice() {
            [single] => Ok(Self::single_day(DateKey::parse(single)?.date())),
            [from, start, until, end]
                if from.eq_ignore_ascii_case("desde") && until.eq_ignore_ascii_case("hasta") =>
            {
                let start = DateKey::parse(start)?;
                let end = DateKey::parse(end)?;
                Self::new(start.date(), end.date())
            }
            _ => Err(DateRangeError::InvalidExpression(input.to_string())),
        }
    }
}

/// Iterator over all dates in a [`DateRange`].
#[derive(Debug, Clone)]
pub struct DateIterator {
    current: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for DateIterator {
    type Item = DateKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current.filter(|d| *d <= self.end)?;
        self.current = current.succ_opt();
        Some(DateKey(current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.current {
            Some(current) if current <= self.end => {
                let days = (self.end - current).num_days() as usize + 1;
                (days, Some(days))
            }
            _ => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for DateIterator {}
