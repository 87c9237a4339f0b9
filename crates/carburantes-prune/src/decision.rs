//! Per-column verdicts and the prune report.

/// Why a column is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// Station identity or location column.
    Fundamental,
    /// Latitude or longitude column.
    Coordinate,
    /// Fuel price column matching the selection.
    SelectedFuel,
    /// Passed the sparse and near-constant rules.
    Retained,
}

/// Why a column is dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropReason {
    /// Fuel price column not in the selection.
    UnselectedFuel,
    /// Too many empty values.
    Sparse {
        /// Share of empty values.
        empty_fraction: f64,
    },
    /// One value dominates the column.
    NearConstant {
        /// Share of the most frequent value.
        mode_fraction: f64,
    },
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnselectedFuel => f.write_str("unselected fuel"),
            Self::Sparse { empty_fraction } => {
                write!(f, "{:.1}% empty", empty_fraction * 100.0)
            }
            Self::NearConstant { mode_fraction } => {
                write!(f, "{:.1}% identical", mode_fraction * 100.0)
            }
        }
    }
}

/// Verdict for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    /// The column stays in the output.
    Keep(KeepReason),
    /// The column is removed.
    Drop(DropReason),
}

/// The verdict computed for one column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneDecision {
    /// Column name.
    pub column: String,
    /// Keep or drop, with the reason.
    pub verdict: Verdict,
}

impl PruneDecision {
    pub(crate) const fn kept_as(column: String, reason: KeepReason) -> Self {
        Self {
            column,
            verdict: Verdict::Keep(reason),
        }
    }

    pub(crate) const fn dropped_as(column: String, reason: DropReason) -> Self {
        Self {
            column,
            verdict: Verdict::Drop(reason),
        }
    }

    /// Returns true if the column is kept.
    #[must_use]
    pub const fn is_kept(&self) -> bool {
        matches!(self.verdict, Verdict::Keep(_))
    }
}

/// Diagnostics of one prune pass. Not consumed by downstream logic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PruneReport {
    /// One decision per input column, in input order.
    pub decisions: Vec<PruneDecision>,
    /// Number of fuel price columns in the input.
    pub fuels_available: usize,
    /// Number of fuel price columns dropped as unselected.
    pub unselected_dropped: usize,
    /// Fuel price columns kept, in input order.
    pub preserved_fuels: Vec<String>,
}

impl PruneReport {
    /// Returns the dropped columns with their reasons.
    pub fn dropped(&self) -> impl Iterator<Item = (&str, DropReason)> {
        self.decisions.iter().filter_map(|d| match d.verdict {
            Verdict::Drop(reason) => Some((d.column.as_str(), reason)),
            Verdict::Keep(_) => None,
        })
    }

    /// Returns the names of kept columns.
    pub fn kept(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|d| d.is_kept())
            .map(|d| d.column.as_str())
    }

    /// Returns the number of dropped columns.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.dropped().count()
    }

    /// Returns the decision for a column, if it was in the input.
    #[must_use]
    pub fn decision(&self, column: &str) -> Option<&PruneDecision> {
        self.decisions.iter().find(|d| d.column == column)
    }
}
