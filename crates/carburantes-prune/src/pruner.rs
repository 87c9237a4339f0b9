//! The column pruning pass.

use std::collections::HashMap;

use carburantes_fuels::FuelSelection;
use carburantes_types::{Column, StationTable, TableError};
use thiserror::Error;
use tracing::debug;

use crate::decision::{DropReason, KeepReason, PruneDecision, PruneReport};
use crate::rules::{PruneRules, format_postal_code, is_coordinate_column, mode_key, normalize_coordinate};

/// Errors raised while pruning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PruneError {
    /// The table could not be rearranged.
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Returns true if a fuel name matches the selection.
///
/// Comparison is exact after trimming and lowercasing both sides, so
/// `"gasoleo a"` matches `"Gasoleo A"` but not `"Gasoleo A Premium"`.
#[must_use]
pub fn matches_fuel(selection: &FuelSelection, fuel: &str) -> bool {
    selection.contains(fuel)
}

/// Applies [`PruneRules`] to station tables.
#[derive(Debug, Clone, Default)]
pub struct ColumnPruner {
    rules: PruneRules,
}

impl ColumnPruner {
    /// Creates a pruner with the given rules.
    #[must_use]
    pub const fn new(rules: PruneRules) -> Self {
        Self { rules }
    }

    /// Returns the rules.
    #[must_use]
    pub const fn rules(&self) -> &PruneRules {
        &self.rules
    }

    /// Reduces a table to its output schema.
    ///
    /// In order: coordinates are normalised; unselected fuel columns are
    /// dropped; every other column that is neither fundamental, coordinate
    /// nor a selected fuel is dropped if it is sparse, else if it is
    /// near-constant; the postal code is formatted as text; rows are sorted
    /// by locality with missing localities last.
    ///
    /// Running the pruner on its own output with the same selection drops
    /// nothing further.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows cannot be reordered.
    pub fn prune(
        &self,
        mut table: StationTable,
        selection: &FuelSelection,
    ) -> Result<(StationTable, PruneReport), PruneError> {
        let rules = &self.rules;
        let names: Vec<String> = table.column_names().map(str::to_string).collect();

        for name in names.iter().filter(|n| is_coordinate_column(n)) {
            if let Some(column) = table.column_mut(name) {
                for cell in &mut column.cells {
                    *cell = normalize_coordinate(cell, &rules.placeholder);
                }
            }
        }

        let mut report = PruneReport::default();
        for column in table.columns() {
            let decision = self.decide(column, table.row_count(), selection, &mut report);
            report.decisions.push(decision);
        }

        for (name, reason) in report.dropped() {
            debug!(column = name, reason = %reason, "Dropping column");
            table.remove_column(name);
        }

        if let Some(column) = table.column_mut(&rules.postal_code_column) {
            for cell in &mut column.cells {
                *cell = format_postal_code(cell, rules.postal_code_width);
            }
        }

        if let Some(order) = self.locality_order(&table) {
            table.reorder_rows(&order)?;
        }

        Ok((table, report))
    }

    fn decide(
        &self,
        column: &Column,
        rows: usize,
        selection: &FuelSelection,
        report: &mut PruneReport,
    ) -> PruneDecision {
        let rules = &self.rules;
        let name = column.name.clone();

        if rules.is_fundamental(&name) {
            return PruneDecision::kept_as(name, KeepReason::Fundamental);
        }
        if is_coordinate_column(&name) {
            return PruneDecision::kept_as(name, KeepReason::Coordinate);
        }
        if let Some(fuel) = rules.fuel_name(&column.name) {
            report.fuels_available += 1;
            if matches_fuel(selection, fuel) {
                report.preserved_fuels.push(name.clone());
                return PruneDecision::kept_as(name, KeepReason::SelectedFuel);
            }
            report.unselected_dropped += 1;
            return PruneDecision::dropped_as(name, DropReason::UnselectedFuel);
        }
        if rows == 0 {
            return PruneDecision::kept_as(name, KeepReason::Retained);
        }

        let total = rows as f64;
        let empty = column.cells.iter().filter(|c| rules.is_empty_cell(c)).count();
        let empty_fraction = empty as f64 / total;
        if empty_fraction > rules.empty_threshold {
            return PruneDecision::dropped_as(name, DropReason::Sparse { empty_fraction });
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for cell in &column.cells {
            *counts.entry(mode_key(cell)).or_default() += 1;
        }
        let mode = counts.values().copied().max().unwrap_or(0);
        let mode_fraction = mode as f64 / total;
        if mode_fraction > rules.constant_threshold {
            return PruneDecision::dropped_as(name, DropReason::NearConstant { mode_fraction });
        }

        PruneDecision::kept_as(name, KeepReason::Retained)
    }

    /// Stable ascending order by locality, missing localities last.
    fn locality_order(&self, table: &StationTable) -> Option<Vec<usize>> {
        let column = table.column(&self.rules.locality_column)?;
        let keys: Vec<Option<String>> = column
            .cells
            .iter()
            .map(|c| c.as_text().map(|t| t.into_owned()))
            .collect();
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| {
            keys[a]
                .is_none()
                .cmp(&keys[b].is_none())
                .then_with(|| keys[a].cmp(&keys[b]))
        });
        Some(order)
    }
}
