//! Station table representation.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::DateKey;

/// Name of the metadata column holding the queried date.
pub const QUERY_DATE_COLUMN: &str = "FechaConsulta";

/// Name of the metadata column holding the retrieval timestamp.
pub const RETRIEVED_AT_COLUMN: &str = "FechaDescarga";

/// A single value in a [`StationTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No value (JSON `null`, a missing field, or an unparseable number).
    Empty,
    /// Raw text as returned by the API.
    Text(String),
    /// A parsed number.
    Number(f64),
    /// Text that writers must never reinterpret as a number.
    Literal(String),
}

impl Cell {
    /// Converts a raw JSON field value into a cell.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(s) => Self::Text(s.clone()),
            Value::Number(n) => n.as_f64().map_or_else(|| Self::Text(n.to_string()), Self::Number),
            Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Returns true if the cell holds no value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the textual content of the cell, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Empty => None,
            Self::Text(s) | Self::Literal(s) => Some(Cow::Borrowed(s)),
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }

    /// Returns the numeric content of the cell, if it holds a number.
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) | Self::Literal(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(s) | Self::Literal(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name as reported by the API.
    pub name: String,
    /// One cell per row.
    pub cells: Vec<Cell>,
}

impl Column {
    /// Creates a new column.
    #[must_use]
    pub const fn new(name: String, cells: Vec<Cell>) -> Self {
        Self { name, cells }
    }

    /// Returns the number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the column has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Errors raised when a table would become ragged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A column does not have one cell per row.
    #[error("Column '{name}' has {len} cells, table has {rows} rows")]
    LengthMismatch {
        /// The offending column.
        name: String,
        /// Number of cells in the column.
        len: usize,
        /// Number of rows in the table.
        rows: usize,
    },

    /// A column with the same name already exists.
    #[error("Duplicate column '{0}'")]
    DuplicateColumn(String),

    /// A row permutation does not cover every row exactly once.
    #[error("Invalid row order: {0}")]
    InvalidOrder(String),
}

/// The station listing of one date, stored column by column.
///
/// Column order follows the order in which field names first appear in the
/// API response. Every column has exactly [`StationTable::row_count`] cells.
#[derive(Debug, Clone, PartialEq)]
pub struct StationTable {
    date: DateKey,
    retrieved_at: DateTime<Local>,
    rows: usize,
    columns: Vec<Column>,
}

impl StationTable {
    /// Creates an empty table with the given number of rows.
    #[must_use]
    pub const fn new(date: DateKey, retrieved_at: DateTime<Local>, rows: usize) -> Self {
        Self {
            date,
            retrieved_at,
            rows,
            columns: Vec::new(),
        }
    }

    /// Builds a table from raw station records.
    ///
    /// Columns are the union of all field names, in first-seen order. A field
    /// missing from a record becomes [`Cell::Empty`].
    #[must_use]
    pub fn from_records(
        date: DateKey,
        retrieved_at: DateTime<Local>,
        records: &[Map<String, Value>],
    ) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut columns: Vec<Column> = Vec::new();

        for (row, record) in records.iter().enumerate() {
            for (name, value) in record {
                let idx = *index.entry(name.as_str()).or_insert_with(|| {
                    columns.push(Column::new(name.clone(), vec![Cell::Empty; row]));
                    columns.len() - 1
                });
                let column = &mut columns[idx];
                column.cells.resize(row, Cell::Empty);
                column.cells.push(Cell::from_json(value));
            }
        }

        for column in &mut columns {
            column.cells.resize(records.len(), Cell::Empty);
        }

        Self {
            date,
            retrieved_at,
            rows: records.len(),
            columns,
        }
    }

    /// Appends the query date and retrieval timestamp as constant columns.
    pub fn stamp_metadata(&mut self) {
        let query_date = Cell::Text(self.date.to_string());
        let retrieved = Cell::Text(self.retrieved_at.format("%Y-%m-%d %H:%M:%S").to_string());
        for (name, cell) in [(QUERY_DATE_COLUMN, query_date), (RETRIEVED_AT_COLUMN, retrieved)] {
            self.columns.retain(|c| c.name != name);
            self.columns
                .push(Column::new(name.to_string(), vec![cell; self.rows]));
        }
    }

    /// Returns the date this table was fetched for.
    #[must_use]
    pub const fn date(&self) -> DateKey {
        self.date
    }

    /// Returns when the snapshot was retrieved.
    #[must_use]
    pub const fn retrieved_at(&self) -> DateTime<Local> {
        self.retrieved_at
    }

    /// Returns the number of rows (stations).
    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns all columns in order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Looks up a column by exact name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a column by exact name for modification.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Returns true if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns an error if the column length differs from the row count or
    /// the name is already taken.
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if column.len() != self.rows {
            return Err(TableError::LengthMismatch {
                name: column.name,
                len: column.cells.len(),
                rows: self.rows,
            });
        }
        if self.has_column(&column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Removes a column by name, returning it.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Returns the cells of one row, in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.columns.iter().filter_map(move |c| c.cells.get(index))
    }

    /// Reorders rows so that new row `i` is old row `order[i]`.
    ///
    /// # Errors
    ///
    /// Returns an error unless `order` is a permutation of `0..row_count`.
    pub fn reorder_rows(&mut self, order: &[usize]) -> Result<(), TableError> {
        if order.len() != self.rows {
            return Err(TableError::InvalidOrder(format!(
                "{} indices for {} rows",
                order.len(),
                self.rows
            )));
        }
        let mut seen = vec![false; self.rows];
        for &i in order {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(TableError::InvalidOrder(format!("index {i}"))),
            }
        }

        for column in &mut self.columns {
            let reordered = order.iter().map(|&i| column.cells[i].clone()).collect();
            column.cells = reordered;
        }
        Ok(())
    }
}
