//! JSON output format.

use carburantes_types::StationTable;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io::Write;

use crate::{FormatError, TableFormatter};

/// JSON output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    /// JSON array (standard JSON).
    #[default]
    Array,
    /// Newline-delimited JSON (NDJSON/JSONL).
    Ndjson,
}

/// JSON formatter. Each row is an object keyed by column name, in column
/// order; missing values are `null`.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    /// Output style.
    style: JsonStyle,
    /// Whether to pretty-print (only for array style).
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter with default settings (array style).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            style: JsonStyle::Array,
            pretty: false,
        }
    }

    /// Creates a new NDJSON formatter.
    #[must_use]
    pub const fn ndjson() -> Self {
        Self {
            style: JsonStyle::Ndjson,
            pretty: false,
        }
    }

    /// Sets whether to pretty-print output (array style only).
    #[must_use]
    pub const fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the output style.
    #[must_use]
    pub const fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }
}

/// One row of a table, serialised as a map.
struct Row<'a> {
    table: &'a StationTable,
    index: usize,
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.column_count()))?;
        for column in self.table.columns() {
            if let Some(cell) = column.cells.get(self.index) {
                map.serialize_entry(&column.name, cell)?;
            }
        }
        map.end()
    }
}

/// Every row of a table, serialised as a sequence.
struct Rows<'a>(&'a StationTable);

impl Serialize for Rows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table = self.0;
        serializer.collect_seq((0..table.row_count()).map(|index| Row { table, index }))
    }
}

impl TableFormatter for JsonFormatter {
    fn write_table<W: Write + Send>(
        &self,
        table: &StationTable,
        mut writer: W,
    ) -> Result<(), FormatError> {
        match self.style {
            JsonStyle::Array => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut writer, &Rows(table))?;
                } else {
                    serde_json::to_writer(&mut writer, &Rows(table))?;
                }
                writeln!(writer)?;
            }
            JsonStyle::Ndjson => {
                for index in 0..table.row_count() {
                    serde_json::to_writer(&mut writer, &Row { table, index })?;
                    writeln!(writer)?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn extension(&self) -> &str {
        match self.style {
            JsonStyle::Array => "json",
            JsonStyle::Ndjson => "ndjson",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carburantes_types::{Cell, Column, DateKey};
    use chrono::{Local, TimeZone};
    use serde_json::{Value, json};
    use std::io::Cursor;

    fn create_test_table() -> StationTable {
        let date = DateKey::parse("01-01-2024").unwrap();
        let at = Local.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut table = StationTable::new(date, at, 2);
        table
            .push_column(Column::new(
                "C.P.".into(),
                vec![Cell::Literal("08001".into()), Cell::Literal("28001".into())],
            ))
            .unwrap();
        table
            .push_column(Column::new(
                "Latitud".into(),
                vec![Cell::Number(41.5), Cell::Empty],
            ))
            .unwrap();
        table
    }

    #[test]
    fn test_json_array() {
        let formatter = JsonFormatter::new();
        let mut output = Cursor::new(Vec::new());

        formatter.write_table(&create_test_table(), &mut output).unwrap();

        let value: Value = serde_json::from_slice(&output.into_inner()).unwrap();
        assert_eq!(
            value,
            json!([
                {"C.P.": "08001", "Latitud": 41.5},
                {"C.P.": "28001", "Latitud": null}
            ])
        );
    }

    #[test]
    fn test_ndjson() {
        let formatter = JsonFormatter::ndjson();
        let mut output = Cursor::new(Vec::new());

        formatter.write_table(&create_test_table(), &mut output).unwrap();

        let result = String::from_utf8(output.into_inner()).unwrap();
        let lines: Vec<_> = result.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"C.P.":"08001","Latitud":41.5}"#);
        assert_eq!(formatter.extension(), "ndjson");
    }

    #[test]
    fn test_pretty_json() {
        let formatter = JsonFormatter::new().with_pretty(true);
        let mut output = Cursor::new(Vec::new());

        formatter.write_table(&create_test_table(), &mut output).unwrap();

        let result = String::from_utf8(output.into_inner()).unwrap();
        assert!(result.contains('\n'));
        assert!(result.contains("  ")); // Indentation
    }
}
