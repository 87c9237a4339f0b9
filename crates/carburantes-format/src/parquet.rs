//! Apache Parquet output format.

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use carburantes_types::{Cell, Column, StationTable};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::io::Write;
use std::sync::Arc;

use crate::{FormatError, TableFormatter};

/// Parquet formatter.
///
/// Columns holding only numbers (or missing values) become nullable
/// `Float64`; every other column, postal codes included, is nullable `Utf8`.
#[derive(Debug, Clone)]
pub struct ParquetFormatter {
    /// Row group size (number of rows per group).
    row_group_size: usize,
    /// Compression codec.
    compression: Compression,
}

impl Default for ParquetFormatter {
    fn default() -> Self {
        Self {
            row_group_size: 100_000,
            compression: Compression::SNAPPY,
        }
    }
}

impl ParquetFormatter {
    /// Creates a new Parquet formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the row group size.
    #[must_use]
    pub const fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Sets the compression codec.
    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Returns true if the column can be stored as `Float64`.
    fn is_numeric(column: &Column) -> bool {
        column.cells.iter().any(|c| matches!(c, Cell::Number(_)))
            && column
                .cells
                .iter()
                .all(|c| matches!(c, Cell::Number(_) | Cell::Empty))
    }

    /// Derives the Arrow schema of a table.
    fn table_schema(table: &StationTable) -> Schema {
        Schema::new(
            table
                .columns()
                .iter()
                .map(|column| {
                    let data_type = if Self::is_numeric(column) {
                        DataType::Float64
                    } else {
                        DataType::Utf8
                    };
                    Field::new(column.name.clone(), data_type, true)
                })
                .collect::<Vec<_>>(),
        )
    }

    /// Converts a table to an Arrow RecordBatch.
    fn table_to_batch(table: &StationTable, schema: Arc<Schema>) -> Result<RecordBatch, FormatError> {
        let arrays: Vec<ArrayRef> = table
            .columns()
            .iter()
            .map(|column| -> ArrayRef {
                if Self::is_numeric(column) {
                    let values: Vec<Option<f64>> =
                        column.cells.iter().map(Cell::as_number).collect();
                    Arc::new(Float64Array::from(values))
                } else {
                    let values: Vec<Option<String>> = column
                        .cells
                        .iter()
                        .map(|c| c.as_text().map(|t| t.into_owned()))
                        .collect();
                    Arc::new(StringArray::from(values))
                }
            })
            .collect();

        RecordBatch::try_new(schema, arrays).map_err(|e| FormatError::Parquet(e.to_string()))
    }
}

impl TableFormatter for ParquetFormatter {
    fn write_table<W: Write + Send>(
        &self,
        table: &StationTable,
        writer: W,
    ) -> Result<(), FormatError> {
        let schema = Arc::new(Self::table_schema(table));
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut arrow_writer = ArrowWriter::try_new(writer, Arc::clone(&schema), Some(props))
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        let batch = Self::table_to_batch(table, schema)?;
        arrow_writer
            .write(&batch)
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        arrow_writer
            .close()
            .map_err(|e| FormatError::Parquet(e.to_string()))?;

        Ok(())
    }

    fn extension(&self) -> &str {
        "parquet"
    }
}
