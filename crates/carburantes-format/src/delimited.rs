//! CSV (delimited text) output format.

use carburantes_types::StationTable;
use std::io::Write;

use crate::{FormatError, TableFormatter};

/// CSV formatter.
///
/// Numbers use a decimal point; text cells, postal codes included, are
/// written verbatim so leading zeros survive.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    /// Field delimiter (default: comma).
    delimiter: u8,
    /// Whether to include header row.
    include_header: bool,
}

impl Default for CsvFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvFormatter {
    /// Creates a new CSV formatter with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            delimiter: b',',
            include_header: true,
        }
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether to include a header row.
    #[must_use]
    pub const fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Creates a semicolon-separated formatter, as spreadsheet tools in
    /// decimal-comma locales expect.
    #[must_use]
    pub const fn semicolon() -> Self {
        Self {
            delimiter: b';',
            include_header: true,
        }
    }
}

impl TableFormatter for CsvFormatter {
    fn write_table<W: Write + Send>(
        &self,
        table: &StationTable,
        writer: W,
    ) -> Result<(), FormatError> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        if self.include_header {
            out.write_record(table.column_names())?;
        }

        for index in 0..table.row_count() {
            out.write_record(table.row(index).map(ToString::to_string))?;
        }

        out.flush()?;
        Ok(())
    }

    fn extension(&self) -> &str {
        "csv"
    }
}
