//! Per-date file output.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use carburantes_types::{DateKey, DateRange, StationTable};
use tracing::debug;

use crate::{CsvFormatter, FormatError, JsonFormatter, OutputFormat, TableFormatter};

/// File name of one date's table: `precios_dd_mm_yyyy.<ext>`.
#[must_use]
pub fn artifact_name(date: DateKey, format: OutputFormat) -> String {
    format!("precios_{}.{}", date.file_stem(), format.extension())
}

/// Directory name of one run: `carburantes_<yyyymmdd>_<yyyymmdd>`.
#[must_use]
pub fn run_dir_name(range: &DateRange) -> String {
    format!(
        "carburantes_{}_{}",
        range.start_key().compact(),
        range.end_key().compact()
    )
}

/// Identifier and size of a written table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenTable {
    /// Artifact identifier (file name for file writers).
    pub name: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Persists finished tables and reports what was written.
pub trait TableWriter: Send + Sync {
    /// Writes one date's table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be written.
    fn write(&self, table: &StationTable) -> Result<WrittenTable, FormatError>;
}

/// Writes each table to its own file in a directory.
#[derive(Debug, Clone)]
pub struct FileTableWriter {
    dir: PathBuf,
    format: OutputFormat,
    csv: CsvFormatter,
    json_pretty: bool,
}

impl FileTableWriter {
    /// Creates a writer into `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            csv: CsvFormatter::new(),
            json_pretty: false,
        }
    }

    /// Creates a writer into the run directory of `range` under `root`.
    #[must_use]
    pub fn for_range(root: &Path, range: &DateRange, format: OutputFormat) -> Self {
        Self::new(root.join(run_dir_name(range)), format)
    }

    /// Sets the CSV formatter used for [`OutputFormat::Csv`].
    #[must_use]
    pub const fn with_csv(mut self, csv: CsvFormatter) -> Self {
        self.csv = csv;
        self
    }

    /// Sets whether JSON arrays are pretty-printed.
    #[must_use]
    pub const fn with_json_pretty(mut self, pretty: bool) -> Self {
        self.json_pretty = pretty;
        self
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Returns the path a date's table is written to.
    #[must_use]
    pub fn path_for(&self, date: DateKey) -> PathBuf {
        self.dir.join(artifact_name(date, self.format))
    }

    fn encode<W: Write + Send>(&self, table: &StationTable, writer: W) -> Result<(), FormatError> {
        match self.format {
            OutputFormat::Csv => self.csv.write_table(table, writer),
            OutputFormat::Json => JsonFormatter::new()
                .with_pretty(self.json_pretty)
                .write_table(table, writer),
            OutputFormat::Ndjson => JsonFormatter::ndjson().write_table(table, writer),
            #[cfg(feature = "parquet")]
            OutputFormat::Parquet => crate::ParquetFormatter::new().write_table(table, writer),
            #[cfg(not(feature = "parquet"))]
            OutputFormat::Parquet => Err(FormatError::Unsupported(OutputFormat::Parquet)),
        }
    }
}

impl TableWriter for FileTableWriter {
    fn write(&self, table: &StationTable) -> Result<WrittenTable, FormatError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(table.date());

        let mut file = BufWriter::new(File::create(&path)?);
        self.encode(table, &mut file)?;
        file.flush()?;
        drop(file);

        let size_bytes = fs::metadata(&path)?.len();
        debug!(path = %path.display(), size_bytes, "Table written");
        Ok(WrittenTable {
            name: artifact_name(table.date(), self.format),
            size_bytes,
        })
    }
}
