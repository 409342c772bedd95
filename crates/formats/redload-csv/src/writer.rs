//! Arrow record batches to a single CSV document

use std::io::Write;

use arrow_array::RecordBatch;
use arrow_csv::WriterBuilder;
use arrow_schema::{ArrowError, SchemaRef};

/// CSV dialect of a staged payload.
///
/// Quoting always uses `"`, and temporal values use arrow-csv's default
/// rendering, which the warehouse parses with `DATEFORMAT`/`TIMEFORMAT 'auto'`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriterOptions {
    delimiter: u8,
    has_header: bool,
    null_value: String,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_value: String::new(),
        }
    }
}

impl CsvWriterOptions {
    /// Comma separated, with a header row and nulls as empty fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Text written for null values; empty means an empty field.
    #[must_use]
    pub fn with_null_value(mut self, null_value: impl Into<String>) -> Self {
        self.null_value = null_value.into();
        self
    }

    /// Field separator
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Whether the first line names the columns
    #[must_use]
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// Null marker
    #[must_use]
    pub fn null_value(&self) -> &str {
        &self.null_value
    }

    fn builder(&self) -> WriterBuilder {
        let builder = WriterBuilder::new()
            .with_delimiter(self.delimiter)
            .with_header(self.has_header);
        if self.null_value.is_empty() {
            builder
        } else {
            builder.with_null(self.null_value.clone())
        }
    }
}

/// Writes `batches` as one CSV document.
///
/// The header row is derived from `schema`, so it is written even when
/// `batches` holds no rows at all. Every batch is checked against `schema`
/// before anything is written.
///
/// # Errors
///
/// Returns [`ArrowError::SchemaError`] if a batch has different fields than
/// `schema`, and any error raised while serializing or writing.
pub fn write_csv<W: Write>(
    writer: W,
    schema: &SchemaRef,
    batches: &[RecordBatch],
    options: &CsvWriterOptions,
) -> Result<(), ArrowError> {
    if let Some(position) = batches
        .iter()
        .position(|batch| batch.schema().fields() != schema.fields())
    {
        return Err(ArrowError::SchemaError(format!(
            "record batch {position} does not match the dataset schema"
        )));
    }

    let mut csv = options.builder().build(writer);
    match batches {
        [] => csv.write(&RecordBatch::new_empty(schema.clone())),
        batches => batches.iter().try_for_each(|batch| csv.write(batch)),
    }
}

/// Writes `batches` into an in-memory buffer.
///
/// # Errors
///
/// Same as [`write_csv`].
pub fn write_csv_to_bytes(
    schema: &SchemaRef,
    batches: &[RecordBatch],
    options: &CsvWriterOptions,
) -> Result<Vec<u8>, ArrowError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, schema, batches, options)?;
    Ok(buffer)
}
