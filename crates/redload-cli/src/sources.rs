//! Source formats the CLI can read a dataset from.
//!
//! Every format is read through a DataFusion `SessionContext` and collected
//! into record batches before the load starts.

use std::path::Path;

use anyhow::{Result, anyhow};
use datafusion::prelude::{CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionContext};
use redload_core::Dataset;
use tracing::info;

/// A readable input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFormat {
    /// Name used with `--format` (e.g., `"CSV"`).
    pub short_name: &'static str,
    /// Descriptive name for display purposes.
    pub long_name: &'static str,
    /// File extensions recognised when `--format` is omitted.
    pub extensions: &'static [&'static str],
}

impl SourceFormat {
    const fn new(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
        }
    }
}

/// Returns every supported source format.
#[must_use]
pub fn get_formats() -> Vec<SourceFormat> {
    vec![
        SourceFormat::new("CSV", "Comma Separated Value (.csv)", &["csv"]),
        SourceFormat::new("Parquet", "Apache Parquet", &["parquet", "pq"]),
        SourceFormat::new(
            "NDJSON",
            "Newline Delimited JSON",
            &["ndjson", "jsonl", "json"],
        ),
    ]
}

/// Finds a format by its short name (case-insensitive).
#[must_use]
pub fn find_format(name: &str) -> Option<SourceFormat> {
    get_formats()
        .into_iter()
        .find(|f| f.short_name.eq_ignore_ascii_case(name))
}

/// Picks a format from the extension of `path`.
#[must_use]
pub fn detect_format(path: &str) -> Option<SourceFormat> {
    let extension = Path::new(path).extension()?.to_str()?;
    get_formats().into_iter().find(|f| {
        f.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    })
}

/// Resolves `--format`, falling back to the input's extension.
///
/// # Errors
///
/// Returns an error if the named format is unknown or none can be detected.
pub fn resolve_format(input: &str, name: Option<&str>) -> Result<SourceFormat> {
    match name {
        Some(name) => find_format(name).ok_or_else(|| anyhow!("Input format '{name}' not found.")),
        None => detect_format(input).ok_or_else(|| {
            anyhow!("Cannot detect the format of '{input}'; pass --format explicitly.")
        }),
    }
}

/// Reads the whole file at `input` into a [`Dataset`].
///
/// # Errors
///
/// Returns an error if DataFusion cannot read the file or the batches do not
/// share one schema.
pub async fn read_dataset(input: &str, format: &SourceFormat) -> Result<Dataset> {
    let ctx = SessionContext::new();
    let extension = Path::new(input)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    info!("Reading {} file: {input}", format.short_name);
    let df = match format.short_name {
        "CSV" => {
            ctx.read_csv(input, CsvReadOptions::new().file_extension(&extension))
                .await
        },
        "Parquet" => {
            let options = ParquetReadOptions {
                file_extension: &extension,
                ..Default::default()
            };
            ctx.read_parquet(input, options).await
        },
        "NDJSON" => {
            ctx.read_json(input, NdJsonReadOptions::default().file_extension(&extension))
                .await
        },
        other => return Err(anyhow!("Input format '{other}' cannot be read.")),
    }
    .map_err(|e| anyhow!("Failed to read {input}: {e}"))?;

    let schema = df.schema().inner().clone();
    let batches = df
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to collect {input}: {e}"))?;

    // Batch schemas are authoritative over the logical plan's
    let schema = batches.first().map_or(schema, |b| b.schema());
    let dataset = Dataset::try_new(schema, batches)?;
    info!(
        "Read {} rows in {} column(s)",
        dataset.num_rows(),
        dataset.schema().fields().len()
    );
    Ok(dataset)
}
