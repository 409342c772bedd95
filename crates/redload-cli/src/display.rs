//! Display utilities for formatting CLI output.

use tabled::{Table, Tabled};

use redload_core::{ColumnTypes, LoadSummary};

use crate::sources::SourceFormat;

/// Table row representation for displaying source formats.
#[derive(Tabled)]
pub struct FormatRow {
    /// Name accepted by `--format`.
    #[tabled(rename = "Short Name")]
    pub short_name: String,
    /// Full descriptive name of the format.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// Recognised file extensions.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
}

impl From<&SourceFormat> for FormatRow {
    fn from(format: &SourceFormat) -> Self {
        Self {
            short_name: format.short_name.to_string(),
            long_name: format.long_name.to_string(),
            extensions: format.extensions.join(", "),
        }
    }
}

/// Table row representation for a column declaration.
#[derive(Tabled)]
pub struct ColumnRow {
    #[tabled(rename = "Column")]
    pub name: String,
    #[tabled(rename = "Redshift Type")]
    pub declaration: String,
}

/// Renders the source formats as a table.
#[must_use]
pub fn formats_table(formats: &[SourceFormat]) -> String {
    let rows: Vec<FormatRow> = formats.iter().map(FormatRow::from).collect();
    Table::new(rows).to_string()
}

/// Renders a column mapping as a table.
#[must_use]
pub fn column_types_table(column_types: &ColumnTypes) -> String {
    let rows: Vec<ColumnRow> = column_types
        .iter()
        .map(|(name, declaration)| ColumnRow {
            name: name.to_string(),
            declaration: declaration.to_string(),
        })
        .collect();
    Table::new(rows).to_string()
}

/// Prints the outcome of a load.
pub fn display_summary(summary: &LoadSummary) {
    println!("\nLoaded {} rows into {}", summary.rows, summary.table);
    if summary.truncated {
        println!("Table was truncated first");
    }
    if summary.created {
        println!("Table was created");
    }
    println!("Staged via {}", summary.staged);
}
