//! CSV serialization of Arrow record batches for staged warehouse loads.
//!
//! The staged payload is a single CSV document: one header row followed by
//! one line per record, with nulls written as empty fields unless configured
//! otherwise.

mod writer;

pub use writer::{CsvWriterOptions, write_csv, write_csv_to_bytes};
