//! `redload-core` loads Arrow datasets into Redshift through staged objects
//! and the warehouse's bulk `COPY` command.
//!
//! This crate includes:
//! - **Type Mapper** ([`type_map`]): Arrow or textual column types to Redshift declarations.
//! - **Object Stager** ([`stager`]): CSV payloads written to and deleted from an `ObjectStore`.
//! - **Table Provisioner** ([`provisioner`]): existence checks and `CREATE TABLE`.
//! - **Bulk-Load Orchestrator** ([`loader`]): truncate, provision, stage, COPY and clean up.
//! - **Warehouse connections** ([`warehouse`]): in-memory and PostgreSQL wire protocol.

pub mod error;
pub mod loader;
pub mod options;
pub mod provisioner;
pub mod stager;
pub mod type_map;
pub mod types;
pub mod warehouse;

pub use error::{ConfigError, LoadError, RedloadError, Result, SchemaError, StorageError};
pub use loader::{CopyStatement, LoadSummary, copy, insert};
pub use options::{DEFAULT_COPY_OPTIONS, InsertOptions, LoadOptions};
pub use provisioner::{create_table, table_exists};
pub use stager::{ObjectStager, StagedObject, StorageConfig};
pub use type_map::{NativeType, infer_column_types, map_types};
pub use types::{ColumnTypes, Dataset, Identifier, TableRef};

pub use redload_core_common::{
    CopyCredentials, CredentialError, CredentialProvider, EnvCredentials, StaticCredentials,
    WarehouseConnection, WarehouseError,
};
pub use redload_csv::CsvWriterOptions;
