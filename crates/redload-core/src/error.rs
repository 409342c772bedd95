//! Error types for `Redload` operations.
//!
//! Every pipeline step maps its failure into one of the domain errors below
//! and the load stops right there. Nothing is retried and nothing that already
//! happened is rolled back.

use arrow_schema::ArrowError;
use redload_core_common::{CredentialError, WarehouseError};
use thiserror::Error;

use crate::stager::StagedObject;

/// Main error type for `Redload` operations.
///
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum RedloadError {
    /// Object storage errors (upload, delete, serialization of the payload)
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Catalog inspection and table provisioning errors
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// COPY statement rejected by the warehouse
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Missing or unsafe identifiers and options
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Any other statement failure, as reported by the warehouse driver
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

/// Object storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to upload the staged object
    #[error("Failed to upload '{key}' to bucket '{bucket}': {source}")]
    Upload {
        /// Target bucket
        bucket: String,
        /// Object key
        key: String,
        /// The underlying error
        #[source]
        source: object_store::Error,
    },

    /// Failed to delete the staged object
    #[error("Failed to delete '{key}' from bucket '{bucket}': {source}")]
    Delete {
        /// Target bucket
        bucket: String,
        /// Object key
        key: String,
        /// The underlying error
        #[source]
        source: object_store::Error,
    },

    /// Failed to serialize the dataset to CSV
    #[error("Failed to serialize dataset for table '{table}': {source}")]
    Serialize {
        /// Table the payload was meant for
        table: String,
        /// The underlying error
        #[source]
        source: ArrowError,
    },

    /// The generated key is not a valid object path
    #[error("Invalid object key '{key}': {source}")]
    InvalidKey {
        /// The rejected key
        key: String,
        /// The underlying error
        #[source]
        source: object_store::path::Error,
    },
}

/// Catalog and provisioning errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Catalog inspection failed
    #[error("Failed to inspect catalog for {table}: {source}")]
    Inspection {
        /// Qualified table name
        table: String,
        /// The underlying error
        #[source]
        source: WarehouseError,
    },

    /// CREATE TABLE hit an existing table
    #[error("Table {table} already exists")]
    AlreadyExists {
        /// Qualified table name
        table: String,
        /// The underlying error
        #[source]
        source: WarehouseError,
    },

    /// CREATE TABLE requested with no columns
    #[error("Cannot create table {table} without columns")]
    NoColumns {
        /// Qualified table name
        table: String,
    },

    /// CREATE SCHEMA failed
    #[error("Failed to create schema {schema}: {source}")]
    CreateSchema {
        /// Schema name
        schema: String,
        /// The underlying error
        #[source]
        source: WarehouseError,
    },

    /// CREATE TABLE failed for another reason
    #[error("Failed to create table {table}: {source}")]
    Create {
        /// Qualified table name
        table: String,
        /// The underlying error
        #[source]
        source: WarehouseError,
    },
}

/// Bulk-load errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The warehouse rejected the COPY statement
    #[error("COPY into {table} failed: {source}")]
    Copy {
        /// Qualified table name
        table: String,
        /// Staged object left behind in the bucket, if it was not cleaned up
        orphaned: Option<StagedObject>,
        /// The underlying error
        #[source]
        source: WarehouseError,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },

    /// Identifier cannot be safely interpolated into SQL
    #[error("Invalid {kind} name '{value}': {reason}")]
    InvalidIdentifier {
        /// What the identifier names (schema, table, column)
        kind: &'static str,
        /// The rejected value
        value: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Column type declaration contains unsafe characters
    #[error("Invalid type declaration '{declaration}' for column '{column}'")]
    InvalidTypeDeclaration {
        /// The column name
        column: String,
        /// The rejected declaration
        declaration: String,
    },

    /// Dataset batches are inconsistent with its schema
    #[error("Invalid dataset: {message}")]
    InvalidDataset {
        /// Description of the problem
        message: String,
    },

    /// Credentials could not be obtained
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Type alias for Results using `RedloadError`.
pub type Result<T> = std::result::Result<T, RedloadError>;

impl RedloadError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Storage(e) => format!("Storage error: {e}"),
            Self::Schema(e) => format!("Schema error: {e}"),
            Self::Load(e) => e.user_message(),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Warehouse(e) => format!("Warehouse error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Storage(StorageError::Upload { .. } | StorageError::Delete { .. }) => Some(
                "Check the bucket name and that the storage credentials can write and delete objects."
                    .to_string(),
            ),
            Self::Schema(SchemaError::AlreadyExists { .. }) => Some(
                "Load without table creation, or drop the existing table first.".to_string(),
            ),
            Self::Load(LoadError::Copy { .. }) => Some(
                "Query STL_LOAD_ERRORS on the cluster for the rejected rows.".to_string(),
            ),
            Self::Warehouse(WarehouseError::UndefinedTable { .. }) => Some(
                "Truncation does not create tables; create the table before truncating it."
                    .to_string(),
            ),
            Self::Config(ConfigError::InvalidIdentifier { .. }) => Some(
                "Use names made of letters, digits, '_' and '$' that do not start with a digit."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying with different
    /// parameters.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Schema(SchemaError::AlreadyExists { .. })
        )
    }

    /// Staged object a failed COPY left behind in the bucket.
    #[must_use]
    pub fn orphaned_object(&self) -> Option<&StagedObject> {
        match self {
            Self::Load(LoadError::Copy { orphaned, .. }) => orphaned.as_ref(),
            _ => None,
        }
    }
}

impl LoadError {
    fn user_message(&self) -> String {
        match self {
            Self::Copy {
                table,
                orphaned: Some(staged),
                source,
            } => format!(
                "COPY into {table} failed: {source}\nThe staged payload was kept at {}",
                staged.source_uri()
            ),
            Self::Copy { .. } => self.to_string(),
        }
    }
}
