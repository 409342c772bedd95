//! Warehouse connection trait used by the load pipeline.
//!
//! The pipeline only ever needs two things from a warehouse: run a statement
//! and ask the catalog whether a table exists. Connection lifetime and
//! transaction boundaries stay with whoever owns the implementation.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a warehouse driver.
///
/// Drivers classify the errors the pipeline reacts to (missing or duplicate
/// relations) and report everything else as [`WarehouseError::Statement`].
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The statement referenced a table that does not exist
    #[error("Undefined table: {message}")]
    UndefinedTable {
        /// Driver message
        message: String,
    },

    /// The statement referenced a schema that does not exist
    #[error("Undefined schema: {message}")]
    UndefinedSchema {
        /// Driver message
        message: String,
    },

    /// The statement tried to create a table that already exists
    #[error("Duplicate table: {message}")]
    DuplicateTable {
        /// Driver message
        message: String,
    },

    /// Any other statement failure
    #[error("Statement failed: {message}")]
    Statement {
        /// Driver message
        message: String,
        /// Driver-specific error code (e.g. a SQLSTATE), if any
        code: Option<String>,
    },

    /// The connection itself failed
    #[error("Connection failed: {message}")]
    Connection {
        /// Driver message
        message: String,
    },
}

/// A handle capable of executing SQL against the target warehouse.
///
/// Implementations must not open or commit transactions on their own: the
/// caller decides whether the statements issued by a load share one.
#[async_trait]
pub trait WarehouseConnection: Send + Sync {
    /// Executes a single statement, discarding any result rows.
    async fn execute(&self, sql: &str) -> Result<(), WarehouseError>;

    /// Returns `true` when `schema.table` exists in the catalog.
    ///
    /// An absent schema and an absent table both yield `false`.
    async fn has_table(&self, table: &str, schema: &str) -> Result<bool, WarehouseError>;
}

#[async_trait]
impl<T> WarehouseConnection for &T
where
    T: WarehouseConnection + ?Sized,
{
    async fn execute(&self, sql: &str) -> Result<(), WarehouseError> {
        (**self).execute(sql).await
    }

    async fn has_table(&self, table: &str, schema: &str) -> Result<bool, WarehouseError> {
        (**self).has_table(table, schema).await
    }
}
