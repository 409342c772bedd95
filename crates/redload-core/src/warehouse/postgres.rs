//! Redshift connection over the PostgreSQL wire protocol.
//!
//! The wrapper accepts anything implementing `tokio_postgres::GenericClient`,
//! so the caller can hand in a plain `Client` or an open `Transaction` and
//! keep control of commit and rollback.

use async_trait::async_trait;
use redload_core_common::{WarehouseConnection, WarehouseError};
use tokio_postgres::GenericClient;
use tokio_postgres::error::SqlState;

const HAS_TABLE_SQL: &str = "SELECT EXISTS (\
     SELECT 1 FROM information_schema.tables \
     WHERE table_schema = lower($1) AND table_name = lower($2))";

/// [`WarehouseConnection`] backed by a `tokio-postgres` client.
#[derive(Debug)]
pub struct PostgresWarehouse<C> {
    client: C,
}

impl<C> PostgresWarehouse<C> {
    /// Wraps a connected client or an open transaction.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Borrow the wrapped client
    pub fn get_ref(&self) -> &C {
        &self.client
    }

    /// Unwrap the client, e.g. to commit a transaction
    pub fn into_inner(self) -> C {
        self.client
    }
}

fn classify(err: &tokio_postgres::Error) -> WarehouseError {
    let message = err
        .as_db_error()
        .map_or_else(|| err.to_string(), |db| db.message().to_string());

    match err.code() {
        Some(code) if *code == SqlState::UNDEFINED_TABLE => {
            WarehouseError::UndefinedTable { message }
        },
        Some(code) if *code == SqlState::INVALID_SCHEMA_NAME => {
            WarehouseError::UndefinedSchema { message }
        },
        Some(code) if *code == SqlState::DUPLICATE_TABLE => {
            WarehouseError::DuplicateTable { message }
        },
        Some(code) => WarehouseError::Statement {
            message,
            code: Some(code.code().to_string()),
        },
        None if err.is_closed() => WarehouseError::Connection { message },
        None => WarehouseError::Statement {
            message,
            code: None,
        },
    }
}

#[async_trait]
impl<C> WarehouseConnection for PostgresWarehouse<C>
where
    C: GenericClient + Send + Sync,
{
    async fn execute(&self, sql: &str) -> Result<(), WarehouseError> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| classify(&e))
    }

    async fn has_table(&self, table: &str, schema: &str) -> Result<bool, WarehouseError> {
        let row = self
            .client
            .query_one(HAS_TABLE_SQL, &[&schema, &table])
            .await
            .map_err(|e| classify(&e))?;
        row.try_get::<_, bool>(0).map_err(|e| classify(&e))
    }
}
