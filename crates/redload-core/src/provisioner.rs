//! Table provisioner: catalog checks and table creation.

use log::{debug, info};
use redload_core_common::{WarehouseConnection, WarehouseError};

use crate::error::{Result, SchemaError};
use crate::types::{ColumnTypes, TableRef};

/// Returns `true` when `target` exists.
///
/// # Errors
///
/// Returns [`SchemaError::Inspection`] if the catalog cannot be queried.
pub async fn table_exists(conn: &dyn WarehouseConnection, target: &TableRef) -> Result<bool> {
    let exists = conn
        .has_table(target.table().as_str(), target.schema().as_str())
        .await
        .map_err(|source| SchemaError::Inspection {
            table: target.to_string(),
            source,
        })?;
    debug!("Table {target} exists: {exists}");
    Ok(exists)
}

/// Builds the `CREATE TABLE` statement for `target`.
///
/// # Errors
///
/// Returns [`SchemaError::NoColumns`] for an empty mapping, or a
/// configuration error if a column name or declaration is unsafe.
pub fn create_table_sql(target: &TableRef, column_types: &ColumnTypes) -> Result<String> {
    if column_types.is_empty() {
        return Err(SchemaError::NoColumns {
            table: target.to_string(),
        }
        .into());
    }
    column_types.validate()?;

    let columns = column_types
        .iter()
        .map(|(column, declaration)| format!("    {column} {declaration}"))
        .collect::<Vec<_>>()
        .join(",\n");
    Ok(format!("CREATE TABLE {target} (\n{columns}\n)"))
}

/// Creates the schema if needed, then the table.
///
/// The table statement has no `IF NOT EXISTS` guard: creating a table that
/// already exists fails with [`SchemaError::AlreadyExists`].
///
/// # Errors
///
/// Returns a [`SchemaError`] if either statement fails, or a configuration
/// error if the column mapping is unsafe.
pub async fn create_table(
    conn: &dyn WarehouseConnection,
    target: &TableRef,
    column_types: &ColumnTypes,
) -> Result<()> {
    let create_table = create_table_sql(target, column_types)?;

    conn.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", target.schema()))
        .await
        .map_err(|source| SchemaError::CreateSchema {
            schema: target.schema().to_string(),
            source,
        })?;

    conn.execute(&create_table)
        .await
        .map_err(|source| match source {
            WarehouseError::DuplicateTable { .. } => SchemaError::AlreadyExists {
                table: target.to_string(),
                source,
            },
            source => SchemaError::Create {
                table: target.to_string(),
                source,
            },
        })?;

    info!("Created table {target} with {} columns", column_types.len());
    Ok(())
}
