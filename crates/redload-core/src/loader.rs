//! Bulk-load orchestration.
//!
//! [`insert`] runs the whole pipeline in a fixed order: optional truncate,
//! optional table creation, staging, COPY, cleanup. Each step only starts
//! once the previous one succeeded and the first failure is returned as-is.
//! [`copy`] is the staging, COPY and cleanup part on its own.
//!
//! Statements are issued on the connection the caller passes in; this module
//! never begins, commits or rolls back a transaction.

use log::{debug, info, warn};
use redload_core_common::{CopyCredentials, CredentialProvider, WarehouseConnection};

use crate::error::{ConfigError, LoadError, Result};
use crate::options::{InsertOptions, LoadOptions};
use crate::provisioner::{create_table, table_exists};
use crate::stager::{ObjectStager, StagedObject};
use crate::type_map::infer_column_types;
use crate::types::{Dataset, TableRef};

/// Outcome of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Target table
    pub table: TableRef,
    /// Rows handed to COPY
    pub rows: usize,
    /// Object the rows were staged in (deleted by now)
    pub staged: StagedObject,
    /// Whether the table was truncated first
    pub truncated: bool,
    /// Whether the table was created by this load
    pub created: bool,
}

/// A COPY statement for one staged object.
#[derive(Debug, Clone, Copy)]
pub struct CopyStatement<'a> {
    target: &'a TableRef,
    staged: &'a StagedObject,
    options: &'a LoadOptions,
}

impl<'a> CopyStatement<'a> {
    /// Describes a COPY of `staged` into `target`.
    #[must_use]
    pub fn new(target: &'a TableRef, staged: &'a StagedObject, options: &'a LoadOptions) -> Self {
        Self {
            target,
            staged,
            options,
        }
    }

    /// Statement text with credentials. Never log this.
    #[must_use]
    pub fn to_sql(&self, credentials: &CopyCredentials) -> String {
        self.render(credentials.copy_clauses())
    }

    /// Statement text with secrets masked.
    #[must_use]
    pub fn to_redacted_sql(&self, credentials: &CopyCredentials) -> String {
        self.render(credentials.redacted_clauses())
    }

    fn render(&self, auth: Vec<String>) -> String {
        let mut lines = vec![
            format!("COPY {}", self.target),
            format!("FROM '{}'", self.staged.source_uri()),
        ];
        lines.extend(self.options.iter().map(str::to_string));
        lines.extend(auth);
        lines.join("\n")
    }
}

/// Stages `dataset`, COPYs it into `target` and deletes the staged object.
///
/// When COPY fails the staged object is kept, unless `cleanup_on_failure` is
/// set; the returned [`LoadError::Copy`] names the object if it was kept.
///
/// # Errors
///
/// Returns a configuration error if credentials are unavailable, a storage
/// error if staging or cleanup fails, and [`LoadError::Copy`] if the
/// warehouse rejects the statement.
pub async fn copy(
    dataset: &Dataset,
    target: &TableRef,
    conn: &dyn WarehouseConnection,
    stager: &ObjectStager,
    credentials: &dyn CredentialProvider,
    load_options: &LoadOptions,
    cleanup_on_failure: bool,
) -> Result<LoadSummary> {
    let credentials = credentials
        .copy_credentials()
        .await
        .map_err(ConfigError::from)?;

    let staged = stager.stage(dataset, target.table().as_str()).await?;

    let statement = CopyStatement::new(target, &staged, load_options);
    debug!("Executing:\n{}", statement.to_redacted_sql(&credentials));

    if let Err(source) = conn.execute(&statement.to_sql(&credentials)).await {
        let orphaned = if cleanup_on_failure {
            match stager.unstage(&staged).await {
                Ok(()) => None,
                Err(e) => {
                    warn!("Could not delete {staged} after failed COPY: {e}");
                    Some(staged)
                },
            }
        } else {
            warn!("COPY into {target} failed, keeping staged object {staged}");
            Some(staged)
        };

        return Err(LoadError::Copy {
            table: target.to_string(),
            orphaned,
            source,
        }
        .into());
    }

    info!("Copied {} rows into {target}", dataset.num_rows());
    stager.unstage(&staged).await?;

    Ok(LoadSummary {
        table: target.clone(),
        rows: dataset.num_rows(),
        staged,
        truncated: false,
        created: false,
    })
}

/// Loads `dataset` into `target`, optionally truncating or creating it first.
///
/// Truncation runs before the existence check, so truncating a table that
/// does not exist fails even when `ensure_exists` is set.
///
/// # Errors
///
/// Returns the error of the first step that fails; see [`copy`],
/// [`create_table`] and [`table_exists`]. A failed truncate surfaces as the
/// warehouse driver reported it.
pub async fn insert(
    dataset: &Dataset,
    target: &TableRef,
    conn: &dyn WarehouseConnection,
    stager: &ObjectStager,
    credentials: &dyn CredentialProvider,
    options: &InsertOptions,
) -> Result<LoadSummary> {
    info!("Loading {} rows into {target}", dataset.num_rows());

    if options.truncate {
        conn.execute(&format!("TRUNCATE TABLE {target}")).await?;
        info!("Truncated {target}");
    }

    let mut created = false;
    if options.ensure_exists && !table_exists(conn, target).await? {
        let column_types = match &options.column_types {
            Some(explicit) if !explicit.is_empty() => explicit.clone(),
            _ => infer_column_types(dataset),
        };
        create_table(conn, target, &column_types).await?;
        created = true;
    }

    let summary = copy(
        dataset,
        target,
        conn,
        stager,
        credentials,
        &options.load_options,
        options.cleanup_on_failure,
    )
    .await?;

    Ok(LoadSummary {
        truncated: options.truncate,
        created,
        ..summary
    })
}
