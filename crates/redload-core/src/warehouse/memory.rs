//! In-memory warehouse used for tests and dry runs.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use redload_core_common::{WarehouseConnection, WarehouseError};

#[derive(Debug)]
struct State {
    schemas: BTreeSet<String>,
    tables: BTreeSet<(String, String)>,
    statements: Vec<String>,
    copy_failure: Option<String>,
}

/// A warehouse that only tracks its catalog.
///
/// It understands the statements the load pipeline issues: `CREATE SCHEMA IF
/// NOT EXISTS`, `CREATE TABLE`, `TRUNCATE TABLE` and `COPY`, and fails them
/// the way a real warehouse would (missing schema or table, duplicate
/// table). Other statements are accepted as-is. Every statement is recorded,
/// including the ones that fail.
#[derive(Debug)]
pub struct InMemoryWarehouse {
    state: Mutex<State>,
}

impl Default for InMemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWarehouse {
    /// Creates a warehouse holding only the `public` schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                schemas: BTreeSet::from(["public".to_string()]),
                tables: BTreeSet::new(),
                statements: Vec::new(),
                copy_failure: None,
            }),
        }
    }

    /// Adds an existing table (and its schema).
    #[must_use]
    pub fn with_table(self, schema: &str, table: &str) -> Self {
        {
            let mut state = self.lock();
            state.schemas.insert(schema.to_lowercase());
            state
                .tables
                .insert((schema.to_lowercase(), table.to_lowercase()));
        }
        self
    }

    /// Makes every following COPY fail with `message`.
    #[must_use]
    pub fn with_copy_failure(self, message: impl Into<String>) -> Self {
        self.lock().copy_failure = Some(message.into());
        self
    }

    /// Statements received so far, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    /// Qualified names of the tables in the catalog.
    #[must_use]
    pub fn tables(&self) -> Vec<String> {
        self.lock()
            .tables
            .iter()
            .map(|(schema, table)| format!("{schema}.{table}"))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Splits `schema.table` off the front of `rest`.
fn relation(rest: &str) -> Option<(String, String)> {
    let name = rest
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()?
        .to_lowercase();
    let (schema, table) = name.split_once('.')?;
    Some((schema.to_string(), table.to_string()))
}

fn strip_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let head = sql.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| sql[keyword.len()..].trim_start())
}

impl State {
    fn apply(&mut self, sql: &str) -> Result<(), WarehouseError> {
        let sql = sql.trim_start();

        if let Some(rest) = strip_keyword(sql, "CREATE SCHEMA IF NOT EXISTS ") {
            self.schemas.insert(rest.trim().to_lowercase());
            return Ok(());
        }

        if let Some(rest) = strip_keyword(sql, "CREATE TABLE ") {
            let (schema, table) = relation(rest).ok_or_else(|| malformed(sql))?;
            if !self.schemas.contains(&schema) {
                return Err(WarehouseError::UndefinedSchema {
                    message: format!("schema \"{schema}\" does not exist"),
                });
            }
            if !self.tables.insert((schema.clone(), table.clone())) {
                return Err(WarehouseError::DuplicateTable {
                    message: format!("relation \"{schema}.{table}\" already exists"),
                });
            }
            return Ok(());
        }

        if let Some(rest) = strip_keyword(sql, "TRUNCATE TABLE ") {
            let relation = relation(rest).ok_or_else(|| malformed(sql))?;
            return self.require(&relation);
        }

        if let Some(rest) = strip_keyword(sql, "COPY ") {
            let relation = relation(rest).ok_or_else(|| malformed(sql))?;
            self.require(&relation)?;
            if let Some(message) = &self.copy_failure {
                return Err(WarehouseError::Statement {
                    message: message.clone(),
                    code: Some("XX000".to_string()),
                });
            }
        }

        Ok(())
    }

    fn require(&self, relation: &(String, String)) -> Result<(), WarehouseError> {
        if self.tables.contains(relation) {
            Ok(())
        } else {
            Err(WarehouseError::UndefinedTable {
                message: format!("relation \"{}.{}\" does not exist", relation.0, relation.1),
            })
        }
    }
}

fn malformed(sql: &str) -> WarehouseError {
    WarehouseError::Statement {
        message: format!("syntax error in statement: {sql}"),
        code: Some("42601".to_string()),
    }
}

#[async_trait]
impl WarehouseConnection for InMemoryWarehouse {
    async fn execute(&self, sql: &str) -> Result<(), WarehouseError> {
        let mut state = self.lock();
        state.statements.push(sql.to_string());
        state.apply(sql)
    }

    async fn has_table(&self, table: &str, schema: &str) -> Result<bool, WarehouseError> {
        Ok(self
            .lock()
            .tables
            .contains(&(schema.to_lowercase(), table.to_lowercase())))
    }
}
