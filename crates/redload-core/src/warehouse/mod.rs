//! Warehouse connection implementations.
//!
//! - [`InMemoryWarehouse`] keeps a catalog in memory and records every
//!   statement, for tests and dry runs.
//! - `PostgresWarehouse` (feature `postgres`) talks to Redshift over the
//!   PostgreSQL wire protocol through `tokio-postgres`.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryWarehouse;
#[cfg(feature = "postgres")]
pub use postgres::PostgresWarehouse;
pub use redload_core_common::{WarehouseConnection, WarehouseError};
