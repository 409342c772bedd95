//! Common types and traits shared across `Redload` crates.
//!
//! This crate provides the collaborator abstractions that the load pipeline
//! talks to, so that `redload-core` and its callers can plug in their own
//! warehouse connections and credential sources.

pub mod credentials;
pub mod warehouse;

// Re-export commonly used types
pub use credentials::{
    CopyCredentials, CredentialError, CredentialProvider, EnvCredentials, StaticCredentials,
};
pub use warehouse::{WarehouseConnection, WarehouseError};
