//! Data models for the Snowflake driver.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConfigError, ConnectionConfig, DEFAULT_LOGIN_TIMEOUT_SECS, DEFAULT_MAX_ROWS, DRIVER_ID,
};
pub use query::{ColumnMetadata, QueryResult, Row};
pub use schema::{ColumnInfo, SchemaInfo, TableColumns};
