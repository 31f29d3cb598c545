//! Snowflake Driver Library
//!
//! Driver adapter that lets a SQL query tool test Snowflake connections,
//! run row-capped queries and read schema metadata over the Snowflake
//! session endpoints.

pub mod config;
pub mod db;
pub mod driver;
pub mod error;
pub mod models;

pub use config::Config;
pub use driver::{Driver, SnowflakeDriver};
pub use error::{DriverError, DriverResult, VendorError};
pub use models::{ColumnInfo, ConnectionConfig, QueryResult, SchemaInfo};
