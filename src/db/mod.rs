//! Snowflake access layer.
//!
//! This module provides the pieces the driver composes:
//! - HTTP client for the session and query endpoints
//! - Scoped sessions with guaranteed release
//! - Capped, lazy result reading across result chunks
//! - Catalog introspection
//! - Value decoding

pub mod client;
pub mod executor;
pub mod schema;
pub mod session;
pub mod types;

pub use client::{ChunkInfo, LoginData, QueryData, RowType, SessionInfo, SnowflakeClient};
pub use executor::{CappedRows, fetch_capped};
pub use schema::{SCHEMA_MAX_ROWS, schema_from_rows};
pub use session::Session;
