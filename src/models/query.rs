//! Query-related data models.
//!
//! This module defines the result of a capped query execution.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single result row: column name to decoded value, in column order.
pub type Row = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Snowflake wire type (e.g., "fixed", "text", "timestamp_ntz")
    pub type_name: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
            scale: None,
            precision: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    /// True iff more rows existed than the row cap allowed.
    pub incomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Names of the result columns, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}
