//! Schema-related data models.
//!
//! This module defines the normalized schema metadata returned by introspection:
//! schema name → table name → columns in catalog order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    /// Catalog type name, e.g. "NUMBER", "TEXT"
    pub data_type: String,
    /// Column comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnInfo {
    /// Create new column info.
    pub fn new(
        table_schema: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            table_schema: table_schema.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
            data_type: data_type.into(),
            description: None,
        }
    }

    /// Set the column comment.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Columns of one table, in catalog order.
pub type TableColumns = Vec<ColumnInfo>;

/// Nested schema metadata.
///
/// Schema and table keys are sorted; the column sequence of each table keeps
/// the order in which columns were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaInfo {
    schemas: BTreeMap<String, BTreeMap<String, TableColumns>>,
}

impl SchemaInfo {
    /// Create an empty schema info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column to its table, creating schema and table entries as needed.
    pub fn push(&mut self, column: ColumnInfo) {
        self.schemas
            .entry(column.table_schema.clone())
            .or_default()
            .entry(column.table_name.clone())
            .or_default()
            .push(column);
    }

    /// Tables of one schema.
    pub fn schema(&self, schema: &str) -> Option<&BTreeMap<String, TableColumns>> {
        self.schemas.get(schema)
    }

    /// Columns of one table.
    pub fn table(&self, schema: &str, table: &str) -> Option<&[ColumnInfo]> {
        self.schemas
            .get(schema)
            .and_then(|tables| tables.get(table))
            .map(Vec::as_slice)
    }

    /// Schema names, sorted.
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn table_count(&self) -> usize {
        self.schemas.values().map(BTreeMap::len).sum()
    }

    pub fn column_count(&self) -> usize {
        self.schemas
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<ColumnInfo> for SchemaInfo {
    fn from_iter<I: IntoIterator<Item = ColumnInfo>>(iter: I) -> Self {
        let mut info = SchemaInfo::new();
        for column in iter {
            info.push(column);
        }
        info
    }
}
