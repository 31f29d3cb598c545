//! Catalog introspection.
//!
//! The catalog query reads `INFORMATION_SCHEMA.COLUMNS` of the session's
//! current database; the database itself comes from the connection
//! configuration at login.

use crate::models::{ColumnInfo, Row, SchemaInfo};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Row cap for the catalog query, independent of the configured `max_rows`.
pub const SCHEMA_MAX_ROWS: u32 = 1_000_000;

pub mod queries {
    pub const COLUMNS: &str = r#"
        SELECT
            c.TABLE_SCHEMA AS "table_schema",
            c.TABLE_NAME AS "table_name",
            c.COLUMN_NAME AS "column_name",
            c.DATA_TYPE AS "data_type",
            c.COMMENT AS "description"
        FROM INFORMATION_SCHEMA.COLUMNS c
        WHERE c.TABLE_SCHEMA <> 'INFORMATION_SCHEMA'
        ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION
        "#;
}

/// Look a field up by its alias, falling back to Snowflake's upper-cased form.
fn field<'a>(row: &'a Row, name: &str) -> Option<&'a str> {
    row.get(name)
        .or_else(|| row.get(&name.to_uppercase()))
        .and_then(JsonValue::as_str)
}

/// Convert one catalog row. Rows without a schema, table or column name are skipped.
pub fn column_from_row(row: &Row) -> Option<ColumnInfo> {
    let column = ColumnInfo::new(
        field(row, "table_schema")?,
        field(row, "table_name")?,
        field(row, "column_name")?,
        field(row, "data_type").unwrap_or_default(),
    );

    Some(match field(row, "description").filter(|d| !d.is_empty()) {
        Some(description) => column.with_description(description),
        None => column,
    })
}

/// Group catalog rows, in the order returned, into nested schema metadata.
pub fn schema_from_rows(rows: &[Row]) -> SchemaInfo {
    let mut skipped = 0usize;
    let info: SchemaInfo = rows
        .iter()
        .filter_map(|row| {
            let column = column_from_row(row);
            if column.is_none() {
                skipped += 1;
            }
            column
        })
        .collect();

    debug!(
        schemas = info.schema_names().count(),
        tables = info.table_count(),
        columns = info.column_count(),
        skipped,
        "Built schema info"
    );
    info
}
