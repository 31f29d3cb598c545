//! Capped result reading.
//!
//! Rows are consumed as a lazy stream: the inline rowset first, then remote
//! chunks, each downloaded only when the stream is polled past the rows already
//! held. Reading stops after `max_rows + 1` rows; the extra row only decides
//! whether the result is incomplete and is discarded.

use crate::db::client::{QueryData, SnowflakeClient};
use crate::db::types::decode_row;
use crate::error::{VendorError, VendorResult};
use crate::models::{ColumnMetadata, Row};
use futures_util::{StreamExt, TryStreamExt, stream};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Rows read under a row cap.
#[derive(Debug, Clone)]
pub struct CappedRows {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<Row>,
    pub incomplete: bool,
    pub query_id: Option<String>,
}

/// Read at most `max_rows` rows of a query response.
pub async fn fetch_capped(
    client: &SnowflakeClient,
    data: QueryData,
    max_rows: u32,
) -> VendorResult<CappedRows> {
    let limit = max_rows as usize;
    let headers = data.chunk_request_headers()?;
    let QueryData {
        rowtype,
        rowset,
        total,
        returned,
        query_id,
        chunks,
        ..
    } = data;

    debug!(
        query_id = ?query_id,
        inline_rows = rowset.len(),
        chunks = chunks.len(),
        total = ?total,
        returned = ?returned,
        limit,
        "Reading query result"
    );

    let inline = stream::iter(rowset.into_iter().map(Ok::<_, VendorError>));

    let client = client.clone();
    let remote = stream::iter(chunks)
        .then(move |chunk| {
            let client = client.clone();
            let headers = headers.clone();
            async move { client.fetch_chunk(&chunk, &headers).await }
        })
        .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Vec<JsonValue>, VendorError>)))
        .try_flatten();

    let mut raw: Vec<Vec<JsonValue>> = inline
        .chain(remote)
        .take(limit + 1)
        .try_collect()
        .await
        .map_err(|e| attach_query_id(e, query_id.as_deref()))?;

    let incomplete = raw.len() > limit;
    if incomplete {
        raw.truncate(limit);
        warn!(
            query_id = ?query_id,
            total = ?total,
            limit,
            "Query result truncated"
        );
    }

    let rows = raw
        .into_iter()
        .map(|cells| decode_row(&rowtype, cells))
        .collect();

    Ok(CappedRows {
        columns: rowtype.iter().map(ColumnMetadata::from).collect(),
        rows,
        incomplete,
        query_id,
    })
}

fn attach_query_id(mut err: VendorError, query_id: Option<&str>) -> VendorError {
    if err.query_id.is_none() {
        err.query_id = query_id.map(String::from);
    }
    err
}
