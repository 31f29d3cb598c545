//! Driver adapter.
//!
//! [`Driver`] is the contract a query tool uses to talk to one kind of
//! database: connection testing, capped query execution and schema
//! introspection. [`SnowflakeDriver`] implements it over the Snowflake
//! session endpoints.
//!
//! Every call opens its own session and releases it before returning, so a
//! single driver value can serve any number of concurrent calls.

use crate::db::schema::queries;
use crate::db::{CappedRows, SCHEMA_MAX_ROWS, Session, SnowflakeClient, fetch_capped, schema_from_rows};
use crate::error::{DriverError, DriverResult, VendorError, VendorResult};
use crate::models::{ConnectionConfig, DRIVER_ID, QueryResult, SchemaInfo};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Common trait for database drivers.
pub trait Driver: Send + Sync {
    /// Driver identifier, e.g. "snowflake".
    fn id(&self) -> &'static str;

    /// Verify reachability and credentials without executing a statement.
    fn test_connection(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = DriverResult<()>> + Send;

    /// Execute `sql`, returning at most `config.max_rows` rows.
    fn run_query(
        &self,
        sql: &str,
        config: &ConnectionConfig,
    ) -> impl Future<Output = DriverResult<QueryResult>> + Send;

    /// Columns of every table visible in the configured database.
    fn get_schema(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = DriverResult<SchemaInfo>> + Send;
}

#[derive(Debug, Clone, Default)]
pub struct SnowflakeDriver {
    http: reqwest::Client,
}

impl SnowflakeDriver {
    /// Create a driver with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver sharing an existing HTTP client (proxy, TLS settings).
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn client_for(&self, config: &ConnectionConfig) -> DriverResult<SnowflakeClient> {
        config.validate()?;
        Ok(SnowflakeClient::new(self.http.clone(), config.base_url()?))
    }

    /// Run one statement in a fresh session and read it under a row cap.
    ///
    /// Login failures are connection errors; everything after login is
    /// classified by `classify`. The session is closed on every path.
    async fn execute_capped(
        &self,
        config: &ConnectionConfig,
        sql: &str,
        max_rows: u32,
        classify: fn(VendorError) -> DriverError,
    ) -> DriverResult<CappedRows> {
        let client = self.client_for(config)?;
        let mut session = Session::open(&client, config)
            .await
            .map_err(DriverError::Connection)?;

        let outcome = read_statement(&mut session, sql, max_rows).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close Snowflake session");
        }

        outcome.map_err(classify)
    }
}

async fn read_statement(session: &mut Session, sql: &str, max_rows: u32) -> VendorResult<CappedRows> {
    let data = session.execute(sql).await?;
    fetch_capped(session.client(), data, max_rows).await
}

/// Apply an optional caller-configured timeout to a whole operation.
async fn with_timeout<T>(
    limit: Option<Duration>,
    operation: &str,
    fut: impl Future<Output = DriverResult<T>>,
) -> DriverResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| DriverError::timeout(operation, limit.as_secs()))?,
        None => fut.await,
    }
}

impl Driver for SnowflakeDriver {
    fn id(&self) -> &'static str {
        DRIVER_ID
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> DriverResult<()> {
        let client = self.client_for(config)?;
        info!(name = %config.name, account = %config.account, "Testing Snowflake connection");

        let session = Session::open(&client, config)
            .await
            .map_err(DriverError::Connection)?;
        let info = session.info().clone();
        session.close().await.map_err(DriverError::Connection)?;

        debug!(
            name = %config.name,
            database = ?info.database_name,
            warehouse = ?info.warehouse_name,
            role = ?info.role_name,
            "Snowflake connection verified"
        );
        Ok(())
    }

    async fn run_query(&self, sql: &str, config: &ConnectionConfig) -> DriverResult<QueryResult> {
        let start = Instant::now();
        debug!(
            sql = %sql,
            name = %config.name,
            max_rows = config.max_rows,
            timeout_secs = ?config.query_timeout_secs,
            "Executing query"
        );

        let capped = with_timeout(
            config.query_timeout(),
            "query execution",
            self.execute_capped(config, sql, config.max_rows, DriverError::Query),
        )
        .await?;

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(
            query_id = ?capped.query_id,
            rows = capped.rows.len(),
            incomplete = capped.incomplete,
            execution_time_ms,
            "Query finished"
        );

        Ok(QueryResult {
            columns: capped.columns,
            rows: capped.rows,
            incomplete: capped.incomplete,
            query_id: capped.query_id,
            execution_time_ms,
        })
    }

    async fn get_schema(&self, config: &ConnectionConfig) -> DriverResult<SchemaInfo> {
        debug!(name = %config.name, database = ?config.database, "Reading Snowflake catalog");

        let capped = with_timeout(
            config.query_timeout(),
            "schema query",
            self.execute_capped(config, queries::COLUMNS, SCHEMA_MAX_ROWS, DriverError::Schema),
        )
        .await?;

        if capped.incomplete {
            warn!(
                limit = SCHEMA_MAX_ROWS,
                "Catalog query truncated; schema info is partial"
            );
        }

        Ok(schema_from_rows(&capped.rows))
    }
}
