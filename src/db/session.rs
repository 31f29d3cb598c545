//! Scoped Snowflake sessions.
//!
//! A [`Session`] is opened at the start of a driver call and released before
//! the call returns. `close()` is the normal path; if the owning future is
//! dropped first (caller timeout, cancellation, panic), `Drop` spawns the
//! logout so the server-side session is never leaked.

use crate::db::client::{QueryData, SessionInfo, SnowflakeClient};
use crate::error::VendorResult;
use crate::models::ConnectionConfig;
use tracing::{debug, warn};

pub struct Session {
    client: SnowflakeClient,
    token: String,
    info: SessionInfo,
    sequence_id: u64,
    released: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.client.base_url().as_str())
            .field("info", &self.info)
            .field("sequence_id", &self.sequence_id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Log in and open a session.
    pub async fn open(client: &SnowflakeClient, config: &ConnectionConfig) -> VendorResult<Self> {
        let login = client.login(config).await?;
        debug!(
            database = ?login.session_info.database_name,
            schema = ?login.session_info.schema_name,
            warehouse = ?login.session_info.warehouse_name,
            role = ?login.session_info.role_name,
            "Snowflake session opened"
        );

        Ok(Self {
            client: client.clone(),
            token: login.token,
            info: login.session_info,
            sequence_id: 0,
            released: false,
        })
    }

    /// Session context as reported by Snowflake at login.
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn client(&self) -> &SnowflakeClient {
        &self.client
    }

    /// Execute one statement in this session.
    pub async fn execute(&mut self, sql: &str) -> VendorResult<QueryData> {
        self.sequence_id += 1;
        self.client.query(&self.token, sql, self.sequence_id).await
    }

    /// Explicitly close the session (preferred over relying on Drop).
    pub async fn close(mut self) -> VendorResult<()> {
        // Still unreleased while the logout is in flight: if this future is
        // dropped here, Drop retries the logout
        let result = self.client.logout(&self.token).await;
        self.released = true;
        debug!(ok = result.is_ok(), "Snowflake session closed");
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let client = self.client.clone();
        let token = std::mem::take(&mut self.token);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = client.logout(&token).await {
                        warn!(error = %e, "Failed to release Snowflake session via Drop");
                    }
                });
                warn!("Snowflake session released via Drop - call was interrupted before close()");
            }
            Err(_) => {
                warn!("Snowflake session dropped outside a tokio runtime; it will expire server-side");
            }
        }
    }
}
