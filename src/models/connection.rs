//! Connection-related data models.
//!
//! This module defines the typed connection configuration the driver consumes.

use crate::error::DriverError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Identifier of this driver within a multi-driver query tool.
pub const DRIVER_ID: &str = "snowflake";

/// Default row cap for query results.
pub const DEFAULT_MAX_ROWS: u32 = 10_000;

/// Default timeout for the login request in seconds.
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 30;

fn default_name() -> String {
    DRIVER_ID.to_string()
}

fn default_driver() -> String {
    DRIVER_ID.to_string()
}

fn default_max_rows() -> u32 {
    DEFAULT_MAX_ROWS
}

/// Configuration for a Snowflake connection.
///
/// Immutable for the duration of a call; derive a per-call copy with
/// [`ConnectionConfig::with_max_rows`] to override the row cap.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Account identifier, e.g. "xy12345.us-east-1"
    pub account: String,
    pub username: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing, default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default = "default_max_rows", alias = "maxRows")]
    pub max_rows: u32,
    /// Overrides `https://<account>.snowflakecomputing.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_timeout_secs: Option<u64>,
    /// Wraps the whole query operation. None means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_timeout_secs: Option<u64>,
}

impl ConnectionConfig {
    /// Create a new connection configuration with default selectors and row cap.
    pub fn new(
        account: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: default_name(),
            driver: default_driver(),
            account: account.into(),
            username: username.into(),
            password: password.into(),
            warehouse: None,
            database: None,
            schema: None,
            role: None,
            max_rows: DEFAULT_MAX_ROWS,
            endpoint: None,
            login_timeout_secs: None,
            query_timeout_secs: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the virtual warehouse.
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Set the database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the row cap.
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Point the driver at a non-default endpoint (proxy, private link).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the login timeout.
    pub fn with_login_timeout(mut self, secs: u64) -> Self {
        self.login_timeout_secs = Some(secs);
        self
    }

    /// Set the query timeout.
    ///
    /// Without one, a long-running statement is polled until it finishes.
    pub fn with_query_timeout(mut self, secs: u64) -> Self {
        self.query_timeout_secs = Some(secs);
        self
    }

    /// Validate all fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.driver.eq_ignore_ascii_case(DRIVER_ID) {
            return Err(ConfigError::WrongDriver(self.driver.clone()));
        }
        if self.account.trim().is_empty() {
            return Err(ConfigError::EmptyAccount);
        }
        if !self
            .account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ConfigError::InvalidAccount(self.account.clone()));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if self.max_rows == 0 {
            return Err(ConfigError::ZeroMaxRows);
        }
        self.base_url()?;
        Ok(())
    }

    /// Base URL of the Snowflake endpoints.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}.snowflakecomputing.com", self.account),
        };
        let url =
            Url::parse(&raw).map_err(|e| ConfigError::InvalidEndpoint(format!("{raw}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidEndpoint(format!(
                "{raw}: unsupported scheme '{other}'"
            ))),
        }
    }

    /// Effective login timeout.
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.unwrap_or(DEFAULT_LOGIN_TIMEOUT_SECS))
    }

    /// Effective query timeout, if any.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("name", &self.name)
            .field("driver", &self.driver)
            .field("account", &self.account)
            .field("username", &self.username)
            .field("password", &"****")
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("max_rows", &self.max_rows)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur when validating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Driver '{0}' is not handled by the Snowflake driver")]
    WrongDriver(String),

    #[error("Account cannot be empty")]
    EmptyAccount,

    #[error("Account contains invalid characters: {0}")]
    InvalidAccount(String),

    #[error("Username cannot be empty")]
    EmptyUsername,

    #[error("max_rows must be greater than 0")]
    ZeroMaxRows,

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::invalid_config(err.to_string())
    }
}
